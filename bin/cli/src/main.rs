use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use switchyard_cli::commands;
use switchyard_cli::config::CliConfig;
use switchyard_cli::error::CliError;
use switchyard_cli::reporting::render_report;
use switchyard_cli::repository::{FileRepository, WorkflowSource};
use switchyard_core::Result;
use switchyard_workflow::{ExecutionState, Workflow};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "switchyard", version, about = "Validate, plan and run switchyard workflows")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, env = "SWITCHYARD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the graph for dangling edges, cycles and trigger/end rules
    Validate {
        /// Workflow file, or a `wf_` id in the workflow store
        workflow: String,
    },
    /// Print the execution order
    Plan {
        /// Workflow file, or a `wf_` id in the workflow store
        workflow: String,
    },
    /// Print the placeholders a node may reference
    Vars {
        /// Workflow file, or a `wf_` id in the workflow store
        workflow: String,
        /// Node to list variables for
        node_id: String,
    },
    /// Run the workflow with the built-in handlers
    Run {
        /// Workflow file, or a `wf_` id in the workflow store
        workflow: String,
        /// Write recorded outputs back to the workflow
        #[arg(long)]
        save: bool,
    },
}

impl Commands {
    fn workflow(&self) -> &str {
        match self {
            Self::Validate { workflow }
            | Self::Plan { workflow }
            | Self::Vars { workflow, .. }
            | Self::Run { workflow, .. } => workflow,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CliConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", CliError::Config { details: e.to_string() });
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log.filter.as_str())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match execute(cli.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(command: Commands, config: &CliConfig) -> Result<ExitCode, CliError> {
    let store = FileRepository::new(config.store.dir.clone());
    let source = WorkflowSource::parse(command.workflow());
    let mut workflow = load(&source, &store).await?;

    match command {
        Commands::Validate { .. } => {
            println!("{}", commands::validate(&workflow)?);
        }
        Commands::Plan { .. } => {
            print!("{}", commands::plan(&workflow));
        }
        Commands::Vars { node_id, .. } => {
            print!("{}", commands::vars(&workflow, &node_id)?);
        }
        Commands::Run { save, .. } => {
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, cancelling run");
                    on_interrupt.cancel();
                }
            });

            let report = commands::run(&mut workflow, config, &cancel).await?;
            println!("{}", render_report(&report, &workflow.graph));

            if save {
                source
                    .save(&store, &workflow)
                    .await
                    .map_err(|e| CliError::Save {
                        path: match &source {
                            WorkflowSource::File(path) => path.clone(),
                            WorkflowSource::Stored(id) => store.path_for(*id),
                        },
                        details: e.to_string(),
                    })?;
                info!(workflow = %source, "recorded outputs saved");
            }

            if report.state != ExecutionState::Completed {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn load(source: &WorkflowSource, store: &FileRepository) -> Result<Workflow, CliError> {
    let workflow = source.load(store).await.map_err(|e| CliError::Load {
        source: source.to_string(),
        details: e.to_string(),
    })?;
    info!(workflow_id = %workflow.id, name = %workflow.name(), "workflow loaded");
    Ok(workflow)
}
