//! Integration layer for switchyard.
//!
//! This crate provides:
//!
//! - **Connections**: Provider connection lookup for handlers that call third-party services
//! - **Connector trait**: Common interface for protocol integrations, adapted into action handlers
//! - **Local handlers**: Built-in handlers that need no external service

pub mod connection;
pub mod connector;
pub mod error;
pub mod handlers;

pub use connection::{Connection, ConnectionProvider, InMemoryConnections};
pub use connector::{Connector, ConnectorHandler, ConnectorInfo, Operation, OperationResult};
pub use error::{ConnectionError, ConnectorError};
pub use handlers::{EndHandler, KeyValueHandler, ManualTriggerHandler, WaitHandler, local_registry};
