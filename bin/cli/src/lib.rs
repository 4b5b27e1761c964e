//! Command-line front end for switchyard.
//!
//! Loads a workflow from a file or the workflow store, then validates it,
//! prints its plan or variables, or runs it with the built-in handlers.

pub mod commands;
pub mod config;
pub mod error;
pub mod reporting;
pub mod repository;
