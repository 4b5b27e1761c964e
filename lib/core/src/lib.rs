//! Core domain types and utilities for switchyard.
//!
//! This crate provides the identifiers and error plumbing shared by the
//! workflow engine, the integration layer and the command-line front end.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ConnectionId, ParseIdError, WorkflowId, WorkflowRunId};
