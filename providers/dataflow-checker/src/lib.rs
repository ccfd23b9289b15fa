//! Keiho checker for Google Cloud Dataflow
//!
//! Reports jobs that failed since the last cycle and batch jobs that have
//! been running longer than a configured limit.

pub mod checker;
pub mod error;
pub mod job;
pub mod service;
pub mod token;

pub use checker::DataflowChecker;
pub use error::DataflowError;
pub use job::{Job, JobStatus, LogMessage, MessageLevel};
pub use service::{DataflowService, JobService};
pub use token::{GcpTokenSource, StaticToken, TokenSource};

pub type Result<T> = std::result::Result<T, DataflowError>;
