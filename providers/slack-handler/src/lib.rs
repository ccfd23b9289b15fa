//! Keiho handler delivering notifications to a Slack channel

pub mod error;
pub mod formatter;
pub mod handler;
pub mod slack_client;
pub mod types;

pub use error::SlackError;
pub use handler::SlackHandler;
pub use slack_client::SlackClient;

pub type Result<T> = std::result::Result<T, SlackError>;
