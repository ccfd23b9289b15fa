//! Wiring for the `keiho-monitor` binary: configuration and the assembled
//! monitor with its storage, checkers and handlers.

pub mod app;
pub mod config;

pub use app::KeihoApp;
pub use config::KeihoMonitorConfig;
