//! Shared utilities for the calculator tools
//!
//! - [`logging`]: tracing subscriber setup (console and rolling file)
//! - [`config`]: layered configuration loading with figment

pub mod config;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use config::{load_config, load_config_from_file};
pub use error::{Error, Result};
pub use logging::{init_logging, init_test_logging, LogConfig, LogFormat};
