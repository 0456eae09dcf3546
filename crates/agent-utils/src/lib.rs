//! Shared utilities
//!
//! Tracing setup and the environment-driven process configuration used by
//! the binaries and by the domain crates' `from_env` constructors.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigError, LogFormat, env_or, env_parse};
pub use logging::{init_tracing, init_tracing_with};
