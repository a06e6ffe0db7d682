//! Olist Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared plumbing for the Olist loader workspace.
//!
//! # Overview
//!
//! - **Logging**: `tracing` subscriber set-up driven by `LOG_*` variables
//! - **Environment**: typed readers for environment variables with defaults
//!
//! # Example
//!
//! ```no_run
//! use olist_common::env;
//! use olist_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_logging(&LogConfig::from_env()?)?;
//!     let port: u16 = env::parse_or("DB_PORT", 5432)?;
//!     tracing::info!(port, "configured");
//!     Ok(())
//! }
//! ```

pub mod env;
pub mod logging;

pub use env::EnvError;
