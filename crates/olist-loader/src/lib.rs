//! Olist CSV Loader
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Batch loader for the Olist e-commerce CSV exports. Each run replaces the
//! contents of one destination table per dataset.
//!
//! # Pipeline
//!
//! - [`schema`]: static registry of datasets, columns and column coercions
//! - [`reader`]: CSV reading with UTF-8 then Latin-1 decoding
//! - [`cleaner`]: projection, blank and line-break handling, type coercion
//! - [`loader`]: transactional clear, batched insert, row count verification
//! - [`orchestrator`]: runs the datasets in order and summarizes the run
//!
//! # Example
//!
//! ```no_run
//! use olist_loader::{db, Config, Loader, Orchestrator, PgDestination, SchemaRegistry};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! config.validate()?;
//!
//! let pool = db::create_pool(&config.database).await?;
//! let loader = Loader::new(PgDestination::new(pool)).with_batch_size(config.source.batch_size);
//!
//! let mut orchestrator = Orchestrator::new(config.source.data_dir()?, loader);
//! let summary = orchestrator.run(&SchemaRegistry::olist()).await;
//! println!("{} failed", summary.failed());
//! # Ok(())
//! # }
//! ```

pub mod cleaner;
pub mod coerce;
pub mod config;
pub mod db;
pub mod destination;
pub mod error;
pub mod loader;
pub mod orchestrator;
pub mod reader;
pub mod schema;
pub mod table;

pub use config::Config;
pub use destination::{Destination, PgDestination};
pub use error::{ConfigError, EntryError};
pub use loader::{LoadResult, Loader, VerificationMismatch};
pub use orchestrator::{EntryOutcome, EntryRecord, EntryReport, Orchestrator, RunSummary};
pub use reader::SourceEncoding;
pub use schema::{ColumnKind, DatasetSpec, SchemaRegistry, OLIST_DATASETS};
pub use table::{CellValue, CleanTable, Column, RawTable};
