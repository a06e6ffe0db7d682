//! Sequential run over the registry
//!
//! Each dataset goes through read, clean and load on its own. A failure is
//! recorded against that dataset and the run moves on; only the summary sees
//! all of them.

use std::path::{Path, PathBuf};

use tracing::{error, info, info_span, warn, Instrument};

use crate::cleaner;
use crate::destination::Destination;
use crate::error::EntryError;
use crate::loader::{LoadResult, Loader};
use crate::reader::{self, SourceEncoding};
use crate::schema::{DatasetSpec, SchemaRegistry};

/// What was read and cleaned for one dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    pub file: PathBuf,
    pub table: String,
    pub encoding: SourceEncoding,
    pub rows: usize,
    pub columns: usize,
}

/// Result of one dataset
#[derive(Debug)]
pub enum EntryOutcome {
    Loaded {
        report: EntryReport,
        result: LoadResult,
    },
    /// Read and cleaned only (dry run)
    Cleaned { report: EntryReport },
    /// Source file absent
    Skipped { path: PathBuf },
    Failed { error: EntryError },
}

impl EntryOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, EntryOutcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, EntryOutcome::Skipped { .. })
    }
}

#[derive(Debug)]
pub struct EntryRecord {
    pub dataset: String,
    pub outcome: EntryOutcome,
}

/// Outcomes of a whole run, in registry order
#[derive(Debug, Default)]
pub struct RunSummary {
    pub entries: Vec<EntryRecord>,
}

impl RunSummary {
    /// Datasets whose source existed
    pub fn attempted(&self) -> usize {
        self.succeeded() + self.failed()
    }

    pub fn succeeded(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| {
                matches!(
                    e.outcome,
                    EntryOutcome::Loaded { .. } | EntryOutcome::Cleaned { .. }
                )
            })
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_failure()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn get(&self, dataset: &str) -> Option<&EntryOutcome> {
        self.entries
            .iter()
            .find(|e| e.dataset == dataset)
            .map(|e| &e.outcome)
    }
}

/// Drives the per-dataset pipeline
pub struct Orchestrator<D> {
    source_root: PathBuf,
    /// `None` in dry-run mode
    loader: Option<Loader<D>>,
}

impl<D: Destination> Orchestrator<D> {
    pub fn new(source_root: impl Into<PathBuf>, loader: Loader<D>) -> Self {
        Self {
            source_root: source_root.into(),
            loader: Some(loader),
        }
    }

    /// Read and clean without a destination
    pub fn dry_run(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            loader: None,
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn loader(&self) -> Option<&Loader<D>> {
        self.loader.as_ref()
    }

    pub fn into_loader(self) -> Option<Loader<D>> {
        self.loader
    }

    /// Process every dataset in registry order
    pub async fn run(&mut self, registry: &SchemaRegistry) -> RunSummary {
        info!(
            source_root = %self.source_root.display(),
            datasets = registry.len(),
            dry_run = self.loader.is_none(),
            "Starting load"
        );

        let mut summary = RunSummary::default();

        for spec in registry.iter() {
            let span = info_span!("dataset", name = spec.name);
            let outcome = self.run_entry(spec).instrument(span).await;
            summary.entries.push(EntryRecord {
                dataset: spec.name.to_string(),
                outcome,
            });
        }

        info!(
            attempted = summary.attempted(),
            succeeded = summary.succeeded(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            "Load finished: {} attempted, {} succeeded, {} skipped, {} failed",
            summary.attempted(),
            summary.succeeded(),
            summary.skipped(),
            summary.failed()
        );

        summary
    }

    async fn run_entry(&mut self, spec: &DatasetSpec) -> EntryOutcome {
        let path = self.source_root.join(spec.file);

        if !path.is_file() {
            warn!(file = %path.display(), "Source file not found, skipping");
            return EntryOutcome::Skipped { path };
        }

        match self.process(spec, &path).await {
            Ok(outcome) => outcome,
            Err(EntryError::SourceNotFound { path }) => {
                warn!(file = %path.display(), "Source file not found, skipping");
                EntryOutcome::Skipped { path }
            },
            Err(error) => {
                error!(kind = error.kind(), "Failed: {}", error);
                EntryOutcome::Failed { error }
            },
        }
    }

    async fn process(&mut self, spec: &DatasetSpec, path: &Path) -> Result<EntryOutcome, EntryError> {
        let (raw, encoding) = reader::read(path)?;
        let clean = cleaner::clean(raw, spec)?;

        let report = EntryReport {
            file: path.to_path_buf(),
            table: spec.name.to_string(),
            encoding,
            rows: clean.len(),
            columns: clean.width(),
        };

        info!(
            file = %report.file.display(),
            table = %report.table,
            encoding = %report.encoding,
            rows = report.rows,
            columns = report.columns,
            "Read {} -> {} ({} rows x {} columns, {})",
            spec.file,
            report.table,
            report.rows,
            report.columns,
            report.encoding
        );

        let Some(loader) = self.loader.as_mut() else {
            return Ok(EntryOutcome::Cleaned { report });
        };

        let result = loader.load(spec.name, &clean).await?;
        info!(
            table = %result.table,
            rows = result.rows_present,
            "Loaded `{}`: {} rows present",
            result.table,
            result.rows_present
        );

        Ok(EntryOutcome::Loaded { report, result })
    }
}
