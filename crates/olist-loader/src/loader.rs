//! Replace-and-verify load of one table
//!
//! The clear and every insert batch share one transaction, so a failure part
//! way through leaves the previous contents of the table in place. The row
//! count is read after commit.

use tracing::{debug, warn};

use crate::config::DEFAULT_BATCH_SIZE;
use crate::destination::Destination;
use crate::error::{EntryError, Result};
use crate::table::CleanTable;

/// Outcome of loading one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    pub table: String,
    /// Rows sent to the destination
    pub rows_attempted: usize,
    /// Rows counted in the table after commit
    pub rows_present: i64,
}

impl LoadResult {
    pub fn is_verified(&self) -> bool {
        i64::try_from(self.rows_attempted).is_ok_and(|n| n == self.rows_present)
    }

    pub fn mismatch(&self) -> Option<VerificationMismatch> {
        (!self.is_verified()).then(|| VerificationMismatch {
            table: self.table.clone(),
            expected: self.rows_attempted,
            actual: self.rows_present,
        })
    }
}

/// Post-load count differs from the rows inserted. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationMismatch {
    pub table: String,
    pub expected: usize,
    pub actual: i64,
}

impl std::fmt::Display for VerificationMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "`{}` holds {} rows after load, expected {}",
            self.table, self.actual, self.expected
        )
    }
}

/// Loads clean tables into a [`Destination`]
pub struct Loader<D> {
    destination: D,
    batch_size: usize,
}

impl<D: Destination> Loader<D> {
    pub fn new(destination: D) -> Self {
        Self {
            destination,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Rows per insert statement; values below 1 are raised to 1
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Configured batch size, capped by what the destination accepts
    pub fn effective_batch_size(&self, columns: usize) -> usize {
        self.batch_size
            .min(self.destination.max_rows_per_batch(columns))
            .max(1)
    }

    pub fn destination(&self) -> &D {
        &self.destination
    }

    pub fn into_inner(self) -> D {
        self.destination
    }

    /// Replace the contents of `table` with `data` and verify the row count
    pub async fn load(&mut self, table: &str, data: &CleanTable) -> Result<LoadResult> {
        let batch_size = self.effective_batch_size(data.width());

        self.destination
            .begin()
            .await
            .map_err(|source| EntryError::Transaction {
                table: table.to_string(),
                source,
            })?;

        if let Err(source) = self.destination.clear(table).await {
            self.abort(table).await;
            return Err(EntryError::ClearFailed {
                table: table.to_string(),
                source,
            });
        }

        for (index, chunk) in data.rows().chunks(batch_size).enumerate() {
            let batch = index + 1;
            match self
                .destination
                .insert_batch(table, data.columns(), chunk)
                .await
            {
                Ok(inserted) => debug!(table, batch, rows = inserted, "Inserted batch"),
                Err(source) => {
                    self.abort(table).await;
                    return Err(EntryError::Insert {
                        table: table.to_string(),
                        batch,
                        source,
                    });
                },
            }
        }

        self.destination
            .commit()
            .await
            .map_err(|source| EntryError::Transaction {
                table: table.to_string(),
                source,
            })?;

        let rows_present =
            self.destination
                .count_rows(table)
                .await
                .map_err(|source| EntryError::Count {
                    table: table.to_string(),
                    source,
                })?;

        let result = LoadResult {
            table: table.to_string(),
            rows_attempted: data.len(),
            rows_present,
        };

        if let Some(mismatch) = result.mismatch() {
            warn!(
                table,
                expected = mismatch.expected,
                actual = mismatch.actual,
                "Verification mismatch: {}",
                mismatch
            );
        }

        Ok(result)
    }

    async fn abort(&mut self, table: &str) {
        if let Err(e) = self.destination.rollback().await {
            warn!(table, error = %e, "Rollback failed");
        }
    }
}
