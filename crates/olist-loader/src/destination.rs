//! Destination primitives used by the loader
//!
//! [`Destination`] is the seam between the loader and the database. The
//! PostgreSQL implementation keeps at most one open transaction; statements
//! issued while it is open run inside it, otherwise they autocommit on the
//! pool.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::PgPool;
use sqlx::query_builder::Separated;
use sqlx::{Postgres, QueryBuilder, Transaction};

use crate::schema::ColumnKind;
use crate::table::{CellValue, Column};

/// PostgreSQL limit on bind parameters per statement
pub const MAX_BIND_PARAMS: usize = 65_535;

/// Statement-level access to the destination database
#[async_trait]
pub trait Destination: Send {
    async fn begin(&mut self) -> Result<(), sqlx::Error>;

    /// Remove every row from `table`
    async fn clear(&mut self, table: &str) -> Result<(), sqlx::Error>;

    /// Insert `rows` in one statement, returning the affected row count
    async fn insert_batch(
        &mut self,
        table: &str,
        columns: &[Column],
        rows: &[Vec<CellValue>],
    ) -> Result<u64, sqlx::Error>;

    async fn commit(&mut self) -> Result<(), sqlx::Error>;

    async fn rollback(&mut self) -> Result<(), sqlx::Error>;

    async fn count_rows(&mut self, table: &str) -> Result<i64, sqlx::Error>;

    /// Largest batch a single insert statement can carry for `columns` columns
    fn max_rows_per_batch(&self, _columns: usize) -> usize {
        usize::MAX
    }
}

/// PostgreSQL destination backed by a connection pool
pub struct PgDestination {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl std::fmt::Debug for PgDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgDestination")
            .field("pool", &self.pool)
            .field("in_transaction", &self.tx.is_some())
            .finish()
    }
}

impl PgDestination {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, tx: None }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }
}

#[async_trait]
impl Destination for PgDestination {
    async fn begin(&mut self) -> Result<(), sqlx::Error> {
        if self.tx.is_some() {
            return Err(sqlx::Error::Protocol(
                "a transaction is already open on this destination".to_string(),
            ));
        }
        self.tx = Some(self.pool.begin().await?);
        Ok(())
    }

    async fn clear(&mut self, table: &str) -> Result<(), sqlx::Error> {
        let sql = format!("TRUNCATE TABLE {}", quote_ident(table));
        match self.tx.as_mut() {
            Some(tx) => sqlx::query(&sql).execute(&mut **tx).await?,
            None => sqlx::query(&sql).execute(&self.pool).await?,
        };
        Ok(())
    }

    async fn insert_batch(
        &mut self,
        table: &str,
        columns: &[Column],
        rows: &[Vec<CellValue>],
    ) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }

        let column_list = columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");

        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) ",
            quote_ident(table),
            column_list
        ));

        query_builder.push_values(rows, |mut b, row| {
            for (cell, column) in row.iter().zip(columns) {
                push_cell(&mut b, cell, column.kind);
            }
        });

        let result = match self.tx.as_mut() {
            Some(tx) => query_builder.build().execute(&mut **tx).await?,
            None => query_builder.build().execute(&self.pool).await?,
        };

        Ok(result.rows_affected())
    }

    async fn commit(&mut self) -> Result<(), sqlx::Error> {
        match self.tx.take() {
            Some(tx) => tx.commit().await,
            None => Ok(()),
        }
    }

    async fn rollback(&mut self) -> Result<(), sqlx::Error> {
        match self.tx.take() {
            Some(tx) => tx.rollback().await,
            None => Ok(()),
        }
    }

    async fn count_rows(&mut self, table: &str) -> Result<i64, sqlx::Error> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        match self.tx.as_mut() {
            Some(tx) => sqlx::query_scalar::<_, i64>(&sql).fetch_one(&mut **tx).await,
            None => sqlx::query_scalar::<_, i64>(&sql).fetch_one(&self.pool).await,
        }
    }

    fn max_rows_per_batch(&self, columns: usize) -> usize {
        rows_within_bind_limit(columns)
    }
}

/// Rows that fit in one statement without exceeding [`MAX_BIND_PARAMS`]
pub fn rows_within_bind_limit(columns: usize) -> usize {
    MAX_BIND_PARAMS / columns.max(1)
}

/// Bind one cell; nulls are bound with the column's type
fn push_cell<'args>(
    b: &mut Separated<'_, 'args, Postgres, &'static str>,
    cell: &'args CellValue,
    kind: ColumnKind,
) {
    match cell {
        CellValue::Null => match kind {
            ColumnKind::Numeric => b.push_bind(None::<f64>),
            ColumnKind::Temporal => b.push_bind(None::<NaiveDateTime>),
            ColumnKind::Text | ColumnKind::FreeText => b.push_bind(None::<&str>),
        },
        CellValue::Text(s) => b.push_bind(s.as_str()),
        CellValue::Integer(i) => b.push_bind(*i),
        CellValue::Float(f) => b.push_bind(*f),
        CellValue::Timestamp(ts) => b.push_bind(*ts),
    };
}

/// Double-quote an identifier for PostgreSQL
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
