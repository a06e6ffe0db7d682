//! Shared helpers for olist-loader integration tests
//!
//! - [`MemoryDestination`]: in-memory [`Destination`] with real transaction
//!   semantics, for pipeline tests that need no database
//! - [`TestPostgres`]: throwaway PostgreSQL container with the Olist tables
//! - CSV fixture writers

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use olist_loader::{CellValue, Column, Destination};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tracing::{debug, info};

/// DDL for the destination tables
pub const OLIST_SCHEMA: &str = include_str!("../../../../sql/olist_schema.sql");

// ============================================================================
// In-memory destination
// ============================================================================

type Rows = Vec<Vec<CellValue>>;

#[derive(Default)]
struct State {
    committed: HashMap<String, Rows>,
    staged: Option<HashMap<String, Rows>>,
    batch_sizes: Vec<usize>,
    fail_inserts_into: Option<String>,
    count_skew: HashMap<String, i64>,
}

impl State {
    fn tables_mut(&mut self) -> &mut HashMap<String, Rows> {
        match self.staged.as_mut() {
            Some(staged) => staged,
            None => &mut self.committed,
        }
    }
}

fn missing_table(table: &str) -> sqlx::Error {
    sqlx::Error::Protocol(format!("relation \"{}\" does not exist", table))
}

/// In-memory destination. Clones share state, so a test can keep a handle
/// while the loader owns another.
#[derive(Clone, Default)]
pub struct MemoryDestination {
    state: Arc<Mutex<State>>,
    max_rows_per_batch: Option<usize>,
}

impl MemoryDestination {
    /// Destination with the given (empty) tables
    pub fn with_tables(tables: &[&str]) -> Self {
        let destination = Self::default();
        {
            let mut state = destination.state.lock().unwrap();
            for table in tables {
                state.committed.insert((*table).to_string(), Vec::new());
            }
        }
        destination
    }

    /// Destination with every Olist table
    pub fn olist() -> Self {
        let names: Vec<&str> = olist_loader::OLIST_DATASETS.iter().map(|d| d.name).collect();
        Self::with_tables(&names)
    }

    pub fn with_max_rows_per_batch(mut self, rows: usize) -> Self {
        self.max_rows_per_batch = Some(rows);
        self
    }

    /// Replace the committed contents of `table`
    pub fn seed(&self, table: &str, rows: Rows) {
        self.state
            .lock()
            .unwrap()
            .committed
            .insert(table.to_string(), rows);
    }

    /// Make every insert into `table` fail
    pub fn fail_inserts_into(&self, table: &str) {
        self.state.lock().unwrap().fail_inserts_into = Some(table.to_string());
    }

    /// Make `count_rows(table)` report `skew` more rows than it holds
    pub fn skew_count(&self, table: &str, skew: i64) {
        self.state
            .lock()
            .unwrap()
            .count_skew
            .insert(table.to_string(), skew);
    }

    /// Committed rows of `table`
    pub fn rows(&self, table: &str) -> Option<Rows> {
        self.state.lock().unwrap().committed.get(table).cloned()
    }

    pub fn row_count(&self, table: &str) -> Option<usize> {
        self.state
            .lock()
            .unwrap()
            .committed
            .get(table)
            .map(Vec::len)
    }

    /// Size of every insert batch received, in order
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.state.lock().unwrap().batch_sizes.clone()
    }

    pub fn in_transaction(&self) -> bool {
        self.state.lock().unwrap().staged.is_some()
    }
}

#[async_trait]
impl Destination for MemoryDestination {
    async fn begin(&mut self) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        if state.staged.is_some() {
            return Err(sqlx::Error::Protocol("transaction already open".to_string()));
        }
        state.staged = Some(state.committed.clone());
        Ok(())
    }

    async fn clear(&mut self, table: &str) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let rows = state
            .tables_mut()
            .get_mut(table)
            .ok_or_else(|| missing_table(table))?;
        rows.clear();
        Ok(())
    }

    async fn insert_batch(
        &mut self,
        table: &str,
        columns: &[Column],
        rows: &[Vec<CellValue>],
    ) -> Result<u64, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        state.batch_sizes.push(rows.len());
        if state.fail_inserts_into.as_deref() == Some(table) {
            return Err(sqlx::Error::Protocol(format!(
                "null value in column \"{}\" violates not-null constraint",
                columns.first().map(|c| c.name.as_str()).unwrap_or("?")
            )));
        }
        let target = state
            .tables_mut()
            .get_mut(table)
            .ok_or_else(|| missing_table(table))?;
        target.extend(rows.iter().cloned());
        Ok(rows.len() as u64)
    }

    async fn commit(&mut self) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        if let Some(staged) = state.staged.take() {
            state.committed = staged;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), sqlx::Error> {
        self.state.lock().unwrap().staged = None;
        Ok(())
    }

    async fn count_rows(&mut self, table: &str) -> Result<i64, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let skew = state.count_skew.get(table).copied().unwrap_or(0);
        state
            .tables_mut()
            .get(table)
            .map(|rows| rows.len() as i64 + skew)
            .ok_or_else(|| missing_table(table))
    }

    fn max_rows_per_batch(&self, _columns: usize) -> usize {
        self.max_rows_per_batch.unwrap_or(usize::MAX)
    }
}

// ============================================================================
// CSV fixtures
// ============================================================================

/// Write `contents` to `dir/name`
pub fn write_source(dir: &Path, name: &str, contents: impl AsRef<[u8]>) {
    std::fs::write(dir.join(name), contents).unwrap();
}

/// Two-row fixture for every Olist dataset, keyed by file name
pub fn olist_fixture() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "product_category_name_translation.csv",
            "product_category_name,product_category_name_english\n\
             beleza_saude,health_beauty\n\
             informatica_acessorios,computers_accessories\n",
        ),
        (
            "olist_customers_dataset.csv",
            "customer_id,customer_unique_id,customer_zip_code_prefix,customer_city,customer_state\n\
             c1,u1,01409,sao paulo,SP\n\
             c2,u2,14409,franca,SP\n",
        ),
        (
            "olist_geolocation_dataset.csv",
            "geolocation_zip_code_prefix,geolocation_lat,geolocation_lng,geolocation_city,geolocation_state\n\
             01037,-23.54562128115268,-46.63929204800168,sao paulo,SP\n\
             01046,,-46.64482029837157,sao paulo,SP\n",
        ),
        (
            "olist_orders_dataset.csv",
            "order_id,customer_id,order_status,order_purchase_timestamp,order_approved_at,\
             order_delivered_carrier_date,order_delivered_customer_date,order_estimated_delivery_date\n\
             o1,c1,delivered,2017-10-02 10:56:33,2017-10-02 11:07:15,2017-10-04 19:55:00,2017-10-10 21:25:13,2017-10-18 00:00:00\n\
             o2,c2,shipped,2018-07-24 20:41:37,2018-07-26 03:24:27,2018-07-26 14:31:00,,2018-08-13 00:00:00\n",
        ),
        (
            "olist_order_items_dataset.csv",
            "order_id,order_item_id,product_id,seller_id,shipping_limit_date,price,freight_value\n\
             o1,1,p1,s1,2017-10-06 11:07:15,29.99,8.72\n\
             o2,1,p2,s2,2018-07-30 03:24:27,118.70,22.76\n",
        ),
        (
            "olist_order_payments_dataset.csv",
            "order_id,payment_sequential,payment_type,payment_installments,payment_value\n\
             o1,1,credit_card,1,18.12\n\
             o2,1,boleto,1,141.46\n",
        ),
        (
            "olist_order_reviews_dataset.csv",
            "review_id,order_id,review_score,review_comment_title,review_comment_message,\
             review_creation_date,review_answer_timestamp\n\
             r1,o1,4,,,2018-01-18 00:00:00,2018-01-18 21:46:59\n\
             r2,o2,5,,\"Recebi bem antes\r\ndo prazo estipulado.\",2018-03-10 00:00:00,2018-03-11 03:05:13\n",
        ),
        (
            "olist_products_dataset.csv",
            "product_id,product_category_name,product_name_lenght,product_description_lenght,\
             product_photos_qty,product_weight_g,product_length_cm,product_height_cm,product_width_cm\n\
             p1,perfumaria,40,287,1,225,16,10,14\n\
             p2,artes,44,276,1,1000,30,18,20\n",
        ),
        (
            "olist_sellers_dataset.csv",
            "seller_id,seller_zip_code_prefix,seller_city,seller_state\n\
             s1,13023,campinas,SP\n\
             s2,13844,mogi guacu,SP\n",
        ),
    ]
}

/// Write every Olist fixture file into `dir`
pub fn write_olist_fixture(dir: &Path) {
    for (name, contents) in olist_fixture() {
        write_source(dir, name, contents);
    }
}

// ============================================================================
// PostgreSQL test container
// ============================================================================

/// PostgreSQL container with the Olist tables created
pub struct TestPostgres {
    container: ContainerAsync<Postgres>,
    pool: PgPool,
    connection_string: String,
}

impl TestPostgres {
    pub async fn start() -> Result<Self> {
        info!("Starting PostgreSQL test container...");

        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let connection_string =
            format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);
        debug!("PostgreSQL connection: {}", connection_string);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&connection_string)
            .await
            .context("Failed to connect to PostgreSQL")?;

        sqlx::raw_sql(OLIST_SCHEMA)
            .execute(&pool)
            .await
            .context("Failed to create Olist tables")?;

        Ok(Self {
            container,
            pool,
            connection_string,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn pool_clone(&self) -> PgPool {
        self.pool.clone()
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }
}

/// Test tracing that respects `RUST_LOG`
pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,olist_loader=debug,sqlx=warn,testcontainers=info")
        }))
        .with_test_writer()
        .try_init();
}
