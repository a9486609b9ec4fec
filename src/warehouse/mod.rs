//! Relational warehouse loader.
//!
//! Sales lines are loaded into `staging.retail_sales_raw`, cleaned in place,
//! then projected into the `analytics` star: `dim_customer`, `dim_date` and
//! `fact_sales`. [`Warehouse::run`] executes the four steps in order and logs
//! each one as it finishes.

pub mod pool;
pub mod sql;
pub mod staging;

use anyhow::{Context, Result};
use serde::Serialize;
use std::future::Future;
use tracing::{error, info, instrument};

use pool::Pool;
use staging::{parse_sales_csv, StagingRow};

pub const STEP_INGESTION: &str = "Data Ingestion";
pub const STEP_CLEANING: &str = "Data Cleaning";
pub const STEP_DIMENSIONS: &str = "Dimension Loading";
pub const STEP_FACTS: &str = "Fact Table Loading";

const MAX_CONNECTIONS: u32 = 5;

/// Records touched by one finished step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: &'static str,
    pub records: u64,
}

/// Post-load counts over staging and the fact table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarehouseChecks {
    pub staging_rows: i64,
    pub fact_rows: i64,
    pub negative_prices: i64,
    pub negative_quantities: i64,
    pub null_key_rows: i64,
    pub orphan_facts: i64,
}

impl WarehouseChecks {
    /// No negatives left, every fact has a customer, and no facts appeared
    /// from nowhere. Null key rows are reported but allowed.
    pub fn passed(&self) -> bool {
        self.negative_prices == 0
            && self.negative_quantities == 0
            && self.orphan_facts == 0
            && self.fact_rows <= self.staging_rows
    }
}

fn log_step(step: &str, outcome: &Result<u64>) {
    match outcome {
        Ok(records) => info!(step, records, "SUCCESS"),
        Err(e) => error!(step, error = %e, "FAILED"),
    }
}

async fn run_step<F>(step: &'static str, work: F) -> Result<StepReport>
where
    F: Future<Output = Result<u64>>,
{
    let outcome = work.await;
    log_step(step, &outcome);
    let records = outcome.with_context(|| format!("{step} failed"))?;
    Ok(StepReport { step, records })
}

#[derive(Debug, Clone)]
pub struct Warehouse {
    pool: Pool,
}

impl Warehouse {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = pool::connect(database_url, MAX_CONNECTIONS)
            .await
            .context("connecting to warehouse database")?;
        Ok(Self::new(pool))
    }

    /// Create the schemas and tables if they are missing.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.pool.create_schemas().await.context("creating schemas")?;
        for ddl in sql::CREATE_TABLES {
            self.pool.execute(ddl).await.context("creating warehouse tables")?;
        }
        Ok(())
    }

    pub async fn load_staging(&self, rows: &[StagingRow]) -> Result<u64> {
        let inserted = self
            .pool
            .insert_staging(sql::INSERT_STAGING, rows)
            .await
            .context("inserting staging rows")?;
        Ok(inserted)
    }

    /// Apply the cleaning rules. Returns the rows deleted or rewritten.
    pub async fn clean_staging(&self) -> Result<u64> {
        let mut touched = 0;
        for rule in sql::CLEANING {
            touched += self.pool.execute(rule).await.context("cleaning staging rows")?;
        }
        Ok(touched)
    }

    /// Load customers and dates not already present.
    pub async fn load_dimensions(&self) -> Result<u64> {
        let customers = self
            .pool
            .execute(sql::LOAD_DIM_CUSTOMER)
            .await
            .context("loading dim_customer")?;
        let dates = self
            .pool
            .execute(&sql::load_dim_date(self.pool.dialect()))
            .await
            .context("loading dim_date")?;
        Ok(customers + dates)
    }

    pub async fn load_facts(&self) -> Result<u64> {
        let facts = self
            .pool
            .execute(&sql::load_fact_sales(self.pool.dialect()))
            .await
            .context("loading fact_sales")?;
        Ok(facts)
    }

    /// Run ingestion, cleaning, dimension and fact loading over one sales CSV.
    /// Stops at the first failing step.
    #[instrument(level = "info", skip_all, fields(bytes = sales_csv.len()))]
    pub async fn run(&self, sales_csv: &[u8]) -> Result<Vec<StepReport>> {
        let steps = async {
            let ingestion = run_step(STEP_INGESTION, async {
                let rows = parse_sales_csv(sales_csv)?;
                self.load_staging(&rows).await
            })
            .await?;
            let cleaning = run_step(STEP_CLEANING, self.clean_staging()).await?;
            let dimensions = run_step(STEP_DIMENSIONS, self.load_dimensions()).await?;
            let facts = run_step(STEP_FACTS, self.load_facts()).await?;
            Ok::<_, anyhow::Error>(vec![ingestion, cleaning, dimensions, facts])
        };

        let result = steps.await;
        match &result {
            Ok(_) => info!("ETL pipeline completed"),
            Err(e) => error!(error = %e, "ETL pipeline failed"),
        }
        result
    }

    pub async fn check(&self) -> Result<WarehouseChecks> {
        let count = |query: &'static str| async move {
            self.pool
                .count(query)
                .await
                .with_context(|| format!("running check: {query}"))
        };
        let checks = WarehouseChecks {
            staging_rows: count(sql::COUNT_STAGING).await?,
            fact_rows: count(sql::COUNT_FACTS).await?,
            negative_prices: count(sql::COUNT_NEGATIVE_PRICES).await?,
            negative_quantities: count(sql::COUNT_NEGATIVE_QUANTITIES).await?,
            null_key_rows: count(sql::COUNT_NULL_KEYS).await?,
            orphan_facts: count(sql::COUNT_ORPHAN_FACTS).await?,
        };
        if checks.passed() {
            info!(?checks, "warehouse checks passed");
        } else {
            error!(?checks, "warehouse checks failed");
        }
        Ok(checks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALES: &str = "\
Invoice,StockCode,Description,Quantity,InvoiceDate,Price,Customer ID,Country
489434,85048,LIGHTS,12,2009-12-01 07:45:00,6.95,13085,United Kingdom
489434,79323P,PINK HEART,-12,2009-12-01 07:45:00,6.75,13085,United Kingdom
489435,22350,CAT BOWL,12,2009-12-01 07:46:00,0,13085,United Kingdom
,,,,2009-12-02 07:46:00,1.00,,
489436,21523,DOORMAT,10,2009-12-02 09:06:00,5.95,,United Kingdom
489437,22143,BAG,6,12/3/2009 10:00,2.10,13078,France
";

    async fn warehouse() -> Result<Warehouse> {
        let warehouse = Warehouse::new(Pool::sqlite_in_memory().await?);
        warehouse.ensure_schema().await?;
        Ok(warehouse)
    }

    #[tokio::test]
    async fn test_pipeline_steps_in_order() -> Result<()> {
        let warehouse = warehouse().await?;
        let reports = warehouse.run(SALES.as_bytes()).await?;

        let steps: Vec<&str> = reports.iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![STEP_INGESTION, STEP_CLEANING, STEP_DIMENSIONS, STEP_FACTS]);
        let records: Vec<u64> = reports.iter().map(|r| r.records).collect();
        // 6 staged; 1 empty row dropped, 1 return flipped, 1 free line dropped;
        // 2 customers + 3 days; 3 lines with a customer
        assert_eq!(records, vec![6, 3, 5, 3]);
        Ok(())
    }

    #[tokio::test]
    async fn test_cleaning_rules_and_fact_values() -> Result<()> {
        let warehouse = warehouse().await?;
        warehouse.run(SALES.as_bytes()).await?;
        let pool = &warehouse.pool;

        assert_eq!(pool.count(sql::COUNT_STAGING).await?, 4);
        assert_eq!(pool.count(sql::COUNT_NEGATIVE_QUANTITIES).await?, 0);
        assert_eq!(
            pool.count("SELECT COUNT(*) FROM staging.retail_sales_raw WHERE price <= 0")
                .await?,
            0
        );
        assert_eq!(
            pool.count(
                "SELECT COUNT(*) FROM analytics.fact_sales \
                 WHERE stock_code = '79323P' AND quantity = 12 AND line_total = 81.0"
            )
            .await?,
            1
        );
        assert_eq!(
            pool.count("SELECT COUNT(*) FROM analytics.dim_date WHERE date_key = 20091203")
                .await?,
            1
        );
        assert_eq!(
            pool.count(
                "SELECT COUNT(*) FROM analytics.fact_sales f \
                 JOIN analytics.dim_date d ON f.date_key = d.date_key \
                 WHERE f.customer_id = '13078' AND d.date_key = 20091203"
            )
            .await?,
            1
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_checks_after_load() -> Result<()> {
        let warehouse = warehouse().await?;
        warehouse.run(SALES.as_bytes()).await?;

        let checks = warehouse.check().await?;
        assert_eq!(
            checks,
            WarehouseChecks {
                staging_rows: 4,
                fact_rows: 3,
                negative_prices: 0,
                negative_quantities: 0,
                null_key_rows: 0,
                orphan_facts: 0,
            }
        );
        assert!(checks.passed());
        Ok(())
    }

    #[tokio::test]
    async fn test_checks_flag_uncleaned_staging() -> Result<()> {
        let warehouse = warehouse().await?;
        let rows = parse_sales_csv(SALES.as_bytes())?;
        warehouse.load_staging(&rows).await?;

        let checks = warehouse.check().await?;
        assert_eq!(checks.negative_quantities, 1);
        assert_eq!(checks.null_key_rows, 1);
        assert!(!checks.passed());
        Ok(())
    }

    #[tokio::test]
    async fn test_dimensions_not_duplicated_on_reload() -> Result<()> {
        let warehouse = warehouse().await?;
        warehouse.run(SALES.as_bytes()).await?;
        assert_eq!(warehouse.load_dimensions().await?, 0);
        assert_eq!(
            warehouse
                .pool
                .count("SELECT COUNT(*) FROM analytics.dim_customer")
                .await?,
            2
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_ingestion_stops_pipeline() -> Result<()> {
        let warehouse = warehouse().await?;
        let err = warehouse
            .run(b"Invoice,StockCode\n1,2\n")
            .await
            .unwrap_err();
        assert!(err.to_string().contains(STEP_INGESTION), "{err}");

        assert_eq!(warehouse.pool.count(sql::COUNT_STAGING).await?, 0);
        assert_eq!(warehouse.pool.count(sql::COUNT_FACTS).await?, 0);
        Ok(())
    }

    #[test]
    fn test_dialect_expressions() {
        let fact = sql::load_fact_sales(pool::Dialect::Postgres);
        assert!(fact.contains("CAST(r.invoice_date AS DATE) = d.invoice_date"));
        let dim = sql::load_dim_date(pool::Dialect::Sqlite);
        assert!(dim.contains("strftime('%Y%m%d', invoice_date)"));
    }
}
