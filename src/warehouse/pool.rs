//! Warehouse connection pool: Postgres in production, in-memory SQLite under test.
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::warehouse::staging::StagingRow;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Schemas the warehouse tables live in.
pub const SCHEMAS: [&str; 2] = ["staging", "analytics"];

#[derive(Debug, Clone)]
enum PoolInner {
    Postgres(PgPool),
    #[cfg(test)]
    Sqlite(sqlx::SqlitePool),
}

/// SQL flavour of the connected database, for the few expressions that differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    #[cfg(test)]
    Sqlite,
}

impl Dialect {
    /// Calendar date of a timestamp expression.
    pub fn date_of(self, expr: &str) -> String {
        match self {
            Dialect::Postgres => format!("CAST({expr} AS DATE)"),
            #[cfg(test)]
            Dialect::Sqlite => format!("date({expr})"),
        }
    }

    /// `YYYYMMDD` integer key of a timestamp expression.
    pub fn date_key_of(self, expr: &str) -> String {
        match self {
            Dialect::Postgres => format!("CAST(to_char({expr}, 'YYYYMMDD') AS INTEGER)"),
            #[cfg(test)]
            Dialect::Sqlite => format!("CAST(strftime('%Y%m%d', {expr}) AS INTEGER)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pool {
    inner: PoolInner,
}

pub async fn connect(database_url: &str, max_connections: u32) -> Result<Pool, sqlx::Error> {
    let pg = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(CONNECT_TIMEOUT)
        .connect(database_url)
        .await?;
    Ok(Pool {
        inner: PoolInner::Postgres(pg),
    })
}

// binds the eight staging columns in table order
macro_rules! bind_staging_row {
    ($query:expr, $row:expr) => {
        $query
            .bind($row.invoice.as_deref())
            .bind($row.stock_code.as_deref())
            .bind($row.description.as_deref())
            .bind($row.quantity)
            .bind($row.invoice_date)
            .bind($row.price)
            .bind($row.customer_id.as_deref())
            .bind($row.country.as_deref())
    };
}

impl Pool {
    /// In-memory SQLite with the warehouse schemas attached. A single
    /// connection is kept so every query sees the same database.
    #[cfg(test)]
    pub async fn sqlite_in_memory() -> Result<Self, sqlx::Error> {
        let sqlite = sqlx::sqlite::SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        for schema in SCHEMAS {
            sqlx::query(&format!("ATTACH DATABASE ':memory:' AS {schema}"))
                .execute(&sqlite)
                .await?;
        }
        Ok(Pool {
            inner: PoolInner::Sqlite(sqlite),
        })
    }

    pub fn dialect(&self) -> Dialect {
        match &self.inner {
            PoolInner::Postgres(_) => Dialect::Postgres,
            #[cfg(test)]
            PoolInner::Sqlite(_) => Dialect::Sqlite,
        }
    }

    /// Create the schemas. SQLite attaches them when the pool opens.
    pub async fn create_schemas(&self) -> Result<(), sqlx::Error> {
        match &self.inner {
            PoolInner::Postgres(pg) => {
                for schema in SCHEMAS {
                    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {schema}"))
                        .execute(pg)
                        .await?;
                }
            }
            #[cfg(test)]
            PoolInner::Sqlite(_) => {}
        }
        Ok(())
    }

    /// Run one statement and return the rows it touched.
    pub async fn execute(&self, sql: &str) -> Result<u64, sqlx::Error> {
        let affected = match &self.inner {
            PoolInner::Postgres(pg) => sqlx::query(sql).execute(pg).await?.rows_affected(),
            #[cfg(test)]
            PoolInner::Sqlite(sqlite) => sqlx::query(sql).execute(sqlite).await?.rows_affected(),
        };
        Ok(affected)
    }

    /// Run a `SELECT COUNT(*)` style query.
    pub async fn count(&self, sql: &str) -> Result<i64, sqlx::Error> {
        match &self.inner {
            PoolInner::Postgres(pg) => sqlx::query_scalar::<_, i64>(sql).fetch_one(pg).await,
            #[cfg(test)]
            PoolInner::Sqlite(sqlite) => {
                sqlx::query_scalar::<_, i64>(sql).fetch_one(sqlite).await
            }
        }
    }

    /// Insert rows with a `$1..$8` statement inside one transaction.
    pub async fn insert_staging(&self, sql: &str, rows: &[StagingRow]) -> Result<u64, sqlx::Error> {
        let mut inserted = 0;
        match &self.inner {
            PoolInner::Postgres(pg) => {
                let mut tx = pg.begin().await?;
                for row in rows {
                    let query = bind_staging_row!(sqlx::query(sql), row);
                    inserted += query.execute(&mut *tx).await?.rows_affected();
                }
                tx.commit().await?;
            }
            #[cfg(test)]
            PoolInner::Sqlite(sqlite) => {
                // $N placeholders become SQLite's ?N
                let sqlite_sql = sql.replace('$', "?");
                let mut tx = sqlite.begin().await?;
                for row in rows {
                    let query = bind_staging_row!(sqlx::query(&sqlite_sql), row);
                    inserted += query.execute(&mut *tx).await?.rows_affected();
                }
                tx.commit().await?;
            }
        }
        Ok(inserted)
    }
}
