//! Fixed warehouse statements.
use crate::warehouse::pool::Dialect;

pub const CREATE_TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS staging.retail_sales_raw (
        invoice TEXT,
        stock_code TEXT,
        description TEXT,
        quantity BIGINT,
        invoice_date TIMESTAMP,
        price DOUBLE PRECISION,
        customer_id TEXT,
        country TEXT
    )",
    "CREATE TABLE IF NOT EXISTS analytics.dim_customer (
        customer_id TEXT PRIMARY KEY,
        country TEXT
    )",
    "CREATE TABLE IF NOT EXISTS analytics.dim_date (
        date_key INTEGER PRIMARY KEY,
        invoice_date DATE NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS analytics.fact_sales (
        invoice_number TEXT,
        stock_code TEXT,
        customer_id TEXT,
        date_key INTEGER,
        quantity BIGINT,
        unit_price DOUBLE PRECISION,
        line_total DOUBLE PRECISION
    )",
];

pub const INSERT_STAGING: &str = "INSERT INTO staging.retail_sales_raw \
    (invoice, stock_code, description, quantity, invoice_date, price, customer_id, country) \
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";

/// Cleaning rules, applied in order.
pub const CLEANING: &[&str] = &[
    // rows with neither an invoice nor a stock code carry nothing to load
    "DELETE FROM staging.retail_sales_raw WHERE invoice IS NULL AND stock_code IS NULL",
    // returns are recorded as negative quantities
    "UPDATE staging.retail_sales_raw SET quantity = ABS(quantity) WHERE quantity < 0",
    "DELETE FROM staging.retail_sales_raw WHERE price <= 0",
];

/// One row per customer; a customer seen under several countries keeps the first by name.
pub const LOAD_DIM_CUSTOMER: &str = "INSERT INTO analytics.dim_customer (customer_id, country) \
    SELECT customer_id, MIN(country) FROM staging.retail_sales_raw \
    WHERE customer_id IS NOT NULL \
    AND customer_id NOT IN (SELECT customer_id FROM analytics.dim_customer) \
    GROUP BY customer_id";

pub fn load_dim_date(dialect: Dialect) -> String {
    let day = dialect.date_of("invoice_date");
    let key = dialect.date_key_of("invoice_date");
    format!(
        "INSERT INTO analytics.dim_date (date_key, invoice_date) \
         SELECT DISTINCT {key}, {day} FROM staging.retail_sales_raw \
         WHERE invoice_date IS NOT NULL \
         AND {key} NOT IN (SELECT date_key FROM analytics.dim_date)"
    )
}

pub fn load_fact_sales(dialect: Dialect) -> String {
    let day = dialect.date_of("r.invoice_date");
    format!(
        "INSERT INTO analytics.fact_sales \
         (invoice_number, stock_code, customer_id, date_key, quantity, unit_price, line_total) \
         SELECT r.invoice, r.stock_code, r.customer_id, d.date_key, \
         r.quantity, r.price, r.quantity * r.price \
         FROM staging.retail_sales_raw r \
         JOIN analytics.dim_date d ON {day} = d.invoice_date \
         WHERE r.customer_id IS NOT NULL"
    )
}

pub const COUNT_STAGING: &str = "SELECT COUNT(*) FROM staging.retail_sales_raw";
pub const COUNT_FACTS: &str = "SELECT COUNT(*) FROM analytics.fact_sales";
pub const COUNT_NEGATIVE_PRICES: &str =
    "SELECT COUNT(*) FROM staging.retail_sales_raw WHERE price < 0";
pub const COUNT_NEGATIVE_QUANTITIES: &str =
    "SELECT COUNT(*) FROM staging.retail_sales_raw WHERE quantity < 0";
pub const COUNT_NULL_KEYS: &str =
    "SELECT COUNT(*) FROM staging.retail_sales_raw WHERE invoice IS NULL OR stock_code IS NULL";
pub const COUNT_ORPHAN_FACTS: &str = "SELECT COUNT(*) FROM analytics.fact_sales f \
    LEFT JOIN analytics.dim_customer c ON f.customer_id = c.customer_id \
    WHERE c.customer_id IS NULL";
