use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord};
use std::str::FromStr;

use crate::process::{date_parser::parse_timestamp, utils::is_null_token};

/// Spreadsheet exports write dates month first without seconds.
const EXPORT_DATE_FORMATS: &[&str] = &["%m/%d/%Y %H:%M", "%m/%d/%Y %H:%M:%S"];

/// One sales line as loaded into `staging.retail_sales_raw`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagingRow {
    pub invoice: Option<String>,
    pub stock_code: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub invoice_date: Option<NaiveDateTime>,
    pub price: Option<f64>,
    pub customer_id: Option<String>,
    pub country: Option<String>,
}

/// Staging columns and the header spellings accepted for each, compared with
/// case, spaces and punctuation ignored.
const COLUMNS: [(&str, &[&str]); 8] = [
    ("invoice", &["invoice", "invoiceno"]),
    ("stock_code", &["stockcode"]),
    ("description", &["description"]),
    ("quantity", &["quantity"]),
    ("invoice_date", &["invoicedate"]),
    ("price", &["price", "unitprice"]),
    ("customer_id", &["customerid"]),
    ("country", &["country"]),
];

fn normalize(header: &str) -> String {
    header
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Position of every staging column in the header row.
fn column_positions(headers: &StringRecord) -> Result<[usize; 8]> {
    let normalized: Vec<String> = headers.iter().map(normalize).collect();
    let mut positions = [0; 8];
    let mut missing = Vec::new();
    for (slot, (name, aliases)) in positions.iter_mut().zip(COLUMNS) {
        match normalized.iter().position(|h| aliases.contains(&h.as_str())) {
            Some(idx) => *slot = idx,
            None => missing.push(name),
        }
    }
    if !missing.is_empty() {
        bail!("sales file is missing columns: {}", missing.join(", "));
    }
    Ok(positions)
}

fn text(record: &StringRecord, idx: usize) -> Option<String> {
    record
        .get(idx)
        .filter(|v| !is_null_token(v))
        .map(|v| v.trim().to_string())
}

fn number<T: FromStr>(record: &StringRecord, idx: usize, line: u64, column: &str) -> Result<Option<T>> {
    text(record, idx)
        .map(|v| {
            v.parse::<T>()
                .ok()
                .with_context(|| format!("line {line}: invalid {column} '{v}'"))
        })
        .transpose()
}

fn invoice_date(record: &StringRecord, idx: usize, line: u64) -> Result<Option<NaiveDateTime>> {
    text(record, idx)
        .map(|v| {
            parse_timestamp(&v)
                .or_else(|| {
                    EXPORT_DATE_FORMATS
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(&v, fmt).ok())
                })
                .with_context(|| format!("line {line}: invalid invoice_date '{v}'"))
        })
        .transpose()
}

/// Parse a sales CSV into staging rows. Null tokens load as NULL.
pub fn parse_sales_csv(data: &[u8]) -> Result<Vec<StagingRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(data);
    let headers = reader.headers().context("reading sales header row")?.clone();
    let [invoice, stock_code, description, quantity, date, price, customer_id, country] =
        column_positions(&headers)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("reading sales row")?;
        let line = record.position().map_or(0, |p| p.line());
        rows.push(StagingRow {
            invoice: text(&record, invoice),
            stock_code: text(&record, stock_code),
            description: text(&record, description),
            quantity: number(&record, quantity, line, "quantity")?,
            invoice_date: invoice_date(&record, date, line)?,
            price: number(&record, price, line, "price")?,
            customer_id: text(&record, customer_id),
            country: text(&record, country),
        });
    }
    Ok(rows)
}
