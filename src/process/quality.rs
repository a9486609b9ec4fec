use serde::Serialize;
use tracing::{info, warn};

use crate::process::Table;

/// Null count per column, in table column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityReport {
    rows: usize,
    null_counts: Vec<(String, usize)>,
}

impl QualityReport {
    /// Count null cells in every column. Never fails and never rejects a table,
    /// including one whose columns are entirely null.
    pub fn from_table(table: &Table) -> Self {
        let null_counts = table
            .columns()
            .iter()
            .map(|c| (c.name.clone(), c.values.null_count()))
            .collect();
        Self {
            rows: table.num_rows(),
            null_counts,
        }
    }

    pub fn null_count(&self, column: &str) -> Option<usize> {
        self.null_counts
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, n)| *n)
    }

    pub fn total_nulls(&self) -> usize {
        self.null_counts.iter().map(|(_, n)| n).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.null_counts.iter().map(|(name, n)| (name.as_str(), *n))
    }

    /// Columns with at least one null.
    pub fn columns_with_nulls(&self) -> impl Iterator<Item = (&str, usize)> {
        self.iter().filter(|(_, n)| *n > 0)
    }

    /// Emit one line per column containing nulls, or a single all-clear line.
    pub fn log(&self) {
        if self.total_nulls() == 0 {
            info!("no null values found");
            return;
        }
        for (column, nulls) in self.columns_with_nulls() {
            let pct = if self.rows == 0 {
                0.0
            } else {
                nulls as f64 / self.rows as f64 * 100.0
            };
            warn!(column, nulls, "{} nulls ({:.1}%)", nulls, pct);
        }
    }
}
