// Tabular dataset provider
// Loads the maintenance-log CSV into memory once at startup and exposes
// name-based column access plus a schema description for prompt rendering.


use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// One row of the maintenance log.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceRecord {
    #[serde(rename = "Problem_Type")]
    pub problem_type: String,
    #[serde(rename = "Service_Status")]
    pub service_status: String,
    #[serde(rename = "Cost")]
    pub cost: f64,
    #[serde(rename = "Hours")]
    pub hours: f64,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Machine_ID")]
    pub machine_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Categorical,
    Numeric,
    Date,
    Identifier,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Categorical => "categorical",
            ColumnType::Numeric => "numeric",
            ColumnType::Date => "date",
            ColumnType::Identifier => "identifier",
        };
        f.write_str(name)
    }
}

/// Fixed column schema, in CSV order. All components reference columns by
/// name, never by position.
pub const SCHEMA: &[(&str, ColumnType)] = &[
    ("Problem_Type", ColumnType::Categorical),
    ("Service_Status", ColumnType::Categorical),
    ("Cost", ColumnType::Numeric),
    ("Hours", ColumnType::Numeric),
    ("Date", ColumnType::Date),
    ("Machine_ID", ColumnType::Identifier),
];

/// Immutable-after-load table of maintenance records.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<ServiceRecord>,
}

impl Dataset {
    /// Load the dataset from a CSV file. Loading the same file twice yields
    /// an identical schema and row count.
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading dataset from {}", path.display());

        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open dataset CSV: {}", path.display()))?;

        let mut records = Vec::new();
        for (line, row) in reader.deserialize::<ServiceRecord>().enumerate() {
            let record = row.with_context(|| {
                format!("Failed to parse record {} in {}", line + 1, path.display())
            })?;
            records.push(record);
        }

        info!(
            "Loaded {} service records from {}",
            records.len(),
            path.display()
        );
        Ok(Self { records })
    }

    /// Build a dataset directly from records. Used by tests and tooling.
    #[inline]
    pub fn from_records(records: Vec<ServiceRecord>) -> Self {
        Self { records }
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn records(&self) -> &[ServiceRecord] {
        &self.records
    }

    /// Ordered column-name → type mapping. Fixed for the process lifetime.
    #[inline]
    pub fn schema() -> &'static [(&'static str, ColumnType)] {
        SCHEMA
    }

    /// Human-readable schema summary embedded into analysis prompts.
    #[inline]
    pub fn schema_description() -> String {
        SCHEMA
            .iter()
            .map(|(name, ty)| format!("{} ({})", name, ty))
            .collect::<Vec<_>>()
            .join(", ")
    }

    #[inline]
    pub fn column_type(name: &str) -> Option<ColumnType> {
        SCHEMA
            .iter()
            .find(|(col, _)| *col == name)
            .map(|(_, ty)| *ty)
    }

    /// Values of a numeric column, or `None` if the column is unknown or
    /// non-numeric.
    #[inline]
    pub fn numeric_column(&self, name: &str) -> Option<Vec<f64>> {
        match name {
            "Cost" => Some(self.records.iter().map(|r| r.cost).collect()),
            "Hours" => Some(self.records.iter().map(|r| r.hours).collect()),
            _ => None,
        }
    }

    /// Values of a textual column, or `None` if the column is unknown or
    /// numeric.
    #[inline]
    pub fn text_column(&self, name: &str) -> Option<Vec<&str>> {
        let values = match name {
            "Problem_Type" => self
                .records
                .iter()
                .map(|r| r.problem_type.as_str())
                .collect(),
            "Service_Status" => self
                .records
                .iter()
                .map(|r| r.service_status.as_str())
                .collect(),
            "Date" => self.records.iter().map(|r| r.date.as_str()).collect(),
            "Machine_ID" => self.records.iter().map(|r| r.machine_id.as_str()).collect(),
            _ => return None,
        };
        Some(values)
    }
}
