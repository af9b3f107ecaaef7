//! Export functionality for event-study estimates.
//!
//! This module serialises estimation results to CSV and JSON. CSV
//! exports flatten to one record per event time; JSON exports carry the
//! full estimate including the lead/lag terms and sample metadata.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown format name.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty_json" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// One event-study row in flat, serialisable form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EventTimeRecord {
    /// Event time relative to treatment onset.
    pub time_to_event: i64,
    /// Cumulative treatment effect.
    pub coef: f64,
    /// Standard error.
    pub se: f64,
    /// Lower bound of the 95% confidence interval.
    pub ci_lower: f64,
    /// Upper bound of the 95% confidence interval.
    pub ci_upper: f64,
}

/// One lead/lag term in flat, serialisable form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GammaRecord {
    /// Term label, e.g. `lead2` or `lag0`.
    pub term: String,
    /// Point estimate.
    pub estimate: f64,
    /// Standard error.
    pub se: f64,
}

/// A complete estimate ready for export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimateExport {
    /// Outcome column name.
    pub outcome: String,
    /// Exposure column name.
    pub exposure: String,
    /// Unit column name, also the clustering dimension.
    pub unit: String,
    /// Time column name.
    pub time: String,
    /// First event period of the window.
    pub from: i64,
    /// Last event period of the window.
    pub to: i64,
    /// Omitted reference period.
    pub reference: i64,
    /// Rows in the estimation sample.
    pub n_obs: usize,
    /// Clusters in the estimation sample.
    pub n_clusters: usize,
    /// Export generation timestamp.
    pub generated_at: DateTime<Utc>,
    /// Event-study rows in ascending event time.
    pub rows: Vec<EventTimeRecord>,
    /// Underlying lead/lag estimates in canonical order.
    pub gammas: Vec<GammaRecord>,
}

impl EstimateExport {
    /// Create an export snapshot, stamped with the current time.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        outcome: String,
        exposure: String,
        unit: String,
        time: String,
        from: i64,
        to: i64,
        reference: i64,
        n_obs: usize,
        n_clusters: usize,
        rows: Vec<EventTimeRecord>,
        gammas: Vec<GammaRecord>,
    ) -> Self {
        Self {
            outcome,
            exposure,
            unit,
            time,
            from,
            to,
            reference,
            n_obs,
            n_clusters,
            generated_at: Utc::now(),
            rows,
            gammas,
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn csv_from_records<T: Serialize>(records: &[T]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in records {
        wtr.serialize(record)?;
    }
    let data = String::from_utf8(wtr.into_inner().map_err(|e| e.into_error())?)
        .map_err(|e| ExportError::InvalidFormat(e.to_string()))?;
    Ok(data)
}

impl Exporter for Vec<EventTimeRecord> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => csv_from_records(self),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Exporter for EstimateExport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            // CSV keeps only the event-study table; the surrounding
            // metadata has no tabular shape.
            ExportFormat::Csv => csv_from_records(&self.rows),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}
