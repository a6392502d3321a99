//! Report generation for food analysis batches
//!
//! - **JSON**: machine-readable, with a generation timestamp and summary
//! - **CSV**: one flat row per image, for spreadsheets
//!
//! # Usage
//!
//! ```ignore
//! use smartspoon::report;
//!
//! // Automatically picks format based on extension
//! report::generate("report.json", &reports)?;  // JSON
//! report::generate("report.csv", &reports)?;   // CSV
//! ```

pub mod csv;
pub mod json;

use crate::error::Result;
use crate::food::{FoodReport, SaltEstimate};
use crate::survey::SurveyAggregate;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Generate a report in the appropriate format based on file extension.
/// Anything other than `.json` is written as CSV.
pub fn generate<P: AsRef<Path>>(path: P, reports: &[FoodReport]) -> Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let file = std::fs::File::create(path)?;

    match ext.as_str() {
        "json" => json::write(file, reports)?,
        _ => csv::write(file, reports)?,
    }

    info!(path = %path.display(), files = reports.len(), "wrote food report");
    Ok(())
}

/// Write the market-research aggregate as pretty JSON
pub fn write_survey_json<P: AsRef<Path>>(path: P, aggregate: &SurveyAggregate) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())?;
    json::write_survey(file, aggregate)?;
    info!(path = %path.as_ref().display(), "wrote survey report");
    Ok(())
}

/// Summary statistics for a batch of food reports
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub analyzed: usize,
    pub error: usize,
    pub low_salt: usize,
    pub medium_salt: usize,
    pub high_salt: usize,
}

impl Summary {
    pub fn from_reports(reports: &[FoodReport]) -> Self {
        let mut summary = Self {
            total: reports.len(),
            ..Self::default()
        };

        for r in reports {
            match &r.analysis {
                Some(analysis) => {
                    summary.analyzed += 1;
                    match analysis.salt_estimate {
                        SaltEstimate::Low => summary.low_salt += 1,
                        SaltEstimate::Medium => summary.medium_salt += 1,
                        SaltEstimate::High => summary.high_salt += 1,
                    }
                }
                None => summary.error += 1,
            }
        }

        summary
    }
}
