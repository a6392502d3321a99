//! JSON report output

use super::Summary;
use crate::error::Result;
use crate::food::FoodReport;
use crate::survey::SurveyAggregate;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct FoodReportDocument<'a> {
    generated: String,
    summary: Summary,
    files: &'a [FoodReport],
}

pub fn write<W: Write>(writer: W, reports: &[FoodReport]) -> Result<()> {
    let doc = FoodReportDocument {
        generated: chrono::Local::now().to_rfc3339(),
        summary: Summary::from_reports(reports),
        files: reports,
    };
    serde_json::to_writer_pretty(writer, &doc)?;
    Ok(())
}

pub fn write_survey<W: Write>(writer: W, aggregate: &SurveyAggregate) -> Result<()> {
    serde_json::to_writer_pretty(writer, aggregate)?;
    Ok(())
}
