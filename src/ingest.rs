//! Survey CSV ingestion
//!
//! Reads the market-research CSV, maps its headers onto the fixed lower-case
//! schema, coerces `age` to a nullable integer and hands the rows to
//! [`Database::replace_survey`], which swaps the table contents in one
//! transaction.
//!
//! Header mapping is by normalized name: `Purchase_Consideration`,
//! `purchase consideration` and `PURCHASE-CONSIDERATION` all land in
//! `purchase_consideration`. Headers that match no schema column are kept
//! verbatim as extra TEXT columns.

use crate::db::{Database, SurveyRow, SURVEY_COLUMNS, SURVEY_TEXT_COLUMNS};
use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Default CSV file name used when no path is configured
pub const DEFAULT_CSV_PATH: &str = "expanded_smart_spoon_market_research.csv";

/// Outcome of a successful load
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestSummary {
    pub rows: usize,
    /// Source headers stored unchanged as extra columns
    pub passthrough_columns: Vec<String>,
    /// Schema columns the CSV did not provide (stored as NULL)
    pub missing_columns: Vec<String>,
    /// Ages that were present but non-numeric, stored as NULL
    pub ages_nulled: usize,
}

/// Names SQLite reserves for the row id. A real column with one of these
/// names hides the row id, so passthrough headers using them get a `_` suffix.
const ROWID_ALIASES: [&str; 3] = ["rowid", "oid", "_rowid_"];

/// Where a source column ends up
#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    Age,
    /// Index into the schema TEXT columns
    Text(usize),
    /// Index into the passthrough columns
    Extra(usize),
}

/// Normalize a header for matching: trim, lower-case, spaces/hyphens to `_`
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Load the CSV at `path` into the survey table, replacing its contents.
pub fn load_survey_csv<P: AsRef<Path>>(db: &Database, path: P) -> Result<IngestSummary> {
    let path = path.as_ref();
    info!(path = %path.display(), "loading survey CSV");

    let file = std::fs::File::open(path)?;
    let (extra_columns, rows, mut summary) = read_survey(file)?;

    db.replace_survey(&extra_columns, &rows)?;

    summary.rows = rows.len();
    info!(
        rows = summary.rows,
        passthrough = summary.passthrough_columns.len(),
        ages_nulled = summary.ages_nulled,
        "survey load complete"
    );
    Ok(summary)
}

/// Parse survey CSV data into insertable rows without touching the database.
///
/// Returns the passthrough column names, the rows and a partial summary
/// (`rows` is filled in by the caller).
pub fn read_survey<R: Read>(reader: R) -> Result<(Vec<String>, Vec<SurveyRow>, IngestSummary)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let (targets, extra_columns) = map_headers(headers.iter())?;

    let mut summary = IngestSummary {
        passthrough_columns: extra_columns.clone(),
        missing_columns: missing_columns(&targets),
        ..Default::default()
    };
    if !summary.missing_columns.is_empty() {
        warn!(missing = ?summary.missing_columns, "CSV lacks schema columns, storing NULL");
    }

    let width = SURVEY_TEXT_COLUMNS + extra_columns.len();
    let mut rows = Vec::new();

    for (idx, record) in csv_reader.records().enumerate() {
        let record = record?;
        // Header is line 1, so the first data row is row 2
        let row_number = idx + 2;
        // Short rows leave their trailing columns NULL
        if record.len() > targets.len() {
            return Err(Error::RowLength {
                row: row_number,
                expected: targets.len(),
                found: record.len(),
            });
        }
        let mut row = SurveyRow {
            age: None,
            values: vec![None; width],
        };

        for (field, target) in record.iter().zip(targets.iter()) {
            match *target {
                Target::Age => match coerce_age(field, row_number)? {
                    AgeValue::Value(age) => row.age = Some(age),
                    AgeValue::Empty => {}
                    AgeValue::NotNumeric => {
                        debug!(row = row_number, value = field, "non-numeric age stored as NULL");
                        summary.ages_nulled += 1;
                    }
                },
                Target::Text(i) => row.values[i] = non_empty(field),
                Target::Extra(i) => row.values[SURVEY_TEXT_COLUMNS + i] = non_empty(field),
            }
        }

        rows.push(row);
    }

    Ok((extra_columns, rows, summary))
}

fn map_headers<'a, I>(headers: I) -> Result<(Vec<Target>, Vec<String>)>
where
    I: Iterator<Item = &'a str>,
{
    let schema_index: HashMap<&str, usize> = SURVEY_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, c)| (*c, i))
        .collect();

    let mut targets = Vec::new();
    let mut extra_columns: Vec<String> = Vec::new();
    // normalized name -> original header, to report collisions
    let mut seen: HashMap<String, String> = HashMap::new();

    for header in headers {
        let normalized = normalize_header(header);
        let target = match schema_index.get(normalized.as_str()) {
            Some(0) => Target::Age,
            Some(&i) => Target::Text(i - 1),
            None => {
                extra_columns.push(passthrough_name(header));
                Target::Extra(extra_columns.len() - 1)
            }
        };

        // SQLite column names are case-insensitive, so passthrough headers
        // collide on their lower-cased form
        let key = match target {
            Target::Extra(i) => extra_columns[i].to_lowercase(),
            _ => normalized.clone(),
        };
        if let Some(first) = seen.insert(key.clone(), header.to_string()) {
            return Err(Error::DuplicateColumn {
                column: key,
                first,
                second: header.to_string(),
            });
        }

        targets.push(target);
    }

    Ok((targets, extra_columns))
}

fn passthrough_name(header: &str) -> String {
    if ROWID_ALIASES.contains(&header.trim().to_lowercase().as_str()) {
        let renamed = format!("{}_", header);
        warn!(header, column = %renamed, "header shadows the SQLite row id, renaming");
        renamed
    } else {
        header.to_string()
    }
}

fn missing_columns(targets: &[Target]) -> Vec<String> {
    let mut present = [false; SURVEY_COLUMNS.len()];
    for target in targets {
        match *target {
            Target::Age => present[0] = true,
            Target::Text(i) => present[i + 1] = true,
            Target::Extra(_) => {}
        }
    }

    SURVEY_COLUMNS
        .iter()
        .zip(present.iter())
        .filter(|(_, &p)| !p)
        .map(|(c, _)| c.to_string())
        .collect()
}

fn non_empty(field: &str) -> Option<String> {
    if field.is_empty() {
        None
    } else {
        Some(field.to_string())
    }
}

#[derive(Debug, PartialEq)]
enum AgeValue {
    Value(i32),
    Empty,
    NotNumeric,
}

/// Numeric-or-null coercion for the age column.
///
/// Non-numeric text becomes NULL. A number that is not a whole value in
/// `i32` range cannot be stored as an integer and fails the load.
fn coerce_age(field: &str, row: usize) -> Result<AgeValue> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Ok(AgeValue::Empty);
    }

    if let Ok(age) = trimmed.parse::<i32>() {
        return Ok(AgeValue::Value(age));
    }

    match trimmed.parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(AgeValue::Empty),
        Ok(v) if v.fract() == 0.0 && v >= i32::MIN as f64 && v <= i32::MAX as f64 => {
            Ok(AgeValue::Value(v as i32))
        }
        Ok(_) => Err(Error::Coercion {
            row,
            value: field.to_string(),
        }),
        Err(_) => Ok(AgeValue::NotNumeric),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const HEADER: &str = "Age,Gender,Low_Sodium_Diet,Diet_Condition,Dining_Frequency,\
Low_Sodium_Satisfaction,Add_Salt_Condiments,Taste_Enhancement_Tech_Aware,Interest_In_Device,\
Importance_Of_Taste_Enhancement,Expected_Device_Features,Purchase_Consideration,\
Concerns_On_Technology,Salt_Usage_Dal_Gojju_Palya,Salt_Usage_Sambar_Rasam_Curd,\
Salt_Usage_Biryani_Pulao_Rice,Salt_Usage_Curry,Salt_Usage_Snacks,Salt_Usage_Roti_Paratha,\
Salt_Usage_Pickles_Papad,Salt_Opinion";

    fn line(age: &str, diet: &str, features: &str, purchase: &str) -> String {
        format!(
            "{},Female,Yes,{},Daily,Satisfied,Sometimes,No,High,Very,\"{}\",{},Battery,\
High,Medium,Low,Medium,High,Low,High,Too much",
            age, diet, features, purchase
        )
    }

    fn write_csv(dir: &TempDir, name: &str, lines: &[String]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        for l in lines {
            writeln!(f, "{}", l).unwrap();
        }
        path
    }

    fn setup() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(dir.path().join("survey.db")).unwrap();
        (dir, db)
    }

    // ==========================================================================
    // HEADER MAPPING TESTS
    // ==========================================================================

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("Purchase_Consideration"), "purchase_consideration");
        assert_eq!(normalize_header(" Diet Condition "), "diet_condition");
        assert_eq!(normalize_header("SALT-OPINION"), "salt_opinion");
    }

    #[test]
    fn test_original_headers_map_to_schema() {
        let (targets, extra) = map_headers(HEADER.split(',')).unwrap();
        assert!(extra.is_empty());
        assert_eq!(targets.len(), SURVEY_COLUMNS.len());
        assert_eq!(targets[0], Target::Age);
        assert_eq!(targets[20], Target::Text(19));
        assert!(missing_columns(&targets).is_empty());
    }

    #[test]
    fn test_duplicate_mapped_header_rejected() {
        let err = map_headers(["Age", "age"].into_iter()).unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn { ref column, .. } if column == "age"));
    }

    #[test]
    fn test_rowid_aliases_renamed() {
        let (targets, extras) = map_headers(["Age", "OID", "_rowid_", "note"].into_iter()).unwrap();
        assert_eq!(targets.len(), 4);
        assert_eq!(extras, vec!["OID_".to_string(), "_rowid__".to_string(), "note".to_string()]);

        let err = map_headers(["rowid", "rowid_"].into_iter()).unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn { .. }));
    }

    #[test]
    fn test_passthrough_headers_collide_case_insensitively() {
        let result = map_headers(["Region", "REGION"].into_iter());
        assert!(matches!(result, Err(Error::DuplicateColumn { .. })));
    }

    // ==========================================================================
    // AGE COERCION TESTS
    // ==========================================================================

    #[test]
    fn test_coerce_age() {
        assert_eq!(coerce_age("42", 2).unwrap(), AgeValue::Value(42));
        assert_eq!(coerce_age(" 42.0 ", 2).unwrap(), AgeValue::Value(42));
        assert_eq!(coerce_age("", 2).unwrap(), AgeValue::Empty);
        assert_eq!(coerce_age("forty", 2).unwrap(), AgeValue::NotNumeric);
        assert_eq!(coerce_age("NaN", 2).unwrap(), AgeValue::Empty);
    }

    #[test]
    fn test_coerce_fractional_age_fails() {
        let err = coerce_age("42.5", 7).unwrap_err();
        assert!(matches!(err, Error::Coercion { row: 7, .. }));
    }

    // ==========================================================================
    // LOAD TESTS
    // ==========================================================================

    #[test]
    fn test_load_round_trip() {
        let (dir, db) = setup();
        let path = write_csv(
            &dir,
            "survey.csv",
            &[
                HEADER.to_string(),
                line("25", "Hypertension", "App control, Salt level display", "Yes"),
                line("unknown", "", "App control", "Maybe"),
                line("61", "Diabetes", "", "No"),
            ],
        );

        let summary = load_survey_csv(&db, &path).unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.ages_nulled, 1);
        assert!(summary.passthrough_columns.is_empty());

        let records = db.load_survey().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].age, Some(25));
        assert_eq!(records[1].age, None);
        assert_eq!(records[1].diet_condition, None);
        assert_eq!(records[2].expected_device_features, None);
        assert_eq!(
            records[0].expected_device_features.as_deref(),
            Some("App control, Salt level display")
        );
        assert_eq!(records[2].salt_opinion.as_deref(), Some("Too much"));
        assert_eq!(db.column_names().unwrap().len(), SURVEY_COLUMNS.len());
    }

    #[test]
    fn test_reload_replaces_previous_rows() {
        let (dir, db) = setup();
        let first = write_csv(
            &dir,
            "first.csv",
            &[HEADER.to_string(), line("20", "None", "A", "Yes"), line("30", "None", "B", "No")],
        );
        let second = write_csv(&dir, "second.csv", &[HEADER.to_string(), line("55", "None", "C", "Maybe")]);

        load_survey_csv(&db, &first).unwrap();
        load_survey_csv(&db, &second).unwrap();

        let records = db.load_survey().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].age, Some(55));
    }

    #[test]
    fn test_extra_columns_pass_through() {
        let (dir, db) = setup();
        let path = write_csv(
            &dir,
            "extra.csv",
            &["Age,Purchase_Consideration,Survey City".to_string(), "34,Yes,Mysuru".to_string()],
        );

        let summary = load_survey_csv(&db, &path).unwrap();
        assert_eq!(summary.passthrough_columns, vec!["Survey City".to_string()]);
        assert_eq!(summary.missing_columns.len(), SURVEY_COLUMNS.len() - 2);

        let columns = db.column_names().unwrap();
        assert!(columns.contains(&"Survey City".to_string()));
        let records = db.load_survey().unwrap();
        assert_eq!(records[0].purchase_consideration.as_deref(), Some("Yes"));
        assert_eq!(records[0].gender, None);
    }

    #[test]
    fn test_failed_load_keeps_previous_table() {
        let (dir, db) = setup();
        let good = write_csv(&dir, "good.csv", &[HEADER.to_string(), line("40", "None", "A", "Yes")]);
        let bad = write_csv(
            &dir,
            "bad.csv",
            &[HEADER.to_string(), line("22", "None", "A", "Yes"), line("22.5", "None", "B", "No")],
        );

        load_survey_csv(&db, &good).unwrap();
        let err = load_survey_csv(&db, &bad).unwrap_err();

        assert!(matches!(err, Error::Coercion { row: 3, .. }));
        let records = db.load_survey().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].age, Some(40));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let (dir, db) = setup();
        let err = load_survey_csv(&db, dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_short_row_fills_null() {
        let data = "Age,Gender,Diet_Condition\n30,Male\n31\n";
        let (_, rows, _) = read_survey(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].age, Some(30));
        assert_eq!(rows[0].values[0].as_deref(), Some("Male"));
        assert!(rows[0].values[1..].iter().all(Option::is_none));
        assert_eq!(rows[1].age, Some(31));
        assert!(rows[1].values.iter().all(Option::is_none));
    }

    #[test]
    fn test_long_row_is_rejected() {
        let data = "Age,Gender\n30,Male\n31,Female,extra\n";
        let err = read_survey(data.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::RowLength { row: 3, expected: 2, found: 3 }));
    }

    #[test]
    fn test_rowid_header_keeps_insertion_order() {
        let (dir, db) = setup();
        let path = write_csv(&dir, "rowid.csv", &["Age,rowid".to_string(), "10,z".to_string(), "20,a".to_string()]);

        let summary = load_survey_csv(&db, &path).unwrap();
        assert_eq!(summary.passthrough_columns, vec!["rowid_".to_string()]);

        let ages: Vec<Option<i32>> = db.load_survey().unwrap().iter().map(|r| r.age).collect();
        assert_eq!(ages, vec![Some(10), Some(20)]);
        assert!(db.column_names().unwrap().contains(&"rowid_".to_string()));
    }
}
