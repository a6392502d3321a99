//! SQLite database with Diesel ORM
//!
//! Holds the survey table and the `avg_purchase_by_age_group` view.
//! The schema is created with raw SQL on open; ingestion replaces the
//! table wholesale inside a single transaction.

use crate::schema::smart_spoon_survey;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sql_types::{Double, Integer, Nullable, Text};
use diesel::sqlite::{Sqlite, SqliteConnection};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_DB_PATH: &str = "smart_spoon.db";

pub const SURVEY_TABLE: &str = "smart_spoon_survey";
pub const AGE_GROUP_VIEW: &str = "avg_purchase_by_age_group";

/// Schema columns in table order. `age` is the only integer column.
pub const SURVEY_COLUMNS: [&str; 21] = [
    "age",
    "gender",
    "low_sodium_diet",
    "diet_condition",
    "dining_frequency",
    "low_sodium_satisfaction",
    "add_salt_condiments",
    "taste_enhancement_tech_aware",
    "interest_in_device",
    "importance_of_taste_enhancement",
    "expected_device_features",
    "purchase_consideration",
    "concerns_on_technology",
    "salt_usage_dal_gojju_palya",
    "salt_usage_sambar_rasam_curd",
    "salt_usage_biryani_pulao_rice",
    "salt_usage_curry",
    "salt_usage_snacks",
    "salt_usage_roti_paratha",
    "salt_usage_pickles_papad",
    "salt_opinion",
];

/// Number of TEXT columns in the fixed schema (everything after `age`)
pub const SURVEY_TEXT_COLUMNS: usize = SURVEY_COLUMNS.len() - 1;

const CREATE_AGE_GROUP_VIEW: &str = r#"
    CREATE VIEW IF NOT EXISTS avg_purchase_by_age_group AS
    SELECT
      CASE
        WHEN age BETWEEN 0 AND 30 THEN '18-30'
        WHEN age BETWEEN 31 AND 50 THEN '31-50'
        WHEN age BETWEEN 51 AND 70 THEN '51-70'
        ELSE 'Other'
      END AS age_group,
      AVG(
        CASE purchase_consideration
          WHEN 'Yes' THEN 1.0
          WHEN 'Maybe' THEN 0.5
          ELSE 0.0
        END
      ) AS avg_consideration
    FROM smart_spoon_survey
    GROUP BY age_group
"#;

// ============================================================================
// Diesel Models
// ============================================================================

/// One respondent's answers (database record)
#[derive(QueryableByName, Debug, Clone, Default, PartialEq, Serialize)]
#[diesel(table_name = smart_spoon_survey)]
pub struct SurveyRecord {
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub low_sodium_diet: Option<String>,
    pub diet_condition: Option<String>,
    pub dining_frequency: Option<String>,
    pub low_sodium_satisfaction: Option<String>,
    pub add_salt_condiments: Option<String>,
    pub taste_enhancement_tech_aware: Option<String>,
    pub interest_in_device: Option<String>,
    pub importance_of_taste_enhancement: Option<String>,
    pub expected_device_features: Option<String>,
    pub purchase_consideration: Option<String>,
    pub concerns_on_technology: Option<String>,
    pub salt_usage_dal_gojju_palya: Option<String>,
    pub salt_usage_sambar_rasam_curd: Option<String>,
    pub salt_usage_biryani_pulao_rice: Option<String>,
    pub salt_usage_curry: Option<String>,
    pub salt_usage_snacks: Option<String>,
    pub salt_usage_roti_paratha: Option<String>,
    pub salt_usage_pickles_papad: Option<String>,
    pub salt_opinion: Option<String>,
}

/// A row of the `avg_purchase_by_age_group` view
#[derive(QueryableByName, Debug, Clone, PartialEq, Serialize)]
pub struct AgeGroupViewRow {
    #[diesel(sql_type = Text)]
    pub age_group: String,
    #[diesel(sql_type = Nullable<Double>)]
    pub avg_consideration: Option<f64>,
}

#[derive(QueryableByName)]
struct ColumnInfo {
    #[diesel(sql_type = Text)]
    name: String,
}

/// A normalized row ready for insertion.
///
/// `values` holds the schema TEXT columns in [`SURVEY_COLUMNS`] order (minus
/// `age`), followed by one value per passthrough column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyRow {
    pub age: Option<i32>,
    pub values: Vec<Option<String>>,
}

// ============================================================================
// Database Connection
// ============================================================================

type DbPool = Pool<ConnectionManager<SqliteConnection>>;
type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Database connection wrapper with connection pool
pub struct Database {
    pool: DbPool,
}

/// Error type for database operations
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Query error: {0}")]
    Query(#[from] diesel::result::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl Database {
    /// Get the default database path
    pub fn db_path() -> std::path::PathBuf {
        std::path::PathBuf::from(DEFAULT_DB_PATH)
    }

    /// Open database at default path
    pub fn open() -> Result<Self> {
        Self::open_at(DEFAULT_DB_PATH)
    }

    /// Open database at specified path and make sure the schema exists
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(&path_str);
        let pool = Pool::builder()
            .max_size(5)
            .build(manager)
            .map_err(|e| DbError::Connection(e.to_string()))?;

        debug!(path = %path_str, "opened survey database");

        let db = Self { pool };
        db.ensure_schema()?;
        Ok(db)
    }

    fn get_conn(&self) -> Result<DbConn> {
        self.pool.get().map_err(|e| DbError::Connection(e.to_string()))
    }

    /// Create the survey table and the age-group view if they are missing.
    ///
    /// Safe to run on every start; never drops or alters anything.
    pub fn ensure_schema(&self) -> Result<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query(create_table_sql("CREATE TABLE IF NOT EXISTS", &[]))
            .execute(&mut conn)?;
        diesel::sql_query(CREATE_AGE_GROUP_VIEW).execute(&mut conn)?;

        Ok(())
    }

    // ========================================================================
    // Survey Table
    // ========================================================================

    /// Drop the survey table, recreate it with `extra_columns` appended and
    /// insert `rows`, all in one transaction.
    ///
    /// On any error the transaction is rolled back and the previous contents
    /// remain in place. Each row must carry one value per TEXT column plus
    /// one per extra column.
    pub fn replace_survey(&self, extra_columns: &[String], rows: &[SurveyRow]) -> Result<usize> {
        let mut conn = self.get_conn()?;
        let insert_sql = insert_sql(extra_columns);
        let width = SURVEY_TEXT_COLUMNS + extra_columns.len();

        let inserted = conn.transaction::<_, DbError, _>(|conn| {
            diesel::sql_query(format!("DROP TABLE IF EXISTS {}", SURVEY_TABLE)).execute(conn)?;
            diesel::sql_query(create_table_sql("CREATE TABLE", extra_columns)).execute(conn)?;

            for row in rows {
                debug_assert_eq!(row.values.len(), width, "survey row width");
                let mut query = diesel::sql_query(insert_sql.as_str())
                    .into_boxed::<Sqlite>()
                    .bind::<Nullable<Integer>, _>(row.age);
                for idx in 0..width {
                    let value = row.values.get(idx).cloned().flatten();
                    query = query.bind::<Nullable<Text>, _>(value);
                }
                query.execute(conn)?;
            }

            Ok(rows.len())
        })?;

        info!(rows = inserted, extra_columns = extra_columns.len(), "replaced survey table");
        Ok(inserted)
    }

    /// Every survey row, in insertion order
    pub fn load_survey(&self) -> Result<Vec<SurveyRecord>> {
        let mut conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid",
            SURVEY_COLUMNS.join(", "),
            SURVEY_TABLE
        );
        let records = diesel::sql_query(sql).load::<SurveyRecord>(&mut conn)?;
        Ok(records)
    }

    /// Number of rows in the survey table
    pub fn count(&self) -> Result<i64> {
        let mut conn = self.get_conn()?;
        let total = smart_spoon_survey::table.count().get_result(&mut conn)?;
        Ok(total)
    }

    /// Column names of the survey table as currently stored
    pub fn column_names(&self) -> Result<Vec<String>> {
        let mut conn = self.get_conn()?;
        let columns = diesel::sql_query(format!("PRAGMA table_info({})", SURVEY_TABLE))
            .load::<ColumnInfo>(&mut conn)?;
        Ok(columns.into_iter().map(|c| c.name).collect())
    }

    /// Rows of the stored age-group view, ordered by group label
    pub fn purchase_by_age_group(&self) -> Result<Vec<AgeGroupViewRow>> {
        let mut conn = self.get_conn()?;
        let rows = diesel::sql_query(format!(
            "SELECT age_group, avg_consideration FROM {} ORDER BY age_group",
            AGE_GROUP_VIEW
        ))
        .load::<AgeGroupViewRow>(&mut conn)?;
        Ok(rows)
    }
}

/// Quote an SQL identifier, doubling embedded quotes
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(create: &str, extra_columns: &[String]) -> String {
    let mut defs: Vec<String> = SURVEY_COLUMNS
        .iter()
        .map(|c| {
            let ty = if *c == "age" { "INTEGER" } else { "TEXT" };
            format!("{} {}", c, ty)
        })
        .collect();
    defs.extend(extra_columns.iter().map(|c| format!("{} TEXT", quote_ident(c))));

    format!("{} {} ({})", create, SURVEY_TABLE, defs.join(", "))
}

fn insert_sql(extra_columns: &[String]) -> String {
    let mut columns: Vec<String> = SURVEY_COLUMNS.iter().map(|c| c.to_string()).collect();
    columns.extend(extra_columns.iter().map(|c| quote_ident(c)));
    let placeholders = vec!["?"; columns.len()].join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        SURVEY_TABLE,
        columns.join(", "),
        placeholders
    )
}
