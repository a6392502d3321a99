//! Crate-wide error type

use crate::db::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Storage errors are passed through as the engine reported them
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: cannot coerce age value {value:?} to an integer")]
    Coercion { row: usize, value: String },

    #[error("columns {first:?} and {second:?} both map to survey column '{column}'")]
    DuplicateColumn {
        column: String,
        first: String,
        second: String,
    },

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("image is {size} bytes, limit is {limit} bytes")]
    ImageTooLarge { size: u64, limit: u64 },

    #[error("image is {width}x{height} pixels, limit is {limit} per side")]
    ImageDimensions { width: u32, height: u32, limit: u32 },

    #[error("row {row}: expected at most {expected} fields, found {found}")]
    RowLength { row: usize, expected: usize, found: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("unknown tab '{0}'")]
    UnknownTab(String),

    #[error("the {tab} tab does not accept {input}")]
    ViewInput { tab: String, input: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<diesel::result::Error> for Error {
    fn from(e: diesel::result::Error) -> Self {
        Error::Db(DbError::Query(e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
