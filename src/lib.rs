//! Smart Spoon Analytics - survey, food-photo and feedback analytics
//!
//! Backend for the Smart Spoon demo dashboard. It owns three read models
//! and the small amount of storage behind them; rendering them is someone
//! else's job (the CLI prints them, the HTTP API serves them as JSON).
//!
//! # Overview
//!
//! 1. **Market research**: a survey CSV is loaded into SQLite
//!    ([`ingest`], [`db`]) and summarised into an age histogram, purchase
//!    consideration per age group, requested features and diet conditions
//!    ([`survey`]).
//!
//! 2. **Food recognition**: a food photo is reduced to colour and texture
//!    statistics which map to salt, food-type, stimulation and flavour labels
//!    by fixed thresholds ([`food`]).
//!
//! 3. **Sentiment analysis**: free-text feedback gets a lexicon polarity
//!    score, a band, and keyword counts ([`sentiment`]).
//!
//! # Quick Start
//!
//! ```no_run
//! use smartspoon::{ingest, Database, SurveyAggregate};
//!
//! let db = Database::open_at("smart_spoon.db")?;
//! ingest::load_survey_csv(&db, "expanded_smart_spoon_market_research.csv")?;
//!
//! let records = db.load_survey()?;
//! let aggregate = SurveyAggregate::from_records(&records, 10);
//! println!("{} respondents", aggregate.total_respondents);
//!
//! let feedback = smartspoon::sentiment::score("The spoon is great but expensive");
//! println!("{} ({:.2})", feedback.band, feedback.polarity);
//! # Ok::<(), smartspoon::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`db`] / [`schema`]: survey table, age-group view, bulk replace
//! - [`ingest`]: CSV to survey table
//! - [`survey`]: in-memory aggregations
//! - [`food`]: image statistics and labels
//! - [`sentiment`]: polarity, bands, keyword counts
//! - [`dashboard`]: tab navigation and view selection
//! - [`report`]: output formatters (JSON, CSV)
//! - [`serve`]: HTTP API
//! - [`config`]: `smartspoon.toml`

pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod food;
pub mod ingest;
pub mod report;
pub mod schema;
pub mod sentiment;
pub mod serve;
pub mod survey;

pub use config::Config;
pub use dashboard::{select_view, NavigationState, Tab, ViewInput, ViewModel, ViewSettings};
pub use db::{AgeGroupViewRow, Database, SurveyRecord};
pub use error::{Error, Result};
pub use food::{FoodAnalysis, FoodReport, ImageLimits, ImageStatistics};
pub use ingest::IngestSummary;
pub use sentiment::{PolarityScorer, SentimentBand, SentimentResult, SentimentScorer};
pub use survey::{AgeGroup, SurveyAggregate};
