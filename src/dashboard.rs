//! Tab navigation and view selection.
//!
//! The active tab lives in a [`NavigationState`] owned by the caller (a CLI
//! invocation, an HTTP request). [`select_view`] turns that state plus the
//! tab's input into the read model a presentation layer renders.

use crate::db::SurveyRecord;
use crate::error::{Error, Result};
use crate::food::{self, FoodAnalysis, ImageLimits, DEFAULT_MAX_IMAGE_DIMENSION, DEFAULT_MAX_UPLOAD_BYTES};
use crate::sentiment::{self, SentimentResult, SAMPLE_FEEDBACK};
use crate::survey::{SurveyAggregate, DEFAULT_AGE_BIN_WIDTH};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tab {
    #[default]
    FoodRecognition,
    MarketResearch,
    SentimentAnalysis,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::FoodRecognition, Tab::MarketResearch, Tab::SentimentAnalysis];

    /// URL / CLI slug
    pub fn slug(&self) -> &'static str {
        match self {
            Tab::FoodRecognition => "food-recognition",
            Tab::MarketResearch => "market-research",
            Tab::SentimentAnalysis => "sentiment-analysis",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Tab::FoodRecognition => "Food Recognition",
            Tab::MarketResearch => "Market Research",
            Tab::SentimentAnalysis => "Sentiment Analysis",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

impl FromStr for Tab {
    type Err = Error;

    /// Accepts the slug, the title, or the short names `food`, `market`, `sentiment`.
    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase().replace([' ', '_'], "-");
        match key.as_str() {
            "food" | "food-recognition" => Ok(Tab::FoodRecognition),
            "market" | "market-research" => Ok(Tab::MarketResearch),
            "sentiment" | "sentiment-analysis" => Ok(Tab::SentimentAnalysis),
            _ => Err(Error::UnknownTab(s.to_string())),
        }
    }
}

/// Which tab is showing. Starts on food recognition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationState {
    pub active: Tab,
}

impl NavigationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, tab: Tab) {
        self.active = tab;
    }
}

/// Input handed to the active tab
#[derive(Debug, Clone, Copy)]
pub enum ViewInput<'a> {
    /// Nothing submitted yet
    Empty,
    Image(&'a [u8]),
    Survey(&'a [SurveyRecord]),
    Feedback(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSettings {
    pub age_bin_width: u32,
    pub max_upload_bytes: u64,
    pub max_image_dimension: u32,
}

impl ViewSettings {
    pub fn image_limits(&self) -> ImageLimits {
        ImageLimits {
            max_bytes: self.max_upload_bytes,
            max_dimension: self.max_image_dimension,
        }
    }
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            age_bin_width: DEFAULT_AGE_BIN_WIDTH,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_image_dimension: DEFAULT_MAX_IMAGE_DIMENSION,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "tab", content = "data", rename_all = "kebab-case")]
pub enum ViewModel {
    /// `None` until an image has been uploaded
    FoodRecognition(Option<FoodAnalysis>),
    MarketResearch(SurveyAggregate),
    SentimentAnalysis(SentimentResult),
}

impl ViewModel {
    pub fn tab(&self) -> Tab {
        match self {
            ViewModel::FoodRecognition(_) => Tab::FoodRecognition,
            ViewModel::MarketResearch(_) => Tab::MarketResearch,
            ViewModel::SentimentAnalysis(_) => Tab::SentimentAnalysis,
        }
    }
}

/// Build the read model for the active tab.
///
/// An empty input shows the tab's initial state: no analysis for food, an
/// empty aggregate for market research, and the pre-filled sample feedback
/// for sentiment. Input meant for another tab is rejected.
pub fn select_view(state: &NavigationState, input: ViewInput<'_>, settings: &ViewSettings) -> Result<ViewModel> {
    match (state.active, input) {
        (Tab::FoodRecognition, ViewInput::Empty) => Ok(ViewModel::FoodRecognition(None)),
        (Tab::FoodRecognition, ViewInput::Image(bytes)) => {
            let analysis = food::analyze_bytes(bytes, &settings.image_limits())?;
            Ok(ViewModel::FoodRecognition(Some(analysis)))
        }
        (Tab::MarketResearch, ViewInput::Empty) => Ok(ViewModel::MarketResearch(
            SurveyAggregate::from_records(&[], settings.age_bin_width),
        )),
        (Tab::MarketResearch, ViewInput::Survey(records)) => Ok(ViewModel::MarketResearch(
            SurveyAggregate::from_records(records, settings.age_bin_width),
        )),
        (Tab::SentimentAnalysis, ViewInput::Empty) => {
            Ok(ViewModel::SentimentAnalysis(sentiment::score(SAMPLE_FEEDBACK)))
        }
        (Tab::SentimentAnalysis, ViewInput::Feedback(text)) => {
            Ok(ViewModel::SentimentAnalysis(sentiment::score(text)))
        }
        (tab, input) => Err(Error::ViewInput {
            tab: tab.title().to_string(),
            input: input.kind().to_string(),
        }),
    }
}

impl ViewInput<'_> {
    fn kind(&self) -> &'static str {
        match self {
            ViewInput::Empty => "nothing",
            ViewInput::Image(_) => "an image",
            ViewInput::Survey(_) => "survey records",
            ViewInput::Feedback(_) => "feedback text",
        }
    }
}
