//! Feedback sentiment scoring
//!
//! Two independent signals are computed for a piece of feedback:
//!
//! 1. **Polarity** in `[-1, 1]` from a [`PolarityScorer`]. The built-in
//!    [`LexiconPolarity`] averages word scores from a small opinion lexicon,
//!    scaled by intensifiers ("very good") and flipped by negators
//!    ("not good"). Any backend can be swapped in; the banding below does
//!    not depend on it.
//! 2. **Keyword counts** against fixed positive and negative theme lists.
//!    These are substring occurrence counts, so "help" is counted inside
//!    "helped" and a repeated word counts every time.
//!
//! # Bands
//!
//! | Polarity | Band |
//! |----------|------|
//! | > 0.3 | Strong Positive |
//! | (0.1, 0.3] | Positive |
//! | [-0.1, 0.1] | Neutral |
//! | [-0.3, -0.1) | Negative |
//! | < -0.3 | Strong Negative |

use serde::Serialize;
use std::fmt;

pub const POSITIVE_KEYWORDS: [&str; 6] = ["help", "improve", "better", "good", "love", "great"];
pub const NEGATIVE_KEYWORDS: [&str; 6] = ["expensive", "issue", "problem", "bad", "hate", "worse"];

pub const STRONG_THRESHOLD: f64 = 0.3;
pub const MILD_THRESHOLD: f64 = 0.1;

/// Feedback shown in the dashboard before the user types anything
pub const SAMPLE_FEEDBACK: &str = "The smart spoon really helped me reduce my salt intake. \
I have hypertension and this device makes low-sodium food taste better. \
I'm not sure about the price point though - it seems expensive for what it does. \
The battery life could be improved.";

/// Anything that maps text to a polarity score in `[-1, 1]`
pub trait PolarityScorer: Send + Sync {
    fn polarity(&self, text: &str) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SentimentBand {
    #[serde(rename = "Strong Positive")]
    StrongPositive,
    Positive,
    Neutral,
    Negative,
    #[serde(rename = "Strong Negative")]
    StrongNegative,
}

impl SentimentBand {
    pub fn from_polarity(polarity: f64) -> Self {
        if polarity > STRONG_THRESHOLD {
            SentimentBand::StrongPositive
        } else if polarity > MILD_THRESHOLD {
            SentimentBand::Positive
        } else if polarity < -STRONG_THRESHOLD {
            SentimentBand::StrongNegative
        } else if polarity < -MILD_THRESHOLD {
            SentimentBand::Negative
        } else {
            SentimentBand::Neutral
        }
    }
}

impl fmt::Display for SentimentBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SentimentBand::StrongPositive => "Strong Positive",
            SentimentBand::Positive => "Positive",
            SentimentBand::Neutral => "Neutral",
            SentimentBand::Negative => "Negative",
            SentimentBand::StrongNegative => "Strong Negative",
        };
        write!(f, "{} Sentiment", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentResult {
    pub polarity: f64,
    pub band: SentimentBand,
    pub positive_keyword_count: usize,
    pub negative_keyword_count: usize,
    /// Distinct negative keywords found, in keyword-list order
    pub negative_keywords_present: Vec<String>,
}

impl SentimentResult {
    pub fn neutral() -> Self {
        Self {
            polarity: 0.0,
            band: SentimentBand::Neutral,
            positive_keyword_count: 0,
            negative_keyword_count: 0,
            negative_keywords_present: Vec::new(),
        }
    }

    /// Polarity mapped onto a 0-100 gauge
    pub fn gauge_percent(&self) -> u8 {
        ((self.polarity + 1.0) * 50.0).clamp(0.0, 100.0) as u8
    }
}

/// Scores feedback with a pluggable polarity backend
pub struct SentimentScorer<P = LexiconPolarity> {
    backend: P,
}

impl SentimentScorer {
    pub fn new() -> Self {
        Self { backend: LexiconPolarity }
    }
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PolarityScorer> SentimentScorer<P> {
    pub fn with_backend(backend: P) -> Self {
        Self { backend }
    }

    pub fn score(&self, text: &str) -> SentimentResult {
        if text.trim().is_empty() {
            return SentimentResult::neutral();
        }

        let raw = self.backend.polarity(text);
        let polarity = if raw.is_nan() { 0.0 } else { raw.clamp(-1.0, 1.0) };

        let lower = text.to_lowercase();
        let negative_keywords_present = NEGATIVE_KEYWORDS
            .iter()
            .filter(|k| lower.contains(*k))
            .map(|k| k.to_string())
            .collect();

        SentimentResult {
            polarity,
            band: SentimentBand::from_polarity(polarity),
            positive_keyword_count: count_occurrences(&lower, &POSITIVE_KEYWORDS),
            negative_keyword_count: count_occurrences(&lower, &NEGATIVE_KEYWORDS),
            negative_keywords_present,
        }
    }
}

/// Score with the built-in lexicon
pub fn score(text: &str) -> SentimentResult {
    SentimentScorer::new().score(text)
}

/// Non-overlapping substring occurrences of every keyword, summed
fn count_occurrences(haystack: &str, keywords: &[&str]) -> usize {
    keywords.iter().map(|k| haystack.matches(k).count()).sum()
}

// ============================================================================
// Lexicon backend
// ============================================================================

/// Negation multiplies the next opinion word by this factor
const NEGATION_FACTOR: f64 = -0.5;

/// Tokens a negator or intensifier stays pending before it is dropped
const MODIFIER_REACH: usize = 3;

/// Word-average polarity over a built-in opinion lexicon
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconPolarity;

impl PolarityScorer for LexiconPolarity {
    fn polarity(&self, text: &str) -> f64 {
        let lower = text.to_lowercase();
        let mut scores = Vec::new();
        let mut negated = false;
        let mut intensity = 1.0;
        let mut pending_for = 0;

        for token in lower.split(|c: char| !(c.is_alphanumeric() || c == '\'')) {
            let token = token.trim_matches('\'');
            if token.is_empty() {
                continue;
            }

            if is_negator(token) {
                negated = true;
                pending_for = 0;
                continue;
            }
            if let Some(m) = intensifier(token) {
                intensity *= m;
                pending_for = 0;
                continue;
            }

            match word_polarity(token) {
                Some(p) => {
                    let mut s = (p * intensity).clamp(-1.0, 1.0);
                    if negated {
                        s *= NEGATION_FACTOR;
                    }
                    scores.push(s);
                    negated = false;
                    intensity = 1.0;
                    pending_for = 0;
                }
                None => {
                    pending_for += 1;
                    if pending_for >= MODIFIER_REACH {
                        negated = false;
                        intensity = 1.0;
                    }
                }
            }
        }

        if scores.is_empty() {
            return 0.0;
        }
        (scores.iter().sum::<f64>() / scores.len() as f64).clamp(-1.0, 1.0)
    }
}

fn is_negator(token: &str) -> bool {
    matches!(token, "not" | "no" | "never" | "nor" | "cannot" | "without") || token.ends_with("n't")
}

fn intensifier(token: &str) -> Option<f64> {
    match token {
        "very" | "so" | "super" => Some(1.3),
        "really" | "too" => Some(1.2),
        "extremely" | "incredibly" => Some(1.5),
        "quite" | "pretty" => Some(1.1),
        "slightly" | "somewhat" => Some(0.7),
        _ => None,
    }
}

fn word_polarity(token: &str) -> Option<f64> {
    let p = match token {
        // positive
        "excellent" | "perfect" | "wonderful" | "awesome" | "best" | "delicious" => 1.0,
        "amazing" | "impressive" | "fantastic" => 0.8,
        "great" | "happy" | "loved" => 0.8,
        "good" | "tasty" => 0.7,
        "nice" | "enjoy" | "enjoyed" => 0.6,
        "love" | "better" | "helpful" | "satisfied" | "healthy" | "sure" => 0.5,
        "easy" | "comfortable" | "recommend" => 0.4,
        "useful" | "fresh" | "worth" | "improved" => 0.3,
        "convenient" | "fine" | "okay" | "ok" => 0.2,
        // negative
        "worst" | "terrible" | "awful" | "horrible" | "disgusting" => -1.0,
        "hate" | "annoying" | "useless" => -0.8,
        "bad" | "disappointed" => -0.7,
        "disappointing" | "bland" | "tasteless" => -0.6,
        "expensive" | "difficult" | "wrong" | "uncomfortable" | "complicated" | "unhappy" => -0.5,
        "worse" | "poor" | "broken" | "overpriced" => -0.4,
        "slow" | "hard" | "heavy" => -0.3,
        "problem" | "issue" | "weird" => -0.2,
        _ => return None,
    };
    Some(p)
}
