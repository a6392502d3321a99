//! Survey aggregates for the market-research view
//!
//! Four independent, read-only transforms over the loaded survey rows:
//!
//! - age histogram with fixed-width bins
//! - mean purchase consideration per age group
//! - requested-feature frequency
//! - diet-condition distribution (with a bucket for missing answers)
//!
//! Count rankings are descending; equal counts keep first-appearance order.

use crate::db::SurveyRecord;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Default age histogram bin width in years
pub const DEFAULT_AGE_BIN_WIDTH: u32 = 10;

/// Delimiter between tags in `expected_device_features`
pub const FEATURE_DELIMITER: &str = ", ";

/// Age bands used by the dashboard and by the stored SQL view.
///
/// Bounds are inclusive: `0..=30`, `31..=50`, `51..=70`. Everything else,
/// including negative and unknown ages, is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AgeGroup {
    #[serde(rename = "18-30")]
    Young,
    #[serde(rename = "31-50")]
    Middle,
    #[serde(rename = "51-70")]
    Senior,
    Other,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 4] = [AgeGroup::Young, AgeGroup::Middle, AgeGroup::Senior, AgeGroup::Other];

    pub fn from_age(age: Option<i32>) -> Self {
        match age {
            Some(0..=30) => AgeGroup::Young,
            Some(31..=50) => AgeGroup::Middle,
            Some(51..=70) => AgeGroup::Senior,
            _ => AgeGroup::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeGroup::Young => "18-30",
            AgeGroup::Middle => "31-50",
            AgeGroup::Senior => "51-70",
            AgeGroup::Other => "Other",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Numeric purchase-consideration score: Yes → 1, Maybe → 0.5, anything else → 0
pub fn purchase_score(answer: Option<&str>) -> f64 {
    match answer {
        Some("Yes") => 1.0,
        Some("Maybe") => 0.5,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeBin {
    /// Inclusive lower bound
    pub start: i64,
    /// Exclusive upper bound
    pub end: i64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeGroupConsideration {
    pub group: AgeGroup,
    pub respondents: usize,
    /// `None` when no respondent falls in the group
    pub avg_consideration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCount {
    pub feature: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DietCount {
    /// `None` is the missing-answer bucket
    pub condition: Option<String>,
    pub count: usize,
}

impl DietCount {
    pub fn label(&self) -> &str {
        self.condition.as_deref().unwrap_or("Missing")
    }
}

/// Count of respondents per fixed-width age bin.
///
/// Bins are `[k*w, (k+1)*w)`; rows without an age are skipped and only
/// non-empty bins are returned, in ascending order. A width of 0 is
/// treated as 1.
pub fn age_histogram(records: &[SurveyRecord], bin_width: u32) -> Vec<AgeBin> {
    let width = i64::from(bin_width.max(1));
    let mut counts: HashMap<i64, usize> = HashMap::new();

    for age in records.iter().filter_map(|r| r.age) {
        let start = i64::from(age).div_euclid(width) * width;
        *counts.entry(start).or_insert(0) += 1;
    }

    let mut bins: Vec<AgeBin> = counts
        .into_iter()
        .map(|(start, count)| AgeBin {
            start,
            end: start + width,
            count,
        })
        .collect();
    bins.sort_by_key(|b| b.start);
    bins
}

/// Mean purchase score for each of the four age groups, in fixed order
pub fn purchase_by_age_group(records: &[SurveyRecord]) -> Vec<AgeGroupConsideration> {
    let mut sums: HashMap<AgeGroup, (f64, usize)> = HashMap::new();

    for record in records {
        let entry = sums.entry(AgeGroup::from_age(record.age)).or_insert((0.0, 0));
        entry.0 += purchase_score(record.purchase_consideration.as_deref());
        entry.1 += 1;
    }

    AgeGroup::ALL
        .iter()
        .map(|&group| {
            let (sum, n) = sums.get(&group).copied().unwrap_or((0.0, 0));
            AgeGroupConsideration {
                group,
                respondents: n,
                avg_consideration: if n > 0 { Some(sum / n as f64) } else { None },
            }
        })
        .collect()
}

/// Occurrences of each requested feature tag across all respondents
pub fn feature_frequency(records: &[SurveyRecord]) -> Vec<FeatureCount> {
    let tags = records
        .iter()
        .filter_map(|r| r.expected_device_features.as_deref())
        .flat_map(|features| features.split(FEATURE_DELIMITER))
        .filter(|tag| !tag.is_empty());

    ranked_counts(tags.map(str::to_string))
        .into_iter()
        .map(|(feature, count)| FeatureCount { feature, count })
        .collect()
}

/// Respondents per diet condition, missing answers counted separately
pub fn diet_distribution(records: &[SurveyRecord]) -> Vec<DietCount> {
    ranked_counts(records.iter().map(|r| r.diet_condition.clone()))
        .into_iter()
        .map(|(condition, count)| DietCount { condition, count })
        .collect()
}

/// Count items, then sort by count descending; the sort is stable so ties
/// stay in first-appearance order.
fn ranked_counts<K, I>(items: I) -> Vec<(K, usize)>
where
    K: Eq + std::hash::Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut counts: Vec<(K, usize)> = Vec::new();

    for item in items {
        match index.get(&item) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(item.clone(), counts.len());
                counts.push((item, 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// All four market-research views over one snapshot of the survey
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyAggregate {
    pub total_respondents: usize,
    pub age_bin_width: u32,
    pub age_histogram: Vec<AgeBin>,
    pub purchase_by_age_group: Vec<AgeGroupConsideration>,
    pub feature_frequency: Vec<FeatureCount>,
    pub diet_distribution: Vec<DietCount>,
}

impl SurveyAggregate {
    /// A bin width of 0 is treated as 1, and the aggregate reports the width used.
    pub fn from_records(records: &[SurveyRecord], age_bin_width: u32) -> Self {
        let age_bin_width = age_bin_width.max(1);
        Self {
            total_respondents: records.len(),
            age_bin_width,
            age_histogram: age_histogram(records, age_bin_width),
            purchase_by_age_group: purchase_by_age_group(records),
            feature_frequency: feature_frequency(records),
            diet_distribution: diet_distribution(records),
        }
    }
}
