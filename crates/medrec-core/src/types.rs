//! Domain types shared by the feature, similarity and selection layers.

use serde::{Deserialize, Serialize};

/// Row position in the record store. Feature and similarity rows share it.
pub type RecordIndex = usize;

/// One drug as served by the recommender.
///
/// - `name`: display name; lookups compare it case-insensitively
/// - `condition`: the condition the review was written for
/// - `review`: free-form review text, possibly long
/// - `rating`: numeric rating on the source scale (1..=10 for drugs.com data)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugRecord {
    pub name: String,
    pub condition: String,
    pub review: String,
    pub rating: f64,
}

impl DrugRecord {
    pub fn new(name: impl Into<String>, condition: impl Into<String>, review: impl Into<String>, rating: f64) -> Self {
        Self { name: name.into(), condition: condition.into(), review: review.into(), rating }
    }

    /// Case-insensitive comparison key for `name`.
    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }

    /// Text fed to the lexical vectorizer. Name precedes condition.
    pub fn feature_text(&self) -> String {
        format!("{} {}", self.name, self.condition)
    }
}

pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A candidate index paired with its similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredIndex {
    pub index: RecordIndex,
    pub score: f64,
}

/// The stable output contract of `recommend`.
///
/// Field names serialize in camelCase so UI and API adapters can pass the
/// records through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub drug_name: String,
    pub condition: String,
    pub rating: f64,
    pub review_snippet: String,
    pub similarity_score: f64,
}
