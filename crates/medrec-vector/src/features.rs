use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVecView, TriMat};
use tracing::{info, warn};

use medrec_core::config::RecommenderSettings;
use medrec_core::error::{Error, Result};
use medrec_core::types::DrugRecord;
use medrec_text::tfidf::TermWeights;
use medrec_text::TfidfVectorizer;

use crate::scaler::MinMaxScaler;

/// N x (V + 1) feature rows in CSR storage, index-aligned with the record store.
///
/// Columns `0..V` hold the L2-normalized TF-IDF weights of `name + condition`;
/// column `V` holds the min-max scaled rating times `rating_weight`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    matrix: CsMat<f64>,
    vocabulary_size: usize,
    scaler: MinMaxScaler,
    rating_weight: f64,
}

impl FeatureMatrix {
    pub fn rows(&self) -> usize {
        self.matrix.rows()
    }

    /// V + 1.
    pub fn dim(&self) -> usize {
        self.matrix.cols()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }

    pub fn rating_weight(&self) -> f64 {
        self.rating_weight
    }

    /// `None` when `r >= rows()`.
    pub fn row(&self, r: usize) -> Option<CsVecView<'_, f64>> {
        self.matrix.outer_view(r)
    }

    pub fn row_views(&self) -> impl Iterator<Item = CsVecView<'_, f64>> + '_ {
        self.matrix.outer_iterator()
    }

    pub fn norms(&self) -> Vec<f64> {
        self.row_views().map(|row| row.l2_norm()).collect()
    }

    /// Structure is checked by `sprs` on deserialization; this covers what it cannot know.
    pub fn validate(&self) -> Result<()> {
        if !self.matrix.is_csr() {
            return Err(Error::Initialization("feature matrix is not stored row-major".to_string()));
        }
        if self.matrix.cols() != self.vocabulary_size + 1 {
            return Err(Error::Initialization(format!(
                "feature matrix has {} columns, expected vocabulary {} + 1",
                self.matrix.cols(),
                self.vocabulary_size
            )));
        }
        if !self.rating_weight.is_finite() || self.matrix.data().iter().any(|v| !v.is_finite()) {
            return Err(Error::Initialization("feature matrix holds non-finite values".to_string()));
        }
        Ok(())
    }
}

fn lexical_block(rows: &[TermWeights], vocabulary_size: usize) -> CsMat<f64> {
    let mut triplets = TriMat::new((rows.len(), vocabulary_size));
    for (r, row) in rows.iter().enumerate() {
        for &(c, w) in row {
            if w != 0.0 {
                triplets.add_triplet(r, c, w);
            }
        }
    }
    triplets.to_csr()
}

fn rating_column(values: &[f64]) -> CsMat<f64> {
    let mut triplets = TriMat::new((values.len(), 1));
    for (r, &v) in values.iter().enumerate() {
        if v != 0.0 {
            triplets.add_triplet(r, 0, v);
        }
    }
    triplets.to_csr()
}

#[derive(Debug, Clone, Copy)]
pub struct FeatureBuilder {
    rating_weight: f64,
}

impl Default for FeatureBuilder {
    fn default() -> Self { Self { rating_weight: 1.0 } }
}

impl FeatureBuilder {
    pub fn new(rating_weight: f64) -> Self { Self { rating_weight } }

    pub fn from_settings(settings: &RecommenderSettings) -> Self { Self::new(settings.rating_weight) }

    pub fn build(&self, records: &[DrugRecord]) -> Result<FeatureMatrix> {
        if records.is_empty() {
            return Err(Error::Initialization("cannot build features for an empty corpus".to_string()));
        }
        if let Some(bad) = records.iter().find(|r| !r.rating.is_finite()) {
            return Err(Error::Initialization(format!("record {:?} has a non-finite rating", bad.name)));
        }
        let texts: Vec<String> = records.iter().map(DrugRecord::feature_text).collect();
        let (vectorizer, lexical) = TfidfVectorizer::fit_transform(&texts);
        let vocabulary_size = vectorizer.vocabulary_size();

        let ratings: Vec<f64> = records.iter().map(|r| r.rating).collect();
        let scaler = MinMaxScaler::fit(&ratings);
        if scaler.is_degenerate() {
            warn!(rating = scaler.min, "all ratings are equal; scaled rating column is constant");
        }
        let scaled: Vec<f64> = ratings.iter().map(|&r| scaler.transform(r) * self.rating_weight).collect();

        let rating = rating_column(&scaled);
        let matrix = if vocabulary_size == 0 {
            rating
        } else {
            let lexical = lexical_block(&lexical, vocabulary_size);
            sprs::hstack(&[lexical.view(), rating.view()]).into_csr()
        };
        info!(rows = matrix.rows(), vocabulary = vocabulary_size, nnz = matrix.nnz(), "feature matrix built");
        Ok(FeatureMatrix { matrix, vocabulary_size, scaler, rating_weight: self.rating_weight })
    }
}
