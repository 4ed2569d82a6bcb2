use std::sync::Arc;

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sprs::CsVecView;
use tracing::info;

use medrec_core::error::{Error, Result};
use medrec_core::traits::SimilaritySource;
use medrec_core::types::RecordIndex;

use crate::features::FeatureMatrix;

/// `dot(a, b) / (|a| * |b|)`, defined as 0 when either row has zero norm.
pub fn cosine(a: &CsVecView<'_, f64>, b: &CsVecView<'_, f64>) -> f64 {
    let denom = a.l2_norm() * b.l2_norm();
    if denom == 0.0 { 0.0 } else { a.dot(b) / denom }
}

fn scored_row(query: &CsVecView<'_, f64>, query_norm: f64, features: &FeatureMatrix, norms: &[f64]) -> Vec<f64> {
    features
        .row_views()
        .zip(norms)
        .map(|(other, &norm)| {
            let denom = query_norm * norm;
            if denom == 0.0 { 0.0 } else { query.dot(&other) / denom }
        })
        .collect()
}

fn check_index(query: RecordIndex, len: usize) -> Result<()> {
    if query >= len {
        return Err(Error::NotFound(format!("record index {} out of range ({} rows)", query, len)));
    }
    Ok(())
}

/// Scores one query row against the feature matrix per call. O(nnz) per query.
pub struct CosineScorer {
    features: Arc<FeatureMatrix>,
    norms: Vec<f64>,
}

impl CosineScorer {
    pub fn new(features: Arc<FeatureMatrix>) -> Self {
        let norms = features.norms();
        Self { features, norms }
    }
}

impl SimilaritySource for CosineScorer {
    fn rows(&self) -> usize {
        self.features.rows()
    }

    fn scores(&self, query: RecordIndex) -> Result<Vec<f64>> {
        let row = self.features.row(query).ok_or_else(|| {
            Error::NotFound(format!("record index {} out of range ({} rows)", query, self.rows()))
        })?;
        Ok(scored_row(&row, self.norms[query], &self.features, &self.norms))
    }
}

/// Dense, symmetric N x N cosine matrix. Trades N^2 memory for O(N) queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    n: usize,
    values: Vec<f64>,
}

impl SimilarityMatrix {
    pub fn compute(features: &FeatureMatrix) -> Self {
        Self::compute_with_progress(features, &ProgressBar::hidden())
    }

    /// Rows are scored in parallel; `progress` advances once per row.
    pub fn compute_with_progress(features: &FeatureMatrix, progress: &ProgressBar) -> Self {
        let n = features.rows();
        let norms = features.norms();
        progress.set_length(n as u64);
        let queries: Vec<CsVecView<'_, f64>> = features.row_views().collect();
        let rows: Vec<Vec<f64>> = queries
            .par_iter()
            .zip(norms.par_iter())
            .map(|(query, &norm)| {
                let row = scored_row(query, norm, features, &norms);
                progress.inc(1);
                row
            })
            .collect();
        progress.finish_and_clear();
        info!(rows = n, "similarity matrix computed");
        Self { n, values: rows.concat() }
    }

    pub fn get(&self, i: RecordIndex, j: RecordIndex) -> f64 {
        self.values[i * self.n + j]
    }

    pub fn row(&self, i: RecordIndex) -> &[f64] {
        &self.values[i * self.n..(i + 1) * self.n]
    }

    pub fn validate(&self) -> Result<()> {
        if self.values.len() != self.n * self.n {
            return Err(Error::Initialization(format!(
                "similarity matrix holds {} values, expected {}x{}",
                self.values.len(),
                self.n,
                self.n
            )));
        }
        if self.values.iter().any(|v| !v.is_finite()) {
            return Err(Error::Initialization("similarity matrix holds non-finite values".to_string()));
        }
        Ok(())
    }
}

impl SimilaritySource for SimilarityMatrix {
    fn rows(&self) -> usize {
        self.n
    }

    fn scores(&self, query: RecordIndex) -> Result<Vec<f64>> {
        check_index(query, self.n)?;
        Ok(self.row(query).to_vec())
    }
}
