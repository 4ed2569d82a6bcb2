//! Corpus-global TF-IDF weighting.
//!
//! The vocabulary and IDF weights are frozen by `fit`; every document is
//! projected into that single space by `transform`. Weights follow the common
//! smoothed formulation: `tf * (ln((1 + n) / (1 + df)) + 1)`, rows L2-normalized.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analyzer::Tokenizer;

/// Sparse row as `(column, weight)` pairs sorted by column.
pub type TermWeights = Vec<(usize, f64)>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Learn vocabulary and IDF from `documents`. Columns are assigned in
    /// lexicographic term order so the layout is independent of input order.
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
        let mut tokenizer = Tokenizer::new();
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenizer.tokens(d.as_ref())).collect();
        Self::fit_tokens(&tokenized)
    }

    fn fit_tokens(tokenized: &[Vec<String>]) -> Self {
        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in tokenized {
            let unique: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let n = tokenized.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(doc_freq.len());
        for (col, (term, df)) in doc_freq.into_iter().enumerate() {
            vocabulary.insert(term.to_string(), col);
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
        }

        if vocabulary.is_empty() {
            warn!(documents = tokenized.len(), "corpus has no terms after stop-word removal; lexical block is empty");
        } else {
            debug!(documents = tokenized.len(), vocabulary = vocabulary.len(), "tf-idf vocabulary fitted");
        }
        Self { vocabulary, idf }
    }

    pub fn fit_transform<S: AsRef<str>>(documents: &[S]) -> (Self, Vec<TermWeights>) {
        let mut tokenizer = Tokenizer::new();
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenizer.tokens(d.as_ref())).collect();
        let vectorizer = Self::fit_tokens(&tokenized);
        let rows = tokenized.iter().map(|tokens| vectorizer.weigh(tokens)).collect();
        (vectorizer, rows)
    }

    /// Project documents into the fitted space. Unknown terms are ignored.
    pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Vec<TermWeights> {
        let mut tokenizer = Tokenizer::new();
        documents.iter().map(|d| self.weigh(&tokenizer.tokens(d.as_ref()))).collect()
    }

    fn weigh(&self, tokens: &[String]) -> TermWeights {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for token in tokens {
            if let Some(&col) = self.vocabulary.get(token) {
                *counts.entry(col).or_insert(0.0) += 1.0;
            }
        }
        let mut row: TermWeights = counts.into_iter().map(|(col, tf)| (col, tf * self.idf[col])).collect();
        let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut row { *w /= norm; }
        }
        row
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn column_of(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.column_of(term).map(|c| self.idf[c])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idf_is_smoothed() {
        let docs = ["DrugA Pain", "DrugB Pain", "DrugC Allergy"];
        let v = TfidfVectorizer::fit(&docs);
        assert_eq!(v.vocabulary_size(), 5);
        let pain = v.idf("pain").unwrap();
        let allergy = v.idf("allergy").unwrap();
        assert!((pain - ((4.0f64 / 3.0).ln() + 1.0)).abs() < 1e-12);
        assert!((allergy - (2.0f64.ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn rows_are_unit_length_and_sorted() {
        let (_, rows) = TfidfVectorizer::fit_transform(&["zoloft depression depression", "prozac depression"]);
        for row in &rows {
            let norm: f64 = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-12);
            assert!(row.windows(2).all(|p| p[0].0 < p[1].0));
        }
    }

    #[test]
    fn stop_word_only_corpus_is_empty_not_error() {
        let (v, rows) = TfidfVectorizer::fit_transform(&["the and", "of it"]);
        assert_eq!(v.vocabulary_size(), 0);
        assert!(rows.iter().all(Vec::is_empty));
    }

    #[test]
    fn transform_ignores_unknown_terms() {
        let v = TfidfVectorizer::fit(&["metformin diabetes"]);
        let rows = v.transform(&["insulin diabetes"]);
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0][0].0, v.column_of("diabetes").unwrap());
    }
}
