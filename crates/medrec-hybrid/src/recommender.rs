use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use medrec_core::config::{RecommenderSettings, Settings, SimilarityStrategy};
use medrec_core::dataset::DatasetLoader;
use medrec_core::error::{Error, Result};
use medrec_core::record_store::RecordStore;
use medrec_core::traits::SimilaritySource;
use medrec_core::types::{DrugRecord, Recommendation, ScoredIndex};
use medrec_vector::{CosineScorer, FeatureBuilder, FeatureMatrix, SimilarityMatrix, Snapshot};

use crate::selector::select;

const ELLIPSIS: &str = "...";

enum Scoring {
    OnDemand(CosineScorer),
    Precomputed(SimilarityMatrix),
}

impl Scoring {
    fn source(&self) -> &dyn SimilaritySource {
        match self {
            Scoring::OnDemand(s) => s,
            Scoring::Precomputed(m) => m,
        }
    }
}

/// Read-only recommendation context: record store, feature matrix and a
/// similarity source, built once and shared across queries.
pub struct Recommender {
    store: RecordStore,
    features: Arc<FeatureMatrix>,
    scoring: Scoring,
    settings: RecommenderSettings,
}

impl Recommender {
    /// Group `records` per the dedup policy, then build features and scoring.
    pub fn build(records: Vec<DrugRecord>, settings: &RecommenderSettings) -> Result<Self> {
        settings.validate()?;
        let store = RecordStore::build(records, settings.dedup)?;
        Self::from_store(store, settings)
    }

    fn from_store(store: RecordStore, settings: &RecommenderSettings) -> Result<Self> {
        let features = Arc::new(FeatureBuilder::from_settings(settings).build(store.records())?);
        let scoring = match settings.strategy {
            SimilarityStrategy::OnDemand => Scoring::OnDemand(CosineScorer::new(features.clone())),
            SimilarityStrategy::Precomputed => Scoring::Precomputed(SimilarityMatrix::compute(&features)),
        };
        Ok(Self { store, features, scoring, settings: settings.clone() })
    }

    /// Skip feature building. A stored similarity matrix is used as is;
    /// without one, scoring follows `settings.strategy`.
    ///
    /// Features stored with a different `rating_weight` than `settings` are
    /// rebuilt from the snapshot's records, and any stored matrix is dropped.
    pub fn from_snapshot(snapshot: Snapshot, settings: &RecommenderSettings) -> Result<Self> {
        settings.validate()?;
        snapshot.validate()?;
        let Snapshot { records, features, similarity, .. } = snapshot;
        let stored_weight = features.rating_weight();
        if (stored_weight - settings.rating_weight).abs() > f64::EPSILON {
            warn!(
                stored = stored_weight,
                configured = settings.rating_weight,
                "snapshot rating weight differs from configuration; rebuilding features"
            );
            return Self::from_store(RecordStore::from_deduplicated(records), settings);
        }
        let features = Arc::new(features);
        let scoring = match (similarity, settings.strategy) {
            (Some(matrix), _) => Scoring::Precomputed(matrix),
            (None, SimilarityStrategy::Precomputed) => Scoring::Precomputed(SimilarityMatrix::compute(&features)),
            (None, SimilarityStrategy::OnDemand) => Scoring::OnDemand(CosineScorer::new(features.clone())),
        };
        let store = RecordStore::from_deduplicated(records);
        info!(records = store.len(), "recommender restored from snapshot");
        Ok(Self { store, features, scoring, settings: settings.clone() })
    }

    /// Prefer the configured snapshot when it exists, else load and build from the dataset.
    pub fn initialize(settings: &Settings, base_dir: &Path) -> Result<Self> {
        if let Some(path) = settings.data.snapshot_path(base_dir).filter(|p| p.exists()) {
            return Self::from_snapshot(Snapshot::load(&path)?, &settings.recommender);
        }
        let path = settings
            .data
            .dataset_path(base_dir)
            .ok_or_else(|| Error::Initialization("no dataset_path or snapshot_path configured".to_string()))?;
        let (records, _) = DatasetLoader::new(settings.data.delimiter).load(&path)?;
        Self::build(records, &settings.recommender)
    }

    /// Capture the built state. With `include_similarity`, the full matrix is
    /// stored (computed now if this instance scores on demand).
    pub fn snapshot(&self, include_similarity: bool) -> Result<Snapshot> {
        let similarity = match (&self.scoring, include_similarity) {
            (_, false) => None,
            (Scoring::Precomputed(m), true) => Some(m.clone()),
            (Scoring::OnDemand(_), true) => Some(SimilarityMatrix::compute(&self.features)),
        };
        Snapshot::new(self.store.records().to_vec(), (*self.features).clone(), similarity)
    }

    /// Up to `top_n` drugs most similar to `drug_name`, best first.
    ///
    /// The query row is excluded by index, and so are other rows carrying the
    /// same name (only present when the store keeps duplicate names).
    pub fn recommend(&self, drug_name: &str, top_n: usize) -> Result<Vec<Recommendation>> {
        let query = self.store.require(drug_name)?;
        let query_key = self.record(query)?.name_key();
        let scores = self.scoring.source().scores(query)?;

        let same_name = |index: usize| self.store.get(index).is_some_and(|r| r.name_key() == query_key);
        let out = select(&scores, query, top_n, |index| !same_name(index))
            .into_iter()
            .map(|ScoredIndex { index, score }| {
                let record = self.record(index)?;
                Ok(Recommendation {
                    drug_name: record.name.clone(),
                    condition: record.condition.clone(),
                    rating: record.rating,
                    review_snippet: snippet(&record.review, self.settings.snippet_chars),
                    similarity_score: round_to(score, self.settings.score_decimals),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(query = drug_name, index = query, returned = out.len(), "recommendations ranked");
        Ok(out)
    }

    pub fn recommend_default(&self, drug_name: &str) -> Result<Vec<Recommendation>> {
        self.recommend(drug_name, self.settings.top_n)
    }

    pub fn names(&self) -> Vec<String> {
        self.store.names()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn features(&self) -> &FeatureMatrix {
        &self.features
    }

    pub fn settings(&self) -> &RecommenderSettings {
        &self.settings
    }

    pub fn is_precomputed(&self) -> bool {
        matches!(self.scoring, Scoring::Precomputed(_))
    }

    fn record(&self, index: usize) -> Result<&DrugRecord> {
        self.store
            .get(index)
            .ok_or_else(|| Error::Initialization(format!("similarity row {} has no record", index)))
    }
}

/// First `max_chars` characters of `review`, suffixed with "..." when cut.
pub fn snippet(review: &str, max_chars: usize) -> String {
    match review.char_indices().nth(max_chars) {
        Some((byte, _)) => format!("{}{}", &review[..byte], ELLIPSIS),
        None => review.to_string(),
    }
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
