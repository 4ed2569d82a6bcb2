use crate::error::Result;
use crate::types::RecordIndex;

/// Scores one query row against every row of the corpus.
///
/// Implemented both by on-demand cosine scoring over the feature matrix and by
/// a precomputed similarity matrix. `scores(i)` has length `rows()` and includes
/// the query's own score.
pub trait SimilaritySource: Send + Sync {
    fn rows(&self) -> usize;

    fn scores(&self, query: RecordIndex) -> Result<Vec<f64>>;
}
