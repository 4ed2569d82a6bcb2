//! Feature matrix construction and cosine similarity over it.
//!
//! `features` turns drug records into TF-IDF rows with a scaled rating column,
//! `similarity` scores rows either on demand or as a precomputed matrix, and
//! `snapshot` persists both so startup can skip the build.

pub mod features;
pub mod scaler;
pub mod similarity;
pub mod snapshot;

pub use features::{FeatureBuilder, FeatureMatrix};
pub use scaler::MinMaxScaler;
pub use similarity::{cosine, CosineScorer, SimilarityMatrix};
pub use snapshot::Snapshot;
