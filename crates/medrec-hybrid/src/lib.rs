//! medrec-hybrid
//!
//! Blends the lexical and rating signals into ranked recommendations. Owns the
//! `Recommender` context that UI, CLI and API adapters call into.

pub mod lazy;
pub mod recommender;
pub mod selector;

pub use lazy::LazyRecommender;
pub use recommender::Recommender;
pub use selector::{rank, select};
