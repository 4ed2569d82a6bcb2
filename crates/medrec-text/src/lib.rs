//! medrec-text
//!
//! Lexical side of the feature pipeline: a stop-word filtering analyzer built on
//! Tantivy's tokenizer chain and a corpus-global TF-IDF vectorizer.

pub mod analyzer;
pub mod tfidf;

pub use analyzer::{build_analyzer, tokenize, Tokenizer};
pub use tfidf::{TermWeights, TfidfVectorizer};
