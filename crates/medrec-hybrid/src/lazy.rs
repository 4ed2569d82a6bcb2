//! Build-on-first-request wrapper around `Recommender`.
//!
//! The first caller runs the builder while concurrent callers block on the
//! same cell; afterwards every caller shares the built instance without
//! locking. A failed build leaves the cell empty so a later call can retry.

use once_cell::sync::OnceCell;
use tracing::info;

use medrec_core::error::Result;
use medrec_core::types::Recommendation;

use crate::recommender::Recommender;

type Builder = Box<dyn Fn() -> Result<Recommender> + Send + Sync>;

pub struct LazyRecommender {
    cell: OnceCell<Recommender>,
    builder: Builder,
}

impl LazyRecommender {
    pub fn new<F>(builder: F) -> Self
    where
        F: Fn() -> Result<Recommender> + Send + Sync + 'static,
    {
        Self { cell: OnceCell::new(), builder: Box::new(builder) }
    }

    pub fn get(&self) -> Result<&Recommender> {
        self.cell.get_or_try_init(|| {
            info!("building recommender on first request");
            (self.builder)()
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn recommend(&self, drug_name: &str, top_n: usize) -> Result<Vec<Recommendation>> {
        self.get()?.recommend(drug_name, top_n)
    }
}
