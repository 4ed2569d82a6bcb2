use serde::{Deserialize, Serialize};

/// Value assigned to every sample when the fitted range is zero.
pub const ZERO_VARIANCE_VALUE: f64 = 0.0;

/// Min-max scaling fitted once on the whole corpus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub min: f64,
    pub max: f64,
}

impl MinMaxScaler {
    pub fn fit(values: &[f64]) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if values.is_empty() { Self { min: 0.0, max: 0.0 } } else { Self { min, max } }
    }

    pub fn is_degenerate(&self) -> bool {
        self.max <= self.min
    }

    pub fn transform(&self, value: f64) -> f64 {
        if self.is_degenerate() { ZERO_VARIANCE_VALUE } else { (value - self.min) / (self.max - self.min) }
    }
}
