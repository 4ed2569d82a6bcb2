//! Deduplicated, read-only drug table with case-insensitive name lookup.

use std::collections::HashMap;

use tracing::info;

use crate::config::DedupPolicy;
use crate::error::{Error, Result};
use crate::types::{name_key, DrugRecord, RecordIndex};

#[derive(Debug, Clone)]
pub struct RecordStore {
    records: Vec<DrugRecord>,
    by_name: HashMap<String, RecordIndex>,
}

impl RecordStore {
    /// Collapse `records` according to `policy`. An empty input cannot serve
    /// any query and is rejected, as is any row with a NaN or infinite rating.
    pub fn build(records: Vec<DrugRecord>, policy: DedupPolicy) -> Result<Self> {
        if records.is_empty() {
            return Err(Error::Initialization("dataset contains no drug records".to_string()));
        }
        if let Some((row, bad)) = records.iter().enumerate().find(|(_, r)| !r.rating.is_finite()) {
            return Err(Error::Initialization(format!(
                "record {} ({:?}) has non-finite rating {}",
                row, bad.name, bad.rating
            )));
        }
        let input_rows = records.len();
        let records = match policy {
            DedupPolicy::KeepAll => records,
            DedupPolicy::First => dedup_first(records),
            DedupPolicy::MeanRating => dedup_mean_rating(records),
        };
        info!(input_rows, records = records.len(), ?policy, "record store built");
        Ok(Self::from_deduplicated(records))
    }

    /// Wrap rows that were already grouped upstream (e.g. from a snapshot).
    pub fn from_deduplicated(records: Vec<DrugRecord>) -> Self {
        let mut by_name = HashMap::with_capacity(records.len());
        for (i, r) in records.iter().enumerate() {
            by_name.entry(r.name_key()).or_insert(i);
        }
        Self { records, by_name }
    }

    /// First row whose name matches `name` ignoring case and surrounding whitespace.
    pub fn lookup(&self, name: &str) -> Option<RecordIndex> {
        self.by_name.get(&name_key(name)).copied()
    }

    pub fn require(&self, name: &str) -> Result<RecordIndex> {
        self.lookup(name).ok_or_else(|| Error::NotFound(format!("no drug named '{}'", name.trim())))
    }

    pub fn get(&self, index: RecordIndex) -> Option<&DrugRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[DrugRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every distinct drug name, sorted case-insensitively.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_name.values().map(|&i| self.records[i].name.clone()).collect();
        names.sort_by(|a, b| name_key(a).cmp(&name_key(b)).then_with(|| a.cmp(b)));
        names
    }
}

fn dedup_first(records: Vec<DrugRecord>) -> Vec<DrugRecord> {
    let mut seen = std::collections::HashSet::new();
    records.into_iter().filter(|r| seen.insert(r.name_key())).collect()
}

fn dedup_mean_rating(records: Vec<DrugRecord>) -> Vec<DrugRecord> {
    let mut slot: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<DrugRecord> = Vec::new();
    let mut sums: Vec<(f64, usize)> = Vec::new();
    for r in records {
        match slot.get(&r.name_key()) {
            Some(&i) => {
                sums[i].0 += r.rating;
                sums[i].1 += 1;
            }
            None => {
                slot.insert(r.name_key(), out.len());
                sums.push((r.rating, 1));
                out.push(r);
            }
        }
    }
    for (r, (sum, n)) in out.iter_mut().zip(sums) {
        r.rating = sum / n as f64;
    }
    out
}
