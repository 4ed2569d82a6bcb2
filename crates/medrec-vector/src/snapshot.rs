//! Precomputed artifact: records, feature matrix and optionally the full
//! similarity matrix, stored as one JSON document.
//!
//! Writes go through a temp file in the destination directory and are renamed
//! into place, so readers never observe a half-written snapshot.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use medrec_core::error::{Error, Result};
use medrec_core::traits::SimilaritySource;
use medrec_core::types::DrugRecord;

use crate::features::FeatureMatrix;
use crate::similarity::SimilarityMatrix;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub records: Vec<DrugRecord>,
    pub features: FeatureMatrix,
    pub similarity: Option<SimilarityMatrix>,
}

impl Snapshot {
    pub fn new(records: Vec<DrugRecord>, features: FeatureMatrix, similarity: Option<SimilarityMatrix>) -> Result<Self> {
        let snapshot = Self { version: SNAPSHOT_VERSION, records, features, similarity };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Records, feature rows and similarity rows must be index-aligned.
    pub fn validate(&self) -> Result<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(Error::Initialization(format!(
                "unsupported snapshot version {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        if self.records.is_empty() {
            return Err(Error::Initialization("snapshot contains no records".to_string()));
        }
        if let Some(bad) = self.records.iter().find(|r| !r.rating.is_finite()) {
            return Err(Error::Initialization(format!("snapshot record {:?} has a non-finite rating", bad.name)));
        }
        self.features.validate()?;
        if self.features.rows() != self.records.len() {
            return Err(Error::Initialization(format!(
                "snapshot has {} records but {} feature rows",
                self.records.len(),
                self.features.rows()
            )));
        }
        if let Some(sim) = &self.similarity {
            sim.validate()?;
            if sim.rows() != self.records.len() {
                return Err(Error::Initialization(format!(
                    "snapshot has {} records but a {}-row similarity matrix",
                    self.records.len(),
                    sim.rows()
                )));
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        info!(path = %path.display(), records = self.records.len(), precomputed = self.similarity.is_some(), "snapshot written");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::Initialization(format!("cannot open snapshot {}: {}", path.display(), e)))?;
        let snapshot: Snapshot = serde_json::from_reader(BufReader::new(file))?;
        snapshot.validate()?;
        info!(path = %path.display(), records = snapshot.records.len(), "snapshot loaded");
        Ok(snapshot)
    }
}
