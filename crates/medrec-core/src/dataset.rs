//! Reads the raw drug review corpus into `DrugRecord`s.
//!
//! Expects a header row with at least `drugName`, `condition`, `review` and
//! `rating`. Other columns (`uniqueID`, `date`, `usefulCount`, ...) are ignored.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::Delimiter;
use crate::error::{Error, Result};
use crate::types::DrugRecord;

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "drugName")]
    drug_name: Option<String>,
    condition: Option<String>,
    review: Option<String>,
    rating: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_skipped: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetLoader {
    delimiter: Delimiter,
}

impl DatasetLoader {
    pub fn new(delimiter: Delimiter) -> Self {
        Self { delimiter }
    }

    pub fn load(&self, path: &Path) -> Result<(Vec<DrugRecord>, LoadReport)> {
        let file = File::open(path)
            .map_err(|e| Error::Initialization(format!("cannot open dataset {}: {}", path.display(), e)))?;
        info!(path = %path.display(), "loading drug dataset");
        self.load_reader(file, self.delimiter.byte_for(path))
    }

    pub fn load_reader<R: Read>(&self, reader: R, delimiter: u8) -> Result<(Vec<DrugRecord>, LoadReport)> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        for required in ["drugName", "condition", "review", "rating"] {
            if !headers.iter().any(|h| h.trim() == required) {
                return Err(Error::Dataset(format!("missing required column '{}'", required)));
            }
        }

        let mut records = Vec::new();
        let mut report = LoadReport::default();
        for (line, row) in rdr.deserialize::<RawRow>().enumerate() {
            report.rows_read += 1;
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(row = line + 1, error = %e, "skipping unreadable row");
                    report.rows_skipped += 1;
                    continue;
                }
            };
            match into_record(row) {
                Some(record) => records.push(record),
                None => {
                    warn!(row = line + 1, "skipping row without drug name or finite rating");
                    report.rows_skipped += 1;
                }
            }
        }

        if records.is_empty() {
            return Err(Error::Initialization(format!(
                "dataset yielded no usable rows ({} read, {} skipped)",
                report.rows_read, report.rows_skipped
            )));
        }
        info!(records = records.len(), skipped = report.rows_skipped, "dataset loaded");
        Ok((records, report))
    }
}

fn into_record(row: RawRow) -> Option<DrugRecord> {
    let name = clean_text(row.drug_name.as_deref().unwrap_or(""));
    if name.is_empty() {
        return None;
    }
    let rating: f64 = row.rating.as_deref()?.trim().parse().ok()?;
    if !rating.is_finite() {
        return None;
    }
    Some(DrugRecord {
        name,
        condition: clean_text(row.condition.as_deref().unwrap_or("")),
        review: clean_text(row.review.as_deref().unwrap_or("")),
        rating,
    })
}

/// Trim whitespace and wrapping quotes, decode the entities scraped reviews carry.
pub fn clean_text(raw: &str) -> String {
    let mut s = raw.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s = s[1..s.len() - 1].trim();
    }
    s.replace("&#039;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
