//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys split on `__`, e.g. `APP_RECOMMENDER__TOP_N`). Every key has a
//! built-in default, so all files are optional.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_in(Path::new("."))
    }

    /// Load `config.toml` and the env-specific overlay from `base_dir`.
    pub fn load_in(base_dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(base_dir, &env_name)
    }

    pub fn load_for_env(base_dir: &Path, env_name: &str) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::file(base_dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(base_dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base_dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base_dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, base_dir: base_dir.to_path_buf() };
        config.settings()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment, base_dir: &Path) -> Self {
        Self { figment, base_dir: base_dir.to_path_buf() }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    /// Typed view of the whole configuration, validated.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub recommender: RecommenderSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.recommender.validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub dataset_path: Option<String>,
    pub snapshot_path: Option<String>,
    pub delimiter: Delimiter,
}

impl DataSettings {
    pub fn dataset_path(&self, base: &Path) -> Option<PathBuf> {
        self.dataset_path.as_ref().map(|p| resolve_with_base(base, p))
    }

    pub fn snapshot_path(&self, base: &Path) -> Option<PathBuf> {
        self.snapshot_path.as_ref().map(|p| resolve_with_base(base, p))
    }

    /// Apply explicit source paths over the configured ones. A dataset given
    /// without a snapshot drops the configured snapshot, which would otherwise
    /// shadow it.
    pub fn override_sources(&mut self, dataset: Option<&Path>, snapshot: Option<&Path>) {
        if let Some(p) = dataset {
            self.dataset_path = Some(p.to_string_lossy().into_owned());
            if snapshot.is_none() {
                self.snapshot_path = None;
            }
        }
        if let Some(p) = snapshot {
            self.snapshot_path = Some(p.to_string_lossy().into_owned());
        }
    }
}

/// Field separator of the raw dataset. `Auto` picks tab for `.tsv` files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    #[default]
    Auto,
    Comma,
    Tab,
}

impl Delimiter {
    pub fn byte_for(self, path: &Path) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
            Delimiter::Auto => match path.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
                _ => b',',
            },
        }
    }
}

/// How rows sharing a drug name collapse into one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// First row per name wins.
    #[default]
    First,
    /// First row's text, rating replaced by the mean over all rows of the name.
    MeanRating,
    /// No collapsing.
    KeepAll,
}

/// Whether similarities are scored per query or precomputed as a full matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityStrategy {
    #[default]
    OnDemand,
    Precomputed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderSettings {
    pub top_n: usize,
    pub snippet_chars: usize,
    pub score_decimals: u32,
    pub dedup: DedupPolicy,
    /// Multiplier on the scaled rating column. 1.0 weighs it like one lexical dimension.
    pub rating_weight: f64,
    pub strategy: SimilarityStrategy,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            top_n: 5,
            snippet_chars: 300,
            score_decimals: 3,
            dedup: DedupPolicy::First,
            rating_weight: 1.0,
            strategy: SimilarityStrategy::OnDemand,
        }
    }
}

impl RecommenderSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.rating_weight.is_finite() || self.rating_weight < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "recommender.rating_weight must be a finite non-negative number, got {}",
                self.rating_weight
            )));
        }
        if self.snippet_chars == 0 {
            return Err(Error::InvalidConfig("recommender.snippet_chars must be at least 1".to_string()));
        }
        if self.score_decimals > 9 {
            return Err(Error::InvalidConfig(format!(
                "recommender.score_decimals must be <= 9, got {}",
                self.score_decimals
            )));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
