use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{CleanerError, Result};
use crate::pipeline::pipeline_config::PipelineConfig;
use crate::pipeline::processing::corrections::Corrections;

pub const DEFAULT_CONFIG_PATH: &str = "grant_cleaner.toml";

pub const ENV_SOURCE: &str = "GRANT_CLEANER_SOURCE";
pub const ENV_OUTPUT: &str = "GRANT_CLEANER_OUTPUT";
pub const ENV_AS_OF: &str = "GRANT_CLEANER_AS_OF";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub schema: SchemaConfig,
    pub sentinels: SentinelConfig,
    pub derive: DeriveConfig,
    pub corrections: Corrections,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Local path or http(s) URL of the raw CSV
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("output/cleaned.csv"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Column names removed after header trimming, when present. An entry
    /// of the form `Unnamed: N` also matches a blank header at position N,
    /// since that is how spreadsheet exports name blank headers.
    pub junk_columns: Vec<String>,
    /// Also remove columns with an empty or `Unnamed: N` header whose cells are all empty
    pub drop_empty_unnamed: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            junk_columns: vec!["Unnamed: 30".to_string(), "Unnamed: 31".to_string()],
            drop_empty_unnamed: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    pub values: Vec<String>,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            values: vec![
                "Missing".to_string(),
                "Pending".to_string(),
                "Waiting on next statement".to_string(),
                String::new(),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeriveConfig {
    /// Reference date for age; today when unset
    pub as_of: Option<NaiveDate>,
}

impl DeriveConfig {
    pub fn as_of_or_today(&self) -> NaiveDate {
        self.as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

impl Config {
    /// Load configuration from `path`, or from `grant_cleaner.toml` when it
    /// exists, falling back to built-in defaults. Environment overrides are
    /// applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CleanerError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(source) = std::env::var(ENV_SOURCE) {
            if !source.trim().is_empty() {
                self.source.location = Some(source.trim().to_string());
            }
        }
        if let Ok(output) = std::env::var(ENV_OUTPUT) {
            if !output.trim().is_empty() {
                self.output.path = PathBuf::from(output.trim());
            }
        }
        if let Ok(as_of) = std::env::var(ENV_AS_OF) {
            let parsed = NaiveDate::parse_from_str(as_of.trim(), "%Y-%m-%d").map_err(|e| {
                CleanerError::Config(format!("{} must be YYYY-MM-DD, got '{}': {}", ENV_AS_OF, as_of, e))
            })?;
            self.derive.as_of = Some(parsed);
        }
        Ok(())
    }
}
