//! Run configuration, loaded from an optional JSON file.

use crate::error::Result;
use crate::loader::NormalizeOptions;
use crate::types::Filter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub dedupe: bool,
    pub top_n: usize,
    pub preview_rows: usize,
    pub log_level: String,
    pub log_format: LogFormat,
    pub filter: Filter,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input: PathBuf::from("Superstore.csv"),
            output_dir: PathBuf::from("."),
            dedupe: false,
            top_n: 10,
            preview_rows: 5,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            filter: Filter::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            dedupe: self.dedupe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_defaults_fill_missing_keys() {
        let cfg = Config::from_json(r#"{ "top_n": 3 }"#).unwrap();
        assert_eq!(cfg.top_n, 3);
        assert_eq!(cfg.input, PathBuf::from("Superstore.csv"));
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert!(cfg.filter.is_empty());
        assert!(!cfg.normalize_options().dedupe);
    }

    #[test]
    fn test_filter_section() {
        let cfg = Config::from_json(
            r#"{
                "dedupe": true,
                "log_format": "json",
                "filter": { "start": "2014-01-01", "end": "2014-12-31", "region": "West" }
            }"#,
        )
        .unwrap();
        assert!(cfg.dedupe);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.filter.start, NaiveDate::from_ymd_opt(2014, 1, 1));
        assert_eq!(cfg.filter.region.as_deref(), Some("West"));
        assert_eq!(cfg.filter.category, None);
    }

    #[test]
    fn test_malformed_json() {
        assert!(Config::from_json("{ nope").is_err());
    }
}
