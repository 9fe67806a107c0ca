use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::store::{TableNames, DEFAULT_TABLE};

pub const DEFAULT_OVERPASS_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub store: StoreConfig,
    pub overpass: OverpassConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    /// Directory holding the shapefile
    pub dir: PathBuf,
    pub base_name: String,
    /// Attribute holding the zone name; first field when unset
    pub name_field: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("tz_world"),
            base_name: "tz_world_mp".to_string(),
            name_field: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub table: String,
    pub batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            batch_size: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OverpassConfig {
    pub endpoint: String,
    pub timeout_secs: u32,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OVERPASS_ENDPOINT.to_string(),
            timeout_secs: 25,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        Self::parse(&content)
    }

    /// Load from `path`, or use defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        config.table_names()?;
        Ok(config)
    }

    pub fn table_names(&self) -> Result<TableNames> {
        TableNames::new(&self.store.table).context("Invalid store table name")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.source.dir, PathBuf::from("tz_world"));
        assert_eq!(config.source.base_name, "tz_world_mp");
        assert!(config.source.name_field.is_none());
        assert_eq!(config.store.table, "tztools_tz0");
        assert_eq!(config.overpass.timeout_secs, 25);
    }

    #[test]
    fn test_partial_override() {
        let config = Config::parse(
            r#"
            [source]
            dir = "/data/tz"
            name_field = "TZID"

            [store]
            table = "zones"
            batch_size = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.source.dir, PathBuf::from("/data/tz"));
        assert_eq!(config.source.base_name, "tz_world_mp");
        assert_eq!(config.source.name_field.as_deref(), Some("TZID"));
        assert_eq!(config.store.batch_size, 50);
        assert_eq!(config.table_names().unwrap().index(), "zones_bounds");
        assert_eq!(config.overpass.endpoint, DEFAULT_OVERPASS_ENDPOINT);
    }

    #[test]
    fn test_invalid_table_rejected() {
        assert!(Config::parse("[store]\ntable = \"tz; drop\"").is_err());
    }
}
