use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::DatapagesError;

pub const GLOBAL_CONFIG_ENV: &str = "DATAPAGES_GLOBAL_CONFIG";

const MANDATORY_KEYS: [&str; 7] = [
    "DATAPAGES_VRTRACK_HOST",
    "DATAPAGES_VRTRACK_PORT",
    "DATAPAGES_VRTRACK_RO_USER",
    "DATAPAGES_SEQUENCESCAPE_HOST",
    "DATAPAGES_SEQUENCESCAPE_PORT",
    "DATAPAGES_SEQUENCESCAPE_RO_USER",
    "DATAPAGES_SEQUENCESCAPE_DATABASE",
];

const OPTIONAL_KEYS: [&str; 3] = [
    "DATAPAGES_LOAD_CACHE_PATH",
    "DATAPAGES_SAVE_CACHE_PATH",
    "DATAPAGES_SITE_DATA_DIR",
];

/// Connection details for one read-only database endpoint. The tracking
/// endpoint leaves `database` unset; the domain config names the tracking
/// databases to union.
#[derive(Debug, Clone)]
pub struct DbDetails {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GlobalConfig {
    pub tracking: DbDetails,
    pub registry: DbDetails,
    pub load_cache_path: Option<Utf8PathBuf>,
    pub save_cache_path: Option<Utf8PathBuf>,
    pub site_data_dir: Option<Utf8PathBuf>,
}

impl GlobalConfig {
    /// Resolves the global config. Every key can come from the environment
    /// or from a JSON config file, the environment winning; missing
    /// mandatory keys are reported together and abort the run before any
    /// fetch happens.
    pub fn resolve(path: Option<&Utf8Path>) -> Result<Self, DatapagesError> {
        let config_path = match path {
            Some(path) => Some(path.to_owned()),
            None => default_config_path(),
        };
        let explicit = path.is_some();

        let from_file = match &config_path {
            Some(config_path) => load_config_file(config_path, explicit)?,
            None => BTreeMap::new(),
        };

        let lookup = |key: &str| -> Option<String> {
            std::env::var(key).ok().or_else(|| from_file.get(key).cloned())
        };

        let mut values = BTreeMap::new();
        let mut missing = Vec::new();
        for key in MANDATORY_KEYS {
            match lookup(key) {
                Some(value) => {
                    values.insert(key, value);
                }
                None => missing.push(key),
            }
        }
        if !missing.is_empty() {
            return Err(DatapagesError::MissingConfigKeys(format_missing(&missing)));
        }
        for key in OPTIONAL_KEYS {
            if let Some(value) = lookup(key) {
                values.insert(key, value);
            }
        }

        let parse_port = |key: &str| -> Result<u16, DatapagesError> {
            values[key]
                .parse::<u16>()
                .map_err(|_| DatapagesError::ConfigParse(format!("{key} is not a port number")))
        };

        Ok(Self {
            tracking: DbDetails {
                host: values["DATAPAGES_VRTRACK_HOST"].clone(),
                port: parse_port("DATAPAGES_VRTRACK_PORT")?,
                user: values["DATAPAGES_VRTRACK_RO_USER"].clone(),
                database: None,
            },
            registry: DbDetails {
                host: values["DATAPAGES_SEQUENCESCAPE_HOST"].clone(),
                port: parse_port("DATAPAGES_SEQUENCESCAPE_PORT")?,
                user: values["DATAPAGES_SEQUENCESCAPE_RO_USER"].clone(),
                database: Some(values["DATAPAGES_SEQUENCESCAPE_DATABASE"].clone()),
            },
            load_cache_path: values
                .get("DATAPAGES_LOAD_CACHE_PATH")
                .map(Utf8PathBuf::from),
            save_cache_path: values
                .get("DATAPAGES_SAVE_CACHE_PATH")
                .map(Utf8PathBuf::from),
            site_data_dir: values.get("DATAPAGES_SITE_DATA_DIR").map(Utf8PathBuf::from),
        })
    }
}

fn default_config_path() -> Option<Utf8PathBuf> {
    if let Ok(path) = std::env::var(GLOBAL_CONFIG_ENV) {
        return Some(Utf8PathBuf::from(path));
    }
    BaseDirs::new().and_then(|dirs| {
        Utf8PathBuf::from_path_buf(dirs.home_dir().join(".datapages_global_config.json")).ok()
    })
}

fn load_config_file(
    path: &Utf8Path,
    explicit: bool,
) -> Result<BTreeMap<String, String>, DatapagesError> {
    let content = match fs::read_to_string(path.as_std_path()) {
        Ok(content) => content,
        Err(_) if !explicit => {
            warn!("could not load config from {path}, using environment variables");
            return Ok(BTreeMap::new());
        }
        Err(_) => return Err(DatapagesError::ConfigRead(PathBuf::from(path.as_str()))),
    };
    let parsed: BTreeMap<String, Value> = serde_json::from_str(&content)
        .map_err(|err| DatapagesError::ConfigParse(err.to_string()))?;
    Ok(parsed
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(text) => Some((key, text)),
            Value::Number(number) => Some((key, number.to_string())),
            Value::Bool(flag) => Some((key, flag.to_string())),
            _ => None,
        })
        .collect())
}

fn format_missing(missing: &[&str]) -> String {
    match missing.split_last() {
        Some((last, [])) => last.to_string(),
        Some((last, head)) => format!("{} and {last}", head.join(", ")),
        None => String::new(),
    }
}

/// One domain of the site: a named group of species served from a set of
/// tracking databases, with per-species display config. Description and
/// link fields hold pre-rendered HTML.
#[derive(Debug, Deserialize)]
pub struct DomainConfig {
    pub metadata: DomainMetadata,
    #[serde(default)]
    pub databases: Vec<String>,
    #[serde(default)]
    species: BTreeMap<String, SpeciesEntry>,
}

#[derive(Debug, Deserialize)]
pub struct DomainMetadata {
    pub name: String,
    pub title: String,
    #[serde(rename = "type", default = "unknown_type")]
    pub domain_type: String,
    #[serde(default)]
    pub list_data: bool,
    #[serde(default)]
    pub description: String,
}

fn unknown_type() -> String {
    "unknown".to_string()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SpeciesEntry {
    show: Option<bool>,
    aliases: Vec<String>,
    description: String,
    published_data_description: String,
    pubmed_ids: Vec<u64>,
    links: String,
}

impl DomainConfig {
    pub fn load(path: &Utf8Path) -> Result<Self, DatapagesError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|_| DatapagesError::ConfigRead(PathBuf::from(path.as_str())))?;
        serde_json::from_str(&content).map_err(|err| DatapagesError::ConfigParse(err.to_string()))
    }

    /// Species names in sorted order.
    pub fn species_list(&self) -> Vec<&str> {
        self.species.keys().map(String::as_str).collect()
    }

    pub fn is_visible(&self, species: &str) -> bool {
        self.species
            .get(species)
            .and_then(|entry| entry.show)
            .unwrap_or(true)
    }

    pub fn aliases(&self, species: &str) -> &[String] {
        self.species
            .get(species)
            .map(|entry| entry.aliases.as_slice())
            .unwrap_or(&[])
    }

    pub fn description(&self, species: &str) -> &str {
        self.species
            .get(species)
            .map(|entry| entry.description.as_str())
            .unwrap_or("")
    }

    pub fn published_data_description(&self, species: &str) -> &str {
        self.species
            .get(species)
            .map(|entry| entry.published_data_description.as_str())
            .unwrap_or("")
    }

    pub fn pubmed_ids(&self, species: &str) -> &[u64] {
        self.species
            .get(species)
            .map(|entry| entry.pubmed_ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn links(&self, species: &str) -> &str {
        self.species
            .get(species)
            .map(|entry| entry.links.as_str())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_config_defaults() {
        let config: DomainConfig = serde_json::from_str(
            r#"{
                "metadata": {"name": "bacteria", "title": "Bacteria"},
                "databases": ["prok_track"],
                "species": {
                    "Escherichia": {"aliases": ["E. coli"]},
                    "Yersinia": {"show": false}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.metadata.domain_type, "unknown");
        assert!(!config.metadata.list_data);
        assert_eq!(config.species_list(), vec!["Escherichia", "Yersinia"]);
        assert!(config.is_visible("Escherichia"));
        assert!(!config.is_visible("Yersinia"));
        assert_eq!(config.aliases("Escherichia"), ["E. coli".to_string()]);
        assert_eq!(config.description("Escherichia"), "");
    }

    #[test]
    fn format_missing_lists_keys() {
        assert_eq!(format_missing(&["A"]), "A");
        assert_eq!(format_missing(&["A", "B", "C"]), "A, B and C");
    }
}
