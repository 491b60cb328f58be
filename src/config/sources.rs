//! Source configuration file (`job_sources.yaml`) and its resolution into
//! the list of sources a run scrapes.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info, warn};

pub const LINKEDIN: &str = "linkedin";

fn enabled_by_default() -> bool {
    true
}

fn default_location() -> String {
    "Canada".to_string()
}

fn default_experience_level() -> String {
    "1".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub job_sources: BTreeMap<String, SourceEntry>,
    #[serde(default)]
    pub custom_urls: Vec<CustomTarget>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub search_params: SearchParams,
}

/// Search parameters for a structured source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_experience_level")]
    pub experience_level: String,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            location: default_location(),
            experience_level: default_experience_level(),
        }
    }
}

/// An arbitrary careers page scraped heuristically.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustomTarget {
    pub name: String,
    pub url: String,
    /// Used when the page does not name the employer on each card
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

/// A source resolved for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Structured { name: String, params: SearchParams },
    Heuristic(CustomTarget),
}

impl SourceSpec {
    /// Provenance tag stamped on postings from this source.
    pub fn tag(&self) -> String {
        match self {
            Self::Structured { name, .. } => name.clone(),
            Self::Heuristic(target) => format!("custom_{}", target.name),
        }
    }
}

impl SourcesConfig {
    /// Loads the sources file. A missing or malformed file is logged and
    /// yields an empty configuration, so the run proceeds without scraping.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                error!("Error loading config {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match Self::parse(&text) {
            Ok(config) => {
                info!("Loaded source configuration from {}", path.display());
                config
            }
            Err(e) => {
                error!("Error parsing config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes as unit, not as an empty mapping
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Enabled sources in run order: structured sources by name, then custom targets.
    pub fn resolve(&self) -> Vec<SourceSpec> {
        let mut specs = Vec::new();

        for (name, entry) in &self.job_sources {
            if !entry.enabled {
                continue;
            }
            if name == LINKEDIN {
                specs.push(SourceSpec::Structured {
                    name: name.clone(),
                    params: entry.search_params.clone(),
                });
            } else {
                warn!("Skipping unsupported job source: {}", name);
            }
        }

        specs.extend(
            self.custom_urls
                .iter()
                .filter(|target| target.enabled)
                .cloned()
                .map(SourceSpec::Heuristic),
        );

        specs
    }
}
