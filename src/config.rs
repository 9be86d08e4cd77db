// SYNOID YTP Configuration Model
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Loads `config.json` describing which effect families may fire and how
// likely they are. A missing file is materialized with defaults; a malformed
// one degrades to defaults with a warning. Unknown keys survive a round trip
// in the order they were declared.

use crate::chain::family::{EffectFamily, CHAIN_ORDER};
use crate::error::{Result, YtpError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Per-family entry in the `effects` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EffectDescriptor {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    /// Family-specific parameters and any keys we don't know about.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

fn default_enabled() -> bool {
    true
}

impl EffectDescriptor {
    pub fn for_family(family: EffectFamily) -> Self {
        let mut params = Map::new();
        if family == EffectFamily::Invert {
            params.insert("max_level".to_string(), Value::from(1));
        }
        Self {
            enabled: true,
            probability: Some(family.default_probability()),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    #[serde(default = "default_sources_dir")]
    pub sources: PathBuf,
    #[serde(default = "default_assets_dir")]
    pub assets: PathBuf,
    #[serde(default = "default_temp_dir")]
    pub temp: PathBuf,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_sources_dir() -> PathBuf {
    PathBuf::from("sources")
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("temp")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            sources: default_sources_dir(),
            assets: default_assets_dir(),
            temp: default_temp_dir(),
            extra: Map::new(),
        }
    }
}

/// Directories with relative entries joined onto the project root.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPaths {
    pub sources: PathBuf,
    pub assets: PathBuf,
    pub temp: PathBuf,
}

/// The whole `config.json` document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_effects")]
    pub effects: IndexMap<String, EffectDescriptor>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_effects() -> IndexMap<String, EffectDescriptor> {
    CHAIN_ORDER
        .iter()
        .map(|f| (f.name().to_string(), EffectDescriptor::for_family(*f)))
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            effects: default_effects(),
            paths: PathsConfig::default(),
            extra: Map::new(),
        }
    }
}

impl Config {
    /// Strict parse. Callers that want the degrade-to-defaults behaviour
    /// should go through [`Config::load_or_materialize`].
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| YtpError::Configuration {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load the configuration at `path`, writing defaults there first if the
    /// file does not exist. Never fails: any problem falls back to defaults.
    pub fn load_or_materialize(path: &Path) -> Self {
        if !path.exists() {
            let config = Self::default();
            match config.save(path) {
                Ok(()) => info!("[CONFIG] Wrote default configuration to {:?}", path),
                Err(e) => warn!("[CONFIG] Could not materialize {:?}: {}", path, e),
            }
            return config;
        }

        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                warn!("[CONFIG] Could not read {:?}: {}. Using defaults.", path, e);
                return Self::default();
            }
        };

        match Self::parse(&text, path) {
            Ok(config) => {
                debug!("[CONFIG] Loaded {} effect entries from {:?}", config.effects.len(), path);
                config
            }
            Err(e) => {
                warn!("[CONFIG] {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Effective settings for one family. Families absent from the file get
    /// their built-in defaults.
    pub fn effect(&self, family: EffectFamily) -> EffectSettings {
        let (enabled, probability, params) = match self.effects.get(family.name()) {
            Some(d) => (
                d.enabled,
                d.probability.unwrap_or_else(|| family.default_probability()),
                d.params.clone(),
            ),
            None => (true, family.default_probability(), Map::new()),
        };

        let clamped = if probability.is_nan() {
            warn!("[CONFIG] {} probability is NaN, treating as 0", family);
            0.0
        } else if !(0.0..=1.0).contains(&probability) {
            warn!("[CONFIG] {} probability {} outside [0, 1], clamping", family, probability);
            probability.clamp(0.0, 1.0)
        } else {
            probability
        };

        EffectSettings {
            family,
            enabled,
            probability: clamped,
            params,
        }
    }

    pub fn resolve_paths(&self, root: &Path) -> ResolvedPaths {
        ResolvedPaths {
            sources: root.join(&self.paths.sources),
            assets: root.join(&self.paths.assets),
            temp: root.join(&self.paths.temp),
        }
    }

    /// Transient copy with caller toggles applied. `self` is left untouched.
    pub fn with_overrides(&self, overrides: &EffectOverrides) -> Config {
        let mut config = self.clone();
        for (family, enabled) in &overrides.enabled {
            config
                .effects
                .entry(family.name().to_string())
                .or_insert_with(|| EffectDescriptor::for_family(*family))
                .enabled = *enabled;
        }
        for (family, probability) in &overrides.probability {
            config
                .effects
                .entry(family.name().to_string())
                .or_insert_with(|| EffectDescriptor::for_family(*family))
                .probability = Some(*probability);
        }
        config
    }
}

/// Resolved view of one family's descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectSettings {
    pub family: EffectFamily,
    pub enabled: bool,
    pub probability: f64,
    pub params: Map<String, Value>,
}

impl EffectSettings {
    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(Value::as_f64)
    }

    pub fn param_i64(&self, key: &str) -> Option<i64> {
        self.params.get(key).and_then(Value::as_i64)
    }

    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.params.get(key).and_then(Value::as_u64)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    /// Numeric list parameter; non-numeric entries are dropped.
    pub fn param_f64_list(&self, key: &str) -> Option<Vec<f64>> {
        self.params
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_f64).collect())
    }
}

/// Caller-supplied toggles layered over the loaded configuration for a
/// single render (GUI checkboxes, CLI flags).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectOverrides {
    pub enabled: BTreeMap<EffectFamily, bool>,
    pub probability: BTreeMap<EffectFamily, f64>,
}

impl EffectOverrides {
    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty() && self.probability.is_empty()
    }

    pub fn enable(mut self, family: EffectFamily) -> Self {
        self.enabled.insert(family, true);
        self
    }

    pub fn disable(mut self, family: EffectFamily) -> Self {
        self.enabled.insert(family, false);
        self
    }

    pub fn probability(mut self, family: EffectFamily, probability: f64) -> Self {
        self.probability.insert(family, probability);
        self
    }

    /// Disable every family not listed.
    pub fn only(mut self, families: &[EffectFamily]) -> Self {
        for family in CHAIN_ORDER {
            self.enabled.insert(family, families.contains(&family));
        }
        self
    }
}
