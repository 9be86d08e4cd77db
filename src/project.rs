// SYNOID YTP Project Snapshot
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// `last_project.json`: which sources were present and the effect table in
// force when the user saved.

use crate::config::{Config, EffectDescriptor};
use crate::error::Result;
use crate::sources;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const PROJECT_FILE: &str = "last_project.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectSnapshot {
    pub sources: Vec<String>,
    pub effects: IndexMap<String, EffectDescriptor>,
}

impl ProjectSnapshot {
    pub fn capture(config: &Config, sources_dir: &Path) -> Result<Self> {
        let sources = sources::list_sources(sources_dir)?
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        Ok(Self {
            sources,
            effects: config.effects.clone(),
        })
    }

    pub fn save(&self, project_root: &Path) -> Result<PathBuf> {
        fs::create_dir_all(project_root)?;
        let path = project_root.join(PROJECT_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!("[PROJECT] Snapshot saved: {:?}", path);
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_save_and_load() {
        let root = tempfile::tempdir().unwrap();
        let sources_dir = root.path().join("sources");
        fs::create_dir_all(&sources_dir).unwrap();
        fs::write(sources_dir.join("clip.mp4"), b"x").unwrap();

        let snapshot = ProjectSnapshot::capture(&Config::default(), &sources_dir).unwrap();
        assert_eq!(snapshot.sources, vec!["clip.mp4".to_string()]);

        let path = snapshot.save(root.path()).unwrap();
        assert_eq!(path, root.path().join(PROJECT_FILE));
        assert_eq!(ProjectSnapshot::load(&path).unwrap(), snapshot);
    }
}
