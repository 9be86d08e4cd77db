// SYNOID YTP Source Tools
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// The sources directory holds the user's input clips. Anything that is a
// regular, non-hidden file counts as a source.

use crate::error::{Result, YtpError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Regular files in `dir`, sorted by file name. A missing directory is empty.
pub fn list_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut sources: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            !p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with('.'))
                .unwrap_or(true)
        })
        .collect();
    sources.sort();
    Ok(sources)
}

/// First source in name order, or `NoSources`.
pub fn first_source(dir: &Path) -> Result<PathBuf> {
    list_sources(dir)?
        .into_iter()
        .next()
        .ok_or_else(|| YtpError::NoSources {
            dir: dir.to_path_buf(),
        })
}

/// Resolve a source by file name inside `dir`.
pub fn find_source(dir: &Path, name: &str) -> Result<PathBuf> {
    list_sources(dir)?
        .into_iter()
        .find(|p| p.file_name().and_then(|n| n.to_str()) == Some(name))
        .ok_or_else(|| {
            YtpError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("source '{}' not found in {:?}", name, dir),
            ))
        })
}

/// Copy files into the sources directory. Files that fail to copy (or are
/// already the destination) are logged and skipped; the added paths are
/// returned.
pub fn add_sources(dir: &Path, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut added = Vec::new();

    for file in files {
        let Some(name) = file.file_name() else {
            warn!("[SOURCES] Skipping {:?}: no file name", file);
            continue;
        };
        let dest = dir.join(name);

        if same_file(file, &dest) {
            info!("[SOURCES] {:?} is already in sources", file);
            continue;
        }

        match fs::copy(file, &dest) {
            Ok(bytes) => {
                info!("[SOURCES] Added {:?} ({:.2} MB)", dest, bytes as f64 / 1_048_576.0);
                added.push(dest);
            }
            Err(e) => warn!("[SOURCES] Could not add {:?}: {}", file, e),
        }
    }

    Ok(added)
}

/// Delete named files from the sources directory. Returns the names removed.
pub fn remove_sources(dir: &Path, names: &[String]) -> Vec<String> {
    let mut removed = Vec::new();
    for name in names {
        let path = dir.join(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("[SOURCES] Removed {:?}", path);
                removed.push(name.clone());
            }
            Err(e) => warn!("[SOURCES] Remove error for {:?}: {}", path, e),
        }
    }
    removed
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
