// SYNOID YTP Staging & Shadow Commit
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Each render owns `<temp>/run_<id>/`. Stage artifacts are written there and
// never shared with another run. The requested output path is only touched
// by `commit`, which writes a per-run `.ytp_tmp` sidecar and renames it into
// place, so concurrent runs targeting one output never share a half-written file.

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// What happens to the run directory when the staging guard is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    /// Keep everything for inspection.
    #[default]
    Retain,
    /// Remove the run directory, but only if the run succeeded.
    PurgeOnSuccess,
}

/// An intermediate file produced by one stage. Stage 0 is the copied input.
#[derive(Debug, Clone, PartialEq)]
pub struct StageArtifact {
    pub index: usize,
    pub path: PathBuf,
}

pub struct StagingDir {
    run_id: String,
    dir: PathBuf,
    extension: String,
    policy: RetentionPolicy,
    succeeded: bool,
}

impl StagingDir {
    /// Create a fresh run directory under `temp_root`. Artifacts use the
    /// extension of `input` (`mp4` when it has none).
    pub fn create(temp_root: &Path, input: &Path, policy: RetentionPolicy) -> Result<Self> {
        let run_id = new_run_id();
        let dir = temp_root.join(format!("run_{}", run_id));
        fs::create_dir_all(&dir)?;

        let extension = input
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .unwrap_or("mp4")
            .to_string();

        info!("[STAGING] Run {} staging in {:?}", run_id, dir);
        Ok(Self {
            run_id,
            dir,
            extension,
            policy,
            succeeded: false,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stage_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("step_{}.{}", index, self.extension))
    }

    /// Where the preview encode of stage `index` is written before the
    /// result is committed: `step_<n>.preview.<ext>`.
    pub fn preview_path(&self, index: usize, output: &Path) -> PathBuf {
        let ext = output
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(&self.extension);
        self.dir.join(format!("step_{}.preview.{}", index, ext))
    }

    pub fn mark_succeeded(&mut self) {
        self.succeeded = true;
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if self.policy == RetentionPolicy::PurgeOnSuccess && self.succeeded {
            match fs::remove_dir_all(&self.dir) {
                Ok(()) => info!("[STAGING] Purged {:?}", self.dir),
                Err(e) => warn!("[STAGING] Could not purge {:?}: {}", self.dir, e),
            }
        }
    }
}

fn new_run_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// `render/out.mp4` + `ab12` -> `render/out.mp4.ab12.ytp_tmp`
pub fn tmp_path_for(final_path: &Path, run_id: &str) -> PathBuf {
    let mut tmp = final_path.as_os_str().to_owned();
    tmp.push(format!(".{}.ytp_tmp", run_id));
    PathBuf::from(tmp)
}

/// Copy `src` to `dest` through a sidecar owned by `run_id` so `dest` never
/// holds a partial file. When runs race on one `dest`, the last rename wins
/// with an intact file. `src` is left in place.
pub fn commit(src: &Path, dest: &Path, run_id: &str) -> Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = tmp_path_for(dest, run_id);
    if let Err(e) = fs::copy(src, &tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp, dest) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    info!("[STAGING] Committed {:?} -> {:?}", src, dest);
    Ok(())
}
