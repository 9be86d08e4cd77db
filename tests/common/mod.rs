#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use synoid_ytp::{
    Config, EffectFamily, EffectOverrides, Invocation, MediaProcessor, RenderRequest, Result,
    YtpError,
};

/// In-process stand-in for ffmpeg: records every invocation, writes a small
/// text body to the output path, and fakes frame extraction.
#[derive(Default)]
pub struct ScriptedProcessor {
    calls: Mutex<Vec<Invocation>>,
    manifests: Mutex<Vec<String>>,
    fail_on: Option<String>,
    frames_to_extract: usize,
}

impl ScriptedProcessor {
    pub fn new() -> Self {
        Self {
            frames_to_extract: 10,
            ..Default::default()
        }
    }

    pub fn failing_on(label: &str) -> Self {
        Self {
            fail_on: Some(label.to_string()),
            ..Self::new()
        }
    }

    pub fn extracting(frames: usize) -> Self {
        Self {
            frames_to_extract: frames,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.label().to_string()).collect()
    }

    pub fn manifests(&self) -> Vec<String> {
        self.manifests.lock().unwrap().clone()
    }
}

impl MediaProcessor for ScriptedProcessor {
    async fn invoke(&self, invocation: &Invocation) -> Result<String> {
        self.calls.lock().unwrap().push(invocation.clone());

        for input in invocation.inputs() {
            if input.extension().and_then(|e| e.to_str()) == Some("txt") {
                if let Ok(text) = fs::read_to_string(input) {
                    self.manifests.lock().unwrap().push(text);
                }
            }
        }

        if self.fail_on.as_deref() == Some(invocation.label()) {
            // ffmpeg usually leaves a truncated file behind when it dies.
            if let Some(out) = invocation.output_path() {
                fs::write(out, b"partial").unwrap();
            }
            return Err(YtpError::Processing {
                stage: invocation.label().to_string(),
                exit_code: Some(1),
                output: "simulated failure: Invalid data found when processing input".to_string(),
            });
        }

        if let Some(out) = invocation.output_path() {
            if out.to_string_lossy().contains("%06d") {
                let dir = out.parent().unwrap();
                for i in 1..=self.frames_to_extract {
                    let frame = dir.join(format!("frame_{:06}.png", i));
                    fs::write(frame, format!("frame {}", i)).unwrap();
                }
            } else {
                fs::write(out, format!("{} output", invocation.label())).unwrap();
            }
        }

        Ok(format!("{} ok", invocation.label()))
    }
}

/// Project layout in a temp dir with one source clip.
pub struct Project {
    pub root: tempfile::TempDir,
}

impl Project {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("sources")).unwrap();
        fs::create_dir_all(root.path().join("assets")).unwrap();
        fs::write(root.path().join("sources/clip.mp4"), b"source clip").unwrap();
        Self { root }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn source(&self) -> PathBuf {
        self.path().join("sources/clip.mp4")
    }

    pub fn output(&self, name: &str) -> PathBuf {
        self.path().join("out").join(name)
    }

    /// Full render of the source clip into `out/<name>`.
    pub fn full_request(&self, name: &str) -> RenderRequest {
        RenderRequest::full(self.source(), self.output(name))
    }

    pub fn add_overlay_asset(&self) -> PathBuf {
        let asset = self.path().join("assets/rainbow_overlay.png");
        fs::write(&asset, b"png").unwrap();
        asset
    }

    pub fn clear_sources(&self) {
        fs::remove_file(self.source()).unwrap();
    }

    pub fn run_dirs(&self) -> Vec<PathBuf> {
        match fs::read_dir(self.path().join("temp")) {
            Ok(entries) => entries.filter_map(|e| e.ok().map(|e| e.path())).collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Everything off except `families`, which always fire.
pub fn only_always(families: &[EffectFamily]) -> Config {
    let mut overrides = EffectOverrides::default().only(families);
    for family in families {
        overrides = overrides.probability(*family, 1.0);
    }
    Config::default().with_overrides(&overrides)
}

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
