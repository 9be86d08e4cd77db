// SYNOID YTP Concat Manifests
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Stutter loops and quick concatenation both go through ffmpeg's concat
// demuxer with `-c copy`, so no re-encode happens.

use crate::error::{Result, YtpError};
use crate::processor::{Invocation, MediaProcessor};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Manifest text, one `file '<absolute path>'` line per segment.
pub fn create_concat_manifest(segments: &[PathBuf]) -> String {
    segments
        .iter()
        .map(|p| format!("file '{}'", escape_single_quotes(&absolute(p).to_string_lossy())))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The concat demuxer reads single-quoted strings; a literal quote is
/// written as `'\''`.
fn escape_single_quotes(s: &str) -> String {
    s.replace('\'', r"'\''")
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Manifest sits next to the output: `out.mp4` -> `out.concat_manifest.txt`.
pub fn manifest_path_for(output: &Path) -> PathBuf {
    output.with_extension("concat_manifest.txt")
}

/// Write the manifest, run a stream-copy concat, then drop the manifest.
pub(crate) async fn concat_copy<P: MediaProcessor>(
    processor: &P,
    label: &str,
    segments: &[PathBuf],
    output: &Path,
) -> Result<PathBuf> {
    if segments.is_empty() {
        return Err(YtpError::InvalidParameter {
            effect: label.to_string(),
            reason: "no segments to concatenate".to_string(),
        });
    }

    let manifest = manifest_path_for(output);
    fs::write(&manifest, create_concat_manifest(segments))?;
    info!("[CONCAT] Manifest written ({} segments): {:?}", segments.len(), manifest);

    let invocation = Invocation::new(label)
        .args(["-f", "concat", "-safe", "0"])
        .input(&manifest)
        .args(["-c", "copy"])
        .output(output);
    let result = processor.invoke(&invocation).await;

    if let Err(e) = fs::remove_file(&manifest) {
        warn!("[CONCAT] Could not remove manifest {:?}: {}", manifest, e);
    }

    result.map(|_| output.to_path_buf())
}
