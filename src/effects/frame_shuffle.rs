// SYNOID YTP Frame Shuffle
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Explode the clip into numbered PNGs, keep the first N, permute them and
// re-encode at a fixed frame rate. Audio is dropped.

use crate::error::{Result, YtpError};
use crate::processor::{Invocation, MediaProcessor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SHUFFLE_FPS: u32 = 25;
const EXTRACT_PATTERN: &str = "frame_%06d.png";
const SHUFFLED_PATTERN: &str = "shuffled_%06d.png";

/// Scratch directory for a stage: `step_5.mp4` -> `step_5.frames/`.
/// Left on disk after the run alongside the stage artifacts.
pub fn frames_dir_for(output: &Path) -> PathBuf {
    output.with_extension("frames")
}

/// Extracted frames in original order.
pub fn list_extracted_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("frame_") && n.ends_with(".png"))
                .unwrap_or(false)
        })
        .collect();
    frames.sort();
    Ok(frames)
}

/// Truncate to the first `max_frames`, then permute with a seeded RNG.
pub fn select_and_shuffle(mut frames: Vec<PathBuf>, max_frames: usize, seed: u64) -> Vec<PathBuf> {
    frames.truncate(max_frames);
    frames.shuffle(&mut StdRng::seed_from_u64(seed));
    frames
}

pub(crate) async fn frame_shuffle<P: MediaProcessor>(
    processor: &P,
    input: &Path,
    output: &Path,
    max_frames: usize,
    seed: u64,
) -> Result<PathBuf> {
    let dir = frames_dir_for(output);
    fs::create_dir_all(&dir)?;

    let extract = Invocation::new("frame_extract")
        .input(input)
        .args(["-vsync", "0"])
        .output(dir.join(EXTRACT_PATTERN));
    processor.invoke(&extract).await?;

    let frames = list_extracted_frames(&dir)?;
    if frames.is_empty() {
        return Err(YtpError::EmptyFrameSet {
            input: input.to_path_buf(),
        });
    }
    let total = frames.len();
    let order = select_and_shuffle(frames, max_frames, seed);
    info!("[SHUFFLE] {} frames extracted, shuffling {}", total, order.len());

    // Renumber so the image2 demuxer reads them back in shuffled order.
    for (i, frame) in order.iter().enumerate() {
        fs::rename(frame, dir.join(format!("shuffled_{:06}.png", i + 1)))?;
    }

    let rate = SHUFFLE_FPS.to_string();
    let assemble = Invocation::new("frame_shuffle")
        .args(["-framerate", rate.as_str()])
        .input(dir.join(SHUFFLED_PATTERN))
        .args(["-r", rate.as_str(), "-c:v", "libx264", "-pix_fmt", "yuv420p", "-an"])
        .output(output);
    processor.invoke(&assemble).await?;

    Ok(output.to_path_buf())
}
