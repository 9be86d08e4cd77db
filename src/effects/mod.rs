// SYNOID YTP Effect Library
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// One operation per effect family. Each translates its semantic parameters
// into a single processor invocation (frame shuffle needs two) and returns
// the output path it wrote.

pub mod concat;
pub mod filters;
pub mod frame_shuffle;

use crate::chain::family::EffectStep;
use crate::error::{Result, YtpError};
use crate::processor::{Invocation, MediaProcessor};
use std::path::{Path, PathBuf};

pub struct EffectLibrary<P> {
    processor: P,
}

impl<P: MediaProcessor> EffectLibrary<P> {
    pub fn new(processor: P) -> Self {
        Self { processor }
    }

    async fn run(&self, invocation: Invocation, output: &Path) -> Result<PathBuf> {
        self.processor.invoke(&invocation).await?;
        Ok(output.to_path_buf())
    }

    /// Colour negation, audio untouched.
    pub async fn invert(&self, input: &Path, output: &Path) -> Result<PathBuf> {
        let inv = Invocation::new("invert")
            .input(input)
            .args(["-vf", filters::NEGATE, "-c:a", "copy"])
            .output(output);
        self.run(inv, output).await
    }

    /// Horizontal flip, audio untouched.
    pub async fn mirror(&self, input: &Path, output: &Path) -> Result<PathBuf> {
        let inv = Invocation::new("mirror")
            .input(input)
            .args(["-vf", filters::HFLIP, "-c:a", "copy"])
            .output(output);
        self.run(inv, output).await
    }

    /// Reverse both streams. Always a full re-encode.
    pub async fn reverse(&self, input: &Path, output: &Path) -> Result<PathBuf> {
        let inv = Invocation::new("reverse")
            .input(input)
            .args(["-vf", filters::REVERSE_VIDEO, "-af", filters::REVERSE_AUDIO])
            .output(output);
        self.run(inv, output).await
    }

    /// Exact video retiming plus pitch-preserving audio tempo, chained when
    /// `speed` is outside what a single `atempo` accepts.
    pub async fn speed_change(&self, input: &Path, output: &Path, speed: f64) -> Result<PathBuf> {
        let graph = filters::speed_filter_graph(speed)?;
        let inv = Invocation::new("speed_change")
            .input(input)
            .args(["-filter_complex", graph.as_str(), "-map", "[v]", "-map", "[a]"])
            .output(output);
        self.run(inv, output).await
    }

    /// Deliberately clipping gain on the audio; video is stream-copied.
    pub async fn earrape(&self, input: &Path, output: &Path, gain_db: f64) -> Result<PathBuf> {
        let volume = filters::volume_boost(gain_db);
        let inv = Invocation::new("earrape")
            .input(input)
            .args(["-af", volume.as_str(), "-c:v", "copy"])
            .output(output);
        self.run(inv, output).await
    }

    /// Echo filter standing in for a chorus; video is stream-copied.
    pub async fn chorus(&self, input: &Path, output: &Path) -> Result<PathBuf> {
        let inv = Invocation::new("chorus")
            .input(input)
            .args(["-af", filters::CHORUS_ECHO, "-c:v", "copy"])
            .output(output);
        self.run(inv, output).await
    }

    pub async fn frame_shuffle(
        &self,
        input: &Path,
        output: &Path,
        max_frames: usize,
        seed: u64,
    ) -> Result<PathBuf> {
        frame_shuffle::frame_shuffle(&self.processor, input, output, max_frames, seed).await
    }

    /// Play the whole clip `repeats` times back to back (stream copy).
    pub async fn stutter_loop(&self, input: &Path, output: &Path, repeats: u32) -> Result<PathBuf> {
        if repeats == 0 {
            return Err(YtpError::InvalidParameter {
                effect: "stutter_loop".to_string(),
                reason: "repeats must be at least 1".to_string(),
            });
        }
        let segments = vec![input.to_path_buf(); repeats as usize];
        concat::concat_copy(&self.processor, "stutter_loop", &segments, output).await
    }

    /// Composite an image (still or animated) at a fixed pixel offset.
    pub async fn overlay_image(
        &self,
        input: &Path,
        overlay: &Path,
        output: &Path,
        x: i64,
        y: i64,
    ) -> Result<PathBuf> {
        let graph = filters::overlay_at(x, y);
        let inv = Invocation::new("rainbow_overlay")
            .input(input)
            .input(overlay)
            .args(["-filter_complex", graph.as_str(), "-c:a", "copy"])
            .output(output);
        self.run(inv, output).await
    }

    /// Stream-copy concatenation of clips assumed to share codecs.
    pub async fn concat_clips(&self, clips: &[PathBuf], output: &Path) -> Result<PathBuf> {
        concat::concat_copy(&self.processor, "concat", clips, output).await
    }

    /// 640px wide, even height, fast low-quality encode.
    pub async fn scale_preview(&self, input: &Path, output: &Path) -> Result<PathBuf> {
        let inv = Invocation::new("preview")
            .input(input)
            .args([
                "-vf",
                filters::PREVIEW_SCALE,
                "-c:v",
                "libx264",
                "-preset",
                "veryfast",
                "-crf",
                "28",
                "-c:a",
                "aac",
                "-b:a",
                "96k",
            ])
            .output(output);
        self.run(inv, output).await
    }

    /// Dispatch a planned step to its operation.
    pub async fn apply(&self, step: &EffectStep, input: &Path, output: &Path) -> Result<PathBuf> {
        match step {
            EffectStep::Invert => self.invert(input, output).await,
            EffectStep::Mirror => self.mirror(input, output).await,
            EffectStep::Reverse => self.reverse(input, output).await,
            EffectStep::SpeedChange { speed } => self.speed_change(input, output, *speed).await,
            EffectStep::StutterLoop { repeats } => self.stutter_loop(input, output, *repeats).await,
            EffectStep::FrameShuffle {
                max_frames,
                shuffle_seed,
            } => {
                self.frame_shuffle(input, output, *max_frames, *shuffle_seed)
                    .await
            }
            EffectStep::Chorus => self.chorus(input, output).await,
            EffectStep::Earrape { gain_db } => self.earrape(input, output, *gain_db).await,
            EffectStep::RainbowOverlay { overlay, x, y } => {
                self.overlay_image(input, overlay, output, *x, *y).await
            }
        }
    }
}
