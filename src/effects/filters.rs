// SYNOID YTP Filter Expressions
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use crate::error::{Result, YtpError};

/// ffmpeg's `atempo` only accepts multipliers in this range per instance.
pub const ATEMPO_MIN: f64 = 0.5;
pub const ATEMPO_MAX: f64 = 2.0;

/// Upper bound on chained `atempo` stages. 32 stages cover factors down to
/// 2^-32 and up to 2^32; anything beyond is rejected rather than looped on.
pub const MAX_ATEMPO_STAGES: usize = 32;

pub const NEGATE: &str = "negate";
pub const HFLIP: &str = "hflip";
pub const REVERSE_VIDEO: &str = "reverse";
pub const REVERSE_AUDIO: &str = "areverse";
pub const CHORUS_ECHO: &str = "aecho=0.8:0.9:100:0.3";
pub const PREVIEW_SCALE: &str = "scale=640:-2";

/// Split a playback speed into `atempo` multipliers, each within
/// [`ATEMPO_MIN`, `ATEMPO_MAX`], whose product is `speed`.
pub fn atempo_chain(speed: f64) -> Result<Vec<f64>> {
    if !speed.is_finite() || speed <= 0.0 {
        return Err(YtpError::InvalidParameter {
            effect: "speed_change".to_string(),
            reason: format!("speed must be a positive finite number, got {}", speed),
        });
    }

    let mut parts = Vec::new();
    let mut remaining = speed;

    while remaining > ATEMPO_MAX {
        parts.push(ATEMPO_MAX);
        remaining /= ATEMPO_MAX;
        if parts.len() >= MAX_ATEMPO_STAGES {
            return Err(too_many_stages(speed));
        }
    }
    while remaining < ATEMPO_MIN {
        parts.push(ATEMPO_MIN);
        remaining /= ATEMPO_MIN;
        if parts.len() >= MAX_ATEMPO_STAGES {
            return Err(too_many_stages(speed));
        }
    }
    parts.push(remaining.clamp(ATEMPO_MIN, ATEMPO_MAX));

    Ok(parts)
}

fn too_many_stages(speed: f64) -> YtpError {
    YtpError::InvalidParameter {
        effect: "speed_change".to_string(),
        reason: format!(
            "speed {} needs more than {} atempo stages",
            speed, MAX_ATEMPO_STAGES
        ),
    }
}

/// `[0:v]setpts=PTS/s[v];[0:a]atempo=..,atempo=..[a]`
pub fn speed_filter_graph(speed: f64) -> Result<String> {
    let audio = atempo_chain(speed)?
        .iter()
        .map(|m| format!("atempo={}", m))
        .collect::<Vec<_>>()
        .join(",");
    Ok(format!("[0:v]setpts=PTS/{}[v];[0:a]{}[a]", speed, audio))
}

pub fn volume_boost(gain_db: f64) -> String {
    format!("volume={}dB", gain_db)
}

pub fn overlay_at(x: i64, y: i64) -> String {
    format!("[0:v][1:v]overlay={}:{}:format=auto", x, y)
}
