// SYNOID YTP Dependency Check
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use tokio::process::Command;
use tracing::debug;

/// True when `binary -version` runs and exits cleanly.
pub async fn tool_available(binary: &str) -> bool {
    match Command::new(binary).arg("-version").output().await {
        Ok(out) => out.status.success(),
        Err(e) => {
            debug!("[HEALTH] {} not runnable: {}", binary, e);
            false
        }
    }
}

/// Names of the external tools that could not be run.
pub async fn check_dependencies(ffmpeg: &str, ffprobe: &str) -> Vec<String> {
    let mut missing = Vec::new();
    for tool in [ffmpeg, ffprobe] {
        if !tool_available(tool).await {
            missing.push(tool.to_string());
        }
    }
    missing
}
