// SYNOID YTP Error Taxonomy
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, YtpError>;

#[derive(Error, Debug)]
pub enum YtpError {
    /// The external media processor exited non-zero.
    #[error("{stage} failed ({}):\n{output}", describe_exit(.exit_code))]
    Processing {
        stage: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("frame extraction produced no frames from {input:?}")]
    EmptyFrameSet { input: PathBuf },

    /// Malformed configuration file. The loader recovers from this by
    /// falling back to defaults; only the strict parser returns it.
    #[error("configuration error in {path:?}: {reason}")]
    Configuration { path: PathBuf, reason: String },

    #[error("invalid parameter for {effect}: {reason}")]
    InvalidParameter { effect: String, reason: String },

    #[error("No sources found in {dir:?}. Add video files first.")]
    NoSources { dir: PathBuf },

    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("render worker stopped before job {job} completed")]
    WorkerStopped { job: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl YtpError {
    /// Tag a processing failure with the chain stage it happened in.
    pub fn at_stage(self, index: usize) -> Self {
        match self {
            YtpError::Processing {
                stage,
                exit_code,
                output,
            } => YtpError::Processing {
                stage: format!("stage {} ({})", index, stage),
                exit_code,
                output,
            },
            other => other,
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, YtpError::Processing { .. })
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {}", c),
        None => "terminated by signal".to_string(),
    }
}
