// SYNOID YTP Media Processor Adapter
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Every effect boils down to one external ffmpeg invocation. This module owns
// the argument vector builder, the process wrapper, and the ffprobe helper.

use crate::error::{Result, YtpError};
use std::ffi::{OsStr, OsString};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{error, info};

/// One external invocation: a label for diagnostics plus the argument vector.
///
/// Inputs and the output are tracked separately from the raw arguments so
/// processors (and test doubles) can see which files a stage touches.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    label: String,
    args: Vec<OsString>,
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
}

impl Invocation {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            args: vec!["-y".into(), "-nostdin".into()],
            inputs: Vec::new(),
            output: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Append `-i <path>`.
    pub fn input(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        self.args.push("-i".into());
        self.args.push(path.as_os_str().to_os_string());
        self.inputs.push(path.to_path_buf());
        self
    }

    /// Append the output path. Must be the last call on the builder.
    pub fn output(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        self.args.push(path.as_os_str().to_os_string());
        self.output = Some(path.to_path_buf());
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// True when `flag` is immediately followed by `value` in the arguments.
    pub fn has_option(&self, flag: &str, value: &str) -> bool {
        self.args
            .windows(2)
            .any(|w| w[0] == OsStr::new(flag) && w[1] == OsStr::new(value))
    }

    /// Value following the first occurrence of `flag`, if any.
    pub fn option_value(&self, flag: &str) -> Option<String> {
        self.args
            .windows(2)
            .find(|w| w[0] == OsStr::new(flag))
            .map(|w| w[1].to_string_lossy().into_owned())
    }

    pub fn command_line(&self, program: &str) -> String {
        let mut line = program.to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Capability to run one media-processing invocation.
///
/// Returns the captured diagnostic text on success; a non-zero exit becomes
/// [`YtpError::Processing`] carrying that text. No retries.
pub trait MediaProcessor: Send + Sync {
    fn invoke(&self, invocation: &Invocation) -> impl Future<Output = Result<String>> + Send;
}

impl<T: MediaProcessor> MediaProcessor for Arc<T> {
    fn invoke(&self, invocation: &Invocation) -> impl Future<Output = Result<String>> + Send {
        (**self).invoke(invocation)
    }
}

/// The real thing: spawns the ffmpeg binary and waits for it to exit.
#[derive(Debug, Clone)]
pub struct FfmpegProcessor {
    binary: String,
}

impl Default for FfmpegProcessor {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegProcessor {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl MediaProcessor for FfmpegProcessor {
    async fn invoke(&self, invocation: &Invocation) -> Result<String> {
        info!("[FFMPEG] RUN: {}", invocation.command_line(&self.binary));

        let output = Command::new(&self.binary)
            .args(invocation.arguments())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| YtpError::Spawn {
                program: self.binary.clone(),
                source,
            })?;

        // ffmpeg writes nearly everything to stderr; keep both streams.
        let mut diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
        diagnostics.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            error!(
                "[FFMPEG] {} failed ({:?}). Output:\n{}",
                invocation.label(),
                output.status.code(),
                diagnostics
            );
            return Err(YtpError::Processing {
                stage: invocation.label().to_string(),
                exit_code: output.status.code(),
                output: diagnostics,
            });
        }

        Ok(diagnostics)
    }
}

/// Container duration in seconds via ffprobe, bounded by a 10s timeout.
pub async fn probe_duration(ffprobe: &str, path: &Path) -> Result<f64> {
    let output = tokio::time::timeout(
        tokio::time::Duration::from_secs(10),
        Command::new(ffprobe)
            .kill_on_drop(true)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output(),
    )
    .await
    .map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::TimedOut, "ffprobe duration check timed out")
    })?
    .map_err(|source| YtpError::Spawn {
        program: ffprobe.to_string(),
        source,
    })?;

    let text = String::from_utf8_lossy(&output.stdout);
    text.trim().parse::<f64>().map_err(|_| YtpError::Processing {
        stage: "ffprobe duration".to_string(),
        exit_code: output.status.code(),
        output: format!("{}{}", text, String::from_utf8_lossy(&output.stderr)),
    })
}
