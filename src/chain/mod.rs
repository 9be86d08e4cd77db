// SYNOID YTP Effect-Chain Orchestrator
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Init -> one evaluation per family in chain order -> Finalize -> Done.
// Stages run strictly in sequence; each stage's output is the next stage's
// only input. The first failing stage aborts the run and nothing is written
// to the requested output path.

pub mod family;
pub mod staging;

use crate::config::Config;
use crate::effects::EffectLibrary;
use crate::error::{Result, YtpError};
use crate::processor::MediaProcessor;
use crate::sources;
use family::{plan_chain, EffectStep, PlanContext};
use rand::Rng;
use staging::{RetentionPolicy, StageArtifact, StagingDir};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Downscale + fast encode instead of copying the last stage verbatim.
    pub preview: bool,
    pub retention: RetentionPolicy,
}

impl RenderRequest {
    pub fn preview(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            preview: true,
            retention: RetentionPolicy::Retain,
        }
    }

    pub fn full(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            preview: false,
            ..Self::preview(input, output)
        }
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderResult {
    pub output: PathBuf,
    pub preview: bool,
    pub run_id: String,
    pub staging_dir: PathBuf,
    /// Every artifact in order, starting with the stage-0 copy of the input.
    pub stages: Vec<StageArtifact>,
    /// Steps that fired, in the order they were applied.
    pub applied: Vec<EffectStep>,
}

pub struct ChainOrchestrator<P> {
    library: EffectLibrary<P>,
    project_root: PathBuf,
}

impl<P: MediaProcessor> ChainOrchestrator<P> {
    /// `project_root` anchors the relative directories in the configuration.
    pub fn new(processor: P, project_root: impl Into<PathBuf>) -> Self {
        Self {
            library: EffectLibrary::new(processor),
            project_root: project_root.into(),
        }
    }

    pub fn library(&self) -> &EffectLibrary<P> {
        &self.library
    }

    /// Decide which families fire, then run them.
    pub async fn render<R: Rng + Send>(
        &self,
        config: &Config,
        request: &RenderRequest,
        rng: &mut R,
    ) -> Result<RenderResult> {
        let paths = config.resolve_paths(&self.project_root);
        let ctx = PlanContext::discover(config, &paths.assets);
        let plan = plan_chain(config, &ctx, rng);

        info!(
            "[CHAIN] {} of {} families fired: [{}]",
            plan.len(),
            family::CHAIN_ORDER.len(),
            plan.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(", ")
        );

        self.execute(plan, &paths.temp, request).await
    }

    /// Render a clip from the configured sources directory: `source` by file
    /// name, or the first source in name order. `output` defaults to
    /// `<temp>/preview.mp4` (`render.mp4` for a full render).
    ///
    /// An empty sources directory yields [`YtpError::NoSources`] before any
    /// staging is created or any processor call is made.
    pub async fn render_source<R: Rng + Send>(
        &self,
        config: &Config,
        source: Option<&str>,
        output: Option<PathBuf>,
        preview: bool,
        retention: RetentionPolicy,
        rng: &mut R,
    ) -> Result<RenderResult> {
        let paths = config.resolve_paths(&self.project_root);
        let input = match source {
            Some(name) => sources::find_source(&paths.sources, name)?,
            None => sources::first_source(&paths.sources)?,
        };
        let output = output.unwrap_or_else(|| {
            paths
                .temp
                .join(if preview { "preview.mp4" } else { "render.mp4" })
        });

        let request = if preview {
            RenderRequest::preview(input, output)
        } else {
            RenderRequest::full(input, output)
        };
        info!(
            "[CHAIN] Generating {} from {:?} to {:?}",
            if preview { "preview" } else { "render" },
            request.input,
            request.output
        );
        self.render(config, &request.with_retention(retention), rng)
            .await
    }

    /// Run an already-decided plan inside a fresh staging directory under
    /// `temp_root`.
    pub async fn execute(
        &self,
        plan: Vec<EffectStep>,
        temp_root: &Path,
        request: &RenderRequest,
    ) -> Result<RenderResult> {
        if !request.input.is_file() {
            return Err(YtpError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input clip {:?} not found", request.input),
            )));
        }

        let mut staging = StagingDir::create(temp_root, &request.input, request.retention)?;

        // Never touch the caller's file.
        let stage0 = staging.stage_path(0);
        tokio::fs::copy(&request.input, &stage0).await?;
        let mut stages = vec![StageArtifact {
            index: 0,
            path: stage0,
        }];

        for step in &plan {
            let index = stages.len();
            let input = stages[index - 1].path.clone();
            let output = staging.stage_path(index);

            info!("[CHAIN] Stage {}: {}", index, step);
            if let Err(e) = self.library.apply(step, &input, &output).await {
                let e = e.at_stage(index);
                error!("[CHAIN] Run {} aborted: {}", staging.run_id(), e);
                return Err(e);
            }
            stages.push(StageArtifact {
                index,
                path: output,
            });
        }

        let last = stages[stages.len() - 1].path.clone();
        let final_artifact = if request.preview {
            let target = staging.preview_path(stages.len() - 1, &request.output);
            if let Err(e) = self.library.scale_preview(&last, &target).await {
                // A half-encoded preview must not look like a finished one.
                if let Err(rm) = std::fs::remove_file(&target) {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        warn!("[CHAIN] Could not remove partial preview {:?}: {}", target, rm);
                    }
                }
                let e = e.at_stage(stages.len());
                error!("[CHAIN] Run {} aborted in finalize: {}", staging.run_id(), e);
                return Err(e);
            }
            target
        } else {
            last
        };

        staging::commit(&final_artifact, &request.output, staging.run_id())?;
        staging.mark_succeeded();

        info!(
            "[CHAIN] Run {} done: {} stage(s) -> {:?}",
            staging.run_id(),
            stages.len() - 1,
            request.output
        );

        Ok(RenderResult {
            output: request.output.clone(),
            preview: request.preview,
            run_id: staging.run_id().to_string(),
            staging_dir: staging.dir().to_path_buf(),
            stages,
            applied: plan,
        })
    }
}
