// SYNOID YTP Render Queue
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Background surface for interactive callers: renders run on a worker task,
// the caller gets a completion signal and can poll job status. Jobs cannot be
// cancelled once submitted.

use crate::chain::{ChainOrchestrator, RenderRequest, RenderResult};
use crate::config::Config;
use crate::error::{Result, YtpError};
use crate::processor::MediaProcessor;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Queued,
    Rendering,
    Completed { output: PathBuf, elapsed_secs: f64 },
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct RenderJob {
    pub id: Uuid,
    pub request: RenderRequest,
    /// Snapshot taken at submission (overrides already applied).
    pub config: Config,
    pub seed: Option<u64>,
    pub status: JobStatus,
    pub created_at: Instant,
}

impl RenderJob {
    pub fn new(request: RenderRequest, config: Config) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            config,
            seed: None,
            status: JobStatus::Queued,
            created_at: Instant::now(),
        }
    }

    pub fn seeded(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Completion signal for one submitted job.
pub struct RenderHandle {
    pub id: Uuid,
    done: oneshot::Receiver<Result<RenderResult>>,
}

impl RenderHandle {
    pub async fn wait(self) -> Result<RenderResult> {
        self.done.await.map_err(|_| YtpError::WorkerStopped {
            job: self.id.to_string(),
        })?
    }
}

struct Submission {
    id: Uuid,
    done: oneshot::Sender<Result<RenderResult>>,
}

pub struct RenderQueue {
    jobs: Arc<Mutex<Vec<RenderJob>>>,
    tx: mpsc::UnboundedSender<Submission>,
}

impl RenderQueue {
    /// Spawn the worker loop. Must be called from inside a tokio runtime.
    pub fn new<P>(orchestrator: Arc<ChainOrchestrator<P>>) -> Self
    where
        P: MediaProcessor + 'static,
    {
        let jobs = Arc::new(Mutex::new(Vec::<RenderJob>::new()));
        let (tx, mut rx) = mpsc::unbounded_channel::<Submission>();

        let jobs_worker = jobs.clone();

        tokio::spawn(async move {
            info!("[QUEUE] Render worker started.");
            while let Some(submission) = rx.recv().await {
                let job_opt = {
                    let mut jobs = jobs_worker.lock().await;
                    if let Some(job) = jobs.iter_mut().find(|j| j.id == submission.id) {
                        job.status = JobStatus::Rendering;
                        Some(job.clone())
                    } else {
                        None
                    }
                };

                let Some(job) = job_opt else {
                    continue;
                };

                info!("[QUEUE] Rendering job {}: {:?}", job.id, job.request.input);
                let mut rng = match job.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                let result = orchestrator
                    .render(&job.config, &job.request, &mut rng)
                    .await;

                {
                    let mut jobs = jobs_worker.lock().await;
                    if let Some(final_job) = jobs.iter_mut().find(|j| j.id == job.id) {
                        match &result {
                            Ok(render) => {
                                let elapsed = job.created_at.elapsed().as_secs_f64();
                                info!("[QUEUE] Job {} completed in {:.1}s", job.id, elapsed);
                                final_job.status = JobStatus::Completed {
                                    output: render.output.clone(),
                                    elapsed_secs: elapsed,
                                };
                            }
                            Err(e) => {
                                error!("[QUEUE] Job {} failed: {}", job.id, e);
                                final_job.status = JobStatus::Failed(e.to_string());
                            }
                        }
                    }
                }

                // The caller may have stopped listening; the status still records the outcome.
                let _ = submission.done.send(result);
            }
            info!("[QUEUE] Render worker stopped.");
        });

        Self { jobs, tx }
    }

    pub async fn submit(&self, job: RenderJob) -> RenderHandle {
        let id = job.id;
        let (done_tx, done_rx) = oneshot::channel();
        {
            let mut jobs = self.jobs.lock().await;
            jobs.push(job);
        }
        if self.tx.send(Submission { id, done: done_tx }).is_err() {
            error!("[QUEUE] Worker is gone; job {} will not run", id);
        } else {
            info!("[QUEUE] Added job {}", id);
        }
        RenderHandle { id, done: done_rx }
    }

    pub async fn status(&self, id: Uuid) -> Option<JobStatus> {
        let jobs = self.jobs.lock().await;
        jobs.iter().find(|j| j.id == id).map(|j| j.status.clone())
    }

    pub async fn list(&self) -> Vec<(Uuid, JobStatus)> {
        let jobs = self.jobs.lock().await;
        jobs.iter().map(|j| (j.id, j.status.clone())).collect()
    }
}
