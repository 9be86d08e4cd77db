// SYNOID YTP Library Root
// Copyright (c) 2026 Xing_The_Creator | SYNOID

pub mod chain;
pub mod config;
pub mod effects;
pub mod error;
pub mod health;
pub mod processor;
pub mod project;
pub mod render_queue;
pub mod sources;

pub use chain::family::{EffectFamily, EffectStep, CHAIN_ORDER};
pub use chain::staging::RetentionPolicy;
pub use chain::{ChainOrchestrator, RenderRequest, RenderResult};
pub use config::{Config, EffectOverrides};
pub use error::{Result, YtpError};
pub use processor::{FfmpegProcessor, Invocation, MediaProcessor};
