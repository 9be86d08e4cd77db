// SYNOID YTP Effect Families
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// The chain is a fixed, ordered table of family descriptors. Each descriptor
// knows how to gate itself and how to derive its randomized parameters; the
// orchestrator walks the table once per run.

use crate::config::{Config, EffectSettings};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EffectFamily {
    Invert,
    Mirror,
    Reverse,
    SpeedChange,
    StutterLoop,
    FrameShuffle,
    Chorus,
    Earrape,
    RainbowOverlay,
}

/// Evaluation order. Independent of which earlier families fired.
pub const CHAIN_ORDER: [EffectFamily; 9] = [
    EffectFamily::Invert,
    EffectFamily::Mirror,
    EffectFamily::Reverse,
    EffectFamily::SpeedChange,
    EffectFamily::StutterLoop,
    EffectFamily::FrameShuffle,
    EffectFamily::Chorus,
    EffectFamily::Earrape,
    EffectFamily::RainbowOverlay,
];

pub const SPEED_CHOICES: [f64; 5] = [0.5, 0.75, 1.25, 1.5, 2.0];
pub const STUTTER_MIN_REPEATS: u32 = 2;
pub const STUTTER_MAX_REPEATS: u32 = 4;
pub const EARRAPE_GAIN_DB: f64 = 18.0;
pub const FRAME_SHUFFLE_MAX_FRAMES: usize = 500;
pub const OVERLAY_ASSET_NAME: &str = "rainbow_overlay.png";

impl EffectFamily {
    pub fn name(self) -> &'static str {
        match self {
            Self::Invert => "invert",
            Self::Mirror => "mirror",
            Self::Reverse => "reverse",
            Self::SpeedChange => "speed_change",
            Self::StutterLoop => "stutter_loop",
            Self::FrameShuffle => "frame_shuffle",
            Self::Chorus => "chorus",
            Self::Earrape => "earrape",
            Self::RainbowOverlay => "rainbow_overlay",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().to_lowercase().replace('-', "_");
        CHAIN_ORDER.iter().copied().find(|f| f.name() == wanted)
    }

    pub fn default_probability(self) -> f64 {
        match self {
            Self::Invert => 0.25,
            Self::Mirror => 0.2,
            Self::Reverse => 0.15,
            Self::SpeedChange => 0.25,
            Self::StutterLoop => 0.2,
            Self::FrameShuffle => 0.1,
            Self::Chorus => 0.1,
            Self::Earrape => 0.05,
            Self::RainbowOverlay => 0.15,
        }
    }
}

impl fmt::Display for EffectFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| {
            let known: Vec<&str> = CHAIN_ORDER.iter().map(|f| f.name()).collect();
            format!("unknown effect '{}' (known: {})", s, known.join(", "))
        })
    }
}

/// A fired family with its parameters fully decided.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectStep {
    Invert,
    Mirror,
    Reverse,
    SpeedChange { speed: f64 },
    StutterLoop { repeats: u32 },
    /// The permutation is drawn from `shuffle_seed` at execution time so the
    /// plan alone fixes every random outcome of the run.
    FrameShuffle { max_frames: usize, shuffle_seed: u64 },
    Chorus,
    Earrape { gain_db: f64 },
    RainbowOverlay { overlay: PathBuf, x: i64, y: i64 },
}

impl EffectStep {
    pub fn family(&self) -> EffectFamily {
        match self {
            Self::Invert => EffectFamily::Invert,
            Self::Mirror => EffectFamily::Mirror,
            Self::Reverse => EffectFamily::Reverse,
            Self::SpeedChange { .. } => EffectFamily::SpeedChange,
            Self::StutterLoop { .. } => EffectFamily::StutterLoop,
            Self::FrameShuffle { .. } => EffectFamily::FrameShuffle,
            Self::Chorus => EffectFamily::Chorus,
            Self::Earrape { .. } => EffectFamily::Earrape,
            Self::RainbowOverlay { .. } => EffectFamily::RainbowOverlay,
        }
    }
}

impl fmt::Display for EffectStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpeedChange { speed } => write!(f, "speed_change x{}", speed),
            Self::StutterLoop { repeats } => write!(f, "stutter_loop x{}", repeats),
            Self::FrameShuffle { max_frames, .. } => {
                write!(f, "frame_shuffle (<= {} frames)", max_frames)
            }
            Self::Earrape { gain_db } => write!(f, "earrape +{}dB", gain_db),
            Self::RainbowOverlay { x, y, .. } => write!(f, "rainbow_overlay @ {}:{}", x, y),
            other => f.write_str(other.family().name()),
        }
    }
}

/// Facts about the environment that gate families beyond their probability.
#[derive(Debug, Clone, Default)]
pub struct PlanContext {
    /// Present only when the overlay asset exists on disk.
    pub overlay_asset: Option<PathBuf>,
}

impl PlanContext {
    /// Look for the overlay asset, honouring a `rainbow_overlay.asset`
    /// override relative to the assets directory.
    pub fn discover(config: &Config, assets_dir: &std::path::Path) -> Self {
        let settings = config.effect(EffectFamily::RainbowOverlay);
        let name = settings.param_str("asset").unwrap_or(OVERLAY_ASSET_NAME);
        let candidate = assets_dir.join(name);
        Self {
            overlay_asset: candidate.is_file().then_some(candidate),
        }
    }
}

type Gate = fn(&PlanContext) -> bool;
type Derive = fn(&EffectSettings, &PlanContext, &mut dyn RngCore) -> EffectStep;

/// One row of the chain table.
pub struct FamilyDescriptor {
    pub family: EffectFamily,
    gate: Gate,
    derive: Derive,
}

fn always(_: &PlanContext) -> bool {
    true
}

fn overlay_present(ctx: &PlanContext) -> bool {
    ctx.overlay_asset.is_some()
}

fn derive_invert(_: &EffectSettings, _: &PlanContext, _: &mut dyn RngCore) -> EffectStep {
    EffectStep::Invert
}

fn derive_mirror(_: &EffectSettings, _: &PlanContext, _: &mut dyn RngCore) -> EffectStep {
    EffectStep::Mirror
}

fn derive_reverse(_: &EffectSettings, _: &PlanContext, _: &mut dyn RngCore) -> EffectStep {
    EffectStep::Reverse
}

fn derive_speed(settings: &EffectSettings, _: &PlanContext, rng: &mut dyn RngCore) -> EffectStep {
    let configured: Vec<f64> = settings
        .param_f64_list("speeds")
        .unwrap_or_default()
        .into_iter()
        .filter(|s| s.is_finite() && *s > 0.0)
        .collect();
    let choices: &[f64] = if configured.is_empty() {
        &SPEED_CHOICES
    } else {
        &configured
    };
    let speed = choices.choose(rng).copied().unwrap_or(1.0);
    EffectStep::SpeedChange { speed }
}

fn derive_stutter(settings: &EffectSettings, _: &PlanContext, rng: &mut dyn RngCore) -> EffectStep {
    let min = settings
        .param_u64("min_repeats")
        .map(|v| v.clamp(1, u32::MAX as u64) as u32)
        .unwrap_or(STUTTER_MIN_REPEATS);
    let max = settings
        .param_u64("max_repeats")
        .map(|v| v.min(u32::MAX as u64) as u32)
        .unwrap_or(STUTTER_MAX_REPEATS)
        .max(min);
    EffectStep::StutterLoop {
        repeats: rng.gen_range(min..=max),
    }
}

fn derive_shuffle(settings: &EffectSettings, _: &PlanContext, rng: &mut dyn RngCore) -> EffectStep {
    let max_frames = settings
        .param_u64("max_frames")
        .map(|v| v.max(1) as usize)
        .unwrap_or(FRAME_SHUFFLE_MAX_FRAMES);
    EffectStep::FrameShuffle {
        max_frames,
        shuffle_seed: rng.next_u64(),
    }
}

fn derive_chorus(_: &EffectSettings, _: &PlanContext, _: &mut dyn RngCore) -> EffectStep {
    EffectStep::Chorus
}

fn derive_earrape(settings: &EffectSettings, _: &PlanContext, _: &mut dyn RngCore) -> EffectStep {
    EffectStep::Earrape {
        gain_db: settings.param_f64("gain_db").unwrap_or(EARRAPE_GAIN_DB),
    }
}

fn derive_overlay(settings: &EffectSettings, ctx: &PlanContext, _: &mut dyn RngCore) -> EffectStep {
    EffectStep::RainbowOverlay {
        overlay: ctx.overlay_asset.clone().unwrap_or_default(),
        x: settings.param_i64("x").unwrap_or(0),
        y: settings.param_i64("y").unwrap_or(0),
    }
}

const fn row(family: EffectFamily, gate: Gate, derive: Derive) -> FamilyDescriptor {
    FamilyDescriptor {
        family,
        gate,
        derive,
    }
}

pub static CHAIN: [FamilyDescriptor; 9] = [
    row(EffectFamily::Invert, always, derive_invert),
    row(EffectFamily::Mirror, always, derive_mirror),
    row(EffectFamily::Reverse, always, derive_reverse),
    row(EffectFamily::SpeedChange, always, derive_speed),
    row(EffectFamily::StutterLoop, always, derive_stutter),
    row(EffectFamily::FrameShuffle, always, derive_shuffle),
    row(EffectFamily::Chorus, always, derive_chorus),
    row(EffectFamily::Earrape, always, derive_earrape),
    row(EffectFamily::RainbowOverlay, overlay_present, derive_overlay),
];

/// Run the Bernoulli trial for every family in chain order and derive the
/// parameters of those that fire.
///
/// Disabled or gated-off families are skipped without consuming randomness,
/// so toggling one family never reshuffles the draws of the others.
pub fn plan_chain<R: Rng>(config: &Config, ctx: &PlanContext, rng: &mut R) -> Vec<EffectStep> {
    let mut steps = Vec::new();

    for descriptor in CHAIN.iter() {
        let settings = config.effect(descriptor.family);
        if !settings.enabled {
            debug!("[CHAIN] {} disabled", descriptor.family);
            continue;
        }
        if !(descriptor.gate)(ctx) {
            debug!("[CHAIN] {} gated off", descriptor.family);
            continue;
        }

        let sample: f64 = rng.gen();
        if sample < settings.probability {
            let step = (descriptor.derive)(&settings, ctx, rng);
            debug!(
                "[CHAIN] {} fired (sample {:.3} < {})",
                descriptor.family, sample, settings.probability
            );
            steps.push(step);
        }
    }

    steps
}
