//! Experiment runner configuration

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use swarmform_common::{DEFAULT_WEDGE_ALTITUDE_STEP, DEFAULT_WEDGE_SPACING};

use crate::algorithm::AlgorithmKind;
use crate::controller::ConsensusStep;
use crate::ConsensusConfig;

/// Version reported in algorithm descriptors
pub const ALGORITHM_VERSION: &str = "1.4";

/// Default heartbeat period
pub const DEFAULT_STATUS_INTERVAL_SECS: u64 = 30;

/// Prefix for all environment overrides
pub const ENV_PREFIX: &str = "SWARMFORM_";

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Which formation algorithm to run
    pub algorithm: AlgorithmKind,
    /// Solver parameters
    pub solver: ConsensusConfig,
    /// Experiment generation
    pub experiments: ExperimentSettings,
    /// Report destinations
    pub sink: SinkSettings,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmKind::LeaderFollower,
            solver: ConsensusConfig::default(),
            experiments: ExperimentSettings::default(),
            sink: SinkSettings::default(),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from `.env` and the process environment
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Apply `SWARMFORM_*` overrides from an arbitrary source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut cfg = Self::default();

        if let Some(val) = get("ALGORITHM") {
            match val.parse() {
                Ok(kind) => cfg.algorithm = kind,
                Err(e) => warn!(value = %val, error = %e, "Ignoring SWARMFORM_ALGORITHM"),
            }
        }

        // Solver settings
        parse_into(get("TRACKING_GAIN"), &mut cfg.solver.tracking_gain);
        parse_into(get("TOLERANCE"), &mut cfg.solver.tolerance);
        parse_into(get("MAX_ITERATIONS"), &mut cfg.solver.max_iterations);
        parse_into(get("DT"), &mut cfg.solver.time_step);
        parse_into(get("VELOCITY_DAMPING"), &mut cfg.solver.velocity_damping);
        parse_into(get("INTEGRAL_GAIN"), &mut cfg.solver.integral_gain);
        if let Some(val) = get("CONSENSUS_STEP") {
            if val.eq_ignore_ascii_case("perron") {
                cfg.solver.consensus_step = ConsensusStep::Perron;
            } else if let Ok(epsilon) = val.parse() {
                cfg.solver.consensus_step = ConsensusStep::Fixed(epsilon);
            }
        }

        // Experiment settings
        parse_into(get("NUM_EXPERIMENTS"), &mut cfg.experiments.num_experiments);
        parse_into(get("NUM_AGENTS"), &mut cfg.experiments.num_agents);
        parse_into(get("SEED_BASE"), &mut cfg.experiments.seed_base);

        // Sink settings
        if let Some(addr) = get("SINK_ADDR").filter(|a| !a.trim().is_empty()) {
            cfg.sink.addr = Some(addr.trim().to_string());
        }
        if let Some(url) = get("STATUS_URL").filter(|u| !u.trim().is_empty()) {
            cfg.sink.status_url = Some(url.trim().to_string());
        }
        parse_into(get("STATUS_INTERVAL"), &mut cfg.sink.status_interval_secs);

        cfg.solver
            .validate()
            .context("invalid solver configuration")?;
        ensure!(
            cfg.sink.status_interval_secs > 0,
            "SWARMFORM_STATUS_INTERVAL must be at least one second"
        );
        Ok(cfg)
    }
}

fn parse_into<T: std::str::FromStr>(raw: Option<String>, slot: &mut T) {
    if let Some(v) = raw.and_then(|raw| raw.trim().parse().ok()) {
        *slot = v;
    }
}

/// Seeded experiment generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSettings {
    /// Number of experiments per run
    pub num_experiments: usize,
    /// Agents per formation
    pub num_agents: usize,
    /// Experiment e uses seed `seed_base + e`
    pub seed_base: u64,
    /// Initial positions are drawn from [0, spawn_extent)^3
    pub spawn_extent: f64,
    /// Wedge rank spacing
    pub spacing: f64,
    /// Wedge altitude drop per rank
    pub altitude_step: f64,
    /// Reference velocity of the virtual centre
    pub leader_velocity: [f64; 3],
}

impl Default for ExperimentSettings {
    fn default() -> Self {
        let planar = 5.0 / std::f64::consts::SQRT_2;
        Self {
            num_experiments: 5,
            num_agents: 5,
            seed_base: 200,
            spawn_extent: 10.0,
            spacing: DEFAULT_WEDGE_SPACING,
            altitude_step: DEFAULT_WEDGE_ALTITUDE_STEP,
            leader_velocity: [planar, planar, 1.0],
        }
    }
}

/// Report destinations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkSettings {
    /// TCP collector as host:port; reports go to stdout only when unset
    pub addr: Option<String>,
    /// HTTP endpoint receiving the status heartbeat; disabled when unset
    pub status_url: Option<String>,
    /// Seconds between heartbeats
    pub status_interval_secs: u64,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            addr: None,
            status_url: None,
            status_interval_secs: DEFAULT_STATUS_INTERVAL_SECS,
        }
    }
}
