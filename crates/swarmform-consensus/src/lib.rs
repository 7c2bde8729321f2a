//! # SwarmForm Consensus
//!
//! Consensus-based formation control for multi-UAV swarms.
//!
//! ## Update Law
//!
//! ```text
//! x_i(k+1) = x_i(k) + ε Σ_j a_ij (x_j − x_i − offset_ij) + g (r(t_k) + c_i − x_i)
//! ```
//!
//! Where:
//! - a_ij: topology weight (agent i listens to agent j)
//! - ε: consensus step (Perron weighting by default)
//! - g: tracking gain toward the reference trajectory r
//! - c_i: agent i's offset from the virtual centre
//!
//! ## Algorithms
//!
//! - [`ConsensusFormationSolver`]: first-order consensus with reference tracking
//! - [`LeaderFollowerController`]: second-order leader-follower law with integral action
//!
//! Both implement [`FormationAlgorithm`] and are selected through
//! [`AlgorithmKind`] at configuration time.

pub mod algorithm;
pub mod config;
pub mod controller;
pub mod descriptor;
pub mod experiment;
pub mod report;
pub mod status;
pub mod trajectory;

use serde::{Deserialize, Serialize};
use tracing::warn;

use swarmform_common::{
    InputError, DEFAULT_MAX_ITERATIONS, DEFAULT_TIME_STEP, DEFAULT_TOLERANCE,
    DEFAULT_TRACKING_GAIN,
};

pub use algorithm::{
    build_algorithm, AlgorithmKind, AuxiliaryInput, FormationAlgorithm, FormationProblem,
};
pub use controller::{
    CancellationToken, ConsensusFormationSolver, ConsensusStep, ConvergenceCriterion, ErrorNorm,
    LeaderFollowerController,
};
pub use descriptor::{AlgorithmDescriptor, PortDef, PortKind};
pub use trajectory::{
    CircularTrajectory, ConstantTrajectory, FnTrajectory, LinearTrajectory, Trajectory,
};

/// Default velocity damping α for the leader-follower law
pub const DEFAULT_VELOCITY_DAMPING: f64 = 2.0;

/// Default integral gain for the leader-follower law
pub const DEFAULT_INTEGRAL_GAIN: f64 = 0.1;

/// Solver configuration shared by all formation algorithms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Gain g pulling each agent toward its reference slot, in [0, 1]
    pub tracking_gain: f64,
    /// Step size ε for neighbour corrections
    pub consensus_step: ConsensusStep,
    /// Convergence threshold
    pub tolerance: f64,
    /// Iteration bound
    pub max_iterations: usize,
    /// Control period dt in seconds
    pub time_step: f64,
    /// Reference time of the initial states
    pub start_time: f64,
    /// Aggregation of per-agent deviations
    pub error_norm: ErrorNorm,
    /// Stopping rule
    pub convergence: ConvergenceCriterion,
    /// Leader-follower velocity damping α
    pub velocity_damping: f64,
    /// Leader-follower integral gain
    pub integral_gain: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            tracking_gain: DEFAULT_TRACKING_GAIN,
            consensus_step: ConsensusStep::Perron,
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            time_step: DEFAULT_TIME_STEP,
            start_time: 0.0,
            error_norm: ErrorNorm::Rms,
            convergence: ConvergenceCriterion::Displacement,
            velocity_damping: DEFAULT_VELOCITY_DAMPING,
            integral_gain: DEFAULT_INTEGRAL_GAIN,
        }
    }
}

impl ConsensusConfig {
    /// Reject parameters that make iteration meaningless
    pub fn validate(&self) -> Result<(), InputError> {
        fn check(name: &'static str, value: f64, ok: bool) -> Result<(), InputError> {
            if value.is_finite() && ok {
                Ok(())
            } else {
                Err(InputError::Parameter { name, value })
            }
        }

        check(
            "tracking_gain",
            self.tracking_gain,
            (0.0..=1.0).contains(&self.tracking_gain),
        )?;
        if let ConsensusStep::Fixed(epsilon) = self.consensus_step {
            check("consensus_step", epsilon, epsilon > 0.0)?;
        }
        check("tolerance", self.tolerance, self.tolerance > 0.0)?;
        check(
            "max_iterations",
            self.max_iterations as f64,
            self.max_iterations >= 1,
        )?;
        check("time_step", self.time_step, self.time_step > 0.0)?;
        check("start_time", self.start_time, self.start_time >= 0.0)?;
        check(
            "velocity_damping",
            self.velocity_damping,
            self.velocity_damping >= 0.0,
        )?;
        check("integral_gain", self.integral_gain, self.integral_gain >= 0.0)?;
        Ok(())
    }

    /// Apply named scalar overrides carried on a problem
    pub fn with_overrides(&self, auxiliary: &[AuxiliaryInput]) -> Self {
        let mut config = self.clone();
        for input in auxiliary {
            let AuxiliaryInput::Scalar { name, value } = input else {
                continue;
            };
            match name.as_str() {
                "tracking_gain" => config.tracking_gain = *value,
                "consensus_step" => config.consensus_step = ConsensusStep::Fixed(*value),
                "tolerance" => config.tolerance = *value,
                "max_iterations" => match whole_count(*value) {
                    Some(count) => config.max_iterations = count,
                    None => warn!(value, "Ignoring non-integral max_iterations override"),
                },
                "time_step" => config.time_step = *value,
                "start_time" => config.start_time = *value,
                "velocity_damping" => config.velocity_damping = *value,
                "integral_gain" => config.integral_gain = *value,
                other => warn!(name = other, value, "Ignoring unknown scalar override"),
            }
        }
        config
    }
}

/// `value` as a count, if it is a non-negative whole number that fits
fn whole_count(value: f64) -> Option<usize> {
    let in_range = value >= 0.0 && value <= u32::MAX as f64;
    (in_range && value.fract() == 0.0).then_some(value as usize)
}
