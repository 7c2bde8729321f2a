//! Consensus formation solver
//!
//! Synchronous discrete-time consensus with reference tracking:
//!
//! ```text
//! x_i(k+1) = x_i(k)
//!          + ε · Σ_j a_ij · (x_j(k) − x_i(k) − offset_ij)
//!          + g · (r(t_k) + c_i − x_i(k))
//! ```
//!
//! Every step reads the full previous snapshot and writes the next one,
//! so per-agent updates are independent of evaluation order.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use swarmform_common::{
    FormationError, FormationOffsets, FormationResult, InputError, Result, StateMatrix, Topology,
};

use super::cancel::CancellationToken;
use crate::trajectory::Trajectory;
use crate::ConsensusConfig;

/// Step size ε applied to the neighbour correction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusStep {
    /// ε = 1 / (1 + max weighted in-degree)
    Perron,
    /// Caller-chosen ε; 1.0 applies the raw correction
    Fixed(f64),
}

impl ConsensusStep {
    /// Concrete ε for a topology
    pub fn resolve(&self, topology: &Topology) -> f64 {
        match self {
            ConsensusStep::Perron => 1.0 / (1.0 + topology.max_in_degree()),
            ConsensusStep::Fixed(epsilon) => *epsilon,
        }
    }
}

/// How per-agent deviations are aggregated into one scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorNorm {
    Rms,
    Max,
}

/// What "the formation stopped moving" means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceCriterion {
    /// max_i ‖x_i(k+1) − x_i(k)‖
    Displacement,
    /// max_i ‖Δx_i − Δr_i‖, for references that keep moving
    RelativeToReference,
}

/// Consensus-based formation solver
///
/// Pure: every call validates, iterates from the given initial states,
/// and returns a fresh result. Nothing is retained between calls.
#[derive(Debug, Clone)]
pub struct ConsensusFormationSolver {
    config: ConsensusConfig,
    offsets: Option<FormationOffsets>,
}

impl Default for ConsensusFormationSolver {
    fn default() -> Self {
        Self::new(ConsensusConfig::default())
    }
}

impl ConsensusFormationSolver {
    pub fn new(config: ConsensusConfig) -> Self {
        Self {
            config,
            offsets: None,
        }
    }

    /// Desired geometry; all agents share the centre when unset
    pub fn with_offsets(mut self, offsets: FormationOffsets) -> Self {
        self.offsets = Some(offsets);
        self
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    pub fn offsets(&self) -> Option<&FormationOffsets> {
        self.offsets.as_ref()
    }

    /// Drive the formation until it settles or the iteration bound is hit
    pub fn solve(
        &self,
        topology: &Topology,
        trajectory: &dyn Trajectory,
        initial_states: &StateMatrix,
    ) -> Result<FormationResult> {
        self.solve_with_cancellation(
            topology,
            trajectory,
            initial_states,
            &CancellationToken::new(),
        )
    }

    /// As [`solve`](Self::solve), checking `cancel` before every step
    pub fn solve_with_cancellation(
        &self,
        topology: &Topology,
        trajectory: &dyn Trajectory,
        initial_states: &StateMatrix,
        cancel: &CancellationToken,
    ) -> Result<FormationResult> {
        let offsets = self.validate(topology, initial_states)?;
        let config = &self.config;
        let n = initial_states.agent_count();
        let d = initial_states.dimension();
        let epsilon = config.consensus_step.resolve(topology);

        debug!(
            agents = n,
            dimension = d,
            epsilon,
            tracking_gain = config.tracking_gain,
            max_iterations = config.max_iterations,
            "Starting consensus solve"
        );

        let mut time = config.start_time;
        let mut reference = reference_at(trajectory, time, n, d)?;
        let mut current = initial_states.clone();
        let mut next = initial_states.clone();
        let mut error_history = Vec::with_capacity(config.max_iterations.min(4096));
        let mut displacement = f64::INFINITY;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < config.max_iterations {
            if cancel.is_cancelled() {
                debug!(iterations, "Consensus solve cancelled");
                return Err(FormationError::Cancelled { iterations });
            }

            self.step(topology, &offsets, epsilon, &reference, &current, &mut next);
            iterations += 1;

            let next_time = config.start_time + iterations as f64 * config.time_step;
            let next_reference = reference_at(trajectory, next_time, n, d)?;

            displacement = match config.convergence {
                ConvergenceCriterion::Displacement => next.max_row_distance(&current),
                ConvergenceCriterion::RelativeToReference => (0..n)
                    .map(|i| {
                        let moved = next.agent(i) - current.agent(i);
                        let shifted = &next_reference[i] - &reference[i];
                        (moved - shifted).norm()
                    })
                    .fold(0.0, f64::max),
            };

            std::mem::swap(&mut current, &mut next);
            time = next_time;
            reference = next_reference;
            error_history.push(self.formation_error(&current, &reference, &offsets));

            if displacement < config.tolerance {
                converged = true;
                break;
            }
        }

        let formation_error = error_history
            .last()
            .copied()
            .unwrap_or_else(|| self.formation_error(&current, &reference, &offsets));

        if converged {
            debug!(iterations, formation_error, "Consensus solve converged");
        } else {
            warn!(
                iterations,
                displacement, formation_error, "Consensus solve hit iteration bound"
            );
        }

        Ok(FormationResult {
            positions: current.into_matrix(),
            formation_error,
            success: converged,
            iterations,
            final_displacement: displacement,
            final_time: time,
            error_history,
        })
    }

    /// Fail fast on anything that would make iteration meaningless
    fn validate(
        &self,
        topology: &Topology,
        states: &StateMatrix,
    ) -> std::result::Result<FormationOffsets, InputError> {
        self.config.validate()?;
        states.validate()?;

        if topology.agent_count() != states.agent_count() {
            return Err(InputError::AgentCountMismatch {
                topology: topology.agent_count(),
                states: states.agent_count(),
            });
        }

        let offsets = self
            .offsets
            .clone()
            .unwrap_or_else(|| FormationOffsets::zeros(states.agent_count(), states.dimension()));
        offsets.check_shape(states)?;
        Ok(offsets)
    }

    /// One synchronous update from `current` into `next`
    fn step(
        &self,
        topology: &Topology,
        offsets: &FormationOffsets,
        epsilon: f64,
        reference: &[DVector<f64>],
        current: &StateMatrix,
        next: &mut StateMatrix,
    ) {
        let gain = self.config.tracking_gain;

        for i in 0..current.agent_count() {
            let x_i = current.agent(i);
            let mut correction = DVector::<f64>::zeros(x_i.len());

            for (j, weight) in topology.neighbors(i) {
                correction += (current.agent(j) - &x_i - offsets.pairwise(i, j)) * weight;
            }

            let tracking = (&reference[i] + offsets.center_offset(i) - &x_i) * gain;
            next.set_agent(i, &(&x_i + correction * epsilon + tracking));
        }
    }

    /// Aggregate ‖x_i − r_i − c_i‖ with the configured norm
    fn formation_error(
        &self,
        states: &StateMatrix,
        reference: &[DVector<f64>],
        offsets: &FormationOffsets,
    ) -> f64 {
        let deviations = (0..states.agent_count())
            .map(|i| (states.agent(i) - &reference[i] - offsets.center_offset(i)).norm());

        match self.config.error_norm {
            ErrorNorm::Rms => {
                let n = states.agent_count() as f64;
                (deviations.map(|e| e * e).sum::<f64>() / n).sqrt()
            }
            ErrorNorm::Max => deviations.fold(0.0, f64::max),
        }
    }
}

/// Evaluate the per-agent reference and check its shape
fn reference_at(
    trajectory: &dyn Trajectory,
    time: f64,
    agents: usize,
    dimension: usize,
) -> std::result::Result<Vec<DVector<f64>>, InputError> {
    (0..agents)
        .map(|i| {
            let r = trajectory.agent_position(time, i);
            if r.len() != dimension {
                return Err(InputError::TrajectoryDimension {
                    expected: dimension,
                    actual: r.len(),
                });
            }
            if r.iter().any(|v| !v.is_finite()) {
                return Err(InputError::NonFiniteTrajectory { time });
            }
            Ok(r)
        })
        .collect()
}
