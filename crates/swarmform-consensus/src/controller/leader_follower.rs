//! Leader-follower formation controller
//!
//! Agent 0 leads and flies the reference velocity. Every follower j runs a
//! second-order consensus law with integral action over its neighbours p:
//!
//! ```text
//! e    = (x_j − c_j) − (x_p − c_p)
//! I_j += e · dt
//! u_j -= a_jp · (e + α (v_j − v_p) + k_i I_j)
//! v_j += u_j · dt
//! x_j += v_j · dt
//! ```
//!
//! The formation error is measured relative to the leader:
//! `Σ_i ‖(x_i − x_0) − (c_i − c_0)‖²`.

use nalgebra::DVector;
use tracing::{debug, warn};

use swarmform_common::{
    FormationError, FormationOffsets, FormationResult, InputError, Result, StateMatrix, Topology,
};

use super::cancel::CancellationToken;
use crate::trajectory::Trajectory;
use crate::ConsensusConfig;

/// Second-order leader-follower controller
#[derive(Debug, Clone)]
pub struct LeaderFollowerController {
    config: ConsensusConfig,
    offsets: Option<FormationOffsets>,
}

impl Default for LeaderFollowerController {
    fn default() -> Self {
        Self::new(ConsensusConfig::default())
    }
}

impl LeaderFollowerController {
    pub fn new(config: ConsensusConfig) -> Self {
        Self {
            config,
            offsets: None,
        }
    }

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

    /// Fly the formation; stops early once the error drops below tolerance
    pub fn run(
        &self,
        topology: &Topology,
        trajectory: &dyn Trajectory,
        initial_positions: &StateMatrix,
        initial_velocities: Option<&StateMatrix>,
    ) -> Result<FormationResult> {
        self.run_with_cancellation(
            topology,
            trajectory,
            initial_positions,
            initial_velocities,
            &CancellationToken::new(),
        )
    }

    pub fn run_with_cancellation(
        &self,
        topology: &Topology,
        trajectory: &dyn Trajectory,
        initial_positions: &StateMatrix,
        initial_velocities: Option<&StateMatrix>,
        cancel: &CancellationToken,
    ) -> Result<FormationResult> {
        let offsets = self.validate(topology, initial_positions, initial_velocities)?;
        let config = &self.config;
        let n = initial_positions.agent_count();
        let d = initial_positions.dimension();
        let dt = config.time_step;

        if !topology.has_spanning_tree(0) {
            warn!(agents = n, "Leader does not reach every follower");
        }
        debug!(
            agents = n,
            dimension = d,
            damping = config.velocity_damping,
            integral_gain = config.integral_gain,
            "Starting leader-follower run"
        );

        let mut positions = initial_positions.clone();
        let mut velocities = initial_velocities
            .cloned()
            .unwrap_or_else(|| StateMatrix::zeros(n, d));
        let mut next_positions = positions.clone();
        let mut next_velocities = velocities.clone();
        let mut integral = vec![DVector::<f64>::zeros(d); n];

        let mut error_history = Vec::with_capacity(config.max_iterations.min(4096));
        let mut displacement = f64::INFINITY;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < config.max_iterations {
            if cancel.is_cancelled() {
                debug!(iterations, "Leader-follower run cancelled");
                return Err(FormationError::Cancelled { iterations });
            }

            let t = config.start_time + iterations as f64 * dt;
            let leader_velocity = trajectory.velocity(t, dt);
            if leader_velocity.len() != d {
                return Err(InputError::TrajectoryDimension {
                    expected: d,
                    actual: leader_velocity.len(),
                }
                .into());
            }
            if leader_velocity.iter().any(|v| !v.is_finite()) {
                return Err(InputError::NonFiniteTrajectory { time: t }.into());
            }

            next_velocities.set_agent(0, &leader_velocity);
            next_positions.set_agent(0, &(positions.agent(0) + &leader_velocity * dt));

            for j in 1..n {
                let x_j = positions.agent(j);
                let v_j = velocities.agent(j);
                let slot_j = &x_j - offsets.center_offset(j);
                let mut u = DVector::<f64>::zeros(d);

                for (p, weight) in topology.neighbors(j) {
                    let e = &slot_j - (positions.agent(p) - offsets.center_offset(p));
                    integral[j] += &e * dt;
                    let damping = (&v_j - velocities.agent(p)) * config.velocity_damping;
                    u -= (e + damping + &integral[j] * config.integral_gain) * weight;
                }

                let v_next = &v_j + u * dt;
                next_positions.set_agent(j, &(&x_j + &v_next * dt));
                next_velocities.set_agent(j, &v_next);
            }

            iterations += 1;
            displacement = next_positions.max_row_distance(&positions);
            std::mem::swap(&mut positions, &mut next_positions);
            std::mem::swap(&mut velocities, &mut next_velocities);

            let error = relative_error(&positions, &offsets);
            error_history.push(error);
            if error < config.tolerance {
                converged = true;
                break;
            }
        }

        let formation_error = error_history
            .last()
            .copied()
            .unwrap_or_else(|| relative_error(&positions, &offsets));

        if converged {
            debug!(iterations, formation_error, "Leader-follower run converged");
        } else {
            warn!(iterations, formation_error, "Leader-follower run hit iteration bound");
        }

        Ok(FormationResult {
            positions: positions.into_matrix(),
            formation_error,
            success: converged,
            iterations,
            final_displacement: displacement,
            final_time: config.start_time + iterations as f64 * dt,
            error_history,
        })
    }

    fn validate(
        &self,
        topology: &Topology,
        positions: &StateMatrix,
        velocities: Option<&StateMatrix>,
    ) -> std::result::Result<FormationOffsets, InputError> {
        self.config.validate()?;
        positions.validate()?;

        if topology.agent_count() != positions.agent_count() {
            return Err(InputError::AgentCountMismatch {
                topology: topology.agent_count(),
                states: positions.agent_count(),
            });
        }

        if let Some(v) = velocities {
            if v.agent_count() != positions.agent_count() || v.dimension() != positions.dimension()
            {
                return Err(InputError::ShapeMismatch {
                    what: "Velocities",
                    rows: v.agent_count(),
                    cols: v.dimension(),
                    expected_rows: positions.agent_count(),
                    expected_cols: positions.dimension(),
                });
            }
        }

        let offsets = self.offsets.clone().unwrap_or_else(|| {
            FormationOffsets::zeros(positions.agent_count(), positions.dimension())
        });
        offsets.check_shape(positions)?;
        Ok(offsets)
    }
}

/// Σ_i ‖(x_i − x_0) − (c_i − c_0)‖²
fn relative_error(positions: &StateMatrix, offsets: &FormationOffsets) -> f64 {
    let head = positions.agent(0);
    let head_offset = offsets.center_offset(0);
    (0..positions.agent_count())
        .map(|i| {
            let actual = positions.agent(i) - &head;
            let desired = offsets.center_offset(i) - &head_offset;
            (actual - desired).norm_squared()
        })
        .sum()
}
