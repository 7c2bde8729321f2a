//! Formation algorithm plugin interface
//!
//! Every concrete algorithm implements [`FormationAlgorithm`] and is chosen
//! at configuration time through [`AlgorithmKind`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use swarmform_common::{
    FormationError, FormationOffsets, FormationResult, InputError, Result, StateMatrix, Topology,
};

use crate::controller::{CancellationToken, ConsensusFormationSolver, LeaderFollowerController};
use crate::descriptor::AlgorithmDescriptor;
use crate::trajectory::Trajectory;
use crate::ConsensusConfig;

/// Extra algorithm-specific input carried on a problem
#[derive(Debug, Clone, PartialEq)]
pub enum AuxiliaryInput {
    /// Initial velocities (N x d) for second-order controllers
    Velocities(StateMatrix),
    /// Named scalar overriding a configuration parameter
    Scalar { name: String, value: f64 },
}

impl AuxiliaryInput {
    pub fn scalar(name: impl Into<String>, value: f64) -> Self {
        AuxiliaryInput::Scalar {
            name: name.into(),
            value,
        }
    }
}

/// Everything an algorithm needs for one computation
#[derive(Clone)]
pub struct FormationProblem {
    pub topology: Topology,
    pub trajectory: Option<Arc<dyn Trajectory>>,
    pub initial_states: StateMatrix,
    pub offsets: Option<FormationOffsets>,
    pub auxiliary: Vec<AuxiliaryInput>,
}

impl FormationProblem {
    pub fn new(topology: Topology, initial_states: StateMatrix) -> Self {
        Self {
            topology,
            trajectory: None,
            initial_states,
            offsets: None,
            auxiliary: Vec::new(),
        }
    }

    pub fn with_trajectory(mut self, trajectory: impl Trajectory + 'static) -> Self {
        self.trajectory = Some(Arc::new(trajectory));
        self
    }

    pub fn with_offsets(mut self, offsets: FormationOffsets) -> Self {
        self.offsets = Some(offsets);
        self
    }

    pub fn with_auxiliary(mut self, input: AuxiliaryInput) -> Self {
        self.auxiliary.push(input);
        self
    }

    /// The reference trajectory, or `MissingTrajectory`
    pub fn trajectory(&self) -> std::result::Result<&dyn Trajectory, InputError> {
        self.trajectory
            .as_deref()
            .ok_or(InputError::MissingTrajectory)
    }

    /// First velocity block among the auxiliary inputs
    pub fn initial_velocities(&self) -> Option<&StateMatrix> {
        self.auxiliary.iter().find_map(|input| match input {
            AuxiliaryInput::Velocities(v) => Some(v),
            _ => None,
        })
    }
}

impl fmt::Debug for FormationProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormationProblem")
            .field("agents", &self.initial_states.agent_count())
            .field("dimension", &self.initial_states.dimension())
            .field("has_trajectory", &self.trajectory.is_some())
            .field("has_offsets", &self.offsets.is_some())
            .field("auxiliary", &self.auxiliary.len())
            .finish()
    }
}

/// A formation control algorithm with a single compute operation
pub trait FormationAlgorithm: Send + Sync {
    /// Registry name
    fn name(&self) -> &'static str;

    /// Metadata describing inputs and outputs
    fn descriptor(&self) -> AlgorithmDescriptor;

    /// Compute target positions and formation error
    fn compute(&self, problem: &FormationProblem) -> Result<FormationResult> {
        self.compute_with_cancellation(problem, &CancellationToken::new())
    }

    /// As [`compute`](Self::compute), checking `cancel` once per iteration
    fn compute_with_cancellation(
        &self,
        problem: &FormationProblem,
        cancel: &CancellationToken,
    ) -> Result<FormationResult>;
}

impl FormationAlgorithm for ConsensusFormationSolver {
    fn name(&self) -> &'static str {
        AlgorithmKind::Consensus.as_str()
    }

    fn descriptor(&self) -> AlgorithmDescriptor {
        AlgorithmDescriptor::consensus()
    }

    fn compute_with_cancellation(
        &self,
        problem: &FormationProblem,
        cancel: &CancellationToken,
    ) -> Result<FormationResult> {
        let trajectory = problem.trajectory()?;
        let config = self.config().with_overrides(&problem.auxiliary);
        let mut solver = ConsensusFormationSolver::new(config);
        if let Some(offsets) = &problem.offsets {
            solver = solver.with_offsets(offsets.clone());
        } else if let Some(offsets) = self.offsets() {
            solver = solver.with_offsets(offsets.clone());
        }
        solver.solve_with_cancellation(
            &problem.topology,
            trajectory,
            &problem.initial_states,
            cancel,
        )
    }
}

impl FormationAlgorithm for LeaderFollowerController {
    fn name(&self) -> &'static str {
        AlgorithmKind::LeaderFollower.as_str()
    }

    fn descriptor(&self) -> AlgorithmDescriptor {
        AlgorithmDescriptor::leader_follower()
    }

    fn compute_with_cancellation(
        &self,
        problem: &FormationProblem,
        cancel: &CancellationToken,
    ) -> Result<FormationResult> {
        let trajectory = problem.trajectory()?;
        let mut controller =
            LeaderFollowerController::new(self.config().with_overrides(&problem.auxiliary));
        if let Some(offsets) = &problem.offsets {
            controller = controller.with_offsets(offsets.clone());
        } else if let Some(offsets) = self.offsets() {
            controller = controller.with_offsets(offsets.clone());
        }
        controller.run_with_cancellation(
            &problem.topology,
            trajectory,
            &problem.initial_states,
            problem.initial_velocities(),
            cancel,
        )
    }
}

/// Algorithms selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    Consensus,
    LeaderFollower,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 2] = [AlgorithmKind::Consensus, AlgorithmKind::LeaderFollower];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmKind::Consensus => "consensus",
            AlgorithmKind::LeaderFollower => "leader_follower",
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlgorithmKind {
    type Err = FormationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "consensus" => Ok(AlgorithmKind::Consensus),
            "leader_follower" => Ok(AlgorithmKind::LeaderFollower),
            other => Err(FormationError::Config(format!(
                "unknown formation algorithm: {other}"
            ))),
        }
    }
}

/// Instantiate the configured algorithm
pub fn build_algorithm(
    kind: AlgorithmKind,
    config: &ConsensusConfig,
) -> Box<dyn FormationAlgorithm> {
    match kind {
        AlgorithmKind::Consensus => Box::new(ConsensusFormationSolver::new(config.clone())),
        AlgorithmKind::LeaderFollower => Box::new(LeaderFollowerController::new(config.clone())),
    }
}
