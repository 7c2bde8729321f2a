//! Seeded formation experiments
//!
//! Experiment `e` of a run draws its initial positions from
//! `StdRng::seed_from_u64(seed_base + e)`, so a run is reproducible from its
//! settings alone.

use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};
use uuid::Uuid;

use swarmform_common::{FormationOffsets, Result, StateMatrix, Topology};

use crate::algorithm::{FormationAlgorithm, FormationProblem};
use crate::config::ExperimentSettings;
use crate::controller::CancellationToken;
use crate::report::ExperimentReport;
use crate::trajectory::LinearTrajectory;

/// Spatial dimension of generated experiments
pub const EXPERIMENT_DIMENSION: usize = 3;

/// Seed used for experiment `experiment`
pub fn experiment_seed(settings: &ExperimentSettings, experiment: usize) -> u64 {
    settings.seed_base.wrapping_add(experiment as u64)
}

/// Build the wedge problem for one experiment
pub fn build_problem(settings: &ExperimentSettings, experiment: usize) -> Result<FormationProblem> {
    let mut rng = StdRng::seed_from_u64(experiment_seed(settings, experiment));
    let rows: Vec<Vec<f64>> = (0..settings.num_agents)
        .map(|_| {
            (0..EXPERIMENT_DIMENSION)
                .map(|_| rng.gen::<f64>() * settings.spawn_extent)
                .collect()
        })
        .collect();
    let positions = StateMatrix::from_rows(&rows)?;

    let offsets =
        FormationOffsets::wedge(settings.num_agents, settings.spacing, settings.altitude_step);

    // The virtual centre starts where the leader's slot is
    let origin = positions.agent(0) - offsets.center_offset(0);
    let trajectory = LinearTrajectory::new(
        origin,
        DVector::from_column_slice(&settings.leader_velocity),
    );

    Ok(FormationProblem::new(Topology::wedge(settings.num_agents), positions)
        .with_trajectory(trajectory)
        .with_offsets(offsets))
}

/// Run one experiment and package the outcome
pub fn run_experiment(
    algorithm: &dyn FormationAlgorithm,
    settings: &ExperimentSettings,
    experiment: usize,
    run_id: Uuid,
    cancel: &CancellationToken,
) -> Result<ExperimentReport> {
    let seed = experiment_seed(settings, experiment);
    let problem = build_problem(settings, experiment)?;
    debug!(experiment, seed, ?problem, "Experiment prepared");

    let result = algorithm.compute_with_cancellation(&problem, cancel)?;
    info!(
        experiment,
        seed,
        algorithm = algorithm.name(),
        success = result.success,
        iterations = result.iterations,
        formation_error = result.formation_error,
        "Experiment finished"
    );

    Ok(ExperimentReport::from_result(
        run_id,
        experiment,
        seed,
        algorithm.name(),
        &result,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{build_algorithm, AlgorithmKind};
    use crate::ConsensusConfig;
    use swarmform_common::FormationError;

    #[test]
    fn test_problem_is_reproducible() {
        let settings = ExperimentSettings::default();
        let a = build_problem(&settings, 2).unwrap();
        let b = build_problem(&settings, 2).unwrap();
        let c = build_problem(&settings, 3).unwrap();

        assert_eq!(a.initial_states, b.initial_states);
        assert_ne!(a.initial_states, c.initial_states);
        assert_eq!(experiment_seed(&settings, 2), 202);
    }

    #[test]
    fn test_positions_within_extent() {
        let settings = ExperimentSettings::default();
        let problem = build_problem(&settings, 0).unwrap();
        let states = problem.initial_states.as_matrix();

        assert_eq!(states.nrows(), 5);
        assert_eq!(states.ncols(), EXPERIMENT_DIMENSION);
        assert!(states.iter().all(|v| (0.0..10.0).contains(v)));
    }

    #[test]
    fn test_zero_agents_rejected() {
        let settings = ExperimentSettings {
            num_agents: 0,
            ..ExperimentSettings::default()
        };
        let err = build_problem(&settings, 0).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_leader_follower_experiment_reports() {
        let config = ConsensusConfig {
            max_iterations: 3000,
            ..ConsensusConfig::default()
        };
        let algorithm = build_algorithm(AlgorithmKind::LeaderFollower, &config);
        let run_id = Uuid::now_v7();
        let report = run_experiment(
            algorithm.as_ref(),
            &ExperimentSettings::default(),
            0,
            run_id,
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(report.run_id, run_id);
        assert_eq!(report.seed, 200);
        assert_eq!(report.algorithm, "leader_follower");
        assert_eq!(report.final_positions.len(), 5);
        assert_eq!(report.error_history.len(), report.iterations);
        assert!(report.success);
        assert!(report.formation_error < 1e-6);
    }

    #[test]
    fn test_cancelled_experiment() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let algorithm = build_algorithm(AlgorithmKind::Consensus, &ConsensusConfig::default());
        let err = run_experiment(
            algorithm.as_ref(),
            &ExperimentSettings::default(),
            1,
            Uuid::now_v7(),
            &cancel,
        )
        .unwrap_err();
        assert!(matches!(err, FormationError::Cancelled { .. }));
    }
}
