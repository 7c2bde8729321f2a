//! Solver-level properties
//!
//! - Termination within the iteration bound on arbitrary weights
//! - Purity: repeated solves agree for every algorithm
//! - Convergence on connected symmetric graphs
//! - Fail-fast validation

use nalgebra::DVector;
use proptest::prelude::*;

use swarmform_common::{FormationError, FormationOffsets, InputError, StateMatrix, Topology};
use swarmform_consensus::{
    build_algorithm, AlgorithmKind, ConsensusConfig, ConsensusFormationSolver, ConsensusStep,
    ConstantTrajectory, FormationProblem, LeaderFollowerController, LinearTrajectory,
};

fn states_strategy() -> impl Strategy<Value = Vec<Vec<f64>>> {
    (1usize..6, 1usize..4).prop_flat_map(|(agents, dimension)| {
        prop::collection::vec(
            prop::collection::vec(-50.0f64..50.0, dimension),
            agents,
        )
    })
}

/// Zero, moderate, and very large weights of either sign
fn weight_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        3 => Just(0.0),
        3 => -5.0f64..5.0,
        1 => 1e3f64..1e6,
        1 => -1e6f64..-1e3,
    ]
}

/// Arbitrary N x N weights with matching N x d states
fn network_strategy() -> impl Strategy<Value = (Vec<Vec<f64>>, Vec<Vec<f64>>)> {
    (1usize..6, 1usize..4).prop_flat_map(|(agents, dimension)| {
        (
            prop::collection::vec(prop::collection::vec(weight_strategy(), agents), agents),
            prop::collection::vec(prop::collection::vec(-50.0f64..50.0, dimension), agents),
        )
    })
}

fn step_strategy() -> impl Strategy<Value = ConsensusStep> {
    prop_oneof![
        Just(ConsensusStep::Perron),
        (0.01f64..3.0).prop_map(ConsensusStep::Fixed),
    ]
}

proptest! {
    #[test]
    fn prop_terminates_within_bound(rows in states_strategy(), max_iterations in 1usize..200) {
        let states = StateMatrix::from_rows(&rows).unwrap();
        let solver = ConsensusFormationSolver::new(ConsensusConfig {
            max_iterations,
            ..ConsensusConfig::default()
        });
        let result = solver
            .solve(
                &Topology::complete(states.agent_count()),
                &ConstantTrajectory::origin(states.dimension()),
                &states,
            )
            .unwrap();

        prop_assert!(result.iterations >= 1);
        prop_assert!(result.iterations <= max_iterations);
        prop_assert_eq!(result.error_history.len(), result.iterations);
        prop_assert!(result.formation_error.is_finite());
    }

    #[test]
    fn prop_any_topology_terminates(
        (weights, rows) in network_strategy(),
        step in step_strategy(),
        max_iterations in 1usize..150,
    ) {
        let topology = Topology::from_rows(&weights).unwrap();
        let states = StateMatrix::from_rows(&rows).unwrap();
        let reference = ConstantTrajectory::origin(states.dimension());
        let config = ConsensusConfig {
            consensus_step: step,
            max_iterations,
            ..ConsensusConfig::default()
        };

        let result = ConsensusFormationSolver::new(config.clone())
            .solve(&topology, &reference, &states)
            .unwrap();
        prop_assert!(result.iterations >= 1);
        prop_assert!(result.iterations <= max_iterations);
        prop_assert_eq!(result.error_history.len(), result.iterations);

        let result = LeaderFollowerController::new(config)
            .run(&topology, &reference, &states, None)
            .unwrap();
        prop_assert!(result.iterations >= 1);
        prop_assert!(result.iterations <= max_iterations);
        prop_assert_eq!(result.error_history.len(), result.iterations);
    }

    #[test]
    fn prop_repeated_solves_agree(rows in states_strategy()) {
        let states = StateMatrix::from_rows(&rows).unwrap();
        let n = states.agent_count();
        let d = states.dimension();
        let solver = ConsensusFormationSolver::new(ConsensusConfig::default())
            .with_offsets(FormationOffsets::circle(n, d, 4.0));
        let reference = LinearTrajectory::new(DVector::zeros(d), DVector::from_element(d, 0.5));

        let first = solver.solve(&Topology::ring(n), &reference, &states).unwrap();
        let second = solver.solve(&Topology::ring(n), &reference, &states).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_repeated_runs_agree_for_every_algorithm(rows in states_strategy()) {
        let states = StateMatrix::from_rows(&rows).unwrap();
        let n = states.agent_count();
        let d = states.dimension();
        let config = ConsensusConfig {
            max_iterations: 300,
            ..ConsensusConfig::default()
        };
        let problem = FormationProblem::new(Topology::wedge(n), states)
            .with_trajectory(LinearTrajectory::new(
                DVector::zeros(d),
                DVector::from_element(d, 0.5),
            ))
            .with_offsets(FormationOffsets::circle(n, d, 4.0));

        for kind in AlgorithmKind::ALL {
            let algorithm = build_algorithm(kind, &config);
            let first = algorithm.compute(&problem).unwrap();
            let second = algorithm.compute(&problem).unwrap();
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn prop_complete_graph_settles(rows in states_strategy()) {
        let states = StateMatrix::from_rows(&rows).unwrap();
        let result = ConsensusFormationSolver::default()
            .solve(
                &Topology::complete(states.agent_count()),
                &ConstantTrajectory::origin(states.dimension()),
                &states,
            )
            .unwrap();

        prop_assert!(result.success);
        prop_assert!(result.formation_error < 1e-4);
    }
}

#[test]
fn two_agents_meet_at_the_reference() {
    let topology = Topology::from_rows(&[vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
    let states = StateMatrix::from_rows(&[vec![1.0, 0.0], vec![-1.0, 0.0]]).unwrap();

    let result = ConsensusFormationSolver::default()
        .solve(&topology, &ConstantTrajectory::origin(2), &states)
        .unwrap();

    assert!(result.success);
    assert!(result.formation_error < 1e-5);
    for i in 0..2 {
        assert!(result.agent_position(i).norm() < 1e-5);
    }
}

#[test]
fn single_agent_tracks_the_reference() {
    let states = StateMatrix::from_rows(&[vec![4.0, -3.0, 1.0]]).unwrap();
    let target = DVector::from_vec(vec![1.0, 1.0, 1.0]);

    let result = ConsensusFormationSolver::default()
        .solve(
            &Topology::disconnected(1),
            &ConstantTrajectory::new(target.clone()),
            &states,
        )
        .unwrap();

    assert!(result.success);
    let miss = (result.agent_position(0) - &target).norm();
    assert!(miss < 1e-4);
    assert!((result.formation_error - miss).abs() < 1e-12);
}

#[test]
fn mismatched_agent_counts_fail_fast() {
    let states = StateMatrix::from_rows(&[vec![0.0, 1.0], vec![2.0, 3.0]]).unwrap();
    let err = ConsensusFormationSolver::default()
        .solve(&Topology::complete(3), &ConstantTrajectory::origin(2), &states)
        .unwrap_err();

    assert!(matches!(
        err,
        FormationError::InvalidInput(InputError::AgentCountMismatch {
            topology: 3,
            states: 2
        })
    ));
}

#[test]
fn non_square_topology_rejected() {
    let err = Topology::from_rows(&[vec![0.0, 1.0, 1.0], vec![1.0, 0.0, 1.0]]).unwrap_err();
    assert!(matches!(err, InputError::NonSquareTopology { .. }));
}

#[test]
fn both_algorithms_hold_the_wedge() {
    let config = ConsensusConfig {
        max_iterations: 3000,
        ..ConsensusConfig::default()
    };
    let states = StateMatrix::from_rows(&[
        vec![1.0, 2.0, 3.0],
        vec![4.0, 0.5, 9.0],
        vec![7.0, 8.0, 2.0],
        vec![0.0, 6.0, 5.0],
        vec![3.0, 3.0, 0.0],
    ])
    .unwrap();
    let offsets = FormationOffsets::wedge(5, 20.0, 2.0);

    for kind in AlgorithmKind::ALL {
        let problem = FormationProblem::new(Topology::wedge(5), states.clone())
            .with_trajectory(ConstantTrajectory::origin(3))
            .with_offsets(offsets.clone());
        let result = build_algorithm(kind, &config).compute(&problem).unwrap();

        assert!(result.success, "{kind} did not settle");
        let leader = result.agent_position(0);
        for i in 1..5 {
            let relative = result.agent_position(i) - &leader;
            let desired = offsets.center_offset(i) - offsets.center_offset(0);
            assert!((relative - desired).norm() < 1e-3, "{kind} agent {i} off slot");
        }
    }
}
