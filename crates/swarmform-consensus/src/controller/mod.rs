//! Formation controllers
pub mod cancel;
pub mod consensus;
pub mod leader_follower;

pub use self::cancel::CancellationToken;
pub use self::consensus::{
    ConsensusFormationSolver, ConsensusStep, ConvergenceCriterion, ErrorNorm,
};
pub use self::leader_follower::LeaderFollowerController;
