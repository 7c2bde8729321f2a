//! Reference trajectories for the formation's virtual centre
//!
//! A trajectory is a pure function of time. Solvers may evaluate it
//! repeatedly with non-decreasing `t`, and may ask for a per-agent
//! variant; most references ignore the agent index.

pub mod reference;

use nalgebra::DVector;

pub use reference::{CircularTrajectory, ConstantTrajectory, LinearTrajectory};

/// Desired position of the formation's virtual centre over time
pub trait Trajectory: Send + Sync {
    /// Reference position at time `t`
    fn position(&self, t: f64) -> DVector<f64>;

    /// Reference for a specific agent; defaults to the shared centre
    fn agent_position(&self, t: f64, _agent: usize) -> DVector<f64> {
        self.position(t)
    }

    /// Reference velocity, forward difference over `dt` unless overridden
    fn velocity(&self, t: f64, dt: f64) -> DVector<f64> {
        (self.position(t + dt) - self.position(t)) / dt
    }
}

/// Adapts a closure `Fn(t) -> position` into a [`Trajectory`]
pub struct FnTrajectory<F> {
    f: F,
}

impl<F> FnTrajectory<F>
where
    F: Fn(f64) -> DVector<f64> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Trajectory for FnTrajectory<F>
where
    F: Fn(f64) -> DVector<f64> + Send + Sync,
{
    fn position(&self, t: f64) -> DVector<f64> {
        (self.f)(t)
    }
}
