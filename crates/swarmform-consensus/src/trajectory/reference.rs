//! Stock reference trajectories

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use super::Trajectory;

/// Hover at a fixed point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantTrajectory {
    pub point: DVector<f64>,
}

impl ConstantTrajectory {
    pub fn new(point: DVector<f64>) -> Self {
        Self { point }
    }

    /// Hover at the origin of a d-dimensional space
    pub fn origin(dimension: usize) -> Self {
        Self::new(DVector::zeros(dimension))
    }
}

impl Trajectory for ConstantTrajectory {
    fn position(&self, _t: f64) -> DVector<f64> {
        self.point.clone()
    }

    fn velocity(&self, _t: f64, _dt: f64) -> DVector<f64> {
        DVector::zeros(self.point.len())
    }
}

/// Straight line at constant velocity: `origin + velocity * t`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearTrajectory {
    pub origin: DVector<f64>,
    pub velocity: DVector<f64>,
}

impl LinearTrajectory {
    pub fn new(origin: DVector<f64>, velocity: DVector<f64>) -> Self {
        Self { origin, velocity }
    }
}

impl Trajectory for LinearTrajectory {
    fn position(&self, t: f64) -> DVector<f64> {
        &self.origin + &self.velocity * t
    }

    fn velocity(&self, _t: f64, _dt: f64) -> DVector<f64> {
        self.velocity.clone()
    }
}

/// Horizontal orbit around `center`
///
/// The first two axes trace the circle; any further axes stay at the
/// centre's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircularTrajectory {
    pub center: DVector<f64>,
    pub radius: f64,
    /// Angular rate in rad/s
    pub angular_rate: f64,
}

impl CircularTrajectory {
    pub fn new(center: DVector<f64>, radius: f64, angular_rate: f64) -> Self {
        Self {
            center,
            radius,
            angular_rate,
        }
    }
}

impl Trajectory for CircularTrajectory {
    fn position(&self, t: f64) -> DVector<f64> {
        let mut p = self.center.clone();
        let phase = self.angular_rate * t;
        if !p.is_empty() {
            p[0] += self.radius * phase.cos();
        }
        if p.len() >= 2 {
            p[1] += self.radius * phase.sin();
        }
        p
    }

    fn velocity(&self, t: f64, _dt: f64) -> DVector<f64> {
        let mut v = DVector::zeros(self.center.len());
        let phase = self.angular_rate * t;
        if !v.is_empty() {
            v[0] = -self.radius * self.angular_rate * phase.sin();
        }
        if v.len() >= 2 {
            v[1] = self.radius * self.angular_rate * phase.cos();
        }
        v
    }
}
