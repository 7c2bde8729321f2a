//! FormationResult - Output of a single solver invocation

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Target positions plus the aggregate formation error
///
/// `formation_error` is only authoritative when `success` is true; a
/// non-converged run still carries the last iterate for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationResult {
    /// Computed target position per agent (N x d)
    pub positions: DMatrix<f64>,

    /// Aggregate deviation from the desired geometry
    pub formation_error: f64,

    /// Converged within the iteration bound
    pub success: bool,

    /// Number of update steps performed
    pub iterations: usize,

    /// Max per-agent displacement of the last step
    pub final_displacement: f64,

    /// Reference time of the last iterate
    pub final_time: f64,

    /// Formation error after each step
    pub error_history: Vec<f64>,
}

impl FormationResult {
    /// Target position of agent i
    pub fn agent_position(&self, i: usize) -> DVector<f64> {
        self.positions.row(i).transpose()
    }

    #[inline]
    pub fn agent_count(&self) -> usize {
        self.positions.nrows()
    }

    /// Error metric if the run converged, `None` otherwise
    pub fn trusted_error(&self) -> Option<f64> {
        self.success.then_some(self.formation_error)
    }
}

impl std::fmt::Display for FormationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FormationResult({} agents, error={:.3e}, {} after {} iterations)",
            self.agent_count(),
            self.formation_error,
            if self.success { "converged" } else { "not converged" },
            self.iterations
        )
    }
}
