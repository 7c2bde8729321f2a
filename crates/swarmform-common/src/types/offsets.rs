//! FormationOffsets - Desired geometry relative to the virtual centre
//!
//! Each agent carries a fixed offset `c_i` from the formation's virtual
//! centre. Pairwise offsets are derived, never stored, so the geometry
//! is always consistent:
//!
//! ```text
//! offset_ij = c_j - c_i
//! ```

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::state::{check_finite_matrix, matrix_from_rows, StateMatrix};
use crate::error::InputError;

/// Per-agent offsets from the virtual centre (N x d)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DMatrix<f64>", into = "DMatrix<f64>")]
pub struct FormationOffsets {
    offsets: DMatrix<f64>,
}

impl FormationOffsets {
    pub fn new(offsets: DMatrix<f64>) -> Result<Self, InputError> {
        check_finite_matrix(&offsets)?;
        Ok(Self { offsets })
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, InputError> {
        Self::new(matrix_from_rows(rows)?)
    }

    /// All agents coincide with the virtual centre
    pub fn zeros(agents: usize, dimension: usize) -> Self {
        Self {
            offsets: DMatrix::zeros(agents, dimension),
        }
    }

    /// Two-wing wedge in 3D led by agent 0
    ///
    /// Odd agents trail along -x, even agents along -y; each rank back
    /// also drops by `altitude_step`.
    pub fn wedge(agents: usize, spacing: f64, altitude_step: f64) -> Self {
        let mut offsets = DMatrix::zeros(agents, 3);
        for i in 1..agents {
            let rank = ((i + 1) / 2) as f64;
            let axis = if i % 2 == 1 { 0 } else { 1 };
            offsets[(i, axis)] = -rank * spacing;
            offsets[(i, 2)] = -rank * altitude_step;
        }
        Self { offsets }
    }

    /// Evenly spaced points on a horizontal circle (first two axes)
    pub fn circle(agents: usize, dimension: usize, radius: f64) -> Self {
        let mut offsets = DMatrix::zeros(agents, dimension);
        if dimension >= 2 {
            for i in 0..agents {
                let angle = std::f64::consts::TAU * i as f64 / agents as f64;
                offsets[(i, 0)] = radius * angle.cos();
                offsets[(i, 1)] = radius * angle.sin();
            }
        }
        Self { offsets }
    }

    #[inline]
    pub fn agent_count(&self) -> usize {
        self.offsets.nrows()
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.offsets.ncols()
    }

    /// Offset `c_i` of agent i from the virtual centre
    pub fn center_offset(&self, i: usize) -> DVector<f64> {
        self.offsets.row(i).transpose()
    }

    /// Desired displacement from agent i to agent j
    pub fn pairwise(&self, i: usize, j: usize) -> DVector<f64> {
        (self.offsets.row(j) - self.offsets.row(i)).transpose()
    }

    /// Shape must match the state matrix exactly
    pub fn check_shape(&self, states: &StateMatrix) -> Result<(), InputError> {
        if self.agent_count() != states.agent_count() || self.dimension() != states.dimension() {
            return Err(InputError::ShapeMismatch {
                what: "Offsets",
                rows: self.agent_count(),
                cols: self.dimension(),
                expected_rows: states.agent_count(),
                expected_cols: states.dimension(),
            });
        }
        Ok(())
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.offsets
    }
}

impl TryFrom<DMatrix<f64>> for FormationOffsets {
    type Error = InputError;

    fn try_from(offsets: DMatrix<f64>) -> Result<Self, Self::Error> {
        Self::new(offsets)
    }
}

impl From<FormationOffsets> for DMatrix<f64> {
    fn from(offsets: FormationOffsets) -> Self {
        offsets.offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wedge_matches_reference_geometry() {
        let wedge = FormationOffsets::wedge(5, 20.0, 2.0);
        let expected = [
            [0.0, 0.0, 0.0],
            [-20.0, 0.0, -2.0],
            [0.0, -20.0, -2.0],
            [-40.0, 0.0, -4.0],
            [0.0, -40.0, -4.0],
        ];
        for (i, row) in expected.iter().enumerate() {
            assert_eq!(wedge.center_offset(i), DVector::from_row_slice(&row[..]));
        }
    }

    #[test]
    fn test_pairwise_is_antisymmetric() {
        let offsets = FormationOffsets::wedge(4, 10.0, 1.0);
        let ij = offsets.pairwise(1, 3);
        let ji = offsets.pairwise(3, 1);
        assert_eq!(ij, -ji);
        assert_eq!(offsets.pairwise(2, 2), DVector::zeros(3));
    }

    #[test]
    fn test_circle_radius() {
        let offsets = FormationOffsets::circle(6, 3, 5.0);
        for i in 0..6 {
            assert!((offsets.center_offset(i).norm() - 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_shape_check() {
        let offsets = FormationOffsets::zeros(3, 2);
        assert!(offsets.check_shape(&StateMatrix::zeros(3, 2)).is_ok());
        assert!(matches!(
            offsets.check_shape(&StateMatrix::zeros(3, 3)),
            Err(InputError::ShapeMismatch { expected_cols: 3, .. })
        ));
    }
}
