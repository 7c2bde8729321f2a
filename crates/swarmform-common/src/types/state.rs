//! StateMatrix - Per-agent state vectors (N x d)

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Row i holds agent i's position in d spatial dimensions
///
/// The shape is fixed for the lifetime of a run; solvers only
/// overwrite rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DMatrix<f64>", into = "DMatrix<f64>")]
pub struct StateMatrix {
    rows: DMatrix<f64>,
}

impl StateMatrix {
    /// Validate and wrap an N x d matrix
    pub fn new(rows: DMatrix<f64>) -> Result<Self, InputError> {
        check_finite_matrix(&rows)?;
        Ok(Self { rows })
    }

    /// Build from one vector per agent
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, InputError> {
        Self::new(matrix_from_rows(rows)?)
    }

    /// All agents at the origin
    pub fn zeros(agents: usize, dimension: usize) -> Self {
        Self {
            rows: DMatrix::zeros(agents, dimension),
        }
    }

    /// Re-check shape and finiteness; `zeros` skips both
    pub fn validate(&self) -> Result<(), InputError> {
        check_finite_matrix(&self.rows)
    }

    /// Number of agents N
    #[inline]
    pub fn agent_count(&self) -> usize {
        self.rows.nrows()
    }

    /// Spatial dimension d
    #[inline]
    pub fn dimension(&self) -> usize {
        self.rows.ncols()
    }

    /// State of agent i as a column vector
    pub fn agent(&self, i: usize) -> DVector<f64> {
        self.rows.row(i).transpose()
    }

    /// Overwrite agent i's state
    pub fn set_agent(&mut self, i: usize, state: &DVector<f64>) {
        self.rows.set_row(i, &state.transpose());
    }

    /// Mean state over all agents
    pub fn centroid(&self) -> DVector<f64> {
        self.rows.row_mean().transpose()
    }

    /// Largest per-agent Euclidean distance to `other`
    pub fn max_row_distance(&self, other: &StateMatrix) -> f64 {
        (0..self.agent_count())
            .map(|i| (self.rows.row(i) - other.rows.row(i)).norm())
            .fold(0.0, f64::max)
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.rows
    }

    pub fn into_matrix(self) -> DMatrix<f64> {
        self.rows
    }
}

impl TryFrom<DMatrix<f64>> for StateMatrix {
    type Error = InputError;

    fn try_from(rows: DMatrix<f64>) -> Result<Self, Self::Error> {
        Self::new(rows)
    }
}

impl From<StateMatrix> for DMatrix<f64> {
    fn from(states: StateMatrix) -> Self {
        states.rows
    }
}

/// Reject empty, zero-width, or non-finite matrices
pub(crate) fn check_finite_matrix(m: &DMatrix<f64>) -> Result<(), InputError> {
    if m.nrows() == 0 {
        return Err(InputError::EmptyFormation);
    }
    if m.ncols() == 0 {
        return Err(InputError::ZeroDimension);
    }
    for col in 0..m.ncols() {
        for row in 0..m.nrows() {
            if !m[(row, col)].is_finite() {
                return Err(InputError::NonFiniteState { row, col });
            }
        }
    }
    Ok(())
}

/// Row-major vectors to a matrix, rejecting ragged input
pub(crate) fn matrix_from_rows(rows: &[Vec<f64>]) -> Result<DMatrix<f64>, InputError> {
    let expected = rows.first().map(Vec::len).unwrap_or(0);
    for (row, values) in rows.iter().enumerate() {
        if values.len() != expected {
            return Err(InputError::RaggedRows {
                row,
                expected,
                actual: values.len(),
            });
        }
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Ok(DMatrix::from_row_slice(rows.len(), expected, &flat))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows() {
        let states = StateMatrix::from_rows(&[vec![1.0, 0.0], vec![-1.0, 2.0]]).unwrap();
        assert_eq!(states.agent_count(), 2);
        assert_eq!(states.dimension(), 2);
        assert_eq!(states.agent(1), DVector::from_vec(vec![-1.0, 2.0]));
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert_eq!(StateMatrix::from_rows(&[]).unwrap_err(), InputError::EmptyFormation);
        assert_eq!(
            StateMatrix::from_rows(&[vec![], vec![]]).unwrap_err(),
            InputError::ZeroDimension
        );
        assert!(matches!(
            StateMatrix::from_rows(&[vec![1.0, 2.0], vec![1.0]]).unwrap_err(),
            InputError::RaggedRows { row: 1, .. }
        ));
    }

    #[test]
    fn test_zeros_revalidated() {
        assert!(StateMatrix::zeros(2, 3).validate().is_ok());
        assert_eq!(StateMatrix::zeros(0, 3).validate(), Err(InputError::EmptyFormation));
        assert_eq!(StateMatrix::zeros(2, 0).validate(), Err(InputError::ZeroDimension));
    }

    #[test]
    fn test_rejects_non_finite() {
        let err = StateMatrix::from_rows(&[vec![0.0], vec![f64::INFINITY]]).unwrap_err();
        assert_eq!(err, InputError::NonFiniteState { row: 1, col: 0 });
    }

    #[test]
    fn test_set_agent_and_distance() {
        let before = StateMatrix::zeros(3, 2);
        let mut after = before.clone();
        after.set_agent(2, &DVector::from_vec(vec![3.0, 4.0]));
        assert!((after.max_row_distance(&before) - 5.0).abs() < 1e-12);
        let centroid = after.centroid();
        assert!((centroid[0] - 1.0).abs() < 1e-12);
        assert!((centroid[1] - 4.0 / 3.0).abs() < 1e-12);
    }
}
