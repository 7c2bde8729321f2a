//! Topology - Weighted directed interaction graph over N agents
//!
//! Entry (i, j) is the weight with which agent i listens to agent j.
//! A zero entry means agent i cannot sense agent j. The diagonal is
//! always zero: self-loops are stripped on construction because the
//! consensus correction for j = i vanishes identically.

use std::collections::VecDeque;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::InputError;

/// Weighted adjacency matrix used for consensus corrections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DMatrix<f64>", into = "DMatrix<f64>")]
pub struct Topology {
    weights: DMatrix<f64>,
}

impl Topology {
    /// Validate and wrap an adjacency matrix
    pub fn new(mut weights: DMatrix<f64>) -> Result<Self, InputError> {
        let (rows, cols) = weights.shape();
        if rows != cols {
            return Err(InputError::NonSquareTopology { rows, cols });
        }

        for col in 0..cols {
            for row in 0..rows {
                if !weights[(row, col)].is_finite() {
                    return Err(InputError::NonFiniteWeight { row, col });
                }
            }
        }

        for i in 0..rows {
            if weights[(i, i)] != 0.0 {
                debug!(agent = i, weight = weights[(i, i)], "Stripping self-loop");
                weights[(i, i)] = 0.0;
            }
        }

        Ok(Self { weights })
    }

    /// Build from row vectors; ragged input is reported as non-square
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, InputError> {
        let n = rows.len();
        if let Some(bad) = rows.iter().find(|row| row.len() != n) {
            return Err(InputError::NonSquareTopology {
                rows: n,
                cols: bad.len(),
            });
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Self::new(DMatrix::from_row_slice(n, n, &flat))
    }

    /// No edges at all
    pub fn disconnected(n: usize) -> Self {
        Self {
            weights: DMatrix::zeros(n, n),
        }
    }

    /// Every agent listens to every other agent with unit weight
    pub fn complete(n: usize) -> Self {
        Self {
            weights: DMatrix::from_fn(n, n, |i, j| if i == j { 0.0 } else { 1.0 }),
        }
    }

    /// Bidirectional ring: each agent listens to both ring neighbours
    pub fn ring(n: usize) -> Self {
        let mut weights = DMatrix::zeros(n, n);
        if n > 1 {
            for i in 0..n {
                weights[(i, (i + 1) % n)] = 1.0;
                weights[(i, (i + n - 1) % n)] = 1.0;
            }
        }
        Self::stripped(weights)
    }

    /// Directed chain: agent i listens to agent i - 1
    pub fn chain(n: usize) -> Self {
        let mut weights = DMatrix::zeros(n, n);
        for i in 1..n {
            weights[(i, i - 1)] = 1.0;
        }
        Self { weights }
    }

    /// Two-wing leader-follower tree rooted at agent 0
    ///
    /// Agents 1 and 2 follow the leader; every later agent follows the
    /// agent two places ahead of it on the same wing.
    pub fn wedge(n: usize) -> Self {
        let mut weights = DMatrix::zeros(n, n);
        for i in 1..n {
            let parent = if i <= 2 { 0 } else { i - 2 };
            weights[(i, parent)] = 1.0;
        }
        Self { weights }
    }

    fn stripped(mut weights: DMatrix<f64>) -> Self {
        weights.fill_diagonal(0.0);
        Self { weights }
    }

    /// Number of agents N
    #[inline]
    pub fn agent_count(&self) -> usize {
        self.weights.nrows()
    }

    /// Weight with which agent i listens to agent j
    #[inline]
    pub fn weight(&self, i: usize, j: usize) -> f64 {
        self.weights[(i, j)]
    }

    /// Agents that agent i listens to, with their weights
    pub fn neighbors(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        (0..self.agent_count())
            .map(move |j| (j, self.weights[(i, j)]))
            .filter(|(_, w)| *w != 0.0)
    }

    /// Weighted in-degree (sum of absolute incoming weights)
    pub fn in_degree(&self, i: usize) -> f64 {
        self.weights.row(i).iter().map(|w| w.abs()).sum()
    }

    /// Largest weighted in-degree over all agents
    pub fn max_in_degree(&self) -> f64 {
        (0..self.agent_count())
            .map(|i| self.in_degree(i))
            .fold(0.0, f64::max)
    }

    /// Symmetric within `tolerance`
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        let n = self.agent_count();
        (0..n).all(|i| (0..i).all(|j| (self.weight(i, j) - self.weight(j, i)).abs() <= tolerance))
    }

    /// Whether information from `root` reaches every agent
    pub fn has_spanning_tree(&self, root: usize) -> bool {
        let n = self.agent_count();
        if root >= n {
            return false;
        }

        let mut reached = vec![false; n];
        reached[root] = true;
        let mut queue = VecDeque::from([root]);

        while let Some(source) = queue.pop_front() {
            for listener in 0..n {
                if !reached[listener] && self.weight(listener, source) != 0.0 {
                    reached[listener] = true;
                    queue.push_back(listener);
                }
            }
        }

        reached.into_iter().all(|r| r)
    }

    /// Graph Laplacian L = D - A
    pub fn laplacian(&self) -> DMatrix<f64> {
        let n = self.agent_count();
        let mut laplacian = -self.weights.clone();
        for i in 0..n {
            laplacian[(i, i)] = self.weights.row(i).sum();
        }
        laplacian
    }

    /// Borrow the adjacency matrix
    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.weights
    }
}

impl TryFrom<DMatrix<f64>> for Topology {
    type Error = InputError;

    fn try_from(weights: DMatrix<f64>) -> Result<Self, Self::Error> {
        Self::new(weights)
    }
}

impl From<Topology> for DMatrix<f64> {
    fn from(topology: Topology) -> Self {
        topology.weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_square_rejected() {
        let err = Topology::new(DMatrix::zeros(2, 3)).unwrap_err();
        assert_eq!(err, InputError::NonSquareTopology { rows: 2, cols: 3 });
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Topology::from_rows(&[vec![0.0, 1.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, InputError::NonSquareTopology { rows: 2, cols: 1 }));
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = Topology::from_rows(&[vec![0.0, f64::NAN], vec![1.0, 0.0]]).unwrap_err();
        assert_eq!(err, InputError::NonFiniteWeight { row: 0, col: 1 });
    }

    #[test]
    fn test_self_loops_stripped() {
        let topology = Topology::from_rows(&[vec![3.0, 1.0], vec![1.0, 2.0]]).unwrap();
        assert_eq!(topology.weight(0, 0), 0.0);
        assert_eq!(topology.weight(1, 1), 0.0);
        assert_eq!(topology.weight(0, 1), 1.0);
    }

    #[test]
    fn test_complete_graph() {
        let topology = Topology::complete(4);
        assert!(topology.is_symmetric(0.0));
        assert_eq!(topology.max_in_degree(), 3.0);
        assert_eq!(topology.neighbors(2).count(), 3);
        assert!(topology.has_spanning_tree(0));
    }

    #[test]
    fn test_ring_small_sizes() {
        assert_eq!(Topology::ring(1).max_in_degree(), 0.0);
        // Both ring neighbours coincide for two agents
        assert_eq!(Topology::ring(2).in_degree(0), 1.0);
        assert_eq!(Topology::ring(5).in_degree(3), 2.0);
    }

    #[test]
    fn test_wedge_structure() {
        let topology = Topology::wedge(5);
        assert_eq!(topology.weight(1, 0), 1.0);
        assert_eq!(topology.weight(2, 0), 1.0);
        assert_eq!(topology.weight(3, 1), 1.0);
        assert_eq!(topology.weight(4, 2), 1.0);
        assert!(topology.has_spanning_tree(0));
        assert!(!topology.has_spanning_tree(4));
        assert!(!topology.is_symmetric(0.0));
    }

    #[test]
    fn test_disconnected_has_no_spanning_tree() {
        assert!(!Topology::disconnected(3).has_spanning_tree(0));
        assert!(Topology::disconnected(1).has_spanning_tree(0));
    }

    #[test]
    fn test_laplacian_rows_sum_to_zero() {
        let laplacian = Topology::wedge(5).laplacian();
        for i in 0..5 {
            assert!(laplacian.row(i).sum().abs() < 1e-12);
        }
        assert_eq!(laplacian[(3, 3)], 1.0);
        assert_eq!(laplacian[(3, 1)], -1.0);
    }

    proptest::proptest! {
        #[test]
        fn prop_diagonal_always_zero(
            n in 1usize..6,
            seed in proptest::collection::vec(-5.0f64..5.0, 36),
        ) {
            let topology = Topology::new(DMatrix::from_fn(n, n, |i, j| seed[i * 6 + j])).unwrap();
            for i in 0..n {
                proptest::prop_assert_eq!(topology.weight(i, i), 0.0);
                proptest::prop_assert!(topology.laplacian().row(i).sum().abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_serde_validates() {
        let json = serde_json::to_string(&Topology::chain(3)).unwrap();
        let back: Topology = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Topology::chain(3));
    }
}
