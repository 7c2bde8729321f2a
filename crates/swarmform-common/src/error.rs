//! Error types for SwarmForm
//!
//! Provides a unified error type and the input validation variants

use thiserror::Error;

/// Result type alias using FormationError
pub type Result<T> = std::result::Result<T, FormationError>;

/// Unified error type for formation operations
#[derive(Debug, Error)]
pub enum FormationError {
    // Rejected before any iteration
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),

    // Cooperative cancellation observed between iterations
    #[error("Solver cancelled after {iterations} iterations")]
    Cancelled { iterations: usize },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Report sink / filesystem errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl FormationError {
    /// True when the error was raised by input validation
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, FormationError::InvalidInput(_))
    }
}

/// Input validation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    #[error("Topology is not square: {rows}x{cols}")]
    NonSquareTopology { rows: usize, cols: usize },

    #[error("Topology entry ({row}, {col}) is not finite")]
    NonFiniteWeight { row: usize, col: usize },

    #[error("Dimension mismatch: topology has {topology} agents, states have {states} rows")]
    AgentCountMismatch { topology: usize, states: usize },

    #[error("Formation has no agents")]
    EmptyFormation,

    #[error("State matrix has zero spatial dimensions")]
    ZeroDimension,

    #[error("Row {row} has {actual} columns, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("State entry ({row}, {col}) is not finite")]
    NonFiniteState { row: usize, col: usize },

    #[error("{what} shape {rows}x{cols} does not match states {expected_rows}x{expected_cols}")]
    ShapeMismatch {
        what: &'static str,
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },

    #[error("Trajectory is not set")]
    MissingTrajectory,

    #[error("Trajectory returned {actual} dimensions, expected {expected}")]
    TrajectoryDimension { expected: usize, actual: usize },

    #[error("Trajectory returned a non-finite value at t={time}")]
    NonFiniteTrajectory { time: f64 },

    #[error("Parameter {name} out of range: {value}")]
    Parameter { name: &'static str, value: f64 },
}

impl From<serde_json::Error> for FormationError {
    fn from(err: serde_json::Error) -> Self {
        FormationError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for FormationError {
    fn from(err: std::io::Error) -> Self {
        FormationError::Io(err.to_string())
    }
}
