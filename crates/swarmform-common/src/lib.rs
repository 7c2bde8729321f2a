//! # SwarmForm Common
//!
//! Shared types, errors, and constants for multi-UAV formation control.
//!
//! ## Core Types
//!
//! - [`Topology`]: weighted directed interaction graph (N x N, zero diagonal)
//! - [`StateMatrix`]: per-agent state vectors (N x d)
//! - [`FormationOffsets`]: per-agent offsets from the virtual centre
//! - [`FormationResult`]: target positions, formation error, convergence flag
//!
//! ## Errors
//!
//! - [`FormationError`]: unified error type
//! - [`InputError`]: validation failures raised before any iteration

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{FormationError, InputError, Result};
pub use types::{FormationOffsets, FormationResult, StateMatrix, Topology};

/// SwarmForm version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default gain pulling each agent toward its reference slot
pub const DEFAULT_TRACKING_GAIN: f64 = 0.1;

/// Default convergence tolerance on per-step displacement
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Default iteration bound
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Default control period in seconds
pub const DEFAULT_TIME_STEP: f64 = 0.1;

/// Default spacing between wedge ranks
pub const DEFAULT_WEDGE_SPACING: f64 = 20.0;

/// Default altitude drop per wedge rank
pub const DEFAULT_WEDGE_ALTITUDE_STEP: f64 = 2.0;
