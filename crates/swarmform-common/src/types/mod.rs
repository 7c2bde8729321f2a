//! Core formation data model

pub mod offsets;
pub mod result;
pub mod state;
pub mod topology;

pub use offsets::FormationOffsets;
pub use result::FormationResult;
pub use state::StateMatrix;
pub use topology::Topology;
