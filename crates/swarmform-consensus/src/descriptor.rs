//! Algorithm metadata
//!
//! Descriptors are published once per run so collectors can label the
//! reports that follow.

use serde::{Deserialize, Serialize};

use swarmform_common::Result;

/// Shape class of an input or output port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    Matrix,
    Vector,
    Scalar,
    Function,
}

/// One named input or output of an algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDef {
    pub name: String,
    pub symbol: String,
    pub kind: PortKind,
    /// Shape such as "NxN" or "Nxd"
    pub dimension: String,
    pub description: String,
}

impl PortDef {
    pub fn new(
        name: &str,
        symbol: &str,
        kind: PortKind,
        dimension: &str,
        description: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            kind,
            dimension: dimension.to_string(),
            description: description.to_string(),
        }
    }
}

/// (name, symbol, kind, dimension, description)
type PortRow = (&'static str, &'static str, PortKind, &'static str, &'static str);

const CONSENSUS_INPUTS: &[PortRow] = &[
    ("topology", "F", PortKind::Matrix, "NxN", "Interaction weights"),
    ("trajectory", "Tr", PortKind::Function, "t -> d", "Virtual centre reference"),
    ("initial_states", "X_0", PortKind::Matrix, "Nxd", "Initial agent positions"),
];

const LEADER_FOLLOWER_INPUTS: &[PortRow] = &[
    ("topology", "F", PortKind::Matrix, "NxN", "Follower-to-neighbour weights"),
    ("trajectory", "Tr", PortKind::Function, "t -> d", "Leader reference"),
    ("initial_states", "X_0", PortKind::Matrix, "Nxd", "Initial agent positions"),
    ("initial_velocities", "V_0", PortKind::Matrix, "Nxd", "Optional initial velocities"),
];

const FORMATION_OUTPUTS: &[PortRow] = &[
    ("formation_pos", "formation_pos", PortKind::Matrix, "Nxd", "Target position per agent"),
    ("formation_error", "formation_error", PortKind::Scalar, "1", "Aggregate geometry deviation"),
];

/// Catalogue entry for a formation algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmDescriptor {
    pub name: String,
    pub category: String,
    pub subcategory: String,
    pub version: String,
    pub creator: String,
    pub description: String,
    pub inputs: Vec<PortDef>,
    pub outputs: Vec<PortDef>,
}

impl AlgorithmDescriptor {
    pub fn consensus() -> Self {
        Self::formation_control(
            "consensus",
            "Consensus-based multi-UAV formation control that holds a prescribed geometry \
             while tracking a reference trajectory",
            CONSENSUS_INPUTS,
        )
    }

    pub fn leader_follower() -> Self {
        Self::formation_control(
            "leader_follower",
            "Second-order leader-follower consensus with integral action; agent 0 flies the \
             reference velocity",
            LEADER_FOLLOWER_INPUTS,
        )
    }

    fn formation_control(name: &str, description: &str, inputs: &[PortRow]) -> Self {
        Self {
            name: name.to_string(),
            category: "builtin_component".to_string(),
            subcategory: "formation_control".to_string(),
            version: crate::config::ALGORITHM_VERSION.to_string(),
            creator: "swarmform".to_string(),
            description: description.to_string(),
            inputs: ports(inputs),
            outputs: ports(FORMATION_OUTPUTS),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn ports(rows: &[PortRow]) -> Vec<PortDef> {
    rows.iter()
        .map(|&(name, symbol, kind, dimension, description)| {
            PortDef::new(name, symbol, kind, dimension, description)
        })
        .collect()
}
