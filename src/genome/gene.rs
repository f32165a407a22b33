use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::activation::Activation;

pub type NodeId = u32;
pub type InnovationId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Input,
    Output,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeGene {
    pub id: NodeId,
    pub kind: NodeKind,
    pub activation: Activation,
}

impl NodeGene {
    pub fn new(id: NodeId, kind: NodeKind, activation: Activation) -> Self {
        Self {
            id,
            kind,
            activation,
        }
    }
}

impl Display for NodeGene {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:?} {:?}", self.id, self.kind, self.activation)
    }
}

/// A weighted connection; identity is its innovation number alone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EdgeGene {
    pub id: InnovationId,
    pub from: NodeId,
    pub to: NodeId,
    pub weight: f32,
    pub enabled: bool,
}

impl EdgeGene {
    pub fn new(id: InnovationId, from: NodeId, to: NodeId, weight: f32) -> Self {
        Self {
            id,
            from,
            to,
            weight,
            enabled: true,
        }
    }
}

impl PartialEq for EdgeGene {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EdgeGene {}

impl PartialOrd for EdgeGene {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EdgeGene {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Display for EdgeGene {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} {} -> {} w: {:.3}{}",
            self.id,
            self.from,
            self.to,
            self.weight,
            if self.enabled { "" } else { " (disabled)" }
        )
    }
}
