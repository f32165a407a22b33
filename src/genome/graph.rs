use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::environment::NetworkSettings;
use crate::error::{NeatError, Result};
use crate::genome::gene::{EdgeGene, InnovationId, NodeGene, NodeId, NodeKind};
use crate::network::GraphNetwork;

/// Direct encoding: node and edge genes keyed by id, ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphGenome {
    pub(crate) nodes: BTreeMap<NodeId, NodeGene>,
    pub(crate) edges: BTreeMap<InnovationId, EdgeGene>,
    pub(crate) hidden_activation: Activation,
    pub(crate) random_activations: bool,
}

impl GraphGenome {
    /// Assembles a genome from loose genes, rejecting edges with dangling endpoints.
    pub fn new(
        nodes: Vec<NodeGene>,
        edges: Vec<EdgeGene>,
        hidden_activation: Activation,
        random_activations: bool,
    ) -> Result<Self> {
        let nodes: BTreeMap<NodeId, NodeGene> = nodes.into_iter().map(|n| (n.id, n)).collect();
        let mut map = BTreeMap::new();
        for edge in edges {
            for endpoint in [edge.from, edge.to] {
                if !nodes.contains_key(&endpoint) {
                    return Err(NeatError::MissingNode {
                        edge: edge.id,
                        node: endpoint,
                    });
                }
            }
            map.insert(edge.id, edge);
        }
        Ok(Self {
            nodes,
            edges: map,
            hidden_activation,
            random_activations,
        })
    }
    pub fn nodes(&self) -> impl Iterator<Item = &NodeGene> {
        self.nodes.values()
    }
    pub fn edges(&self) -> impl Iterator<Item = &EdgeGene> {
        self.edges.values()
    }
    pub fn node(&self, id: NodeId) -> Option<&NodeGene> {
        self.nodes.get(&id)
    }
    pub fn edge(&self, id: InnovationId) -> Option<&EdgeGene> {
        self.edges.get(&id)
    }
    pub fn inputs(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.of_kind(NodeKind::Input)
    }
    pub fn outputs(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.of_kind(NodeKind::Output)
    }
    fn of_kind(&self, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .values()
            .filter(move |n| n.kind == kind)
            .map(|n| n.id)
    }
    pub fn num_hidden(&self) -> usize {
        self.of_kind(NodeKind::Hidden).count()
    }
    pub fn num_enabled_edges(&self) -> usize {
        self.edges.values().filter(|e| e.enabled).count()
    }
    pub fn gene_count(&self) -> usize {
        self.nodes.len() + self.edges.len()
    }
    pub fn hidden_activation(&self) -> Activation {
        self.hidden_activation
    }
    pub fn random_activations(&self) -> bool {
        self.random_activations
    }
    pub fn contains_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.edges.values().any(|e| e.from == from && e.to == to)
    }
    /// Whether adding `from -> to` would close a loop over the existing edges.
    pub fn creates_cycle(&self, from: NodeId, to: NodeId) -> bool {
        if from == to {
            return true;
        }
        let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for edge in self.edges.values() {
            adjacency.entry(edge.from).or_default().push(edge.to);
        }
        let mut visited = HashSet::from([to]);
        let mut stack = vec![to];
        while let Some(current) = stack.pop() {
            if let Some(next) = adjacency.get(&current) {
                for &n in next {
                    if n == from {
                        return true;
                    }
                    if visited.insert(n) {
                        stack.push(n);
                    }
                }
            }
        }
        false
    }
    /// First structural inconsistency found, if any: a gene filed under another
    /// id or an edge whose endpoint is missing. Genomes built through
    /// [`GraphGenome::new`] or evolved in a population never have one.
    pub fn defect(&self) -> Option<String> {
        if let Some((key, node)) = self.nodes.iter().find(|(key, node)| **key != node.id) {
            return Some(format!("node {} is filed under id {}", node.id, key));
        }
        if let Some((key, edge)) = self.edges.iter().find(|(key, edge)| **key != edge.id) {
            return Some(format!("edge {} is filed under id {}", edge.id, key));
        }
        for edge in self.edges.values() {
            for endpoint in [edge.from, edge.to] {
                if !self.nodes.contains_key(&endpoint) {
                    return Some(format!(
                        "edge {} references missing node {}",
                        edge.id, endpoint
                    ));
                }
            }
        }
        None
    }
    pub fn compile(&self, settings: NetworkSettings) -> GraphNetwork {
        let index: HashMap<NodeId, usize> = self
            .nodes
            .keys()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();
        let activations = self.nodes.values().map(|n| n.activation).collect();
        let inputs = self.inputs().map(|id| index[&id]).collect();
        let outputs = self.outputs().map(|id| index[&id]).collect();
        let links = self
            .edges
            .values()
            .filter(|e| e.enabled)
            .map(|e| (index[&e.from], index[&e.to], e.weight))
            .collect();
        GraphNetwork::new(activations, inputs, outputs, links, settings)
    }
}

impl Display for GraphGenome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "genome: {} nodes ({} hidden), {} edges ({} enabled)",
            self.nodes.len(),
            self.num_hidden(),
            self.edges.len(),
            self.num_enabled_edges()
        )?;
        for node in self.nodes.values() {
            writeln!(f, "  node {}", node)?;
        }
        for edge in self.edges.values() {
            writeln!(f, "  edge {}", edge)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::network::Network;

    pub(crate) fn genome(
        edges: &[(InnovationId, NodeId, NodeId, f32)],
        hidden: &[NodeId],
    ) -> GraphGenome {
        let mut nodes = vec![
            NodeGene::new(0, NodeKind::Input, Activation::Linear),
            NodeGene::new(1, NodeKind::Input, Activation::Linear),
            NodeGene::new(2, NodeKind::Output, Activation::Linear),
            NodeGene::new(3, NodeKind::Output, Activation::Linear),
        ];
        for &h in hidden {
            nodes.push(NodeGene::new(h, NodeKind::Hidden, Activation::Linear));
        }
        let edges = edges
            .iter()
            .map(|&(id, from, to, w)| EdgeGene::new(id, from, to, w))
            .collect();
        GraphGenome::new(nodes, edges, Activation::Linear, false).unwrap()
    }

    #[test]
    fn dangling_edge_is_rejected() {
        let nodes = vec![NodeGene::new(0, NodeKind::Input, Activation::Linear)];
        let edges = vec![EdgeGene::new(0, 0, 9, 1.0)];
        let result = GraphGenome::new(nodes, edges, Activation::Linear, false);
        assert!(matches!(result, Err(NeatError::MissingNode { edge: 0, node: 9 })));
    }

    #[test]
    fn cycle_detection() {
        let g = genome(&[(0, 0, 4, 1.0), (1, 4, 5, 1.0), (2, 5, 2, 1.0)], &[4, 5]);
        assert!(g.creates_cycle(5, 4));
        assert!(g.creates_cycle(2, 4));
        assert!(g.creates_cycle(4, 4));
        assert!(!g.creates_cycle(4, 2));
        assert!(!g.creates_cycle(1, 5));
    }

    #[test]
    fn defects_are_reported() {
        let mut g = genome(&[(0, 0, 2, 1.0), (1, 1, 3, 1.0)], &[]);
        assert_eq!(g.defect(), None);
        g.edges.insert(2, EdgeGene::new(2, 0, 777, 1.0));
        assert_eq!(g.defect().as_deref(), Some("edge 2 references missing node 777"));
        g.edges.remove(&2);
        g.edges.insert(5, EdgeGene::new(4, 0, 2, 1.0));
        assert!(g.defect().is_some());
        g.edges.remove(&5);
        let moved = g.nodes.remove(&3).unwrap();
        g.nodes.insert(8, moved);
        assert!(g.defect().is_some());
    }

    #[test]
    fn compiles_mixed_activations() {
        let mut g = genome(&[(0, 0, 2, -2.0), (1, 1, 3, 1.0)], &[]);
        g.nodes.get_mut(&3).unwrap().activation = Activation::Sigmoid;
        let mut network = g.compile(NetworkSettings::default());
        let output = network.calculate(&[2.0, 3.0]);
        assert_eq!(output[0], -4.0);
        assert!((output[1] - 0.952_574_1).abs() < 1e-6);
        assert!(!network.is_recurrent());
    }

    #[test]
    fn disabled_edges_are_not_compiled() {
        let mut g = genome(&[(0, 0, 2, 3.0), (1, 1, 2, 5.0)], &[]);
        g.edges.get_mut(&1).unwrap().enabled = false;
        let mut network = g.compile(NetworkSettings::default());
        assert_eq!(network.calculate(&[1.0, 1.0]), vec![3.0, 0.0]);
    }

    #[test]
    fn counts() {
        let g = genome(&[(0, 0, 4, 1.0), (1, 4, 2, 1.0)], &[4]);
        assert_eq!(g.num_hidden(), 1);
        assert_eq!(g.num_enabled_edges(), 2);
        assert_eq!(g.gene_count(), 7);
        assert_eq!(g.inputs().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(g.outputs().collect::<Vec<_>>(), vec![2, 3]);
    }
}
