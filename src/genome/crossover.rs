use std::cmp::Ordering;
use std::collections::BTreeMap;

use rand::Rng;
use tracing::error;

use crate::context::chance;
use crate::environment::Environment;
use crate::error::{NeatError, Result};
use crate::genome::gene::{EdgeGene, NodeKind};
use crate::genome::graph::GraphGenome;

/// Multipoint crossover. Genes unique to `other` are never inherited; matching
/// genes take the averaged weight or one parent's weight depending on `average`.
pub fn crossover<R: Rng>(
    fit: &GraphGenome,
    other: &GraphGenome,
    average: bool,
    environment: &Environment,
    rng: &mut R,
) -> Result<GraphGenome> {
    let mut edges = BTreeMap::new();
    let mut best = fit.edges.values().peekable();
    let mut rest = other.edges.values().peekable();
    while let Some(gene) = best.peek().copied() {
        let Some(matching) = rest.peek().copied() else {
            edges.insert(gene.id, *gene);
            best.next();
            continue;
        };
        match gene.id.cmp(&matching.id) {
            Ordering::Less => {
                edges.insert(gene.id, *gene);
                best.next();
            }
            Ordering::Greater => {
                rest.next();
            }
            Ordering::Equal => {
                edges.insert(gene.id, inherit(gene, matching, average, environment, rng));
                best.next();
                rest.next();
            }
        }
    }
    let mut nodes: BTreeMap<_, _> = fit
        .nodes
        .values()
        .filter(|n| n.kind != NodeKind::Hidden)
        .map(|n| (n.id, *n))
        .collect();
    for edge in edges.values() {
        for endpoint in [edge.from, edge.to] {
            if nodes.contains_key(&endpoint) {
                continue;
            }
            match fit.nodes.get(&endpoint).or_else(|| other.nodes.get(&endpoint)) {
                Some(node) => {
                    nodes.insert(endpoint, *node);
                }
                None => {
                    error!(edge = edge.id, node = endpoint, "crossover hit a dangling edge");
                    return Err(NeatError::MissingNode {
                        edge: edge.id,
                        node: endpoint,
                    });
                }
            }
        }
    }
    Ok(GraphGenome {
        nodes,
        edges,
        hidden_activation: fit.hidden_activation,
        random_activations: fit.random_activations,
    })
}

fn inherit<R: Rng>(
    gene: &EdgeGene,
    matching: &EdgeGene,
    average: bool,
    environment: &Environment,
    rng: &mut R,
) -> EdgeGene {
    let mut child = *gene;
    child.weight = if average {
        (gene.weight + matching.weight) / 2.0
    } else if rng.gen_bool(0.5) {
        matching.weight
    } else {
        gene.weight
    };
    child.enabled = if !gene.enabled || !matching.enabled {
        !chance(rng, environment.inherit_disable)
    } else {
        true
    };
    child
}
