mod builder;
mod compatibility;
mod crossover;
mod gene;
mod graph;
mod mutation;

use std::fmt::{Display, Formatter};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::error;

pub use builder::{GenomeBuilder, GenomeConfig, SubstrateConfig, Wiring};
pub use compatibility::Compatibility;
pub use crossover::crossover;
pub use gene::{EdgeGene, InnovationId, NodeGene, NodeId, NodeKind};
pub use graph::GraphGenome;

use crate::context::RunContext;
use crate::environment::{Environment, NetworkSettings};
use crate::error::{NeatError, Result};
use crate::network::{ComposedNetwork, Network, SubstrateNetwork};

/// Evolved pattern network paired with the fixed substrate it drives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposedGenome {
    pub pattern: GraphGenome,
    pub substrate: SubstrateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Genome {
    Graph(GraphGenome),
    Composed(ComposedGenome),
}

impl Genome {
    /// The evolving graph; for composed genomes this is the pattern network.
    pub fn pattern(&self) -> &GraphGenome {
        match self {
            Genome::Graph(graph) => graph,
            Genome::Composed(composed) => &composed.pattern,
        }
    }
    fn pattern_mut(&mut self) -> &mut GraphGenome {
        match self {
            Genome::Graph(graph) => graph,
            Genome::Composed(composed) => &mut composed.pattern,
        }
    }
    pub fn gene_count(&self) -> usize {
        self.pattern().gene_count()
    }
    pub fn mutate<R: Rng>(&mut self, environment: &Environment, ctx: &mut RunContext<R>) {
        self.pattern_mut().mutate(environment, ctx);
    }
    /// Crosses `fit` with `other`; genes unique to `other` are dropped.
    pub fn crossover<R: Rng>(
        fit: &Genome,
        other: &Genome,
        average: bool,
        environment: &Environment,
        rng: &mut R,
    ) -> Result<Genome> {
        match (fit, other) {
            (Genome::Graph(a), Genome::Graph(b)) => {
                Ok(Genome::Graph(crossover(a, b, average, environment, rng)?))
            }
            (Genome::Composed(a), Genome::Composed(b)) if a.substrate == b.substrate => {
                Ok(Genome::Composed(ComposedGenome {
                    pattern: crossover(&a.pattern, &b.pattern, average, environment, rng)?,
                    substrate: a.substrate.clone(),
                }))
            }
            _ => {
                error!("refusing to cross genomes of different encodings");
                Err(NeatError::EncodingMismatch)
            }
        }
    }
    /// Genomes of different encodings are infinitely far apart.
    pub fn distance(&self, other: &Genome, environment: &Environment) -> f32 {
        match (self, other) {
            (Genome::Graph(a), Genome::Graph(b)) => Compatibility::new(a, b).distance(environment),
            (Genome::Composed(a), Genome::Composed(b)) if a.substrate == b.substrate => {
                Compatibility::new(&a.pattern, &b.pattern).distance(environment)
            }
            _ => f32::INFINITY,
        }
    }
    pub fn compile(&self, settings: NetworkSettings) -> Result<Box<dyn Network>> {
        match self {
            Genome::Graph(graph) => Ok(Box::new(graph.compile(settings))),
            Genome::Composed(composed) => {
                let mut pattern = composed.pattern.compile(settings);
                let layout = composed.substrate.layout.clone();
                match &composed.substrate.wiring {
                    Wiring::Chained { weights } => {
                        let substrate = SubstrateNetwork::new(layout, weights.clone())?;
                        Ok(Box::new(ComposedNetwork::new(
                            Box::new(pattern),
                            Box::new(substrate),
                        )))
                    }
                    Wiring::Queried {
                        threshold,
                        max_weight,
                    } => Ok(Box::new(SubstrateNetwork::from_pattern(
                        layout,
                        &mut pattern,
                        *threshold,
                        *max_weight,
                    )?)),
                }
            }
        }
    }
}

impl Display for Genome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Genome::Graph(graph) => write!(f, "{}", graph),
            Genome::Composed(composed) => {
                writeln!(f, "substrate layers {:?}", composed.substrate.layout.layers)?;
                write!(f, "{}", composed.pattern)
            }
        }
    }
}
