use std::collections::{BTreeMap, HashSet};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::error::{NeatError, Result};
use crate::genome::gene::{EdgeGene, InnovationId, NodeGene, NodeId, NodeKind};
use crate::genome::graph::GraphGenome;
use crate::genome::{ComposedGenome, Genome};
use crate::innovation::{InnovationCache, InnovationCounters};
use crate::network::{SubstrateLayout, SubstrateNetwork};

/// How the evolved pattern network drives its substrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Wiring {
    /// Pattern outputs become substrate inputs; substrate weights are fixed.
    Chained { weights: Vec<Vec<f32>> },
    /// The pattern is queried for every substrate weight.
    Queried { threshold: f32, max_weight: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstrateConfig {
    pub layout: SubstrateLayout,
    pub wiring: Wiring,
}

impl SubstrateConfig {
    pub(crate) fn validate(&self, num_inputs: usize, num_outputs: usize) -> Result<()> {
        self.layout.validate()?;
        match &self.wiring {
            Wiring::Chained { weights } => {
                SubstrateNetwork::new(self.layout.clone(), weights.clone())?;
                if num_outputs != self.layout.input_size() {
                    return Err(NeatError::config(format!(
                        "pattern gives {} outputs but the substrate takes {} inputs",
                        num_outputs,
                        self.layout.input_size()
                    )));
                }
            }
            Wiring::Queried {
                threshold,
                max_weight,
            } => {
                if num_inputs != self.layout.query_size() {
                    return Err(NeatError::config(format!(
                        "a queried substrate needs a pattern with {} inputs, got {}",
                        self.layout.query_size(),
                        num_inputs
                    )));
                }
                if !(0.0..1.0).contains(threshold) || !(*max_weight > 0.0) {
                    return Err(NeatError::config(
                        "expression threshold must lie in [0, 1) and max weight be positive",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// What the first genome of a run looks like.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeConfig {
    pub num_inputs: usize,
    pub num_outputs: usize,
    pub input_activation: Activation,
    pub output_activation: Activation,
    pub hidden_activation: Activation,
    pub random_activations: bool,
    /// `(from, to, weight)` over node indices: inputs first, then outputs.
    /// `None` connects every input to every output.
    pub initial_connections: Option<Vec<(usize, usize, f32)>>,
    pub weight_range: f32,
    pub substrate: Option<SubstrateConfig>,
}

impl GenomeConfig {
    pub fn new(num_inputs: usize, num_outputs: usize) -> Self {
        Self {
            num_inputs,
            num_outputs,
            input_activation: Activation::Linear,
            output_activation: Activation::Sigmoid,
            hidden_activation: Activation::Sigmoid,
            random_activations: false,
            initial_connections: None,
            weight_range: 1.0,
            substrate: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenomeBuilder {
    config: GenomeConfig,
}

impl GenomeBuilder {
    pub fn new(config: GenomeConfig) -> Result<Self> {
        if config.num_inputs == 0 || config.num_outputs == 0 {
            return Err(NeatError::config(format!(
                "a genome needs inputs and outputs, got {} and {}",
                config.num_inputs, config.num_outputs
            )));
        }
        if !(config.weight_range >= 0.0) {
            return Err(NeatError::config("initial weight range must not be negative"));
        }
        if let Some(connections) = &config.initial_connections {
            let total = config.num_inputs + config.num_outputs;
            let mut seen = HashSet::new();
            for &(from, to, weight) in connections {
                if from >= total || to >= total {
                    return Err(NeatError::config(format!(
                        "initial connection {} -> {} is out of range for {} nodes",
                        from, to, total
                    )));
                }
                if to < config.num_inputs {
                    return Err(NeatError::config(format!(
                        "initial connection {} -> {} ends in an input",
                        from, to
                    )));
                }
                if !weight.is_finite() {
                    return Err(NeatError::config(format!(
                        "initial connection {} -> {} has a non-finite weight",
                        from, to
                    )));
                }
                if !seen.insert((from, to)) {
                    return Err(NeatError::config(format!(
                        "initial connection {} -> {} is listed twice",
                        from, to
                    )));
                }
            }
        }
        if let Some(substrate) = &config.substrate {
            substrate.validate(config.num_inputs, config.num_outputs)?;
        }
        Ok(Self { config })
    }
    pub fn config(&self) -> &GenomeConfig {
        &self.config
    }
    /// Builds the ancestor genome together with a cache whose counters sit past its ids.
    pub fn build<R: Rng>(&self, rng: &mut R) -> (Genome, InnovationCache) {
        let config = &self.config;
        let mut nodes = BTreeMap::new();
        for i in 0..config.num_inputs {
            let id = i as NodeId;
            nodes.insert(id, NodeGene::new(id, NodeKind::Input, config.input_activation));
        }
        for o in 0..config.num_outputs {
            let id = (config.num_inputs + o) as NodeId;
            nodes.insert(id, NodeGene::new(id, NodeKind::Output, config.output_activation));
        }
        let pairs: Vec<(usize, usize, f32)> = match &config.initial_connections {
            Some(connections) => connections.clone(),
            None => {
                let range = config.weight_range;
                let mut pairs = vec![];
                for i in 0..config.num_inputs {
                    for o in config.num_inputs..config.num_inputs + config.num_outputs {
                        pairs.push((i, o, rng.gen_range(-range..=range)));
                    }
                }
                pairs
            }
        };
        let mut edges = BTreeMap::new();
        for (innovation, (from, to, weight)) in pairs.into_iter().enumerate() {
            let id = innovation as InnovationId;
            edges.insert(id, EdgeGene::new(id, from as NodeId, to as NodeId, weight));
        }
        let counters = InnovationCounters {
            next_node: nodes.len() as NodeId,
            next_edge: edges.len() as InnovationId,
        };
        let graph = GraphGenome {
            nodes,
            edges,
            hidden_activation: config.hidden_activation,
            random_activations: config.random_activations,
        };
        let genome = match &config.substrate {
            Some(substrate) => Genome::Composed(ComposedGenome {
                pattern: graph,
                substrate: substrate.clone(),
            }),
            None => Genome::Graph(graph),
        };
        (genome, InnovationCache::new(counters))
    }
    /// Why `genome` could not have descended from this builder's ancestor, if it
    /// could not: another encoding or substrate, other input or output counts,
    /// or a structural defect.
    pub fn mismatch(&self, genome: &Genome) -> Option<String> {
        let config = &self.config;
        match (genome, &config.substrate) {
            (Genome::Graph(_), None) => {}
            (Genome::Composed(composed), Some(substrate)) if composed.substrate == *substrate => {}
            _ => return Some("genome encoding differs from the configured one".to_string()),
        }
        let pattern = genome.pattern();
        let (inputs, outputs) = (pattern.inputs().count(), pattern.outputs().count());
        if (inputs, outputs) != (config.num_inputs, config.num_outputs) {
            return Some(format!(
                "genome has {} inputs and {} outputs, expected {} and {}",
                inputs, outputs, config.num_inputs, config.num_outputs
            ));
        }
        pattern.defect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn fully_connected_by_default() {
        let builder = GenomeBuilder::new(GenomeConfig::new(3, 2)).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let (genome, cache) = builder.build(&mut rng);
        let graph = genome.pattern();
        assert_eq!(graph.inputs().count(), 3);
        assert_eq!(graph.outputs().collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(graph.edges().count(), 6);
        assert!(graph.edges().all(|e| e.weight.abs() <= 1.0 && e.enabled));
        assert_eq!(
            cache.counters(),
            InnovationCounters {
                next_node: 5,
                next_edge: 6
            }
        );
    }

    #[test]
    fn explicit_wiring() {
        let mut config = GenomeConfig::new(2, 2);
        config.initial_connections = Some(vec![(0, 2, -2.0), (1, 3, 1.0)]);
        let builder = GenomeBuilder::new(config).unwrap();
        let (genome, _) = builder.build(&mut StdRng::seed_from_u64(2));
        let edges: Vec<_> = genome
            .pattern()
            .edges()
            .map(|e| (e.id, e.from, e.to, e.weight))
            .collect();
        assert_eq!(edges, vec![(0, 0, 2, -2.0), (1, 1, 3, 1.0)]);
    }

    #[test]
    fn foreign_genomes_are_told_apart() {
        let builder = GenomeBuilder::new(GenomeConfig::new(2, 1)).unwrap();
        let (mut genome, _) = builder.build(&mut StdRng::seed_from_u64(4));
        assert_eq!(builder.mismatch(&genome), None);
        let wider = GenomeBuilder::new(GenomeConfig::new(3, 1)).unwrap();
        assert!(wider.mismatch(&genome).is_some());
        if let Genome::Graph(graph) = &mut genome {
            graph.edges.insert(9, EdgeGene::new(9, 0, 777, 1.0));
        }
        let reason = builder.mismatch(&genome).unwrap();
        assert!(reason.contains("777"));
    }

    #[test]
    fn configuration_errors_fail_fast() {
        assert!(GenomeBuilder::new(GenomeConfig::new(0, 1)).is_err());
        assert!(GenomeBuilder::new(GenomeConfig::new(1, 0)).is_err());
        let mut config = GenomeConfig::new(2, 1);
        config.initial_connections = Some(vec![(0, 5, 1.0)]);
        assert!(GenomeBuilder::new(config.clone()).is_err());
        config.initial_connections = Some(vec![(2, 0, 1.0)]);
        assert!(GenomeBuilder::new(config.clone()).is_err());
        config.initial_connections = Some(vec![(0, 2, 1.0), (0, 2, 0.5)]);
        assert!(GenomeBuilder::new(config).is_err());
    }

    #[test]
    fn substrate_shapes_are_checked() {
        let layout = SubstrateLayout::new(vec![vec![2], vec![1]]);
        let mut config = GenomeConfig::new(2, 3);
        config.substrate = Some(SubstrateConfig {
            layout: layout.clone(),
            wiring: Wiring::Chained {
                weights: vec![vec![0.0; 2]],
            },
        });
        assert!(GenomeBuilder::new(config.clone()).is_err());
        config.num_outputs = 2;
        assert!(GenomeBuilder::new(config.clone()).is_ok());
        config.substrate = Some(SubstrateConfig {
            layout,
            wiring: Wiring::Queried {
                threshold: 0.2,
                max_weight: 3.0,
            },
        });
        assert!(GenomeBuilder::new(config.clone()).is_err());
        config.num_inputs = 4;
        config.num_outputs = 1;
        let builder = GenomeBuilder::new(config).unwrap();
        let (genome, _) = builder.build(&mut StdRng::seed_from_u64(3));
        assert!(matches!(genome, Genome::Composed(_)));
    }
}
