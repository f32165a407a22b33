use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::genome::Genome;
use crate::species::SpeciesId;

pub type Fitness = f32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Individual {
    pub genome: Genome,
    pub fitness: Fitness,
    pub winner: bool,
    /// Species that bred this individual, if any.
    pub lineage: Option<SpeciesId>,
}

impl Individual {
    pub fn new(genome: Genome) -> Self {
        Self {
            genome,
            fitness: 0.0,
            winner: false,
            lineage: None,
        }
    }
    pub(crate) fn offspring(genome: Genome, species: SpeciesId) -> Self {
        Self {
            lineage: Some(species),
            ..Self::new(genome)
        }
    }
    /// Fitter first; equal fitness prefers the smaller genome.
    pub fn rank(a: &Individual, b: &Individual) -> Ordering {
        b.fitness
            .total_cmp(&a.fitness)
            .then_with(|| a.genome.gene_count().cmp(&b.genome.gene_count()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Activation;
    use crate::genome::{EdgeGene, GraphGenome, NodeGene, NodeKind};

    fn individual(fitness: Fitness, edges: usize) -> Individual {
        let nodes = vec![
            NodeGene::new(0, NodeKind::Input, Activation::Linear),
            NodeGene::new(1, NodeKind::Output, Activation::Linear),
        ];
        let edges = (0..edges as u32).map(|id| EdgeGene::new(id, 0, 1, 1.0)).collect();
        let genome = GraphGenome::new(nodes, edges, Activation::Sigmoid, false).unwrap();
        Individual {
            fitness,
            ..Individual::new(Genome::Graph(genome))
        }
    }

    #[test]
    fn ranking_prefers_fitness_then_size() {
        let mut members = vec![individual(1.0, 1), individual(3.0, 4), individual(3.0, 2)];
        members.sort_by(Individual::rank);
        let order: Vec<_> = members
            .iter()
            .map(|m| (m.fitness, m.genome.gene_count()))
            .collect();
        assert_eq!(order, vec![(3.0, 4), (3.0, 6), (1.0, 3)]);
    }
}
