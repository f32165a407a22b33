use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::environment::{Environment, Generation};
use crate::genome::Genome;
use crate::individual::{Fitness, Individual};

pub type SpeciesId = usize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species {
    pub id: SpeciesId,
    pub parent_id: Option<SpeciesId>,
    pub founded: Generation,
    pub representative: Genome,
    pub members: Vec<Individual>,
    /// Mean member fitness of the last assessment.
    pub fitness: Fitness,
    pub peak_fitness: Fitness,
    pub last_improvement: Generation,
}

impl Species {
    pub fn new(
        id: SpeciesId,
        parent_id: Option<SpeciesId>,
        founded: Generation,
        representative: Genome,
    ) -> Species {
        Self {
            id,
            parent_id,
            founded,
            representative,
            members: vec![],
            fitness: 0.0,
            peak_fitness: Fitness::MIN,
            last_improvement: founded,
        }
    }
    /// Same species with no members and a representative drawn at random from
    /// the current ones.
    pub fn empty_duplicate<R: Rng>(&self, rng: &mut R) -> Species {
        let representative = if self.members.is_empty() {
            self.representative.clone()
        } else {
            self.members[rng.gen_range(0..self.members.len())].genome.clone()
        };
        Species {
            id: self.id,
            parent_id: self.parent_id,
            founded: self.founded,
            representative,
            members: vec![],
            fitness: self.fitness,
            peak_fitness: self.peak_fitness,
            last_improvement: self.last_improvement,
        }
    }
    pub fn update_fitness(&mut self, generation: Generation) {
        if self.members.is_empty() {
            self.fitness = 0.0;
            return;
        }
        self.fitness =
            self.members.iter().map(|m| m.fitness).sum::<Fitness>() / self.members.len() as Fitness;
        if self.fitness > self.peak_fitness {
            self.peak_fitness = self.fitness;
            self.last_improvement = generation;
        }
    }
    /// Stale for too long and past its grace period.
    pub fn is_stagnant(&self, generation: Generation, environment: &Environment) -> bool {
        generation.saturating_sub(self.last_improvement) >= environment.stagnation_threshold
            && generation.saturating_sub(self.founded) >= environment.new_species_grace
    }
    pub fn sort_members(&mut self) {
        self.members.sort_by(Individual::rank);
    }
}

/// Files every individual under the first species whose representative is
/// close enough, founding new species as needed. Species left empty are dropped.
pub(crate) fn speciate(
    species: &mut Vec<Species>,
    individuals: Vec<Individual>,
    environment: &Environment,
    generation: Generation,
    next_id: &mut SpeciesId,
) {
    for individual in individuals {
        let found = species.iter().position(|s| {
            s.representative.distance(&individual.genome, environment)
                < environment.compatibility_threshold
        });
        match found {
            Some(idx) => species[idx].members.push(individual),
            None => {
                let id = *next_id;
                *next_id += 1;
                debug!(species = id, parent = ?individual.lineage, generation, "new species");
                let mut created =
                    Species::new(id, individual.lineage, generation, individual.genome.clone());
                created.members.push(individual);
                species.push(created);
            }
        }
    }
    species.retain(|s| {
        if s.members.is_empty() {
            debug!(species = s.id, "species died out");
        }
        !s.members.is_empty()
    });
}

/// Stagnant species to drop, worst peak first, never taking the count below
/// the species floor.
pub(crate) fn stagnant_species(
    species: &[Species],
    generation: Generation,
    environment: &Environment,
) -> Vec<SpeciesId> {
    let removable = species.len().saturating_sub(environment.min_species.max(1));
    let mut candidates: Vec<(SpeciesId, Fitness)> = species
        .iter()
        .filter(|s| s.is_stagnant(generation, environment))
        .map(|s| (s.id, s.peak_fitness))
        .collect();
    candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
    let mut removed = vec![];
    for (id, peak) in candidates {
        if removed.len() >= removable {
            debug!(species = id, "keeping stagnant species at the species floor");
            continue;
        }
        debug!(species = id, peak, generation, "removing stagnant species");
        removed.push(id);
    }
    removed
}

/// Moves the threshold a step toward the target species count, if one is set.
pub(crate) fn adjust_threshold(environment: &mut Environment, species_count: usize) {
    let Some(target) = environment.target_species else {
        return;
    };
    if species_count > target {
        environment.compatibility_threshold += environment.threshold_step;
    } else if species_count < target {
        environment.compatibility_threshold = (environment.compatibility_threshold
            - environment.threshold_step)
            .max(environment.min_threshold);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::{GenomeBuilder, GenomeConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn base() -> Genome {
        let mut config = GenomeConfig::new(2, 1);
        config.initial_connections = Some(vec![(0, 2, 1.0), (1, 2, 1.0)]);
        GenomeBuilder::new(config).unwrap().build(&mut StdRng::seed_from_u64(0)).0
    }

    fn scored(genome: &Genome, fitness: Fitness) -> Individual {
        Individual {
            fitness,
            ..Individual::new(genome.clone())
        }
    }

    #[test]
    fn fitness_tracks_peak_and_improvement() {
        let genome = base();
        let mut species = Species::new(0, None, 0, genome.clone());
        species.members = vec![scored(&genome, 1.0), scored(&genome, 3.0)];
        species.update_fitness(0);
        let summary = |s: &Species| (s.fitness, s.peak_fitness, s.last_improvement);
        assert_eq!(summary(&species), (2.0, 2.0, 0));
        species.members[1].fitness = 1.0;
        species.update_fitness(4);
        assert_eq!(summary(&species), (1.0, 2.0, 0));
    }

    #[test]
    fn speciation_separates_distant_genomes() {
        let environment = Environment::default();
        let genome = base();
        let mut far = genome.clone();
        if let Genome::Graph(graph) = &mut far {
            for edge in graph.edges.values_mut() {
                edge.weight += 100.0;
            }
        }
        let mut species = vec![];
        let mut next_id = 0;
        let individuals = vec![scored(&genome, 0.0), scored(&far, 0.0), scored(&genome, 0.0)];
        speciate(&mut species, individuals, &environment, 0, &mut next_id);
        assert_eq!(species.len(), 2);
        assert_eq!(species[0].members.len(), 2);
        assert_eq!(next_id, 2);
        let mut rng = StdRng::seed_from_u64(1);
        let mut next: Vec<Species> = species.iter().map(|s| s.empty_duplicate(&mut rng)).collect();
        speciate(&mut next, vec![scored(&genome, 0.0)], &environment, 1, &mut next_id);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].id, 0);
    }

    #[test]
    fn stagnation_respects_grace_and_floor() {
        let mut environment = Environment::default();
        environment.set_stagnation_threshold(3);
        environment.set_new_species_grace(2);
        environment.set_min_species(2);
        let genome = base();
        let mut species: Vec<Species> = (0..4)
            .map(|id| Species::new(id, None, 0, genome.clone()))
            .collect();
        species[0].peak_fitness = 5.0;
        species[1].peak_fitness = 1.0;
        species[2].peak_fitness = 3.0;
        species[3].founded = 9;
        species[3].last_improvement = 0;
        assert_eq!(stagnant_species(&species, 10, &environment), vec![1, 2]);
        assert!(!species[3].is_stagnant(10, &environment));
        environment.set_min_species(3);
        assert_eq!(stagnant_species(&species, 10, &environment), vec![1]);
    }

    #[test]
    fn threshold_moves_toward_target() {
        let mut environment = Environment::default();
        adjust_threshold(&mut environment, 50);
        assert_eq!(environment.compatibility_threshold, 3.0);
        environment.set_target_species(Some(10));
        adjust_threshold(&mut environment, 20);
        assert!((environment.compatibility_threshold - 3.3).abs() < 1e-6);
        environment.set_compatibility_threshold(0.4);
        adjust_threshold(&mut environment, 2);
        assert_eq!(environment.compatibility_threshold, environment.min_threshold);
    }
}
