use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::context::RunContext;
use crate::environment::{Environment, Generation};
use crate::error::{NeatError, Result};
use crate::genome::{Genome, GenomeBuilder};
use crate::individual::{Fitness, Individual};
use crate::innovation::{InnovationCache, InnovationCounters};
use crate::scoring::{assess, ScoringFunction};
use crate::snapshot::{Archive, PopulationSnapshot};
use crate::species::{adjust_threshold, speciate, stagnant_species, Species, SpeciesId};

/// Lifecycle position of a [`Population`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    Uninitialized,
    Ready,
    Scored,
}

impl State {
    fn name(self) -> &'static str {
        match self {
            State::Uninitialized => "uninitialized",
            State::Ready => "ready",
            State::Scored => "scored",
        }
    }
}

/// Summary of one assessed generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: Generation,
    pub species: usize,
    pub average: Fitness,
    pub best: Fitness,
}

pub struct Population<R: Rng = StdRng> {
    environment: Environment,
    builder: GenomeBuilder,
    context: RunContext<R>,
    species: Vec<Species>,
    generation: Generation,
    state: State,
    next_species_id: SpeciesId,
    generation_fitness: Fitness,
    best: Option<Individual>,
    history: Vec<GenerationStats>,
    archive: Option<Box<dyn Archive + Send>>,
}

impl<R: Rng> Population<R> {
    pub fn new(environment: Environment, builder: GenomeBuilder, rng: R) -> Result<Self> {
        environment.validate()?;
        Ok(Self {
            environment,
            builder,
            context: RunContext::new(
                rng,
                InnovationCache::new(InnovationCounters {
                    next_node: 0,
                    next_edge: 0,
                }),
            ),
            species: vec![],
            generation: 0,
            state: State::Uninitialized,
            next_species_id: 0,
            generation_fitness: 0.0,
            best: None,
            history: vec![],
            archive: None,
        })
    }
    fn expect_state(&self, operation: &'static str, expected: State) -> Result<()> {
        if self.state != expected {
            return Err(NeatError::InvalidState {
                operation,
                state: self.state.name(),
            });
        }
        Ok(())
    }
    /// Builds the ancestor genome and fills the population with mutated copies of it.
    pub fn create_first_generation(&mut self) -> Result<()> {
        self.expect_state("create the first generation", State::Uninitialized)?;
        let (base, innovations) = self.builder.build(&mut self.context.rng);
        self.context.innovations = innovations;
        let mut individuals = Vec::with_capacity(self.environment.population_size);
        for _ in 0..self.environment.population_size {
            let mut genome = base.clone();
            genome.mutate(&self.environment, &mut self.context);
            individuals.push(Individual::new(genome));
        }
        speciate(
            &mut self.species,
            individuals,
            &self.environment,
            self.generation,
            &mut self.next_species_id,
        );
        adjust_threshold(&mut self.environment, self.species.len());
        self.state = State::Ready;
        info!(
            population = self.environment.population_size,
            species = self.species.len(),
            "first generation created"
        );
        Ok(())
    }
    /// Scores every individual; returns whether any of them is a winner.
    pub fn assess_generation<S>(&mut self, scoring: &S) -> Result<bool>
    where
        S: ScoringFunction + Sync,
    {
        self.expect_state("assess a generation", State::Ready)?;
        let settings = self.environment.network;
        let individuals: Vec<&mut Individual> = self
            .species
            .iter_mut()
            .flat_map(|s| s.members.iter_mut())
            .collect();
        let won = assess(individuals, scoring, settings)?;
        let mut total = 0.0;
        let mut count = 0;
        let mut champion: Option<&Individual> = None;
        for species in self.species.iter_mut() {
            species.update_fitness(self.generation);
            species.sort_members();
        }
        for member in self.species.iter().flat_map(|s| s.members.iter()) {
            total += member.fitness;
            count += 1;
            if champion.map_or(true, |c| Individual::rank(member, c) == Ordering::Less) {
                champion = Some(member);
            }
        }
        self.generation_fitness = if count > 0 { total / count as Fitness } else { 0.0 };
        let best_now = champion.map(|c| c.fitness).unwrap_or(0.0);
        if let Some(champion) = champion {
            let improved = self
                .best
                .as_ref()
                .map_or(true, |best| champion.fitness > best.fitness);
            if improved {
                self.best = Some(champion.clone());
            }
        }
        let stats = GenerationStats {
            generation: self.generation,
            species: self.species.len(),
            average: self.generation_fitness,
            best: best_now,
        };
        info!(
            generation = stats.generation,
            species = stats.species,
            average = stats.average,
            best = stats.best,
            winner = won,
            "generation assessed"
        );
        self.history.push(stats);
        self.state = State::Scored;
        Ok(won)
    }
    /// Breeds the next generation from the scored one. Nothing changes when
    /// breeding fails, so the population stays scored.
    pub fn next_generation(&mut self) -> Result<()> {
        self.expect_state("breed the next generation", State::Scored)?;
        if self.archive.is_some() {
            let snapshot = self.snapshot();
            if let Some(archive) = self.archive.as_mut() {
                archive.store(snapshot);
            }
        }
        let generation = self.generation;
        let stagnant = stagnant_species(&self.species, generation, &self.environment);
        let breeding: Vec<&Species> = self
            .species
            .iter()
            .filter(|s| !stagnant.contains(&s.id))
            .collect();
        let fitness: Vec<Fitness> = breeding.iter().map(|s| s.fitness).collect();
        let allowances = allowances(
            &fitness,
            self.environment.population_size,
            self.environment.min_offspring,
            &mut self.context.rng,
        );
        debug!(?allowances, "breeding allowances");
        let champions: Vec<(SpeciesId, &Individual)> = breeding
            .iter()
            .filter_map(|s| s.members.first().map(|c| (s.id, c)))
            .collect();
        let innovations = self.context.innovations.clone();
        self.context.innovations.clear();
        let mut offspring = Vec::with_capacity(self.environment.population_size);
        for (species, allowance) in breeding.iter().zip(allowances) {
            let bred = breed(
                species,
                allowance,
                &champions,
                &self.environment,
                &mut self.context,
                &mut offspring,
            );
            if let Err(e) = bred {
                self.context.innovations = innovations;
                return Err(e);
            }
        }
        let mut next: Vec<Species> = breeding
            .iter()
            .map(|s| s.empty_duplicate(&mut self.context.rng))
            .collect();
        speciate(
            &mut next,
            offspring,
            &self.environment,
            generation + 1,
            &mut self.next_species_id,
        );
        self.species = next;
        adjust_threshold(&mut self.environment, self.species.len());
        self.generation += 1;
        self.state = State::Ready;
        debug!(
            generation = self.generation,
            species = self.species.len(),
            threshold = self.environment.compatibility_threshold,
            "next generation bred"
        );
        Ok(())
    }
    /// Best individual seen across every assessed generation.
    pub fn best_individual(&self) -> Option<&Individual> {
        self.best.as_ref()
    }
    /// Mean fitness of the last assessed generation.
    pub fn generation_fitness(&self) -> Fitness {
        self.generation_fitness
    }
    pub fn species(&self) -> &[Species] {
        &self.species
    }
    pub fn individuals(&self) -> impl Iterator<Item = &Individual> {
        self.species.iter().flat_map(|s| s.members.iter())
    }
    pub fn state(&self) -> State {
        self.state
    }
    pub fn generation(&self) -> Generation {
        self.generation
    }
    pub fn history(&self) -> &[GenerationStats] {
        &self.history
    }
    pub fn environment(&self) -> &Environment {
        &self.environment
    }
    pub fn set_archive<A: Archive + Send + 'static>(&mut self, archive: A) {
        self.archive = Some(Box::new(archive));
    }
    pub fn snapshot(&self) -> PopulationSnapshot {
        let (species, individuals) = PopulationSnapshot::capture(self.species.iter());
        PopulationSnapshot {
            generation: self.generation,
            state: self.state,
            compatibility_threshold: self.environment.compatibility_threshold,
            next_species_id: self.next_species_id,
            species,
            individuals,
            innovation: self.context.innovations.counters(),
            best: self.best.clone(),
            generation_fitness: self.generation_fitness,
            history: self.history.clone(),
        }
    }
    /// Resumes a run from `snapshot` in the state it was taken in.
    pub fn restore(
        environment: Environment,
        builder: GenomeBuilder,
        snapshot: PopulationSnapshot,
        rng: R,
    ) -> Result<Self> {
        let mut population = Self::new(environment, builder, rng)?;
        if !(snapshot.compatibility_threshold > 0.0) {
            return Err(NeatError::CorruptSnapshot(format!(
                "compatibility threshold {} is not positive",
                snapshot.compatibility_threshold
            )));
        }
        let species = snapshot.unpack()?;
        for s in species.iter() {
            let genomes = std::iter::once(&s.representative)
                .chain(s.members.iter().map(|m| &m.genome));
            for genome in genomes {
                if let Some(reason) = population.builder.mismatch(genome) {
                    return Err(NeatError::CorruptSnapshot(format!(
                        "species {}: {}",
                        s.id, reason
                    )));
                }
            }
        }
        if let Some(reason) = snapshot
            .best
            .as_ref()
            .and_then(|best| population.builder.mismatch(&best.genome))
        {
            return Err(NeatError::CorruptSnapshot(format!("best individual: {}", reason)));
        }
        if snapshot.state != State::Uninitialized && species.is_empty() {
            return Err(NeatError::CorruptSnapshot(format!(
                "a {} population has no species",
                snapshot.state.name()
            )));
        }
        population.context.innovations.reserve(snapshot.innovation);
        for individual in species.iter().flat_map(|s| s.members.iter()) {
            let pattern = individual.genome.pattern();
            population.context.innovations.reserve(InnovationCounters {
                next_node: pattern.nodes().map(|n| n.id + 1).max().unwrap_or(0),
                next_edge: pattern.edges().map(|e| e.id + 1).max().unwrap_or(0),
            });
        }
        population.environment.compatibility_threshold = snapshot.compatibility_threshold;
        population.species = species;
        population.generation = snapshot.generation;
        population.state = snapshot.state;
        population.next_species_id = snapshot.next_species_id;
        population.generation_fitness = snapshot.generation_fitness;
        population.best = snapshot.best;
        population.history = snapshot.history;
        info!(
            generation = population.generation,
            species = population.species.len(),
            "population restored"
        );
        Ok(population)
    }
}

/// Fills `allowance` slots for one species: its champion first when the species
/// is large enough, then crossover or mutation of the surviving members.
fn breed<R: Rng>(
    species: &Species,
    allowance: usize,
    champions: &[(SpeciesId, &Individual)],
    environment: &Environment,
    ctx: &mut RunContext<R>,
    offspring: &mut Vec<Individual>,
) -> Result<()> {
    if species.members.is_empty() || allowance == 0 {
        return Ok(());
    }
    let mut remaining = allowance;
    if species.members.len() >= environment.elitism_threshold {
        let champion = species.members[0].genome.clone();
        offspring.push(Individual::offspring(champion, species.id));
        remaining -= 1;
    }
    let len = species.members.len();
    let survivors = ((len as f32 * environment.survival_threshold).ceil() as usize).clamp(1, len);
    let parents = &species.members[..survivors];
    let strangers: Vec<&Individual> = champions
        .iter()
        .filter(|(id, _)| *id != species.id)
        .map(|(_, champion)| *champion)
        .collect();
    for _ in 0..remaining {
        let mother = &parents[ctx.rng.gen_range(0..parents.len())];
        let genome = if ctx.chance(environment.crossover) {
            let father = if !strangers.is_empty() && ctx.chance(environment.interspecies) {
                strangers[ctx.rng.gen_range(0..strangers.len())]
            } else {
                &parents[ctx.rng.gen_range(0..parents.len())]
            };
            let (fit, other) = match Individual::rank(mother, father) {
                Ordering::Greater => (father, mother),
                _ => (mother, father),
            };
            let average = ctx.chance(environment.crossover_average);
            let mut child =
                Genome::crossover(&fit.genome, &other.genome, average, environment, &mut ctx.rng)?;
            if !ctx.chance(environment.mate_only) {
                child.mutate(environment, ctx);
            }
            child
        } else {
            let mut child = mother.genome.clone();
            child.mutate(environment, ctx);
            child
        };
        offspring.push(Individual::offspring(genome, species.id));
    }
    Ok(())
}

/// Offspring per species: `min_offspring` each, the remainder split by share of
/// non-negative fitness, leftovers handed out at random. Always sums to `size`.
pub(crate) fn allowances<R: Rng>(
    fitness: &[Fitness],
    size: usize,
    min_offspring: usize,
    rng: &mut R,
) -> Vec<usize> {
    let count = fitness.len();
    if count == 0 {
        return vec![];
    }
    let guaranteed = count * min_offspring;
    if guaranteed > size {
        warn!(
            species = count,
            guaranteed, size, "minimum offspring exceed the population size, clamping"
        );
        let mut order: Vec<usize> = (0..count).collect();
        order.sort_by(|a, b| fitness[*b].total_cmp(&fitness[*a]));
        let mut allowances = vec![0; count];
        let mut remaining = size;
        for idx in order {
            let share = min_offspring.min(remaining);
            allowances[idx] = share;
            remaining -= share;
        }
        return allowances;
    }
    let mut allowances = vec![min_offspring; count];
    let remainder = size - guaranteed;
    let shares: Vec<Fitness> = fitness.iter().map(|f| f.max(0.0)).collect();
    let total: Fitness = shares.iter().sum();
    let mut assigned = 0;
    if total > 0.0 && total.is_finite() {
        for (allowance, share) in allowances.iter_mut().zip(shares) {
            let extra = ((share / total) * remainder as Fitness).floor() as usize;
            let extra = extra.min(remainder - assigned);
            *allowance += extra;
            assigned += extra;
        }
    }
    for _ in assigned..remainder {
        allowances[rng.gen_range(0..count)] += 1;
    }
    allowances
}
