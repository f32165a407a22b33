use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::error::{NeatError, Result};

pub type Generation = usize;

/// Limits applied when a compiled network settles cyclic connections.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkSettings {
    pub max_cycles: usize,
    pub epsilon: f32,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            max_cycles: 30,
            epsilon: 1e-4,
        }
    }
}

/// Tunable parameters of the evolutionary run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub population_size: usize,
    pub c1: f32,
    pub c2: f32,
    pub c3: f32,
    pub compatibility_threshold: f32,
    /// Nudges the threshold each generation toward this many species.
    pub target_species: Option<usize>,
    pub threshold_step: f32,
    pub min_threshold: f32,
    pub stagnation_threshold: Generation,
    pub min_species: usize,
    pub new_species_grace: Generation,
    /// Species at least this large keep their champion unmutated.
    pub elitism_threshold: usize,
    pub survival_threshold: f32,
    pub min_offspring: usize,
    pub crossover: f32,
    pub crossover_average: f32,
    pub mate_only: f32,
    pub interspecies: f32,
    pub inherit_disable: f32,
    pub add_node: f32,
    pub add_edge: f32,
    pub allow_recurrent: bool,
    pub add_edge_attempts: usize,
    pub weight_mutation: f32,
    pub weight_reset: f32,
    pub weight_range: f32,
    pub weight_perturbation: f32,
    pub toggle_edge: f32,
    pub node_trait: f32,
    pub activation_pool: Vec<Activation>,
    pub network: NetworkSettings,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            population_size: 150,
            c1: 1.0,
            c2: 1.0,
            c3: 0.4,
            compatibility_threshold: 3.0,
            target_species: None,
            threshold_step: 0.3,
            min_threshold: 0.3,
            stagnation_threshold: 15,
            min_species: 1,
            new_species_grace: 2,
            elitism_threshold: 5,
            survival_threshold: 0.2,
            min_offspring: 1,
            crossover: 0.75,
            crossover_average: 0.4,
            mate_only: 0.2,
            interspecies: 0.001,
            inherit_disable: 0.75,
            add_node: 0.03,
            add_edge: 0.05,
            allow_recurrent: false,
            add_edge_attempts: 20,
            weight_mutation: 0.8,
            weight_reset: 0.1,
            weight_range: 2.0,
            weight_perturbation: 0.5,
            toggle_edge: 0.01,
            node_trait: 0.05,
            activation_pool: Activation::ALL.to_vec(),
            network: NetworkSettings::default(),
        }
    }
}

impl Environment {
    pub fn new(population_size: usize) -> Self {
        Self {
            population_size,
            ..Default::default()
        }
    }
    pub fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(NeatError::config("population size must be positive"));
        }
        if !(self.compatibility_threshold > 0.0) {
            return Err(NeatError::config("compatibility threshold must be positive"));
        }
        if self.weight_range < 0.0 || self.weight_perturbation < 0.0 {
            return Err(NeatError::config("weight ranges must not be negative"));
        }
        if self.network.max_cycles == 0 {
            return Err(NeatError::config("networks need at least one cycle"));
        }
        let probabilities = [
            ("survival_threshold", self.survival_threshold),
            ("crossover", self.crossover),
            ("crossover_average", self.crossover_average),
            ("mate_only", self.mate_only),
            ("interspecies", self.interspecies),
            ("inherit_disable", self.inherit_disable),
            ("add_node", self.add_node),
            ("add_edge", self.add_edge),
            ("weight_mutation", self.weight_mutation),
            ("weight_reset", self.weight_reset),
            ("toggle_edge", self.toggle_edge),
            ("node_trait", self.node_trait),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(NeatError::config(format!("{} must lie in [0, 1], got {}", name, p)));
            }
        }
        Ok(())
    }
    pub fn set_population_size(&mut self, population_size: usize) {
        self.population_size = population_size;
    }
    pub fn set_c1(&mut self, c1: f32) {
        self.c1 = c1;
    }
    pub fn set_c2(&mut self, c2: f32) {
        self.c2 = c2;
    }
    pub fn set_c3(&mut self, c3: f32) {
        self.c3 = c3;
    }
    pub fn set_compatibility_threshold(&mut self, compatibility_threshold: f32) {
        self.compatibility_threshold = compatibility_threshold;
    }
    pub fn set_target_species(&mut self, target_species: Option<usize>) {
        self.target_species = target_species;
    }
    pub fn set_stagnation_threshold(&mut self, stagnation_threshold: Generation) {
        self.stagnation_threshold = stagnation_threshold;
    }
    pub fn set_min_species(&mut self, min_species: usize) {
        self.min_species = min_species;
    }
    pub fn set_new_species_grace(&mut self, new_species_grace: Generation) {
        self.new_species_grace = new_species_grace;
    }
    pub fn set_elitism_threshold(&mut self, elitism_threshold: usize) {
        self.elitism_threshold = elitism_threshold;
    }
    pub fn set_survival_threshold(&mut self, survival_threshold: f32) {
        self.survival_threshold = survival_threshold;
    }
    pub fn set_crossover(&mut self, crossover: f32) {
        self.crossover = crossover;
    }
    pub fn set_mate_only(&mut self, mate_only: f32) {
        self.mate_only = mate_only;
    }
    pub fn set_interspecies(&mut self, interspecies: f32) {
        self.interspecies = interspecies;
    }
    pub fn set_inherit_disable(&mut self, inherit_disable: f32) {
        self.inherit_disable = inherit_disable;
    }
    pub fn set_add_node(&mut self, add_node: f32) {
        self.add_node = add_node;
    }
    pub fn set_add_edge(&mut self, add_edge: f32) {
        self.add_edge = add_edge;
    }
    pub fn set_allow_recurrent(&mut self, allow_recurrent: bool) {
        self.allow_recurrent = allow_recurrent;
    }
    pub fn set_weight_mutation(&mut self, weight_mutation: f32) {
        self.weight_mutation = weight_mutation;
    }
    pub fn set_weight_reset(&mut self, weight_reset: f32) {
        self.weight_reset = weight_reset;
    }
    pub fn set_toggle_edge(&mut self, toggle_edge: f32) {
        self.toggle_edge = toggle_edge;
    }
    pub fn set_node_trait(&mut self, node_trait: f32) {
        self.node_trait = node_trait;
    }
}
