//! NeuroEvolution of Augmenting Topologies: genomes with historical markings,
//! speciation, a generation lifecycle and the networks evolved genomes compile to.

pub mod activation;
pub mod context;
pub mod environment;
pub mod error;
pub mod genome;
pub mod individual;
pub mod innovation;
pub mod network;
pub mod population;
pub mod scoring;
pub mod snapshot;
pub mod species;

pub use activation::Activation;
pub use context::RunContext;
pub use environment::{Environment, Generation, NetworkSettings};
pub use error::{NeatError, Result};
pub use genome::{Genome, GenomeBuilder, GenomeConfig, SubstrateConfig, Wiring};
pub use individual::{Fitness, Individual};
pub use innovation::{InnovationCache, InnovationCounters};
pub use network::{ComposedNetwork, GraphNetwork, Network, SubstrateLayout, SubstrateNetwork};
pub use population::{GenerationStats, Population, State};
pub use scoring::{run_episode, ScoringFunction};
pub use snapshot::{Archive, MemoryArchive, PopulationSnapshot, SpeciesRecord};
pub use species::{Species, SpeciesId};
