use std::collections::VecDeque;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::environment::Generation;
use crate::error::{NeatError, Result};
use crate::genome::Genome;
use crate::individual::{Fitness, Individual};
use crate::innovation::InnovationCounters;
use crate::population::{GenerationStats, State};
use crate::species::{Species, SpeciesId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesRecord {
    pub id: SpeciesId,
    pub parent_id: Option<SpeciesId>,
    pub founded: Generation,
    pub representative: Genome,
    pub fitness: Fitness,
    pub peak_fitness: Fitness,
    pub last_improvement: Generation,
    /// Indices into [`PopulationSnapshot::individuals`].
    pub members: Vec<usize>,
}

/// Everything needed to pick a run back up. The encoding is left to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationSnapshot {
    pub generation: Generation,
    pub state: State,
    pub compatibility_threshold: f32,
    pub next_species_id: SpeciesId,
    pub species: Vec<SpeciesRecord>,
    pub individuals: Vec<Individual>,
    pub innovation: InnovationCounters,
    pub best: Option<Individual>,
    pub generation_fitness: Fitness,
    pub history: Vec<GenerationStats>,
}

impl PopulationSnapshot {
    pub(crate) fn capture<'a>(
        species: impl Iterator<Item = &'a Species>,
    ) -> (Vec<SpeciesRecord>, Vec<Individual>) {
        let mut records = vec![];
        let mut individuals = vec![];
        for s in species {
            let start = individuals.len();
            individuals.extend(s.members.iter().cloned());
            records.push(SpeciesRecord {
                id: s.id,
                parent_id: s.parent_id,
                founded: s.founded,
                representative: s.representative.clone(),
                fitness: s.fitness,
                peak_fitness: s.peak_fitness,
                last_improvement: s.last_improvement,
                members: (start..individuals.len()).collect(),
            });
        }
        (records, individuals)
    }
    /// Rebuilds species, checking that every individual belongs to exactly one.
    pub(crate) fn unpack(&self) -> Result<Vec<Species>> {
        let mut claimed = vec![false; self.individuals.len()];
        let mut species = Vec::with_capacity(self.species.len());
        for record in self.species.iter() {
            if record.id >= self.next_species_id {
                return Err(NeatError::CorruptSnapshot(format!(
                    "species {} is not below the next species id {}",
                    record.id, self.next_species_id
                )));
            }
            let mut rebuilt = Species::new(
                record.id,
                record.parent_id,
                record.founded,
                record.representative.clone(),
            );
            rebuilt.fitness = record.fitness;
            rebuilt.peak_fitness = record.peak_fitness;
            rebuilt.last_improvement = record.last_improvement;
            for &member in record.members.iter() {
                match claimed.get_mut(member) {
                    Some(slot) if !*slot => *slot = true,
                    Some(_) => {
                        return Err(NeatError::CorruptSnapshot(format!(
                            "individual {} belongs to more than one species",
                            member
                        )))
                    }
                    None => {
                        return Err(NeatError::CorruptSnapshot(format!(
                            "species {} lists missing individual {}",
                            record.id, member
                        )))
                    }
                }
                rebuilt.members.push(self.individuals[member].clone());
            }
            species.push(rebuilt);
        }
        if let Some(orphan) = claimed.iter().position(|c| !c) {
            return Err(NeatError::CorruptSnapshot(format!(
                "individual {} has no species",
                orphan
            )));
        }
        Ok(species)
    }
}

/// Receives the outgoing generation right before it is replaced.
pub trait Archive {
    fn store(&mut self, snapshot: PopulationSnapshot);
}

impl Archive for Sender<PopulationSnapshot> {
    fn store(&mut self, snapshot: PopulationSnapshot) {
        // a dropped receiver just means nobody is listening anymore
        let _ = self.send(snapshot);
    }
}

/// Keeps the most recent snapshots in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    capacity: Option<usize>,
    snapshots: Arc<Mutex<VecDeque<PopulationSnapshot>>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }
    pub fn snapshots(&self) -> Vec<PopulationSnapshot> {
        let snapshots = self.snapshots.lock().unwrap_or_else(|e| e.into_inner());
        snapshots.iter().cloned().collect()
    }
    pub fn latest(&self) -> Option<PopulationSnapshot> {
        let snapshots = self.snapshots.lock().unwrap_or_else(|e| e.into_inner());
        snapshots.back().cloned()
    }
}

impl Archive for MemoryArchive {
    fn store(&mut self, snapshot: PopulationSnapshot) {
        let mut snapshots = self.snapshots.lock().unwrap_or_else(|e| e.into_inner());
        snapshots.push_back(snapshot);
        if let Some(capacity) = self.capacity {
            while snapshots.len() > capacity {
                snapshots.pop_front();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::{GenomeBuilder, GenomeConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn genome() -> Genome {
        GenomeBuilder::new(GenomeConfig::new(2, 1))
            .unwrap()
            .build(&mut StdRng::seed_from_u64(7))
            .0
    }

    fn snapshot() -> PopulationSnapshot {
        let mut first = Species::new(0, None, 0, genome());
        first.members = vec![Individual::new(genome()), Individual::new(genome())];
        let mut second = Species::new(2, Some(0), 1, genome());
        second.members = vec![Individual::new(genome())];
        let (species, individuals) = PopulationSnapshot::capture([first, second].iter());
        PopulationSnapshot {
            generation: 1,
            state: State::Ready,
            compatibility_threshold: 3.0,
            next_species_id: 3,
            species,
            individuals,
            innovation: InnovationCounters {
                next_node: 3,
                next_edge: 2,
            },
            best: None,
            generation_fitness: 0.0,
            history: vec![],
        }
    }

    #[test]
    fn capture_then_unpack() {
        let snapshot = snapshot();
        assert_eq!(snapshot.species[1].members, vec![2]);
        let species = snapshot.unpack().unwrap();
        assert_eq!(species.len(), 2);
        assert_eq!(species[0].members.len(), 2);
        assert_eq!(species[1].parent_id, Some(0));
    }

    #[test]
    fn inconsistent_membership_is_rejected() {
        let mut doubled = snapshot();
        doubled.species[1].members.push(0);
        assert!(matches!(doubled.unpack(), Err(NeatError::CorruptSnapshot(_))));
        let mut missing = snapshot();
        missing.species[1].members = vec![9];
        assert!(missing.unpack().is_err());
        let mut orphan = snapshot();
        orphan.species[1].members.clear();
        assert!(orphan.unpack().is_err());
        let mut stale_id = snapshot();
        stale_id.next_species_id = 1;
        assert!(stale_id.unpack().is_err());
    }

    #[test]
    fn serializes_as_json() {
        let snapshot = snapshot();
        let text = serde_json::to_string(&snapshot).unwrap();
        let back: PopulationSnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(back.individuals.len(), 3);
        assert_eq!(back.innovation, snapshot.innovation);
        assert_eq!(back.state, State::Ready);
    }

    #[test]
    fn channel_archive_forwards_snapshots() {
        let (mut sender, receiver) = std::sync::mpsc::channel::<PopulationSnapshot>();
        sender.store(snapshot());
        assert_eq!(receiver.recv().unwrap().individuals.len(), 3);
        drop(receiver);
        sender.store(snapshot());
    }

    #[test]
    fn memory_archive_keeps_the_latest() {
        let mut archive = MemoryArchive::with_capacity(2);
        let reader = archive.clone();
        for generation in 0..3 {
            let mut snapshot = snapshot();
            snapshot.generation = generation;
            archive.store(snapshot);
        }
        let kept: Vec<_> = reader.snapshots().iter().map(|s| s.generation).collect();
        assert_eq!(kept, vec![1, 2]);
        assert_eq!(reader.latest().map(|s| s.generation), Some(2));
    }
}
