use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::warn;

use crate::environment::NetworkSettings;
use crate::error::Result;
use crate::individual::{Fitness, Individual};
use crate::network::Network;

/// Drives one network through an episode and judges it.
///
/// A fresh instance is made per individual with [`ScoringFunction::create_fresh`];
/// instances are never shared between concurrent evaluations.
pub trait ScoringFunction {
    /// Upper bound on simultaneous evaluations, 0 for no bound.
    fn max_concurrent_instances(&self) -> usize {
        0
    }
    fn create_fresh(&self) -> Self
    where
        Self: Sized;
    fn flush_between_inputs(&self) -> bool {
        false
    }
    fn use_step_mode(&self) -> bool {
        false
    }
    /// `None` ends the episode.
    fn next_input(&mut self) -> Option<Vec<f32>>;
    fn accept_output(&mut self, output: Vec<f32>);
    fn score(&self) -> Fitness;
    fn is_winner(&self) -> bool;
}

/// Feeds inputs until the scoring function runs dry, returning fitness and winner flag.
pub fn run_episode<N, S>(network: &mut N, scoring: &mut S) -> (Fitness, bool)
where
    N: Network + ?Sized,
    S: ScoringFunction,
{
    let step_mode = scoring.use_step_mode();
    while let Some(input) = scoring.next_input() {
        if scoring.flush_between_inputs() && !step_mode {
            network.flush();
        }
        let output = if step_mode {
            network.step(&input)
        } else {
            network.calculate(&input)
        };
        scoring.accept_output(output);
    }
    (sanitize(scoring.score()), scoring.is_winner())
}

fn sanitize(fitness: Fitness) -> Fitness {
    if fitness.is_finite() {
        fitness
    } else {
        warn!(fitness, "non-finite fitness replaced with 0");
        0.0
    }
}

/// Scores every individual on a worker pool. Returns whether any of them won.
pub(crate) fn assess<S>(
    individuals: Vec<&mut Individual>,
    scoring: &S,
    settings: NetworkSettings,
) -> Result<bool>
where
    S: ScoringFunction + Sync,
{
    let limit = scoring.max_concurrent_instances();
    let hardware = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let threads = if limit == 0 { hardware } else { hardware.min(limit) };
    let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;
    let winners = pool.install(|| {
        individuals
            .into_par_iter()
            .map(|individual| -> Result<bool> {
                let mut network = individual.genome.compile(settings)?;
                let mut instance = scoring.create_fresh();
                let (fitness, winner) = run_episode(network.as_mut(), &mut instance);
                individual.fitness = fitness;
                individual.winner = winner;
                Ok(winner)
            })
            .collect::<Result<Vec<bool>>>()
    })?;
    Ok(winners.into_iter().any(|w| w))
}
