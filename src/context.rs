use rand::rngs::StdRng;
use rand::Rng;

use crate::innovation::InnovationCache;

/// Randomness and innovation bookkeeping threaded through every mutation and breeding step.
pub struct RunContext<R: Rng = StdRng> {
    pub rng: R,
    pub innovations: InnovationCache,
}

impl<R: Rng> RunContext<R> {
    pub fn new(rng: R, innovations: InnovationCache) -> Self {
        Self { rng, innovations }
    }
    pub fn chance(&mut self, probability: f32) -> bool {
        chance(&mut self.rng, probability)
    }
}

/// Bernoulli trial.
pub(crate) fn chance<R: Rng + ?Sized>(rng: &mut R, probability: f32) -> bool {
    probability > 0.0 && rng.gen_range(0.0f32..1.0) < probability
}
