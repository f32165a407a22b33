use rand::Rng;
use serde::{Deserialize, Serialize};

pub fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

/// Transfer function applied by a neuron to its summed input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activation {
    Linear,
    #[default]
    Sigmoid,
    /// Sigmoid with the classic NEAT slope of 4.9.
    SteepSigmoid,
    Tanh,
    Gaussian,
    Sine,
    Sinc,
    Relu,
    Abs,
    Step,
    Square,
    Inverse,
}

impl Activation {
    pub const STEEPNESS: f32 = 4.9;
    pub const ALL: [Activation; 12] = [
        Activation::Linear,
        Activation::Sigmoid,
        Activation::SteepSigmoid,
        Activation::Tanh,
        Activation::Gaussian,
        Activation::Sine,
        Activation::Sinc,
        Activation::Relu,
        Activation::Abs,
        Activation::Step,
        Activation::Square,
        Activation::Inverse,
    ];
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Linear => x,
            Activation::Sigmoid => sigmoid(x),
            Activation::SteepSigmoid => sigmoid(Self::STEEPNESS * x),
            Activation::Tanh => x.tanh(),
            Activation::Gaussian => (-x * x).exp(),
            Activation::Sine => x.sin(),
            Activation::Sinc => {
                if x.abs() < f32::EPSILON {
                    1.0
                } else {
                    x.sin() / x
                }
            }
            Activation::Relu => x.max(0.0),
            Activation::Abs => x.abs(),
            Activation::Step => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Square => x * x,
            Activation::Inverse => -x,
        }
    }
    /// Picks one function out of `pool`, falling back to `fallback` for an empty pool.
    pub fn choose<R: Rng>(pool: &[Activation], fallback: Activation, rng: &mut R) -> Activation {
        if pool.is_empty() {
            return fallback;
        }
        pool[rng.gen_range(0..pool.len())]
    }
}
