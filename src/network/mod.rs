//! Runtime networks compiled from genomes.
//!
//! Inputs shorter than [`Network::num_inputs`] are padded with zeros and extra
//! values are ignored.

mod composed;
mod graph;
mod substrate;

pub use composed::ComposedNetwork;
pub use graph::GraphNetwork;
pub use substrate::{SubstrateLayout, SubstrateNetwork};

pub trait Network: Send {
    fn num_inputs(&self) -> usize;
    fn num_outputs(&self) -> usize;
    /// Propagates `inputs` until the outputs settle (or the cycle cap is hit).
    fn calculate(&mut self, inputs: &[f32]) -> Vec<f32>;
    /// Advances the network by exactly one time tick.
    fn step(&mut self, inputs: &[f32]) -> Vec<f32>;
    /// Clears transient state; topology and weights are untouched.
    fn flush(&mut self);
    fn is_recurrent(&self) -> bool;
}

impl<N: Network + ?Sized> Network for Box<N> {
    fn num_inputs(&self) -> usize {
        (**self).num_inputs()
    }
    fn num_outputs(&self) -> usize {
        (**self).num_outputs()
    }
    fn calculate(&mut self, inputs: &[f32]) -> Vec<f32> {
        (**self).calculate(inputs)
    }
    fn step(&mut self, inputs: &[f32]) -> Vec<f32> {
        (**self).step(inputs)
    }
    fn flush(&mut self) {
        (**self).flush()
    }
    fn is_recurrent(&self) -> bool {
        (**self).is_recurrent()
    }
}
