use crate::network::Network;

/// Feeds the outputs of `first` straight into `second`.
pub struct ComposedNetwork {
    first: Box<dyn Network>,
    second: Box<dyn Network>,
}

impl ComposedNetwork {
    pub fn new(first: Box<dyn Network>, second: Box<dyn Network>) -> Self {
        Self { first, second }
    }
}

impl Network for ComposedNetwork {
    fn num_inputs(&self) -> usize {
        self.first.num_inputs()
    }
    fn num_outputs(&self) -> usize {
        self.second.num_outputs()
    }
    fn calculate(&mut self, inputs: &[f32]) -> Vec<f32> {
        let intermediate = self.first.calculate(inputs);
        self.second.calculate(&intermediate)
    }
    fn step(&mut self, inputs: &[f32]) -> Vec<f32> {
        let intermediate = self.first.step(inputs);
        self.second.step(&intermediate)
    }
    fn flush(&mut self) {
        self.first.flush();
        self.second.flush();
    }
    fn is_recurrent(&self) -> bool {
        self.first.is_recurrent() || self.second.is_recurrent()
    }
}
