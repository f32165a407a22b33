use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::error::{NeatError, Result};
use crate::network::Network;

/// Shapes of a fixed, layered network. Each layer is an n-dimensional grid
/// flattened row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstrateLayout {
    pub layers: Vec<Vec<usize>>,
    pub input_activation: Activation,
    pub hidden_activation: Activation,
    pub output_activation: Activation,
}

impl SubstrateLayout {
    pub fn new(layers: Vec<Vec<usize>>) -> Self {
        Self {
            layers,
            input_activation: Activation::Linear,
            hidden_activation: Activation::Sigmoid,
            output_activation: Activation::Sigmoid,
        }
    }
    pub fn validate(&self) -> Result<()> {
        if self.layers.len() < 2 {
            return Err(NeatError::config("a substrate needs at least two layers"));
        }
        if self
            .layers
            .iter()
            .any(|shape| shape.is_empty() || shape.contains(&0))
        {
            return Err(NeatError::config("substrate layers must have a non-empty shape"));
        }
        Ok(())
    }
    pub fn sizes(&self) -> Vec<usize> {
        self.layers.iter().map(|shape| shape.iter().product()).collect()
    }
    pub fn input_size(&self) -> usize {
        self.sizes().first().copied().unwrap_or(0)
    }
    pub fn output_size(&self) -> usize {
        self.sizes().last().copied().unwrap_or(0)
    }
    pub fn dimensions(&self) -> usize {
        self.layers.iter().map(|shape| shape.len()).max().unwrap_or(0)
    }
    /// Length of a pattern query: source then target coordinates, each with a layer depth appended.
    pub fn query_size(&self) -> usize {
        2 * (self.dimensions() + 1)
    }
    /// Position of a neuron in `[-1, 1]` per axis, padded to [`Self::dimensions`],
    /// then the layer depth.
    pub fn coordinates(&self, layer: usize, index: usize) -> Vec<f32> {
        let dimensions = self.dimensions();
        let mut coordinates = vec![0.0; dimensions + 1];
        if let Some(shape) = self.layers.get(layer) {
            let mut rest = index;
            for axis in (0..shape.len()).rev() {
                let extent = shape[axis];
                let position = rest % extent;
                rest /= extent;
                coordinates[axis] = spread(position, extent);
            }
        }
        coordinates[dimensions] = spread(layer, self.layers.len());
        coordinates
    }
}

fn spread(position: usize, extent: usize) -> f32 {
    if extent <= 1 {
        0.0
    } else {
        -1.0 + 2.0 * position as f32 / (extent - 1) as f32
    }
}

/// Dense layered network with externally supplied weights.
#[derive(Debug, Clone)]
pub struct SubstrateNetwork {
    layout: SubstrateLayout,
    sizes: Vec<usize>,
    /// One `[target][source]` matrix per pair of consecutive layers.
    weights: Vec<Vec<f32>>,
}

impl SubstrateNetwork {
    pub fn new(layout: SubstrateLayout, weights: Vec<Vec<f32>>) -> Result<Self> {
        layout.validate()?;
        let sizes = layout.sizes();
        if weights.len() != sizes.len() - 1 {
            return Err(NeatError::config(format!(
                "substrate with {} layers needs {} weight matrices, got {}",
                sizes.len(),
                sizes.len() - 1,
                weights.len()
            )));
        }
        for (l, matrix) in weights.iter().enumerate() {
            let expected = sizes[l] * sizes[l + 1];
            if matrix.len() != expected {
                return Err(NeatError::config(format!(
                    "weight matrix {} has {} entries, expected {}",
                    l,
                    matrix.len(),
                    expected
                )));
            }
        }
        Ok(Self {
            layout,
            sizes,
            weights,
        })
    }
    pub fn zeroed(layout: SubstrateLayout) -> Result<Self> {
        layout.validate()?;
        let sizes = layout.sizes();
        let weights = sizes.windows(2).map(|w| vec![0.0; w[0] * w[1]]).collect();
        Self::new(layout, weights)
    }
    /// Asks `pattern` for the weight of every substrate connection. Outputs
    /// with magnitude at or below `threshold` are not expressed; the rest are
    /// rescaled to `[-max_weight, max_weight]`.
    pub fn from_pattern<N: Network + ?Sized>(
        layout: SubstrateLayout,
        pattern: &mut N,
        threshold: f32,
        max_weight: f32,
    ) -> Result<Self> {
        layout.validate()?;
        if pattern.num_inputs() != layout.query_size() || pattern.num_outputs() == 0 {
            return Err(NeatError::config(format!(
                "pattern network must take {} inputs and give at least one output",
                layout.query_size()
            )));
        }
        let sizes = layout.sizes();
        let mut weights = Vec::with_capacity(sizes.len() - 1);
        for l in 0..sizes.len() - 1 {
            let mut matrix = Vec::with_capacity(sizes[l] * sizes[l + 1]);
            for target in 0..sizes[l + 1] {
                let to = layout.coordinates(l + 1, target);
                for source in 0..sizes[l] {
                    let mut query = layout.coordinates(l, source);
                    query.extend_from_slice(&to);
                    pattern.flush();
                    let value = pattern.calculate(&query).first().copied().unwrap_or(0.0);
                    matrix.push(express(value, threshold, max_weight));
                }
            }
            weights.push(matrix);
        }
        Self::new(layout, weights)
    }
    pub fn layout(&self) -> &SubstrateLayout {
        &self.layout
    }
    pub fn weights(&self) -> &[Vec<f32>] {
        &self.weights
    }
}

fn express(value: f32, threshold: f32, max_weight: f32) -> f32 {
    let magnitude = value.abs().min(1.0);
    if !(magnitude > threshold) {
        return 0.0;
    }
    value.signum() * (magnitude - threshold) / (1.0 - threshold) * max_weight
}

impl Network for SubstrateNetwork {
    fn num_inputs(&self) -> usize {
        self.sizes[0]
    }
    fn num_outputs(&self) -> usize {
        self.sizes[self.sizes.len() - 1]
    }
    fn calculate(&mut self, inputs: &[f32]) -> Vec<f32> {
        let input_activation = self.layout.input_activation;
        let mut values: Vec<f32> = (0..self.sizes[0])
            .map(|i| input_activation.apply(inputs.get(i).copied().unwrap_or(0.0)))
            .collect();
        let last = self.weights.len();
        for (l, matrix) in self.weights.iter().enumerate() {
            let activation = if l + 1 == last {
                self.layout.output_activation
            } else {
                self.layout.hidden_activation
            };
            let width = values.len();
            values = matrix
                .chunks(width)
                .map(|row| {
                    let sum: f32 = row.iter().zip(values.iter()).map(|(w, v)| w * v).sum();
                    activation.apply(sum)
                })
                .collect();
        }
        values
    }
    fn step(&mut self, inputs: &[f32]) -> Vec<f32> {
        self.calculate(inputs)
    }
    fn flush(&mut self) {}
    fn is_recurrent(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::NetworkSettings;
    use crate::network::GraphNetwork;

    #[test]
    fn zero_weights_give_activation_of_zero() {
        let layout = SubstrateLayout::new(vec![vec![3, 3], vec![4], vec![2]]);
        let mut net = SubstrateNetwork::zeroed(layout).unwrap();
        for inputs in [vec![0.0; 9], vec![5.0; 9], vec![-1.0, 2.0, 3.0]] {
            assert_eq!(net.calculate(&inputs), vec![0.5, 0.5]);
        }
    }

    #[test]
    fn layered_pass() {
        let mut layout = SubstrateLayout::new(vec![vec![2], vec![2], vec![1]]);
        layout.hidden_activation = Activation::Linear;
        layout.output_activation = Activation::Linear;
        let weights = vec![vec![1.0, 2.0, -1.0, 0.5], vec![1.0, 3.0]];
        let mut net = SubstrateNetwork::new(layout, weights).unwrap();
        // hidden = [1*2 + 2*4, -1*2 + 0.5*4] = [10, 0]
        assert_eq!(net.calculate(&[2.0, 4.0]), vec![10.0]);
        assert!(!net.is_recurrent());
        assert_eq!((net.num_inputs(), net.num_outputs()), (2, 1));
    }

    #[test]
    fn rejects_misshapen_weights() {
        let layout = SubstrateLayout::new(vec![vec![2], vec![2]]);
        assert!(SubstrateNetwork::new(layout.clone(), vec![vec![0.0; 3]]).is_err());
        assert!(SubstrateNetwork::new(layout, vec![]).is_err());
        assert!(SubstrateLayout::new(vec![vec![2]]).validate().is_err());
        assert!(SubstrateLayout::new(vec![vec![2, 0], vec![1]]).validate().is_err());
    }

    #[test]
    fn coordinates_span_the_grid() {
        let layout = SubstrateLayout::new(vec![vec![3, 2], vec![1]]);
        assert_eq!(layout.query_size(), 6);
        assert_eq!(layout.coordinates(0, 0), vec![-1.0, -1.0, -1.0]);
        assert_eq!(layout.coordinates(0, 5), vec![1.0, 1.0, -1.0]);
        assert_eq!(layout.coordinates(0, 2), vec![0.0, -1.0, -1.0]);
        assert_eq!(layout.coordinates(1, 0), vec![0.0, 0.0, 1.0]);
    }

    fn constant_pattern(layout: &SubstrateLayout, activation: Activation) -> GraphNetwork {
        let inputs = layout.query_size();
        let mut activations = vec![Activation::Linear; inputs];
        activations.push(activation);
        GraphNetwork::new(
            activations,
            (0..inputs).collect(),
            vec![inputs],
            vec![],
            NetworkSettings::default(),
        )
    }

    #[test]
    fn pattern_supplies_weights() {
        let layout = SubstrateLayout::new(vec![vec![2, 2], vec![3]]);
        let mut pattern = constant_pattern(&layout, Activation::Gaussian);
        let net = SubstrateNetwork::from_pattern(layout, &mut pattern, 0.2, 3.0).unwrap();
        assert_eq!(net.weights().len(), 1);
        assert_eq!(net.weights()[0].len(), 12);
        assert!(net.weights()[0].iter().all(|w| (*w - 3.0).abs() < 1e-6));
    }

    #[test]
    fn weak_pattern_output_is_not_expressed() {
        let layout = SubstrateLayout::new(vec![vec![2], vec![2]]);
        let mut pattern = constant_pattern(&layout, Activation::Linear);
        let net = SubstrateNetwork::from_pattern(layout.clone(), &mut pattern, 0.2, 3.0).unwrap();
        assert!(net.weights()[0].iter().all(|w| *w == 0.0));
        let mut wrong = GraphNetwork::new(
            vec![Activation::Linear; 2],
            vec![0],
            vec![1],
            vec![],
            NetworkSettings::default(),
        );
        assert!(SubstrateNetwork::from_pattern(layout, &mut wrong, 0.2, 3.0).is_err());
    }
}
