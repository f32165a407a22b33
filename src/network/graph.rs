use std::collections::VecDeque;

use tracing::trace;

use crate::activation::Activation;
use crate::environment::NetworkSettings;
use crate::network::Network;

#[derive(Debug, Clone, Copy)]
struct Link {
    neuron: usize,
    weight: f32,
    /// Closes a cycle; its contribution lands in the next pass.
    back: bool,
}

#[derive(Debug, Clone)]
struct Neuron {
    activation: Activation,
    input: f32,
    output: f32,
    outgoing: Vec<Link>,
    incoming: Vec<Link>,
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    White,
    Gray,
    Black,
}

/// General graph network; cycles are allowed and settled by repeated passes.
#[derive(Debug, Clone)]
pub struct GraphNetwork {
    neurons: Vec<Neuron>,
    inputs: Vec<usize>,
    outputs: Vec<usize>,
    is_input: Vec<bool>,
    indegree: Vec<usize>,
    recurrent: bool,
    settings: NetworkSettings,
    remaining: Vec<usize>,
    visited: Vec<bool>,
    queue: VecDeque<usize>,
    order: Vec<usize>,
    scratch: Vec<f32>,
}

impl GraphNetwork {
    /// `links` are `(from, to, weight)` over neuron indices.
    pub fn new(
        activations: Vec<Activation>,
        inputs: Vec<usize>,
        outputs: Vec<usize>,
        links: Vec<(usize, usize, f32)>,
        settings: NetworkSettings,
    ) -> Self {
        let count = activations.len();
        let mut neurons: Vec<Neuron> = activations
            .into_iter()
            .map(|activation| Neuron {
                activation,
                input: 0.0,
                output: 0.0,
                outgoing: vec![],
                incoming: vec![],
            })
            .collect();
        for (from, to, weight) in links {
            if from < count && to < count {
                neurons[from].outgoing.push(Link {
                    neuron: to,
                    weight,
                    back: false,
                });
            }
        }
        let inputs: Vec<usize> = inputs.into_iter().filter(|i| *i < count).collect();
        let outputs: Vec<usize> = outputs.into_iter().filter(|o| *o < count).collect();
        let recurrent = Self::mark_cycles(&mut neurons, &inputs);
        let mut indegree = vec![0; count];
        for from in 0..count {
            let outgoing = neurons[from].outgoing.clone();
            for link in outgoing {
                if !link.back {
                    indegree[link.neuron] += 1;
                }
                neurons[link.neuron].incoming.push(Link {
                    neuron: from,
                    weight: link.weight,
                    back: link.back,
                });
            }
        }
        let mut is_input = vec![false; count];
        for &i in inputs.iter() {
            is_input[i] = true;
        }
        Self {
            neurons,
            inputs,
            outputs,
            is_input,
            indegree,
            recurrent,
            settings,
            remaining: vec![0; count],
            visited: vec![false; count],
            queue: VecDeque::with_capacity(count),
            order: Vec::with_capacity(count),
            scratch: vec![0.0; count],
        }
    }
    /// Depth-first walk from the inputs with an explicit stack. Edges into a
    /// neuron still on the stack are back edges; neurons never reached lose
    /// their outgoing edges. Returns whether any back edge exists.
    fn mark_cycles(neurons: &mut [Neuron], inputs: &[usize]) -> bool {
        let mut marks = vec![Mark::White; neurons.len()];
        let mut recurrent = false;
        for &start in inputs {
            if marks[start] != Mark::White {
                continue;
            }
            marks[start] = Mark::Gray;
            let mut stack = vec![(start, 0usize)];
            while let Some(top) = stack.last_mut() {
                let (node, cursor) = *top;
                if cursor < neurons[node].outgoing.len() {
                    top.1 += 1;
                    let target = neurons[node].outgoing[cursor].neuron;
                    match marks[target] {
                        Mark::White => {
                            marks[target] = Mark::Gray;
                            stack.push((target, 0));
                        }
                        Mark::Gray => {
                            neurons[node].outgoing[cursor].back = true;
                            recurrent = true;
                        }
                        Mark::Black => {}
                    }
                } else {
                    marks[node] = Mark::Black;
                    stack.pop();
                }
            }
        }
        for (neuron, mark) in neurons.iter_mut().zip(marks) {
            if mark == Mark::White {
                neuron.outgoing.clear();
            }
        }
        recurrent
    }
    fn load_inputs(&mut self, values: &[f32]) {
        for (slot, &n) in self.inputs.iter().enumerate() {
            let value = values.get(slot).copied().unwrap_or(0.0);
            let neuron = &mut self.neurons[n];
            neuron.output = neuron.activation.apply(value);
            neuron.input = 0.0;
        }
    }
    fn read_outputs(&self) -> Vec<f32> {
        self.outputs.iter().map(|&o| self.neurons[o].output).collect()
    }
    /// One worklist sweep: a neuron fires once all of its forward inputs have.
    fn pass(&mut self, values: &[f32]) {
        self.load_inputs(values);
        self.remaining.copy_from_slice(&self.indegree);
        self.visited.iter_mut().for_each(|v| *v = false);
        self.queue.clear();
        for &i in self.inputs.iter() {
            if !self.visited[i] {
                self.visited[i] = true;
                self.queue.push_back(i);
            }
        }
        while let Some(n) = self.queue.pop_front() {
            if !self.is_input[n] {
                let neuron = &mut self.neurons[n];
                neuron.output = neuron.activation.apply(neuron.input);
                neuron.input = 0.0;
            }
            let output = self.neurons[n].output;
            for k in 0..self.neurons[n].outgoing.len() {
                let link = self.neurons[n].outgoing[k];
                self.neurons[link.neuron].input += output * link.weight;
                if link.back {
                    continue;
                }
                self.remaining[link.neuron] = self.remaining[link.neuron].saturating_sub(1);
                if self.remaining[link.neuron] == 0 && !self.visited[link.neuron] {
                    self.visited[link.neuron] = true;
                    self.queue.push_back(link.neuron);
                }
            }
        }
        for &o in self.outputs.iter() {
            if !self.visited[o] {
                let neuron = &mut self.neurons[o];
                neuron.output = neuron.activation.apply(neuron.input);
                neuron.input = 0.0;
            }
        }
    }
}

impl Network for GraphNetwork {
    fn num_inputs(&self) -> usize {
        self.inputs.len()
    }
    fn num_outputs(&self) -> usize {
        self.outputs.len()
    }
    fn calculate(&mut self, inputs: &[f32]) -> Vec<f32> {
        self.pass(inputs);
        let mut last = self.read_outputs();
        if !self.recurrent {
            return last;
        }
        for _ in 1..self.settings.max_cycles {
            self.pass(inputs);
            let current = self.read_outputs();
            let difference = last
                .iter()
                .zip(current.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0f32, f32::max);
            last = current;
            if difference < self.settings.epsilon {
                return last;
            }
        }
        trace!(cycles = self.settings.max_cycles, "network did not settle");
        last
    }
    /// Walks backwards from the outputs, updating every neuron on the way from
    /// the previous tick's values. Calling `flush` between ticks erases the
    /// state this relies on.
    fn step(&mut self, inputs: &[f32]) -> Vec<f32> {
        self.load_inputs(inputs);
        self.visited.iter_mut().for_each(|v| *v = false);
        self.queue.clear();
        self.order.clear();
        for &o in self.outputs.iter() {
            if !self.visited[o] {
                self.visited[o] = true;
                self.queue.push_back(o);
            }
        }
        while let Some(n) = self.queue.pop_front() {
            self.order.push(n);
            for link in self.neurons[n].incoming.iter() {
                if !self.visited[link.neuron] {
                    self.visited[link.neuron] = true;
                    self.queue.push_back(link.neuron);
                }
            }
        }
        for &n in self.order.iter() {
            if self.is_input[n] {
                continue;
            }
            let neuron = &self.neurons[n];
            let sum: f32 = neuron
                .incoming
                .iter()
                .map(|link| link.weight * self.neurons[link.neuron].output)
                .sum();
            self.scratch[n] = neuron.activation.apply(sum);
        }
        for &n in self.order.iter() {
            if !self.is_input[n] {
                self.neurons[n].output = self.scratch[n];
            }
        }
        self.read_outputs()
    }
    fn flush(&mut self) {
        for neuron in self.neurons.iter_mut() {
            neuron.input = 0.0;
            neuron.output = 0.0;
        }
    }
    fn is_recurrent(&self) -> bool {
        self.recurrent
    }
}
