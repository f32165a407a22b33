use std::cmp::Ordering;

use crate::environment::Environment;
use crate::genome::graph::GraphGenome;

/// Gene alignment counts between two genomes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Compatibility {
    pub excess: f32,
    pub disjoint: f32,
    pub matching: f32,
    pub weight_difference: f32,
}

impl Compatibility {
    pub fn new(a: &GraphGenome, b: &GraphGenome) -> Self {
        let a_max = a.edges.keys().next_back().copied();
        let b_max = b.edges.keys().next_back().copied();
        let mut excess = 0.0;
        let mut disjoint = 0.0;
        let mut matching = 0.0;
        let mut total_difference = 0.0;
        let mut left = a.edges.values().peekable();
        let mut right = b.edges.values().peekable();
        loop {
            let (lhs, rhs) = (left.peek().copied(), right.peek().copied());
            let (unmatched, other_max) = match (lhs, rhs) {
                (None, None) => break,
                (Some(l), None) => {
                    left.next();
                    (l.id, b_max)
                }
                (None, Some(r)) => {
                    right.next();
                    (r.id, a_max)
                }
                (Some(l), Some(r)) => match l.id.cmp(&r.id) {
                    Ordering::Equal => {
                        matching += 1.0;
                        total_difference += (l.weight - r.weight).abs();
                        left.next();
                        right.next();
                        continue;
                    }
                    Ordering::Less => {
                        left.next();
                        (l.id, b_max)
                    }
                    Ordering::Greater => {
                        right.next();
                        (r.id, a_max)
                    }
                },
            };
            match other_max {
                Some(max) if unmatched < max => disjoint += 1.0,
                _ => excess += 1.0,
            }
        }
        let weight_difference = if matching > 0.0 {
            total_difference / matching
        } else {
            0.0
        };
        Self {
            excess,
            disjoint,
            matching,
            weight_difference,
        }
    }
    pub fn distance(&self, environment: &Environment) -> f32 {
        environment.c1 * self.excess
            + environment.c2 * self.disjoint
            + environment.c3 * self.weight_difference
    }
}
