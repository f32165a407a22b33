use rand::Rng;

use crate::activation::Activation;
use crate::context::{chance, RunContext};
use crate::environment::Environment;
use crate::genome::gene::{EdgeGene, InnovationId, NodeGene, NodeId, NodeKind};
use crate::genome::graph::GraphGenome;

impl GraphGenome {
    /// One mutation round. Add-node beats add-edge; the numeric mutations
    /// only run when neither structural mutation changed the genome.
    pub fn mutate<R: Rng>(&mut self, environment: &Environment, ctx: &mut RunContext<R>) {
        let structural = if ctx.chance(environment.add_node) {
            self.mutate_add_node(environment, ctx)
        } else if ctx.chance(environment.add_edge) {
            self.mutate_add_edge(environment, ctx)
        } else {
            false
        };
        if structural {
            return;
        }
        if ctx.chance(environment.weight_mutation) {
            self.mutate_weights(environment, &mut ctx.rng);
        }
        if self.random_activations && ctx.chance(environment.node_trait) {
            self.mutate_node_traits(&environment.activation_pool, &mut ctx.rng);
        }
        if ctx.chance(environment.toggle_edge) {
            self.mutate_toggle_edge(&mut ctx.rng);
        }
    }
    pub fn mutate_weights<R: Rng>(&mut self, environment: &Environment, rng: &mut R) {
        let range = environment.weight_range;
        let perturbation = environment.weight_perturbation;
        for edge in self.edges.values_mut() {
            if chance(rng, environment.weight_reset) {
                edge.weight = rng.gen_range(-range..=range);
            } else {
                edge.weight += rng.gen_range(-perturbation..=perturbation);
            }
        }
    }
    pub fn mutate_toggle_edge<R: Rng>(&mut self, rng: &mut R) -> bool {
        if self.edges.is_empty() {
            return false;
        }
        let idx = rng.gen_range(0..self.edges.len());
        if let Some(edge) = self.edges.values_mut().nth(idx) {
            edge.enabled = !edge.enabled;
            return true;
        }
        false
    }
    /// Gives up quietly after `add_edge_attempts` rejected picks.
    pub fn mutate_add_edge<R: Rng>(
        &mut self,
        environment: &Environment,
        ctx: &mut RunContext<R>,
    ) -> bool {
        let sources: Vec<NodeId> = self.nodes.keys().copied().collect();
        let targets: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.kind != NodeKind::Input)
            .map(|n| n.id)
            .collect();
        if sources.is_empty() || targets.is_empty() {
            return false;
        }
        for _ in 0..environment.add_edge_attempts {
            let from = sources[ctx.rng.gen_range(0..sources.len())];
            let to = targets[ctx.rng.gen_range(0..targets.len())];
            if self.contains_edge(from, to) {
                continue;
            }
            if !environment.allow_recurrent && self.creates_cycle(from, to) {
                continue;
            }
            let id = ctx.innovations.edge(from, to);
            if self.edges.contains_key(&id) {
                continue;
            }
            let range = environment.weight_range;
            let weight = ctx.rng.gen_range(-range..=range);
            self.edges.insert(id, EdgeGene::new(id, from, to, weight));
            return true;
        }
        false
    }
    /// Splits a random enabled edge `a -> b` into `a -> new -> b`. The ids come
    /// from the cache keyed by the split edge, so the same split made twice in
    /// one generation produces the same genes.
    pub fn mutate_add_node<R: Rng>(
        &mut self,
        environment: &Environment,
        ctx: &mut RunContext<R>,
    ) -> bool {
        let enabled: Vec<InnovationId> = self
            .edges
            .values()
            .filter(|e| e.enabled)
            .map(|e| e.id)
            .collect();
        if enabled.is_empty() {
            return false;
        }
        let id = enabled[ctx.rng.gen_range(0..enabled.len())];
        let mut split = ctx.innovations.split(id);
        if self.nodes.contains_key(&split.node)
            || self.edges.contains_key(&split.to_edge)
            || self.edges.contains_key(&split.from_edge)
        {
            split = ctx.innovations.fresh_split();
        }
        let Some(old) = self.edges.get_mut(&id) else {
            return false;
        };
        old.enabled = false;
        let old = *old;
        let activation = if self.random_activations {
            Activation::choose(&environment.activation_pool, self.hidden_activation, &mut ctx.rng)
        } else {
            self.hidden_activation
        };
        self.nodes
            .insert(split.node, NodeGene::new(split.node, NodeKind::Hidden, activation));
        self.edges.insert(
            split.to_edge,
            EdgeGene::new(split.to_edge, old.from, split.node, old.weight),
        );
        self.edges.insert(
            split.from_edge,
            EdgeGene::new(split.from_edge, split.node, old.to, 1.0),
        );
        true
    }
    /// Reassigns the activation of one hidden or input node.
    pub fn mutate_node_traits<R: Rng>(&mut self, pool: &[Activation], rng: &mut R) -> bool {
        let candidates: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.kind != NodeKind::Output)
            .map(|n| n.id)
            .collect();
        if candidates.is_empty() {
            return false;
        }
        let id = candidates[rng.gen_range(0..candidates.len())];
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.activation = Activation::choose(pool, node.activation, rng);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::graph::tests::genome;
    use crate::innovation::{InnovationCache, InnovationCounters};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn context(seed: u64) -> RunContext {
        RunContext::new(
            StdRng::seed_from_u64(seed),
            InnovationCache::new(InnovationCounters {
                next_node: 10,
                next_edge: 10,
            }),
        )
    }

    fn base() -> GraphGenome {
        genome(&[(0, 0, 2, 0.5), (1, 1, 3, -0.5)], &[])
    }

    #[test]
    fn add_node_splits_edge() {
        let mut g = genome(&[(0, 0, 2, 0.5)], &[]);
        let mut ctx = context(1);
        assert!(g.mutate_add_node(&Environment::default(), &mut ctx));
        assert!(!g.edge(0).unwrap().enabled);
        assert_eq!(g.num_hidden(), 1);
        let into = g.edge(10).unwrap();
        let out = g.edge(11).unwrap();
        assert_eq!((into.from, into.to, into.weight), (0, 10, 0.5));
        assert_eq!((out.from, out.to, out.weight), (10, 2, 1.0));
    }

    #[test]
    fn identical_splits_share_ids() {
        let mut a = genome(&[(0, 0, 2, 0.5)], &[]);
        let mut b = a.clone();
        let mut ctx = context(3);
        let environment = Environment::default();
        a.mutate_add_node(&environment, &mut ctx);
        b.mutate_add_node(&environment, &mut ctx);
        let ids = |g: &GraphGenome| {
            (
                g.nodes().map(|n| n.id).collect::<Vec<_>>(),
                g.edges().map(|e| (e.id, e.from, e.to)).collect::<Vec<_>>(),
            )
        };
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn identical_new_edges_share_ids() {
        let mut a = genome(&[(0, 0, 2, 0.5)], &[]);
        let mut b = a.clone();
        let mut environment = Environment::default();
        environment.add_edge_attempts = 200;
        let mut ctx = context(5);
        while !a.contains_edge(1, 3) {
            a.mutate_add_edge(&environment, &mut ctx);
        }
        while !b.contains_edge(1, 3) {
            b.mutate_add_edge(&environment, &mut ctx);
        }
        let id = |g: &GraphGenome| g.edges().find(|e| e.from == 1 && e.to == 3).unwrap().id;
        assert_eq!(id(&a), id(&b));
    }

    #[test]
    fn add_edge_gives_up_when_saturated() {
        let mut g = genome(
            &[(0, 0, 2, 1.0), (1, 0, 3, 1.0), (2, 1, 2, 1.0), (3, 1, 3, 1.0), (4, 2, 3, 1.0)],
            &[],
        );
        let mut ctx = context(9);
        let before = g.clone();
        assert!(!g.mutate_add_edge(&Environment::default(), &mut ctx));
        assert_eq!(g.edges().count(), before.edges().count());
    }

    #[test]
    fn feed_forward_mode_never_adds_cycles() {
        let mut g = genome(
            &[(0, 0, 4, 1.0), (1, 4, 2, 1.0), (2, 1, 5, 1.0), (3, 5, 3, 1.0)],
            &[4, 5],
        );
        let mut environment = Environment::default();
        environment.add_edge_attempts = 50;
        let mut ctx = context(11);
        for _ in 0..30 {
            g.mutate_add_edge(&environment, &mut ctx);
        }
        let network = g.compile(environment.network);
        assert!(!crate::network::Network::is_recurrent(&network));
    }

    #[test]
    fn weights_stay_within_perturbation() {
        let mut g = base();
        let mut environment = Environment::default();
        environment.weight_reset = 0.0;
        environment.weight_perturbation = 0.1;
        let mut rng = StdRng::seed_from_u64(2);
        g.mutate_weights(&environment, &mut rng);
        assert!((g.edge(0).unwrap().weight - 0.5).abs() <= 0.1 + f32::EPSILON);
        assert!((g.edge(1).unwrap().weight + 0.5).abs() <= 0.1 + f32::EPSILON);
    }

    #[test]
    fn weight_reset_uses_range() {
        let mut g = base();
        let mut environment = Environment::default();
        environment.weight_reset = 1.0;
        environment.weight_range = 0.25;
        let mut rng = StdRng::seed_from_u64(4);
        g.mutate_weights(&environment, &mut rng);
        assert!(g.edges().all(|e| e.weight.abs() <= 0.25));
    }

    #[test]
    fn toggle_flips_one_edge() {
        let mut g = base();
        let mut rng = StdRng::seed_from_u64(8);
        assert!(g.mutate_toggle_edge(&mut rng));
        assert_eq!(g.num_enabled_edges(), 1);
    }

    #[test]
    fn traits_never_touch_outputs() {
        let mut g = genome(&[(0, 0, 4, 1.0), (1, 4, 2, 1.0)], &[4]);
        let mut rng = StdRng::seed_from_u64(6);
        for _ in 0..40 {
            g.mutate_node_traits(&[Activation::Tanh], &mut rng);
        }
        assert_eq!(g.node(2).unwrap().activation, Activation::Linear);
        assert_eq!(g.node(3).unwrap().activation, Activation::Linear);
        assert_eq!(g.node(4).unwrap().activation, Activation::Tanh);
    }
}
