use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::genome::{InnovationId, NodeId};

/// Ids minted for splitting one edge: the new node, the edge into it and the edge out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    pub node: NodeId,
    pub to_edge: InnovationId,
    pub from_edge: InnovationId,
}

/// Next free ids; this is all that survives a generation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnovationCounters {
    pub next_node: NodeId,
    pub next_edge: InnovationId,
}

/// Per-generation dedup table so that identical structural mutations share ids.
#[derive(Debug, Clone)]
pub struct InnovationCache {
    edges: HashMap<(NodeId, NodeId), InnovationId>,
    splits: HashMap<InnovationId, Split>,
    counters: InnovationCounters,
}

impl InnovationCache {
    pub fn new(counters: InnovationCounters) -> Self {
        Self {
            edges: HashMap::new(),
            splits: HashMap::new(),
            counters,
        }
    }
    pub fn counters(&self) -> InnovationCounters {
        self.counters
    }
    /// Forgets this generation's mutations; ids keep counting up.
    pub fn clear(&mut self) {
        self.edges.clear();
        self.splits.clear();
    }
    pub fn edge(&mut self, from: NodeId, to: NodeId) -> InnovationId {
        if let Some(id) = self.edges.get(&(from, to)) {
            return *id;
        }
        let id = self.next_edge();
        self.edges.insert((from, to), id);
        id
    }
    pub fn split(&mut self, edge: InnovationId) -> Split {
        if let Some(split) = self.splits.get(&edge) {
            return *split;
        }
        let split = self.fresh_split();
        self.splits.insert(edge, split);
        split
    }
    /// Ids for a split that must not coalesce with anything else.
    pub fn fresh_split(&mut self) -> Split {
        let node = self.counters.next_node;
        self.counters.next_node += 1;
        Split {
            node,
            to_edge: self.next_edge(),
            from_edge: self.next_edge(),
        }
    }
    fn next_edge(&mut self) -> InnovationId {
        let id = self.counters.next_edge;
        self.counters.next_edge += 1;
        id
    }
    pub(crate) fn reserve(&mut self, counters: InnovationCounters) {
        self.counters.next_node = self.counters.next_node.max(counters.next_node);
        self.counters.next_edge = self.counters.next_edge.max(counters.next_edge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> InnovationCache {
        InnovationCache::new(InnovationCounters {
            next_node: 3,
            next_edge: 2,
        })
    }

    #[test]
    fn same_pair_same_id() {
        let mut cache = cache();
        let a = cache.edge(0, 2);
        let b = cache.edge(1, 2);
        assert_eq!(a, 2);
        assert_eq!(b, 3);
        assert_eq!(cache.edge(0, 2), a);
    }

    #[test]
    fn same_split_same_ids() {
        let mut cache = cache();
        let first = cache.split(0);
        let again = cache.split(0);
        assert_eq!(first, again);
        assert_eq!(first.node, 3);
        let other = cache.split(1);
        assert_ne!(first.node, other.node);
        assert_ne!(first.to_edge, other.to_edge);
    }

    #[test]
    fn clear_keeps_counters() {
        let mut cache = cache();
        let before = cache.split(0);
        cache.clear();
        let after = cache.split(0);
        assert!(after.node > before.node);
        assert!(after.to_edge > before.from_edge);
        assert_eq!(cache.counters().next_node, 5);
    }
}
