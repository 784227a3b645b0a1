//! The component flow graph used by the load-time cycle check.
//!
//! Nodes are components; edges are every route a component may take
//! (default successor, branch targets, respin loop entries, jump awards).
//! Respin components are allowed on cycles since their loops are bounded by
//! an iteration count. Any other cycle could spin a round forever and is
//! rejected.

use std::collections::VecDeque;

use crate::config::ConfigError;
use crate::id::ComponentId;

#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    outputs: Vec<Vec<ComponentId>>,
    bounded: Vec<bool>,
}

impl FlowGraph {
    pub fn new(nodes: usize) -> Self {
        Self {
            outputs: vec![Vec::new(); nodes],
            bounded: vec![false; nodes],
        }
    }

    pub fn node_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn edge_count(&self) -> usize {
        self.outputs.iter().map(Vec::len).sum()
    }

    /// Add `from -> to`. Duplicate edges are ignored.
    pub fn add_edge(&mut self, from: ComponentId, to: ComponentId) {
        if let Some(out) = self.outputs.get_mut(from.index()) {
            if !out.contains(&to) {
                out.push(to);
            }
        }
    }

    pub fn outputs(&self, node: ComponentId) -> &[ComponentId] {
        self.outputs.get(node.index()).map_or(&[], Vec::as_slice)
    }

    /// Mark a node whose loops are bounded (a respin component).
    pub fn mark_bounded(&mut self, node: ComponentId) {
        if let Some(b) = self.bounded.get_mut(node.index()) {
            *b = true;
        }
    }

    /// Kahn's algorithm over the unbounded nodes. Returns the order, or the
    /// nodes left on cycles.
    pub fn unbounded_order(&self) -> Result<Vec<ComponentId>, Vec<ComponentId>> {
        let n = self.outputs.len();
        let live = |id: ComponentId| id.index() < n && !self.bounded[id.index()];

        let mut in_degree = vec![0usize; n];
        for (from, outs) in self.outputs.iter().enumerate() {
            if self.bounded[from] {
                continue;
            }
            for &to in outs {
                if live(to) {
                    in_degree[to.index()] += 1;
                }
            }
        }

        let mut queue: VecDeque<ComponentId> = (0..n)
            .map(|i| ComponentId(i as u32))
            .filter(|&id| live(id) && in_degree[id.index()] == 0)
            .collect();
        let mut order = Vec::with_capacity(n);

        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &dest in &self.outputs[node.index()] {
                if !live(dest) {
                    continue;
                }
                let deg = &mut in_degree[dest.index()];
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(dest);
                }
            }
        }

        let live_count = (0..n).filter(|&i| !self.bounded[i]).count();
        if order.len() == live_count {
            Ok(order)
        } else {
            Err((0..n)
                .map(|i| ComponentId(i as u32))
                .filter(|&id| live(id) && in_degree[id.index()] > 0)
                .collect())
        }
    }

    /// Reject cycles that avoid every bounded node. `name` labels the
    /// offending components in the error.
    pub fn check_cycles<'a>(&self, name: impl Fn(ComponentId) -> &'a str) -> Result<(), ConfigError> {
        match self.unbounded_order() {
            Ok(_) => Ok(()),
            Err(stuck) => Err(ConfigError::Cycle(
                stuck.into_iter().map(|id| name(id).to_string()).collect(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(i: u32) -> ComponentId {
        ComponentId(i)
    }

    fn label(id: ComponentId) -> &'static str {
        ["a", "b", "c", "d"][id.index()]
    }

    #[test]
    fn chain_is_acyclic() {
        let mut g = FlowGraph::new(3);
        g.add_edge(c(0), c(1));
        g.add_edge(c(1), c(2));
        g.add_edge(c(1), c(2));
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.unbounded_order().unwrap(), vec![c(0), c(1), c(2)]);
    }

    #[test]
    fn plain_cycle_rejected() {
        let mut g = FlowGraph::new(3);
        g.add_edge(c(0), c(1));
        g.add_edge(c(1), c(2));
        g.add_edge(c(2), c(1));
        assert_eq!(
            g.check_cycles(label),
            Err(ConfigError::Cycle(vec!["b".into(), "c".into()]))
        );
    }

    #[test]
    fn cycle_through_respin_allowed() {
        // a -> r(respin) -> b -> c -> r
        let mut g = FlowGraph::new(4);
        g.add_edge(c(0), c(1));
        g.add_edge(c(1), c(2));
        g.add_edge(c(2), c(3));
        g.add_edge(c(3), c(1));
        g.mark_bounded(c(1));
        assert!(g.check_cycles(label).is_ok());
    }

    #[test]
    fn self_loop_rejected() {
        let mut g = FlowGraph::new(1);
        g.add_edge(c(0), c(0));
        assert!(g.unbounded_order().is_err());
        assert_eq!(g.outputs(c(0)), &[c(0)]);
        assert!(g.outputs(c(5)).is_empty());
    }
}
