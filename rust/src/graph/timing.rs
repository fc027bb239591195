//! ASAP/ALAP mobility windows and topological orderings.

use std::collections::VecDeque;

use crate::config::{OrderingStrategy, MAX_HORIZON};

use super::{DependencyGraph, GraphError, NodeId};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

#[derive(Clone, Copy)]
enum Follow {
    Preds,
    Succs,
}

impl DependencyGraph {
    fn neighbors(&self, id: NodeId, follow: Follow) -> &[NodeId] {
        match follow {
            Follow::Preds => &self.nodes[id].preds,
            Follow::Succs => &self.nodes[id].succs,
        }
    }

    /// Depth-first post-order from `roots`, following `follow` links.
    ///
    /// Every node is finished after all nodes reachable from it. Fails if a
    /// back edge is found or if some node is unreachable from every root
    /// (which on a finite graph means it sits on a cycle).
    fn post_order(
        &self,
        roots: impl Iterator<Item = NodeId>,
        follow: Follow,
    ) -> Result<Vec<NodeId>, GraphError> {
        let n = self.nodes.len();
        let mut state = vec![Visit::New; n];
        let mut order = Vec::with_capacity(n);
        let mut stack: Vec<(NodeId, usize)> = Vec::new();

        for root in roots {
            if state[root] != Visit::New {
                continue;
            }
            state[root] = Visit::Active;
            stack.push((root, 0));

            while let Some(&(id, next)) = stack.last() {
                match self.neighbors(id, follow).get(next) {
                    Some(&nb) => {
                        if let Some(top) = stack.last_mut() {
                            top.1 += 1;
                        }
                        match state[nb] {
                            Visit::New => {
                                state[nb] = Visit::Active;
                                stack.push((nb, 0));
                            }
                            Visit::Active => {
                                let start = stack.iter().position(|&(s, _)| s == nb).unwrap_or(0);
                                let cycle = stack[start..]
                                    .iter()
                                    .map(|&(s, _)| self.nodes[s].name.clone())
                                    .collect();
                                return Err(GraphError::CircularDependency(cycle));
                            }
                            Visit::Done => {}
                        }
                    }
                    None => {
                        state[id] = Visit::Done;
                        order.push(id);
                        stack.pop();
                    }
                }
            }
        }

        if order.len() != n {
            let stuck = (0..n)
                .filter(|&id| state[id] != Visit::Done)
                .map(|id| self.nodes[id].name.clone())
                .collect();
            return Err(GraphError::CircularDependency(stuck));
        }
        Ok(order)
    }

    /// Compute ASAP start steps, the critical path length and the horizon.
    ///
    /// Traverses predecessors depth-first from every sink; the finish order
    /// doubles as the DFS topological order. Returns the critical path length.
    pub fn compute_asap(&mut self) -> Result<u32, GraphError> {
        let sinks: Vec<NodeId> = (0..self.nodes.len())
            .filter(|&id| self.nodes[id].succs.is_empty())
            .collect();
        let order = self.post_order(sinks.into_iter(), Follow::Preds)?;

        let mut cdepth = 0;
        for &id in &order {
            let asap = self.nodes[id]
                .preds
                .iter()
                .map(|&p| u64::from(self.nodes[p].asap) + u64::from(self.nodes[p].delay))
                .max()
                .unwrap_or(1);
            let finish = asap + u64::from(self.nodes[id].delay) - 1;
            if finish > u64::from(MAX_HORIZON) {
                return Err(GraphError::HorizonTooLarge {
                    horizon: finish,
                    max: MAX_HORIZON,
                });
            }
            // asap <= finish <= MAX_HORIZON
            self.nodes[id].asap = asap as u32;
            cdepth = cdepth.max(finish as u32);
        }

        let horizon = (f64::from(cdepth) * self.config.latency_factor).floor();
        if horizon > f64::from(MAX_HORIZON) {
            return Err(GraphError::HorizonTooLarge {
                horizon: horizon as u64,
                max: MAX_HORIZON,
            });
        }

        self.critical_path_length = Some(cdepth);
        self.constrained_latency = horizon as u32;
        self.alap_computed = false;
        self.dfs_order = order.clone();
        self.order = order;
        Ok(cdepth)
    }

    /// Compute ALAP start steps against the constrained latency.
    ///
    /// Traverses successors depth-first from every source.
    pub fn compute_alap(&mut self) -> Result<(), GraphError> {
        if self.critical_path_length.is_none() {
            return Err(GraphError::AsapNotComputed);
        }
        let horizon = self.constrained_latency;

        let sources: Vec<NodeId> = (0..self.nodes.len())
            .filter(|&id| self.nodes[id].preds.is_empty())
            .collect();
        let order = self.post_order(sources.into_iter(), Follow::Succs)?;

        for id in order {
            let delay = self.nodes[id].delay;
            let alap = self.nodes[id]
                .succs
                .iter()
                .map(|&s| self.nodes[s].alap.saturating_sub(delay))
                .min()
                .unwrap_or((horizon + 1).saturating_sub(delay));
            self.nodes[id].alap = alap;
        }
        self.alap_computed = true;
        Ok(())
    }

    /// Topological order produced by the last ASAP computation.
    pub fn topological_order_dfs(&self) -> Result<&[NodeId], GraphError> {
        if self.critical_path_length.is_none() {
            return Err(GraphError::AsapNotComputed);
        }
        Ok(&self.dfs_order)
    }

    /// Topological order by Kahn's algorithm (zero in-degree queue).
    pub fn topological_order_kahn(&mut self) -> Result<Vec<NodeId>, GraphError> {
        for node in &mut self.nodes {
            node.remaining_incoming = node.incoming;
        }

        let mut queue: VecDeque<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.incoming == 0)
            .map(|n| n.id)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = queue.pop_front() {
            order.push(id);
            for i in 0..self.nodes[id].succs.len() {
                let succ = self.nodes[id].succs[i];
                let node = &mut self.nodes[succ];
                node.remaining_incoming -= 1;
                if node.remaining_incoming == 0 {
                    queue.push_back(succ);
                }
            }
        }

        if order.len() != self.nodes.len() {
            let stuck = self
                .nodes
                .iter()
                .filter(|n| n.remaining_incoming > 0)
                .map(|n| n.name.clone())
                .collect();
            return Err(GraphError::CircularDependency(stuck));
        }
        Ok(order)
    }

    /// Compute ASAP/ALAP windows and select the scheduling order.
    pub fn prepare(&mut self, ordering: OrderingStrategy) -> Result<(), GraphError> {
        self.compute_asap()?;
        self.compute_alap()?;
        if ordering == OrderingStrategy::Kahn {
            self.order = self.topological_order_kahn()?;
        }
        Ok(())
    }
}
