use crate::graph::edge::EdgeId;
use crate::graph::graph::Graph;
use std::ops::{Deref, DerefMut};

/// Temporary ceiling on link capacities, lifted when dropped.
pub struct CapacityCap<'g> {
    graph: &'g mut Graph,
    capped: Vec<EdgeId>,
}

impl<'g> CapacityCap<'g> {
    /// Caps every link accepted by `filter` at `floor(capacity * percent / 100)`.
    pub fn apply(
        graph: &'g mut Graph,
        percent: f64,
        filter: impl Fn(EdgeId) -> bool,
    ) -> Self {
        let percent = percent.max(0.0);
        let targets = graph
            .all_edges()
            .filter(|(id, _)| filter(*id))
            .map(|(id, e)| (id, (e.capacity() as f64 * percent / 100.0).floor() as u64))
            .collect::<Vec<_>>();

        let capped = targets
            .into_iter()
            .filter_map(|(id, cap)| {
                let edge = graph.edge_mut(id)?;
                edge.set_cap(Some(cap));
                Some(id)
            })
            .collect();
        Self { graph, capped }
    }

    pub fn capped(&self) -> &[EdgeId] {
        &self.capped
    }
}

impl Deref for CapacityCap<'_> {
    type Target = Graph;

    fn deref(&self) -> &Graph {
        self.graph
    }
}

impl DerefMut for CapacityCap<'_> {
    fn deref_mut(&mut self) -> &mut Graph {
        self.graph
    }
}

impl Drop for CapacityCap<'_> {
    fn drop(&mut self) {
        for id in self.capped.drain(..) {
            if let Some(edge) = self.graph.edge_mut(id) {
                edge.set_cap(None);
            }
        }
    }
}
