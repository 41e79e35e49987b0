use crate::graph::node::NodeId;

/// Slot index of a link. Valid until the link (or either endpoint) is
/// removed; the slot is then recycled for the next link added.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

impl EdgeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
pub struct Edge {
    origin: NodeId,
    dest: NodeId,
    capacity: u64,
    /// temporary ceiling below `capacity`, set only while balancing
    cap: Option<u64>,
    /// 0 <= flow <= effective_capacity()
    flow: u64,
    operational: bool,
    twin: Option<EdgeId>,
}

impl Edge {
    pub fn new(origin: NodeId, dest: NodeId, capacity: u64) -> Self {
        Self {
            origin,
            dest,
            capacity,
            cap: None,
            flow: 0,
            operational: true,
            twin: None,
        }
    }

    pub fn origin(&self) -> NodeId {
        self.origin
    }

    pub fn dest(&self) -> NodeId {
        self.dest
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub(crate) fn set_capacity(&mut self, capacity: u64) {
        self.capacity = capacity;
        self.flow = self.flow.min(capacity);
    }

    pub fn effective_capacity(&self) -> u64 {
        match self.cap {
            Some(cap) => cap.min(self.capacity),
            None => self.capacity,
        }
    }

    pub(crate) fn set_cap(&mut self, cap: Option<u64>) {
        self.cap = cap;
    }

    pub fn flow(&self) -> u64 {
        self.flow
    }

    pub(crate) fn set_flow(&mut self, flow: u64) {
        debug_assert!(flow <= self.effective_capacity());
        self.flow = flow;
    }

    /// Forward residual: how much more this link can carry.
    pub fn residual(&self) -> u64 {
        self.effective_capacity().saturating_sub(self.flow)
    }

    /// Utilisation as a percentage of the true capacity.
    pub fn pressure(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.flow as f64 * 100.0 / self.capacity as f64
        }
    }

    pub fn is_operational(&self) -> bool {
        self.operational
    }

    pub(crate) fn set_operational(&mut self, operational: bool) {
        self.operational = operational;
    }

    pub fn twin(&self) -> Option<EdgeId> {
        self.twin
    }

    pub(crate) fn set_twin(&mut self, twin: Option<EdgeId>) {
        self.twin = twin;
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.origin == node || self.dest == node
    }
}
