use crate::graph::edge::EdgeId;

/// Slot index of a node. Slots are reused, so an id is only meaningful
/// until the node it was issued for is removed; after that it may refer to
/// whatever node is inserted next. Hold codes across removals instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Kind-specific payload of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Source {
        name: String,
        /// municipality or other administrative grouping
        grouping: String,
        id: String,
        max_supply: u64,
    },
    Router {
        id: String,
    },
    Consumer {
        name: String,
        id: String,
        demand: u64,
        population: u64,
    },
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Source { .. } => "source",
            NodeKind::Router { .. } => "router",
            NodeKind::Consumer { .. } => "consumer",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    code: String,
    kind: NodeKind,
    operational: bool,
    outgoing: Vec<EdgeId>,
    incoming: Vec<EdgeId>,
}

impl Node {
    pub fn new(code: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            code: code.into(),
            kind,
            operational: true,
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }

    pub fn source(
        code: impl Into<String>,
        name: impl Into<String>,
        grouping: impl Into<String>,
        id: impl Into<String>,
        max_supply: u64,
    ) -> Self {
        Self::new(
            code,
            NodeKind::Source {
                name: name.into(),
                grouping: grouping.into(),
                id: id.into(),
                max_supply,
            },
        )
    }

    pub fn router(code: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(code, NodeKind::Router { id: id.into() })
    }

    pub fn consumer(
        code: impl Into<String>,
        name: impl Into<String>,
        id: impl Into<String>,
        demand: u64,
        population: u64,
    ) -> Self {
        Self::new(
            code,
            NodeKind::Consumer {
                name: name.into(),
                id: id.into(),
                demand,
                population,
            },
        )
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Display name for sources and consumers.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Source { name, .. } | NodeKind::Consumer { name, .. } => Some(name),
            NodeKind::Router { .. } => None,
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self.kind, NodeKind::Source { .. })
    }

    pub fn is_consumer(&self) -> bool {
        matches!(self.kind, NodeKind::Consumer { .. })
    }

    pub fn max_supply(&self) -> Option<u64> {
        match self.kind {
            NodeKind::Source { max_supply, .. } => Some(max_supply),
            _ => None,
        }
    }

    pub fn demand(&self) -> Option<u64> {
        match self.kind {
            NodeKind::Consumer { demand, .. } => Some(demand),
            _ => None,
        }
    }

    pub fn is_operational(&self) -> bool {
        self.operational
    }

    pub(crate) fn set_operational(&mut self, operational: bool) {
        self.operational = operational;
    }

    pub fn outgoing(&self) -> &[EdgeId] {
        &self.outgoing
    }

    pub fn incoming(&self) -> &[EdgeId] {
        &self.incoming
    }

    pub(crate) fn attach_outgoing(&mut self, edge: EdgeId) {
        self.outgoing.push(edge);
    }

    pub(crate) fn attach_incoming(&mut self, edge: EdgeId) {
        self.incoming.push(edge);
    }

    pub(crate) fn detach(&mut self, edge: EdgeId) {
        if let Some(pos) = self.outgoing.iter().position(|e| *e == edge) {
            self.outgoing.swap_remove(pos);
        }
        if let Some(pos) = self.incoming.iter().position(|e| *e == edge) {
            self.incoming.swap_remove(pos);
        }
    }
}
