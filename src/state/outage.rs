use crate::error::Result;
use crate::graph::edge::EdgeId;
use crate::graph::graph::Graph;
use crate::graph::node::NodeId;
use std::ops::{Deref, DerefMut};

/// Something to take out of service for a what-if scenario.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Failure {
    Node(String),
    /// A link and, if bidirectional, its twin.
    Link { origin: String, dest: String },
}

impl Failure {
    pub fn node(code: impl Into<String>) -> Self {
        Failure::Node(code.into())
    }

    pub fn link(origin: impl Into<String>, dest: impl Into<String>) -> Self {
        Failure::Link {
            origin: origin.into(),
            dest: dest.into(),
        }
    }

    pub fn target(&self) -> String {
        match self {
            Failure::Node(code) => code.clone(),
            Failure::Link { origin, dest } => format!("{origin}->{dest}"),
        }
    }
}

/// Scoped outage: flags flipped through it are put back when it drops,
/// whether the recompute in between returned normally or with an error.
pub struct Outage<'g> {
    graph: &'g mut Graph,
    nodes: Vec<(NodeId, bool)>,
    edges: Vec<(EdgeId, bool)>,
}

impl<'g> Outage<'g> {
    pub fn new(graph: &'g mut Graph) -> Self {
        Self {
            graph,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn apply(&mut self, failure: &Failure) -> Result<()> {
        match failure {
            Failure::Node(code) => {
                let id = self.graph.require_node(code)?;
                self.disable_node(id);
            }
            Failure::Link { origin, dest } => {
                let id = self.graph.require_edge(origin, dest)?;
                self.disable_link(id);
            }
        }
        Ok(())
    }

    pub fn disable_node(&mut self, id: NodeId) {
        if let Some(node) = self.graph.node(id) {
            self.nodes.push((id, node.is_operational()));
            self.graph.set_node_flag(id, false);
        }
    }

    pub fn disable_link(&mut self, id: EdgeId) {
        let Some(edge) = self.graph.edge(id) else {
            return;
        };
        let twin = edge.twin();
        self.edges.push((id, edge.is_operational()));
        self.graph.set_edge_flag(id, false);
        if let Some(twin) = twin.filter(|t| self.graph.edge(*t).is_some()) {
            let was = self.graph.edge(twin).is_some_and(|e| e.is_operational());
            self.edges.push((twin, was));
            self.graph.set_edge_flag(twin, false);
        }
    }
}

impl Deref for Outage<'_> {
    type Target = Graph;

    fn deref(&self) -> &Graph {
        self.graph
    }
}

impl DerefMut for Outage<'_> {
    fn deref_mut(&mut self) -> &mut Graph {
        self.graph
    }
}

impl Drop for Outage<'_> {
    fn drop(&mut self) {
        // reverse order so a doubly-disabled entity ends at its first state
        for (id, was) in self.edges.drain(..).rev() {
            self.graph.set_edge_flag(id, was);
        }
        for (id, was) in self.nodes.drain(..).rev() {
            self.graph.set_node_flag(id, was);
        }
    }
}
