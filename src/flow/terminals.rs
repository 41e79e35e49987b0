use crate::error::Result;
use crate::graph::edge::EdgeId;
use crate::graph::graph::Graph;
use crate::graph::node::{Node, NodeId};
use std::ops::{Deref, DerefMut};
use tracing::warn;

pub const SUPER_SOURCE: &str = "@source";
pub const SUPER_SINK: &str = "@sink";

/// Virtual super-source (and optionally super-sink) spliced into the graph
/// for one solve. Both nodes and their links are removed on drop.
pub struct Terminals<'g> {
    graph: &'g mut Graph,
    source: NodeId,
    sink: NodeId,
    virtual_sink: bool,
}

impl<'g> Terminals<'g> {
    /// Super-source feeding every operational source up to its supply, and a
    /// super-sink fed by every operational consumer up to its demand.
    pub fn for_all_consumers(graph: &'g mut Graph) -> Result<Self> {
        let mut terminals = Self::with_super_source(graph)?;
        let demands = terminals
            .graph
            .consumers()
            .filter(|(_, n)| n.is_operational())
            .map(|(id, n)| (id, n.demand().unwrap_or(0)))
            .collect::<Vec<_>>();

        let sink = terminals.graph.insert_node(Node::router(SUPER_SINK, ""))?;
        terminals.sink = sink;
        terminals.virtual_sink = true;
        for (id, demand) in demands {
            terminals.graph.link(id, sink, demand);
        }
        Ok(terminals)
    }

    /// Super-source only; the sink is `target` itself, with no demand cap.
    pub fn for_node(graph: &'g mut Graph, target: NodeId) -> Result<Self> {
        let mut terminals = Self::with_super_source(graph)?;
        terminals.sink = target;
        Ok(terminals)
    }

    fn with_super_source(graph: &'g mut Graph) -> Result<Self> {
        let supplies = graph
            .sources()
            .filter(|(_, n)| n.is_operational())
            .map(|(id, n)| (id, n.max_supply().unwrap_or(0)))
            .collect::<Vec<_>>();

        let source = graph.insert_node(Node::router(SUPER_SOURCE, ""))?;
        for (id, supply) in supplies {
            graph.link(source, id, supply);
        }
        Ok(Self {
            graph,
            source,
            sink: source,
            virtual_sink: false,
        })
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn sink(&self) -> NodeId {
        self.sink
    }

    /// Whether a link was created for the virtual terminals.
    pub fn is_virtual(&self, id: EdgeId) -> bool {
        self.graph.edge(id).is_some_and(|e| {
            e.touches(self.source) || (self.virtual_sink && e.touches(self.sink))
        })
    }
}

impl Deref for Terminals<'_> {
    type Target = Graph;

    fn deref(&self) -> &Graph {
        self.graph
    }
}

impl DerefMut for Terminals<'_> {
    fn deref_mut(&mut self) -> &mut Graph {
        self.graph
    }
}

impl Drop for Terminals<'_> {
    fn drop(&mut self) {
        if self.virtual_sink {
            if let Err(err) = self.graph.detach_node(self.sink) {
                warn!(%err, "failed to remove super-sink");
            }
        }
        if let Err(err) = self.graph.detach_node(self.source) {
            warn!(%err, "failed to remove super-source");
        }
    }
}
