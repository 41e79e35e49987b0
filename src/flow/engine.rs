use crate::error::{NetworkError, Result};
use crate::flow::cancel::CancelToken;
use crate::flow::terminals::Terminals;
use crate::graph::edge::{Edge, EdgeId};
use crate::graph::graph::Graph;
use crate::graph::node::{Node, NodeId};
use crate::state::scratch::SearchScratch;
use crate::state::snapshot::FlowMap;
use std::collections::VecDeque;
use tracing::debug;

/// Order in which a node's links are offered to the path search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchOrder {
    /// Outgoing links then incoming links, in adjacency order.
    #[default]
    Natural,
    /// Incoming links by descending pressure (drain hot links first), then
    /// outgoing links by ascending pressure (prefer idle links).
    PressureBiased,
}

/// One hop of an augmenting path.
#[derive(Clone, Copy, Debug)]
struct Step {
    edge: EdgeId,
    forward: bool,
}

/// Edmonds-Karp maximum-flow engine over a [`Graph`].
///
/// Residual capacity is read straight off the links: a link offers
/// `effective_capacity - flow` forward and `flow` backward, so no paired
/// residual edges are materialised.
#[derive(Clone, Debug, Default)]
pub struct FlowSolver {
    cancel: CancelToken,
}

impl FlowSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(cancel: CancelToken) -> Self {
        Self { cancel }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Maximum flow each consumer can receive with every source and consumer
    /// active at once. Overwrites the flow on every link.
    pub fn max_flow_to_all_consumers(&self, graph: &mut Graph) -> Result<FlowMap> {
        {
            let mut terminals = Terminals::for_all_consumers(graph)?;
            let (source, sink) = (terminals.source(), terminals.sink());
            self.edmonds_karp(&mut terminals, source, sink, SearchOrder::Natural, true)?;
        }
        Ok(consumer_flows(graph))
    }

    /// Maximum flow a single consumer can draw when it is the only sink,
    /// capped by its demand.
    pub fn max_flow_to_consumer(&self, graph: &mut Graph, code: &str) -> Result<u64> {
        let target = graph.require_node(code)?;
        let demand = graph
            .node(target)
            .and_then(Node::demand)
            .ok_or_else(|| NetworkError::WrongKind {
                code: code.to_string(),
                expected: "consumer",
            })?;
        {
            let mut terminals = Terminals::for_node(graph, target)?;
            let source = terminals.source();
            self.edmonds_karp(&mut terminals, source, target, SearchOrder::Natural, true)?;
        }
        Ok(graph.inbound_flow(target).min(demand))
    }

    /// Pushes flow from `source` to `sink` until no augmenting path is left
    /// and returns the amount pushed by this call.
    ///
    /// With `reset` the flow on every link is zeroed first; without it the
    /// search continues from the current (feasible) flow.
    pub fn edmonds_karp(
        &self,
        graph: &mut Graph,
        source: NodeId,
        sink: NodeId,
        order: SearchOrder,
        reset: bool,
    ) -> Result<u64> {
        if graph.node(source).is_none() || graph.node(sink).is_none() {
            return Err(NetworkError::invalid_config("source or sink is missing"));
        }
        if source == sink {
            return Err(NetworkError::invalid_config(
                "source and sink are the same node",
            ));
        }
        if reset {
            graph.reset_flows();
        }

        let mut scratch = SearchScratch::new(graph.node_slots());
        let mut pushed = 0u64;
        let mut paths = 0usize;
        while find_augmenting_path(graph, source, sink, order, &mut scratch) {
            self.cancel.check("max-flow search")?;
            let Some(path) = trace_path(graph, &scratch, source, sink) else {
                break;
            };
            let amount = bottleneck(graph, &path);
            if amount == 0 {
                break;
            }
            augment(graph, &path, amount);
            pushed += amount;
            paths += 1;
        }
        debug!(paths, pushed, ?order, reset, "edmonds-karp finished");
        Ok(pushed)
    }
}

/// Total inbound flow of every consumer, including flow it passes on.
pub fn consumer_flows(graph: &Graph) -> FlowMap {
    graph
        .consumers()
        .map(|(id, n)| (n.code().to_string(), graph.inbound_flow(id)))
        .collect()
}

fn candidate_steps<'a>(
    graph: &'a Graph,
    node: &Node,
    order: SearchOrder,
) -> Vec<(Step, &'a Edge)> {
    let outgoing = node.outgoing().iter().filter_map(move |id| {
        graph
            .edge(*id)
            .map(|e| (Step { edge: *id, forward: true }, e))
    });
    let incoming = node.incoming().iter().filter_map(move |id| {
        graph
            .edge(*id)
            .map(|e| (Step { edge: *id, forward: false }, e))
    });

    match order {
        SearchOrder::Natural => outgoing.chain(incoming).collect(),
        SearchOrder::PressureBiased => {
            let mut drain = incoming.collect::<Vec<_>>();
            drain.sort_by(|a, b| b.1.pressure().total_cmp(&a.1.pressure()));
            let mut fill = outgoing.collect::<Vec<_>>();
            fill.sort_by(|a, b| a.1.pressure().total_cmp(&b.1.pressure()));
            drain.extend(fill);
            drain
        }
    }
}

/// BFS over the residual network, recording for each node the link it was
/// reached through. Stops as soon as the sink is reached.
fn find_augmenting_path(
    graph: &Graph,
    source: NodeId,
    sink: NodeId,
    order: SearchOrder,
    scratch: &mut SearchScratch,
) -> bool {
    scratch.reset(graph.node_slots());
    scratch.visit(source, None);
    let mut queue = VecDeque::from([source]);

    while let Some(v) = queue.pop_front() {
        if scratch.is_visited(sink) {
            break;
        }
        let Some(node) = graph.node(v) else {
            continue;
        };
        if !node.is_operational() {
            continue;
        }
        for (step, edge) in candidate_steps(graph, node, order) {
            let (next, residual) = if step.forward {
                (edge.dest(), edge.residual())
            } else {
                (edge.origin(), edge.flow())
            };
            let open = residual > 0
                && edge.is_operational()
                && !scratch.is_visited(next)
                && graph.node(next).is_some_and(Node::is_operational);
            if open {
                scratch.visit(next, Some(step.edge));
                queue.push_back(next);
            }
        }
    }
    scratch.is_visited(sink)
}

fn trace_path(
    graph: &Graph,
    scratch: &SearchScratch,
    source: NodeId,
    sink: NodeId,
) -> Option<Vec<Step>> {
    let mut path = Vec::new();
    let mut v = sink;
    while v != source {
        let id = scratch.via(v)?;
        let edge = graph.edge(id)?;
        if edge.dest() == v {
            path.push(Step { edge: id, forward: true });
            v = edge.origin();
        } else {
            path.push(Step { edge: id, forward: false });
            v = edge.dest();
        }
    }
    Some(path)
}

fn bottleneck(graph: &Graph, path: &[Step]) -> u64 {
    path.iter()
        .filter_map(|step| {
            graph.edge(step.edge).map(|e| {
                if step.forward {
                    e.residual()
                } else {
                    e.flow()
                }
            })
        })
        .min()
        .unwrap_or(0)
}

fn augment(graph: &mut Graph, path: &[Step], amount: u64) {
    for step in path {
        if let Some(edge) = graph.edge_mut(step.edge) {
            let flow = if step.forward {
                edge.flow() + amount
            } else {
                edge.flow() - amount
            };
            edge.set_flow(flow);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::Node;

    fn single_link(capacity: u64) -> Graph {
        let mut g = Graph::new();
        g.add_node(Node::source("S", "s", "g", "1", 10)).unwrap();
        g.add_node(Node::consumer("C", "c", "1", 10, 0)).unwrap();
        g.add_edge("S", "C", capacity, false).unwrap();
        g
    }

    #[test]
    fn test_flow_limited_by_link_capacity() {
        let mut g = single_link(6);
        let flows = FlowSolver::new().max_flow_to_all_consumers(&mut g).unwrap();
        assert_eq!(Some(&6), flows.get("C"));
    }

    #[test]
    fn test_parallel_sources_capped_by_demand() {
        let mut g = Graph::new();
        g.add_node(Node::source("S1", "s1", "g", "1", 5)).unwrap();
        g.add_node(Node::source("S2", "s2", "g", "2", 5)).unwrap();
        g.add_node(Node::consumer("C", "c", "1", 8, 0)).unwrap();
        g.add_edge("S1", "C", 10, false).unwrap();
        g.add_edge("S2", "C", 10, false).unwrap();

        let flows = FlowSolver::new().max_flow_to_all_consumers(&mut g).unwrap();
        assert_eq!(Some(&8), flows.get("C"));
    }

    // S ─9→ A ─3→ C1
    //       ↓4
    //       B ─9→ C2
    #[test]
    fn test_flow_split_across_consumers() {
        let mut g = Graph::new();
        g.add_node(Node::source("S", "s", "g", "1", 9)).unwrap();
        g.add_node(Node::router("A", "1")).unwrap();
        g.add_node(Node::router("B", "2")).unwrap();
        g.add_node(Node::consumer("C1", "c1", "1", 5, 0)).unwrap();
        g.add_node(Node::consumer("C2", "c2", "2", 5, 0)).unwrap();
        g.add_edge("S", "A", 9, false).unwrap();
        g.add_edge("A", "C1", 3, false).unwrap();
        g.add_edge("A", "B", 4, false).unwrap();
        g.add_edge("B", "C2", 9, false).unwrap();

        let flows = FlowSolver::new().max_flow_to_all_consumers(&mut g).unwrap();
        assert_eq!(Some(&3), flows.get("C1"));
        assert_eq!(Some(&4), flows.get("C2"));
    }

    #[test]
    fn test_consumer_flow_counts_everything_it_receives() {
        let mut g = Graph::new();
        g.add_node(Node::source("S", "s", "g", "1", 10)).unwrap();
        g.add_node(Node::consumer("C1", "c1", "1", 4, 0)).unwrap();
        g.add_node(Node::consumer("C2", "c2", "2", 5, 0)).unwrap();
        g.add_edge("S", "C1", 10, false).unwrap();
        g.add_edge("C1", "C2", 10, false).unwrap();

        let flows = FlowSolver::new().max_flow_to_all_consumers(&mut g).unwrap();
        // C1 keeps 4 and forwards 5
        assert_eq!(Some(&9), flows.get("C1"));
        assert_eq!(Some(&5), flows.get("C2"));
        let c1 = g.find_node("C1").unwrap();
        assert_eq!(5, g.outbound_flow(c1));
    }

    // Classic case where the first BFS path must later be cancelled.
    #[test]
    fn test_backward_steps_cancel_flow() {
        let mut g = Graph::new();
        for code in ["s", "a", "b", "t"] {
            g.add_node(Node::router(code, code)).unwrap();
        }
        g.add_edge("s", "a", 1, false).unwrap();
        g.add_edge("s", "b", 1, false).unwrap();
        g.add_edge("a", "b", 1, false).unwrap();
        g.add_edge("a", "t", 1, false).unwrap();
        g.add_edge("b", "t", 1, false).unwrap();

        let s = g.find_node("s").unwrap();
        let t = g.find_node("t").unwrap();
        let pushed = FlowSolver::new()
            .edmonds_karp(&mut g, s, t, SearchOrder::Natural, true)
            .unwrap();
        assert_eq!(2, pushed);
        assert_eq!(2, g.inbound_flow(t));
    }

    #[test]
    fn test_virtual_terminals_do_not_leak() {
        let mut g = single_link(6);
        let nodes = g.node_count();
        let edges = g.edge_count();
        FlowSolver::new().max_flow_to_all_consumers(&mut g).unwrap();
        FlowSolver::new().max_flow_to_consumer(&mut g, "C").unwrap();
        assert_eq!(nodes, g.node_count());
        assert_eq!(edges, g.edge_count());
    }

    #[test]
    fn test_single_consumer_flow_capped_by_demand() {
        let mut g = Graph::new();
        g.add_node(Node::source("S", "s", "g", "1", 50)).unwrap();
        g.add_node(Node::consumer("C", "c", "1", 7, 0)).unwrap();
        g.add_edge("S", "C", 20, false).unwrap();
        let solver = FlowSolver::new();
        assert_eq!(7, solver.max_flow_to_consumer(&mut g, "C").unwrap());
    }

    #[test]
    fn test_single_consumer_requires_consumer_kind() {
        let mut g = single_link(6);
        let solver = FlowSolver::new();
        assert!(matches!(
            solver.max_flow_to_consumer(&mut g, "S"),
            Err(NetworkError::WrongKind { .. })
        ));
        assert!(matches!(
            solver.max_flow_to_consumer(&mut g, "nobody"),
            Err(NetworkError::NodeNotFound { .. })
        ));
    }

    #[test]
    fn test_identical_or_missing_terminals_rejected() {
        let mut g = single_link(6);
        let s = g.find_node("S").unwrap();
        let solver = FlowSolver::new();
        assert!(matches!(
            solver.edmonds_karp(&mut g, s, s, SearchOrder::Natural, true),
            Err(NetworkError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            solver.edmonds_karp(&mut g, s, NodeId(99), SearchOrder::Natural, true),
            Err(NetworkError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_disabled_nodes_and_links_carry_nothing() {
        let mut g = single_link(6);
        g.set_link_operational("S", "C", false).unwrap();
        let flows = FlowSolver::new().max_flow_to_all_consumers(&mut g).unwrap();
        assert_eq!(Some(&0), flows.get("C"));

        g.set_link_operational("S", "C", true).unwrap();
        g.set_node_operational("S", false).unwrap();
        let flows = FlowSolver::new().max_flow_to_all_consumers(&mut g).unwrap();
        assert_eq!(Some(&0), flows.get("C"));
    }

    #[test]
    fn test_cancelled_solver_stops() {
        let mut g = single_link(6);
        let token = CancelToken::new();
        token.cancel();
        let solver = FlowSolver::with_cancel(token);
        assert!(matches!(
            solver.max_flow_to_all_consumers(&mut g),
            Err(NetworkError::Cancelled { .. })
        ));
        assert!(g.find_node(crate::flow::terminals::SUPER_SOURCE).is_none());
    }

    #[test]
    fn test_pressure_biased_search_reaches_same_maximum() {
        let mut g = Graph::new();
        g.add_node(Node::router("s", "s")).unwrap();
        g.add_node(Node::router("a", "a")).unwrap();
        g.add_node(Node::router("b", "b")).unwrap();
        g.add_node(Node::router("t", "t")).unwrap();
        g.add_edge("s", "a", 5, true).unwrap();
        g.add_edge("s", "b", 5, false).unwrap();
        g.add_edge("a", "t", 4, false).unwrap();
        g.add_edge("b", "t", 7, false).unwrap();
        g.add_edge("a", "b", 2, true).unwrap();
        let s = g.find_node("s").unwrap();
        let t = g.find_node("t").unwrap();

        let solver = FlowSolver::new();
        let natural = solver
            .edmonds_karp(&mut g, s, t, SearchOrder::Natural, true)
            .unwrap();
        let biased = solver
            .edmonds_karp(&mut g, s, t, SearchOrder::PressureBiased, true)
            .unwrap();
        assert_eq!(10, natural);
        assert_eq!(natural, biased);
    }
}
