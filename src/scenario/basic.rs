use crate::error::Result;
use crate::graph::graph::Graph;
use crate::graph::node::Node;
use crate::scenario::scenario::NetworkSource;

/// Small fixed network: two reservoirs feeding four cities through three
/// pumping stations, with one bidirectional interconnect.
pub struct BasicNetwork;

impl NetworkSource for BasicNetwork {
    fn build(&self) -> Result<Graph> {
        let mut graph = Graph::new();

        graph.add_node(Node::source("R_1", "Lakeside", "Northvale", "1", 90))?;
        graph.add_node(Node::source("R_2", "Hill Dam", "Southbury", "2", 60))?;

        for (code, id) in [("PS_1", "1"), ("PS_2", "2"), ("PS_3", "3")] {
            graph.add_node(Node::router(code, id))?;
        }

        graph.add_node(Node::consumer("C_1", "Ashford", "1", 40, 32_000))?;
        graph.add_node(Node::consumer("C_2", "Brookton", "2", 35, 27_500))?;
        graph.add_node(Node::consumer("C_3", "Carden", "3", 50, 41_000))?;
        graph.add_node(Node::consumer("C_4", "Dunmore", "4", 30, 18_200))?;

        let links = [
            ("R_1", "PS_1", 70, false),
            ("R_1", "PS_2", 30, false),
            ("R_2", "PS_3", 60, false),
            ("PS_1", "PS_2", 25, true),
            ("PS_2", "PS_3", 20, true),
            ("PS_1", "C_1", 45, false),
            ("PS_1", "C_2", 20, false),
            ("PS_2", "C_2", 20, false),
            ("PS_2", "C_3", 30, false),
            ("PS_3", "C_3", 25, false),
            ("PS_3", "C_4", 30, false),
        ];
        for (origin, dest, capacity, bidirectional) in links {
            graph.add_edge(origin, dest, capacity, bidirectional)?;
        }

        Ok(graph)
    }

    fn describe(&self) -> String {
        "basic demo network".into()
    }
}
