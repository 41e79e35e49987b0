use crate::error::{NetworkError, Result};
use crate::graph::graph::Graph;
use crate::graph::node::{Node, NodeId};
use crate::scenario::scenario::NetworkSource;
use rand::{Rng, SeedableRng, rngs::StdRng};

const CAPACITIES: [u64; 5] = [5, 10, 20, 30, 50];

/// Seeded random network. Every router and consumer is reachable from some
/// source; extra links (a quarter of them bidirectional) add redundancy.
#[derive(Clone, Debug)]
pub struct RandomNetwork {
    pub seed: u64,
    pub sources: usize,
    pub routers: usize,
    pub consumers: usize,
    /// extra links per node on top of the spanning links
    pub density: usize,
}

impl RandomNetwork {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            sources: 4,
            routers: 12,
            consumers: 20,
            density: 2,
        }
    }

    pub fn with_sizes(mut self, sources: usize, routers: usize, consumers: usize) -> Self {
        self.sources = sources.max(1);
        self.routers = routers;
        self.consumers = consumers;
        self
    }

    pub fn with_density(mut self, density: usize) -> Self {
        self.density = density;
        self
    }
}

impl NetworkSource for RandomNetwork {
    fn build(&self) -> Result<Graph> {
        if self.sources == 0 {
            return Err(NetworkError::invalid_config("random network needs a source"));
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut graph = Graph::new();

        let mut source_ids = Vec::new();
        for i in 0..self.sources {
            let supply = CAPACITIES[rng.gen_range(0..CAPACITIES.len())] * 2;
            let id = graph.add_node(Node::source(
                format!("R_{i}"),
                format!("Reservoir {i}"),
                format!("Municipality {}", i % 3),
                i.to_string(),
                supply,
            ))?;
            source_ids.push(id);
        }
        let mut router_ids = Vec::new();
        for i in 0..self.routers {
            router_ids.push(graph.add_node(Node::router(format!("PS_{i}"), i.to_string()))?);
        }
        let mut consumer_ids = Vec::new();
        for i in 0..self.consumers {
            let demand = CAPACITIES[rng.gen_range(0..CAPACITIES.len())];
            let population = rng.gen_range(1_000..100_000);
            consumer_ids.push(graph.add_node(Node::consumer(
                format!("C_{i}"),
                format!("City {i}"),
                i.to_string(),
                demand,
                population,
            ))?);
        }

        let slots = graph.node_slots();
        let mut has_edge = vec![vec![false; slots]; slots];
        let mut connect = |graph: &mut Graph, rng: &mut StdRng, from: NodeId, to: NodeId| {
            let (f, t) = (from.index(), to.index());
            if from == to || has_edge[f][t] || has_edge[t][f] {
                return Ok(());
            }
            let bidirectional = rng.gen_range(0..4) == 0;
            has_edge[f][t] = true;
            has_edge[t][f] = bidirectional;
            let capacity = CAPACITIES[rng.gen_range(0..CAPACITIES.len())];
            let (origin, dest) = (code_of(graph, from), code_of(graph, to));
            graph.add_edge(&origin, &dest, capacity, bidirectional).map(|_| ())
        };

        // spanning links: routers hang off sources or earlier routers,
        // consumers off any supplier
        let mut frontier = source_ids.clone();
        for &router in &router_ids {
            let from = frontier[rng.gen_range(0..frontier.len())];
            connect(&mut graph, &mut rng, from, router)?;
            frontier.push(router);
        }
        for &consumer in &consumer_ids {
            let from = frontier[rng.gen_range(0..frontier.len())];
            connect(&mut graph, &mut rng, from, consumer)?;
        }

        let targets = router_ids
            .iter()
            .chain(&consumer_ids)
            .copied()
            .collect::<Vec<_>>();
        if !targets.is_empty() {
            for _ in 0..slots * self.density {
                let from = frontier[rng.gen_range(0..frontier.len())];
                let to = targets[rng.gen_range(0..targets.len())];
                connect(&mut graph, &mut rng, from, to)?;
            }
        }

        Ok(graph)
    }

    fn describe(&self) -> String {
        format!(
            "random network (seed {}, {} sources, {} routers, {} consumers)",
            self.seed, self.sources, self.routers, self.consumers
        )
    }
}

fn code_of(graph: &Graph, id: NodeId) -> String {
    graph
        .node(id)
        .map(|n| n.code().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_network() {
        let a = RandomNetwork::new(7).build().unwrap();
        let b = RandomNetwork::new(7).build().unwrap();
        assert_eq!(a.node_count(), b.node_count());
        assert_eq!(a.edge_count(), b.edge_count());
        for ((_, x), (_, y)) in a.all_edges().zip(b.all_edges()) {
            assert_eq!(x.capacity(), y.capacity());
            assert_eq!(x.origin(), y.origin());
            assert_eq!(x.dest(), y.dest());
        }
    }

    #[test]
    fn test_every_non_source_has_a_supplier() {
        let g = RandomNetwork::new(42).with_sizes(3, 6, 10).build().unwrap();
        assert_eq!(19, g.node_count());
        assert!(
            g.all_nodes()
                .filter(|(_, n)| !n.is_source())
                .all(|(_, n)| !n.incoming().is_empty())
        );
    }

    #[test]
    fn test_network_without_routers_feeds_consumers_directly() {
        let g = RandomNetwork::new(1)
            .with_sizes(1, 0, 3)
            .with_density(0)
            .build()
            .unwrap();
        for consumer in ["C_0", "C_1", "C_2"] {
            assert!(g.find_edge("R_0", consumer).is_some());
        }
    }

    #[test]
    fn test_network_needs_a_source() {
        let mut network = RandomNetwork::new(1);
        network.sources = 0;
        assert!(network.build().is_err());
    }
}
