use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use supplygraph::{
    AnalysisConfig, EdgeId, Failure, FlowSolver, Graph, LoadBalancer, NetworkSource, NodeId,
    RandomNetwork, SensitivityAnalyzer,
};

fn network(seed: u64, sources: usize, routers: usize, consumers: usize) -> Graph {
    RandomNetwork::new(seed)
        .with_sizes(sources, routers, consumers)
        .with_density(1)
        .build()
        .unwrap()
}

fn small_network() -> impl Strategy<Value = Graph> {
    (any::<u64>(), 1usize..3, 0usize..4, 1usize..5)
        .prop_map(|(seed, s, r, c)| network(seed, s, r, c))
}

fn medium_network() -> impl Strategy<Value = Graph> {
    (any::<u64>(), 1usize..5, 0usize..10, 1usize..12)
        .prop_map(|(seed, s, r, c)| network(seed, s, r, c))
}

/// One edge per physical link, twins skipped.
fn physical_links(graph: &Graph) -> Vec<EdgeId> {
    let mut seen = HashSet::new();
    graph
        .all_edges()
        .filter(|(id, edge)| {
            let fresh = seen.insert(*id);
            if let Some(twin) = edge.twin() {
                seen.insert(twin);
            }
            fresh
        })
        .map(|(id, _)| id)
        .collect()
}

/// Flow that ends at consumers: what they receive minus what they pass on.
fn delivered(graph: &Graph) -> u64 {
    graph
        .consumers()
        .map(|(id, _)| graph.inbound_flow(id) - graph.outbound_flow(id))
        .sum()
}

/// Brute-force minimum cut of the network extended with a super source
/// feeding every source and a super sink draining every consumer.
fn min_cut(graph: &Graph) -> u64 {
    let nodes = graph.all_nodes().map(|(id, _)| id).collect::<Vec<NodeId>>();
    assert!(nodes.len() <= 16);
    let mut best = u64::MAX;
    for mask in 0u32..(1 << nodes.len()) {
        let source_side = nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, id)| *id)
            .collect::<HashSet<_>>();
        let mut cut = 0u64;
        for (id, node) in graph.all_nodes() {
            let inside = source_side.contains(&id);
            if !inside {
                cut += node.max_supply().unwrap_or(0);
            }
            if inside {
                cut += node.demand().unwrap_or(0);
            }
        }
        for (_, edge) in graph.all_edges() {
            if source_side.contains(&edge.origin()) && !source_side.contains(&edge.dest()) {
                cut += edge.capacity();
            }
        }
        best = best.min(cut);
    }
    best
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn solved_flow_is_conserved_and_bounded(mut graph in medium_network()) {
        FlowSolver::new().max_flow_to_all_consumers(&mut graph).unwrap();

        for (_, edge) in graph.all_edges() {
            prop_assert!(edge.flow() <= edge.effective_capacity());
        }
        for (id, node) in graph.all_nodes() {
            let inbound = graph.inbound_flow(id);
            let outbound = graph.outbound_flow(id);
            if let Some(supply) = node.max_supply() {
                prop_assert!(outbound.saturating_sub(inbound) <= supply);
                prop_assert!(inbound <= outbound);
            } else if let Some(demand) = node.demand() {
                prop_assert!(outbound <= inbound);
                prop_assert!(inbound - outbound <= demand);
            } else {
                prop_assert_eq!(inbound, outbound, "router {} leaks", node.code());
            }
        }
    }

    #[test]
    fn repeated_solves_agree(mut graph in medium_network()) {
        let solver = FlowSolver::new();
        let first = solver.max_flow_to_all_consumers(&mut graph).unwrap();
        let second = solver.max_flow_to_all_consumers(&mut graph).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn max_flow_equals_min_cut(mut graph in small_network()) {
        FlowSolver::new().max_flow_to_all_consumers(&mut graph).unwrap();
        prop_assert_eq!(min_cut(&graph), delivered(&graph));
    }

    #[test]
    fn failures_never_increase_flow(graph in medium_network(), pick in any::<prop::sample::Index>()) {
        let codes = graph
            .all_nodes()
            .map(|(_, n)| n.code().to_string())
            .collect::<Vec<_>>();
        let links = physical_links(&graph)
            .into_iter()
            .filter_map(|id| graph.endpoints(id).map(|(o, d)| (o.to_string(), d.to_string())))
            .collect::<Vec<_>>();
        let endpoints_only = graph.consumers().all(|(_, n)| n.outgoing().is_empty());
        let mut analyzer = SensitivityAnalyzer::new(graph);
        let baseline = analyzer.max_flow_to_all_consumers().unwrap();
        let baseline_total = delivered(analyzer.graph());
        let satisfied = endpoints_only && analyzer.meets_all_demand().unwrap();

        let mut scenarios = vec![Failure::node(pick.get(&codes).as_str())];
        if !links.is_empty() {
            let (origin, dest) = pick.get(&links);
            scenarios.push(Failure::link(origin.as_str(), dest.as_str()));
        }
        for failure in scenarios {
            let after = analyzer.flows_under(std::slice::from_ref(&failure)).unwrap();
            prop_assert!(delivered(analyzer.graph()) <= baseline_total);
            // consumers competing for supply may trade flow; when none of them
            // forwards anything and every demand is met nobody has room to gain
            if satisfied {
                for (code, flow) in &after {
                    prop_assert!(flow <= &baseline[code]);
                }
            }
        }

        prop_assert!(analyzer.graph().all_nodes().all(|(_, n)| n.is_operational()));
        prop_assert!(analyzer.graph().all_edges().all(|(_, e)| e.is_operational()));
    }

    #[test]
    fn deficits_match_demand_minus_flow(graph in medium_network()) {
        let mut analyzer = SensitivityAnalyzer::new(graph);
        let flows = analyzer.max_flow_to_all_consumers().unwrap();
        let deficits = analyzer.flow_deficits().unwrap();

        for (_, node) in analyzer.graph().consumers() {
            let demand = node.demand().unwrap();
            let expected = demand.saturating_sub(flows[node.code()]);
            prop_assert_eq!(expected, deficits.get(node.code()).copied().unwrap_or(0));
        }
        prop_assert!(deficits.values().all(|d| *d > 0));
        prop_assert_eq!(deficits.is_empty(), analyzer.meets_all_demand().unwrap());
    }

    #[test]
    fn crucial_links_match_brute_force(graph in small_network(), parallel in any::<bool>()) {
        let consumers = graph
            .consumers()
            .map(|(_, n)| n.code().to_string())
            .collect::<Vec<_>>();
        let links = physical_links(&graph);
        let config = AnalysisConfig { parallel, ..AnalysisConfig::default() };
        let mut analyzer = SensitivityAnalyzer::with_config(graph, config);
        let baseline = analyzer.max_flow_to_all_consumers().unwrap();

        let mut drops: HashMap<String, HashSet<(String, String)>> = HashMap::new();
        for id in links {
            let (origin, dest) = analyzer
                .graph()
                .endpoints(id)
                .map(|(o, d)| (o.to_string(), d.to_string()))
                .unwrap();
            let after = analyzer
                .flows_under(&[Failure::link(origin.as_str(), dest.as_str())])
                .unwrap();
            for code in &consumers {
                if after[code] < baseline[code] {
                    drops.entry(code.clone()).or_default().insert((origin.clone(), dest.clone()));
                }
            }
        }

        for code in &consumers {
            let reported = analyzer
                .crucial_edges_to(code)
                .unwrap()
                .into_iter()
                .map(|l| (l.origin, l.dest))
                .collect::<HashSet<_>>();
            prop_assert_eq!(drops.remove(code).unwrap_or_default(), reported);
        }
    }

    #[test]
    fn balancing_keeps_total_and_capacity(mut graph in medium_network()) {
        let report = LoadBalancer::default().balance(&mut graph).unwrap();
        prop_assert_eq!(report.total_before, report.total_after);
        prop_assert_eq!(report.total_after, delivered(&graph));
        for (_, edge) in graph.all_edges() {
            prop_assert!(edge.flow() <= edge.capacity());
            prop_assert_eq!(edge.capacity(), edge.effective_capacity());
        }
    }
}
