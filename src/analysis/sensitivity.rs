use crate::analysis::balance::{BalanceReport, LoadBalancer};
use crate::analysis::pressure::{PressureStats, pressure_stats};
use crate::config::AnalysisConfig;
use crate::error::{NetworkError, Result};
use crate::flow::cancel::CancelToken;
use crate::flow::engine::FlowSolver;
use crate::graph::edge::EdgeId;
use crate::graph::graph::Graph;
use crate::graph::node::Node;
use crate::state::outage::{Failure, Outage};
use crate::state::snapshot::{Baseline, CrucialLink, FlowDelta, FlowMap};
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info};

/// What-if engine: takes parts of the network out of service, re-solves, and
/// reports which consumers lose flow.
///
/// Owns the graph so it can keep the unperturbed baseline honest: every
/// mutable access through [`graph_mut`](Self::graph_mut) or
/// [`rebalance`](Self::rebalance) drops the cached baseline, and the cache is
/// additionally stamped with the graph generation it was computed at.
pub struct SensitivityAnalyzer {
    graph: Graph,
    solver: FlowSolver,
    config: AnalysisConfig,
    baseline: Option<Baseline>,
    // link flows are not those of a full solve or a balancing pass
    perturbed: bool,
}

impl SensitivityAnalyzer {
    pub fn new(graph: Graph) -> Self {
        Self::with_config(graph, AnalysisConfig::default())
    }

    pub fn with_config(graph: Graph, config: AnalysisConfig) -> Self {
        Self {
            graph,
            solver: FlowSolver::new(),
            config,
            baseline: None,
            perturbed: true,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.solver = FlowSolver::with_cancel(cancel);
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        self.solver.cancel_token()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable access to the graph; invalidates the baseline.
    pub fn graph_mut(&mut self) -> &mut Graph {
        self.invalidate();
        self.perturbed = true;
        &mut self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    pub fn invalidate(&mut self) {
        self.baseline = None;
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline
            .as_ref()
            .is_some_and(|b| b.is_current(self.graph.generation()))
    }

    /// Baseline flows, solving the unperturbed network if the cache is empty
    /// or stale.
    pub fn baseline(&mut self) -> Result<&Baseline> {
        if !self.has_baseline() {
            let flows = self.solver.max_flow_to_all_consumers(&mut self.graph)?;
            self.baseline = Some(Baseline::new(self.graph.generation(), flows));
            self.perturbed = false;
        }
        self.baseline
            .as_ref()
            .ok_or_else(|| NetworkError::invalid_config("baseline unavailable"))
    }

    /// Fresh full solve. Also refreshes the baseline, since the graph is in
    /// its unperturbed state.
    pub fn max_flow_to_all_consumers(&mut self) -> Result<FlowMap> {
        let flows = self.solver.max_flow_to_all_consumers(&mut self.graph)?;
        self.baseline = Some(Baseline::new(self.graph.generation(), flows.clone()));
        self.perturbed = false;
        Ok(flows)
    }

    pub fn max_flow_to_consumer(&mut self, code: &str) -> Result<u64> {
        self.perturbed = true;
        self.solver.max_flow_to_consumer(&mut self.graph, code)
    }

    /// Full solve with `failures` out of service. Flags are restored before
    /// returning, on success or error.
    pub fn flows_under(&mut self, failures: &[Failure]) -> Result<FlowMap> {
        self.perturbed = true;
        let mut outage = Outage::new(&mut self.graph);
        for failure in failures {
            outage.apply(failure)?;
        }
        self.solver.max_flow_to_all_consumers(&mut outage)
    }

    /// Consumers whose flow strictly drops with `failures` out of service.
    pub fn affected_by(&mut self, failures: &[Failure]) -> Result<Vec<FlowDelta>> {
        let baseline = self.baseline()?.clone();
        let after = self.flows_under(failures)?;
        Ok(baseline.decreases(&after))
    }

    pub fn affected_by_node_failure(&mut self, code: &str) -> Result<Vec<FlowDelta>> {
        let affected = self
            .affected_by(&[Failure::node(code)])
            .map_err(|e| e.in_scenario("node failure", code))?;
        info!(node = code, affected = affected.len(), "node failure analysed");
        Ok(affected)
    }

    pub fn affected_by_source_failure(&mut self, code: &str) -> Result<Vec<FlowDelta>> {
        self.require_kind(code, Node::is_source, "source")?;
        self.affected_by_node_failure(code)
    }

    pub fn affected_by_router_failure(&mut self, code: &str) -> Result<Vec<FlowDelta>> {
        self.require_kind(code, |n| !n.is_source() && !n.is_consumer(), "router")?;
        self.affected_by_node_failure(code)
    }

    /// Consumers hurt by losing the link `origin -> dest` (and its twin).
    pub fn affected_by_edge_rupture(&mut self, origin: &str, dest: &str) -> Result<Vec<FlowDelta>> {
        let failure = Failure::link(origin, dest);
        let affected = self
            .affected_by(std::slice::from_ref(&failure))
            .map_err(|e| e.in_scenario("link rupture", failure.target()))?;
        info!(link = %failure.target(), affected = affected.len(), "link rupture analysed");
        Ok(affected)
    }

    /// Links whose individual loss strictly lowers `consumer`'s flow.
    ///
    /// A bidirectional pair is evaluated once, with both directions down.
    pub fn crucial_edges_to(&mut self, consumer: &str) -> Result<Vec<CrucialLink>> {
        self.require_kind(consumer, Node::is_consumer, "consumer")?;
        let old_flow = self.baseline()?.flow(consumer);
        let links = self.undirected_links();
        info!(
            consumer,
            links = links.len(),
            parallel = self.config.parallel,
            "evaluating crucial links"
        );
        if old_flow == 0 {
            // nothing left to lose
            return Ok(Vec::new());
        }

        let evaluate = |graph: &mut Graph, id: EdgeId| -> Result<Option<CrucialLink>> {
            self.solver.cancel_token().check("crucial link analysis")?;
            let Some((origin, dest)) = graph
                .endpoints(id)
                .map(|(o, d)| (o.to_string(), d.to_string()))
            else {
                return Ok(None);
            };
            let new_flow = {
                let mut outage = Outage::new(graph);
                outage.disable_link(id);
                self.solver
                    .max_flow_to_all_consumers(&mut outage)
                    .map_err(|e| e.in_scenario("crucial link", format!("{origin}->{dest}")))?
                    .get(consumer)
                    .copied()
                    .unwrap_or(0)
            };
            debug!(%origin, %dest, old_flow, new_flow, "link evaluated");
            Ok((new_flow < old_flow).then_some(CrucialLink {
                origin,
                dest,
                old_flow,
                new_flow,
            }))
        };

        let found = if self.config.parallel {
            let shared = &self.graph;
            links
                .par_iter()
                .map(|id| {
                    let mut isolated = shared.clone();
                    evaluate(&mut isolated, *id)
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            self.perturbed = true;
            let mut found = Vec::with_capacity(links.len());
            for id in &links {
                found.push(evaluate(&mut self.graph, *id)?);
            }
            found
        };
        Ok(found.into_iter().flatten().collect())
    }

    /// Unmet demand per consumer, positive entries only.
    pub fn flow_deficits(&mut self) -> Result<FlowMap> {
        let baseline = self.baseline()?.clone();
        Ok(self
            .graph
            .consumers()
            .filter_map(|(_, n)| {
                let demand = n.demand()?;
                let deficit = demand.saturating_sub(baseline.flow(n.code()));
                (deficit > 0).then(|| (n.code().to_string(), deficit))
            })
            .collect())
    }

    pub fn meets_all_demand(&mut self) -> Result<bool> {
        Ok(self.flow_deficits()?.is_empty())
    }

    /// Pressure of the unperturbed network. Link flows left over from a
    /// failure scenario are replaced by a full solve first; flows from the
    /// last [`rebalance`](Self::rebalance) are kept as they are.
    pub fn pressure_stats(&mut self) -> Result<PressureStats> {
        if self.perturbed {
            self.max_flow_to_all_consumers()?;
        }
        Ok(pressure_stats(&self.graph))
    }

    /// Runs a balancing pass. Link flows change, so the baseline is dropped.
    pub fn rebalance(&mut self, balancer: &LoadBalancer) -> Result<BalanceReport> {
        self.invalidate();
        let report = balancer.balance(&mut self.graph)?;
        self.perturbed = false;
        Ok(report)
    }

    fn require_kind(
        &self,
        code: &str,
        accept: impl Fn(&Node) -> bool,
        expected: &'static str,
    ) -> Result<()> {
        let node = self
            .graph
            .node_by_code(code)
            .ok_or_else(|| NetworkError::node_not_found(code))?;
        if accept(node) {
            Ok(())
        } else {
            Err(NetworkError::WrongKind {
                code: code.to_string(),
                expected,
            })
        }
    }

    /// One representative edge per physical link.
    fn undirected_links(&self) -> Vec<EdgeId> {
        let mut evaluated = HashSet::new();
        self.graph
            .all_edges()
            .filter_map(|(id, edge)| {
                if !evaluated.insert(id) {
                    return None;
                }
                if let Some(twin) = edge.twin() {
                    evaluated.insert(twin);
                }
                Some(id)
            })
            .collect()
    }
}
