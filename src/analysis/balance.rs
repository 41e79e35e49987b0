use crate::analysis::pressure::{PressureStats, pressure_stats_where};
use crate::error::Result;
use crate::flow::engine::{FlowSolver, SearchOrder, consumer_flows};
use crate::flow::modifiers::CapacityCap;
use crate::flow::terminals::Terminals;
use crate::graph::edge::EdgeId;
use crate::graph::graph::Graph;
use crate::state::snapshot::FlowMap;
use std::collections::HashSet;
use tracing::info;

/// Outcome of one balancing pass.
#[derive(Clone, Debug)]
pub struct BalanceReport {
    pub flows: FlowMap,
    pub before: PressureStats,
    pub after: PressureStats,
    pub total_before: u64,
    pub total_after: u64,
}

/// Redistributes flow to even out link pressure.
///
/// 1. unconstrained max flow, measure mean pressure over real links
/// 2. cap every real link at `capacity * mean * headroom`, re-solve from zero
///    with the pressure-biased search
/// 3. lift the caps and keep augmenting from the capped flow
///
/// Step 3 runs to completion from a feasible flow, so the total delivered
/// flow always matches the unconstrained maximum; only its placement moves.
#[derive(Clone, Debug)]
pub struct LoadBalancer {
    solver: FlowSolver,
    headroom: f64,
}

impl Default for LoadBalancer {
    fn default() -> Self {
        Self::new(FlowSolver::new())
    }
}

impl LoadBalancer {
    pub fn new(solver: FlowSolver) -> Self {
        Self {
            solver,
            headroom: 1.0,
        }
    }

    pub fn with_headroom(mut self, headroom: f64) -> Self {
        self.headroom = headroom.max(0.0);
        self
    }

    pub fn headroom(&self) -> f64 {
        self.headroom
    }

    pub fn balance(&self, graph: &mut Graph) -> Result<BalanceReport> {
        let report = {
            let mut terminals = Terminals::for_all_consumers(graph)?;
            let (source, sink) = (terminals.source(), terminals.sink());
            let virtual_links = terminals
                .all_edges()
                .map(|(id, _)| id)
                .filter(|id| terminals.is_virtual(*id))
                .collect::<HashSet<EdgeId>>();
            let real = |id: EdgeId| !virtual_links.contains(&id);

            let total_before =
                self.solver
                    .edmonds_karp(&mut terminals, source, sink, SearchOrder::Natural, true)?;
            let before = pressure_stats_where(&terminals, real);

            let capped_total = {
                let mut capped =
                    CapacityCap::apply(&mut terminals, before.mean * self.headroom, real);
                self.solver
                    .edmonds_karp(&mut capped, source, sink, SearchOrder::PressureBiased, true)?
            };
            let recovered = self.solver.edmonds_karp(
                &mut terminals,
                source,
                sink,
                SearchOrder::PressureBiased,
                false,
            )?;
            let after = pressure_stats_where(&terminals, real);

            BalanceReport {
                flows: FlowMap::new(),
                before,
                after,
                total_before,
                total_after: capped_total + recovered,
            }
        };

        info!(
            mean_before = report.before.mean,
            variance_before = report.before.variance,
            variance_after = report.after.variance,
            total = report.total_after,
            "balanced network"
        );
        Ok(BalanceReport {
            flows: consumer_flows(graph),
            ..report
        })
    }
}
