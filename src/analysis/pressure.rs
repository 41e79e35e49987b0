use crate::graph::edge::EdgeId;
use crate::graph::graph::Graph;
use std::collections::HashSet;

/// Pressure of one physical link. A bidirectional pair is one link whose
/// pressure is the larger of its two directions.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkPressure {
    pub origin: String,
    pub dest: String,
    pub bidirectional: bool,
    pub flow: u64,
    pub capacity: u64,
    /// percent of capacity
    pub pressure: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PressureStats {
    pub links: usize,
    pub mean: f64,
    pub variance: f64,
    pub max: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl PressureStats {
    fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
        let max = samples.iter().copied().fold(0.0, f64::max);
        Self {
            links: samples.len(),
            mean,
            variance,
            max,
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }

    /// Direction of change in variance relative to `previous`, ignoring
    /// moves smaller than `epsilon`.
    pub fn variance_trend(&self, previous: &PressureStats, epsilon: f64) -> Trend {
        let diff = self.variance - previous.variance;
        if diff > epsilon {
            Trend::Up
        } else if diff < -epsilon {
            Trend::Down
        } else {
            Trend::Flat
        }
    }
}

/// One sample per physical link, restricted to links accepted by `include`.
pub fn link_pressures_where(graph: &Graph, include: impl Fn(EdgeId) -> bool) -> Vec<LinkPressure> {
    let mut evaluated = HashSet::new();
    let mut out = Vec::new();
    for (id, edge) in graph.all_edges() {
        if !include(id) || !evaluated.insert(id) {
            continue;
        }
        let twin = edge
            .twin()
            .filter(|t| include(*t))
            .and_then(|t| graph.edge(t).map(|e| (t, e)));
        let (pressure, flow) = match twin {
            Some((twin_id, twin)) => {
                evaluated.insert(twin_id);
                if twin.pressure() > edge.pressure() {
                    (twin.pressure(), twin.flow())
                } else {
                    (edge.pressure(), edge.flow())
                }
            }
            None => (edge.pressure(), edge.flow()),
        };
        let Some((origin, dest)) = graph.endpoints(id) else {
            continue;
        };
        out.push(LinkPressure {
            origin: origin.to_string(),
            dest: dest.to_string(),
            bidirectional: twin.is_some(),
            flow,
            capacity: edge.capacity(),
            pressure,
        });
    }
    out
}

pub fn link_pressures(graph: &Graph) -> Vec<LinkPressure> {
    link_pressures_where(graph, |_| true)
}

pub fn pressure_stats_where(graph: &Graph, include: impl Fn(EdgeId) -> bool) -> PressureStats {
    let samples = link_pressures_where(graph, include)
        .into_iter()
        .map(|l| l.pressure)
        .collect::<Vec<_>>();
    PressureStats::from_samples(&samples)
}

pub fn pressure_stats(graph: &Graph) -> PressureStats {
    pressure_stats_where(graph, |_| true)
}
