use std::collections::BTreeMap;

/// Consumer code to delivered flow.
pub type FlowMap = BTreeMap<String, u64>;

/// A consumer whose flow changed under a what-if scenario.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowDelta {
    pub code: String,
    pub old_flow: u64,
    pub new_flow: u64,
}

/// A link whose loss lowers a consumer's flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrucialLink {
    pub origin: String,
    pub dest: String,
    pub old_flow: u64,
    pub new_flow: u64,
}

/// Flows of the most recent unperturbed full solve, stamped with the graph
/// generation they were computed at.
#[derive(Clone, Debug)]
pub struct Baseline {
    generation: u64,
    flows: FlowMap,
}

impl Baseline {
    pub fn new(generation: u64, flows: FlowMap) -> Self {
        Self { generation, flows }
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn flows(&self) -> &FlowMap {
        &self.flows
    }

    pub fn flow(&self, code: &str) -> u64 {
        self.flows.get(code).copied().unwrap_or(0)
    }

    /// Consumers whose flow in `after` is strictly below the baseline.
    pub fn decreases(&self, after: &FlowMap) -> Vec<FlowDelta> {
        self.flows
            .iter()
            .filter_map(|(code, &old_flow)| {
                let new_flow = after.get(code).copied().unwrap_or(0);
                (new_flow < old_flow).then(|| FlowDelta {
                    code: code.clone(),
                    old_flow,
                    new_flow,
                })
            })
            .collect()
    }
}
