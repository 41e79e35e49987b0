/// Tunables shared by the analysis entry points.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisConfig {
    /// Solve independent what-if scenarios on cloned graphs in parallel.
    pub parallel: bool,
    /// Multiplier on the mean link pressure used as the balancing cap.
    pub balance_headroom: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            balance_headroom: 1.0,
        }
    }
}
