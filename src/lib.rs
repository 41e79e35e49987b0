//! Maximum-flow analysis of resource distribution networks: sources feed
//! consumers through routers over capacity-bounded links.
//!
//! [`FlowSolver`] computes how much each consumer can receive,
//! [`SensitivityAnalyzer`] answers what-if questions about failures, and
//! [`LoadBalancer`] evens out link pressure without losing delivered flow.

pub mod analysis;
pub mod config;
pub mod error;
pub mod flow;
pub mod graph;
pub mod scenario;
pub mod state;
pub mod tui;

pub use analysis::{BalanceReport, LoadBalancer, PressureStats, SensitivityAnalyzer};
pub use config::AnalysisConfig;
pub use error::{NetworkError, Result};
pub use flow::{CancelToken, FlowSolver, SearchOrder};
pub use graph::{Edge, EdgeId, Graph, Node, NodeId, NodeKind};
pub use scenario::{BasicNetwork, CsvDataset, NetworkSource, RandomNetwork};
pub use state::{CrucialLink, Failure, FlowDelta, FlowMap};
