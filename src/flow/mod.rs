pub mod cancel;
pub mod engine;
pub mod modifiers;
pub mod terminals;

pub use cancel::CancelToken;
pub use engine::{FlowSolver, SearchOrder, consumer_flows};
pub use modifiers::CapacityCap;
pub use terminals::Terminals;
