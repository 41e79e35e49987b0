pub mod outage;
pub mod scratch;
pub mod snapshot;

pub use outage::{Failure, Outage};
pub use scratch::SearchScratch;
pub use snapshot::{Baseline, CrucialLink, FlowDelta, FlowMap};
