pub mod edge;
pub mod graph;
pub mod node;

pub use edge::{Edge, EdgeId};
pub use graph::Graph;
pub use node::{Node, NodeId, NodeKind};
