use crate::error::Result;
use crate::graph::graph::Graph;

/// Anything that can produce a populated network.
pub trait NetworkSource {
    fn build(&self) -> Result<Graph>;

    fn describe(&self) -> String;
}
