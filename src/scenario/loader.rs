use crate::error::{NetworkError, Result};
use crate::graph::graph::Graph;
use crate::graph::node::Node;
use crate::scenario::scenario::NetworkSource;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SOURCES_FILE: &str = "sources.csv";
pub const ROUTERS_FILE: &str = "routers.csv";
pub const CONSUMERS_FILE: &str = "consumers.csv";
pub const LINKS_FILE: &str = "links.csv";

#[derive(Deserialize)]
struct SourceRecord {
    name: String,
    grouping: String,
    id: String,
    code: String,
    #[serde(deserialize_with = "quantity")]
    max_supply: u64,
}

#[derive(Deserialize)]
struct RouterRecord {
    id: String,
    code: String,
}

#[derive(Deserialize)]
struct ConsumerRecord {
    name: String,
    id: String,
    code: String,
    #[serde(deserialize_with = "quantity")]
    demand: u64,
    #[serde(deserialize_with = "quantity")]
    population: u64,
}

#[derive(Deserialize)]
struct LinkRecord {
    origin: String,
    dest: String,
    #[serde(deserialize_with = "quantity")]
    capacity: u64,
    direction: u8,
}

/// Accepts `1200`, `1,200` and `1200.0`; fractions are truncated.
fn quantity<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let cleaned = raw.trim().replace(',', "");
    if let Ok(value) = cleaned.parse::<u64>() {
        return Ok(value);
    }
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value as u64),
        _ => Err(serde::de::Error::custom(format!("'{raw}' is not a quantity"))),
    }
}

/// A directory holding the four network CSV files. Each file has a header
/// row; fields are read by position.
///
/// Link direction: `1` is one-way from origin to dest, `0` is bidirectional.
#[derive(Clone, Debug)]
pub struct CsvDataset {
    dir: PathBuf,
}

impl CsvDataset {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<(u64, T)>> {
        let path = self.dir.join(file);
        let handle = File::open(&path).map_err(|source| NetworkError::Io {
            path: path.clone(),
            source,
        })?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(handle);

        let mut rows = Vec::new();
        let mut record = StringRecord::new();
        while reader.read_record(&mut record)? {
            if record.iter().all(str::is_empty) {
                continue;
            }
            let line = record.position().map_or(0, |p| p.line());
            let row = record
                .deserialize::<T>(None)
                .map_err(|e| invalid_record(file, line, e.to_string()))?;
            rows.push((line, row));
        }
        Ok(rows)
    }
}

impl NetworkSource for CsvDataset {
    fn build(&self) -> Result<Graph> {
        let mut graph = Graph::new();

        for (line, r) in self.read::<SourceRecord>(SOURCES_FILE)? {
            graph
                .add_node(Node::source(r.code, r.name, r.grouping, r.id, r.max_supply))
                .map_err(|e| invalid_record(SOURCES_FILE, line, e.to_string()))?;
        }
        for (line, r) in self.read::<RouterRecord>(ROUTERS_FILE)? {
            graph
                .add_node(Node::router(r.code, r.id))
                .map_err(|e| invalid_record(ROUTERS_FILE, line, e.to_string()))?;
        }
        for (line, r) in self.read::<ConsumerRecord>(CONSUMERS_FILE)? {
            graph
                .add_node(Node::consumer(r.code, r.name, r.id, r.demand, r.population))
                .map_err(|e| invalid_record(CONSUMERS_FILE, line, e.to_string()))?;
        }
        for (line, r) in self.read::<LinkRecord>(LINKS_FILE)? {
            let bidirectional = match r.direction {
                1 => false,
                0 => true,
                other => {
                    return Err(invalid_record(
                        LINKS_FILE,
                        line,
                        format!("direction must be 0 or 1, got {other}"),
                    ));
                }
            };
            graph
                .add_edge(&r.origin, &r.dest, r.capacity, bidirectional)
                .map_err(|e| invalid_record(LINKS_FILE, line, e.to_string()))?;
        }

        info!(
            dir = %self.dir.display(),
            nodes = graph.node_count(),
            links = graph.edge_count(),
            "dataset loaded"
        );
        Ok(graph)
    }

    fn describe(&self) -> String {
        format!("dataset {}", self.dir.display())
    }
}

fn invalid_record(file: &str, line: u64, reason: String) -> NetworkError {
    NetworkError::InvalidRecord {
        file: file.to_string(),
        line,
        reason,
    }
}
