pub mod basic;
pub mod loader;
pub mod random;
pub mod scenario;

pub use basic::BasicNetwork;
pub use loader::CsvDataset;
pub use random::RandomNetwork;
pub use scenario::NetworkSource;
