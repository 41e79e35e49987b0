pub mod balance;
pub mod pressure;
pub mod sensitivity;

pub use balance::{BalanceReport, LoadBalancer};
pub use pressure::{LinkPressure, PressureStats, Trend, link_pressures, pressure_stats};
pub use sensitivity::SensitivityAnalyzer;
