pub mod monitor;
pub mod resolution;

pub use monitor::{CycleReport, LiquidationMonitor, MonitorConfig, MonitorError};
pub use resolution::{ResolutionError, ResolutionHandler, ResolutionOutcome};
