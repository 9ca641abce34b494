pub mod config;
pub mod generator;
pub mod metrics;
pub mod namespace_metrics;
pub mod orchestrator;
pub mod progress;
pub mod report;
pub mod scenario;
pub mod worker;
