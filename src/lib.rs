pub mod config;
pub mod model;
pub mod orchestrator;
pub mod report;
pub mod safety;
pub mod types;
