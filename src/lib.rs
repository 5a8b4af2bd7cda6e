// hostwatch library crate
// Exposes modules for integration testing

pub mod cli;
pub mod config;
pub mod logger;
pub mod monitor;
pub mod notify;
pub mod policy;
pub mod sampler;
pub mod usage;
