pub mod config;
pub mod constants;
pub mod error;
pub mod fixtures;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod paths;
pub mod pipeline;
pub mod storage;
pub mod types;
