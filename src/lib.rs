pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{agent, client, stdio, telemetry, tooling};
pub use domain::types;
pub use infrastructure::model;
