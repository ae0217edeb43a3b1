pub mod agent;
pub mod client;
pub mod stdio;
pub mod telemetry;
pub mod tooling;
