pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod types;

// Layered boundaries: traits in `app`, concrete adapters in `infra`
pub mod app;
pub mod infra;

pub mod observability;
