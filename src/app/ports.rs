use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::types::Coordinate;

/// A single failed lookup that is worth retrying.
#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("geocoding service responded with status {0}")]
    Status(u16),

    #[error("malformed geocoding response: {0}")]
    Malformed(String),
}

/// Resolves one address. `Ok(None)` is a confirmed "no match"; `Err` is a
/// transient fault.
#[async_trait]
pub trait GeocoderPort: Send + Sync {
    async fn lookup(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError>;
}

/// Suspends the caller between retry attempts.
#[async_trait]
pub trait DelayPort: Send + Sync {
    async fn pause(&self, duration: Duration);
}

#[async_trait]
pub trait RateLimiterPort: Send + Sync {
    async fn acquire(&self);
}
