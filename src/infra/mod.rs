// Concrete adapters for the ports in `app::ports`.
pub mod nominatim;
pub mod rate_limiter;
pub mod rate_limiter_adapter;
pub mod tokio_delay;
