// Application-layer boundaries: traits the pipeline depends on, implemented in `infra`.
pub mod ports;
