use crate::app::ports::DelayPort;
use async_trait::async_trait;
use std::time::Duration;

/// Retry delay backed by the tokio timer.
pub struct TokioDelay;

#[async_trait]
impl DelayPort for TokioDelay {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
