//! Background job that drains pending push notifications.

use std::sync::Arc;
use std::time::Duration;

use domain::services::PushDispatcher;

use super::scheduler::Job;
use crate::middleware::metrics::record_dispatch_summary;

/// Runs one dispatcher pass per interval.
pub struct PushDispatchJob {
    dispatcher: Arc<PushDispatcher>,
    interval: Duration,
}

impl PushDispatchJob {
    pub fn new(dispatcher: Arc<PushDispatcher>, interval: Duration) -> Self {
        Self {
            dispatcher,
            interval,
        }
    }
}

#[async_trait::async_trait]
impl Job for PushDispatchJob {
    fn name(&self) -> &'static str {
        "push_dispatch"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self) -> Result<(), String> {
        let summary = self
            .dispatcher
            .run_once()
            .await
            .map_err(|e| format!("Failed to select pending notifications: {}", e))?;

        record_dispatch_summary(&summary);
        Ok(())
    }
}
