use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::messaging::{HandlerError, TaskHandler};

pub const WORK_UNIT: Duration = Duration::from_secs(1);

pub fn dot_count(body: &[u8]) -> usize {
    body.iter().filter(|&&b| b == b'.').count()
}

/// Simulated cost of a task: one `unit` per `.` in the body.
pub fn work_duration(body: &[u8], unit: Duration) -> Duration {
    let dots = u32::try_from(dot_count(body)).unwrap_or(u32::MAX);
    unit.saturating_mul(dots)
}

/// Pretends to be busy for one work unit per dot in the task body.
#[derive(Debug, Clone)]
pub struct FakeWork {
    unit: Duration,
}

impl FakeWork {
    pub fn new(unit: Duration) -> Self {
        Self { unit }
    }
}

impl Default for FakeWork {
    fn default() -> Self {
        Self::new(WORK_UNIT)
    }
}

#[async_trait]
impl TaskHandler for FakeWork {
    async fn handle(&self, body: &[u8]) -> Result<(), HandlerError> {
        let delay = work_duration(body, self.unit);
        debug!(delay_ms = delay.as_millis() as u64, "Simulating work");
        tokio::time::sleep(delay).await;
        Ok(())
    }
}
