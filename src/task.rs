use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::webhook::PushEvent;

/// One queued push-diff request.
///
/// The id only correlates log lines; nothing about a task outlives the queue.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: String,
    pub event: PushEvent,
    pub received_at: DateTime<Utc>,
}

impl Task {
    pub fn new(event: PushEvent) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            event,
            received_at: Utc::now(),
        }
    }

    /// Seconds spent waiting in the queue so far
    pub fn queued_for_secs(&self) -> i64 {
        (Utc::now() - self.received_at).num_seconds()
    }
}
