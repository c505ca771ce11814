//! Domain events surfaced as debug log lines.

use std::sync::Arc;
use studybot_core::event::EventBus;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Build an event bus whose events are logged at `debug` level.
pub fn logged_bus() -> Arc<EventBus> {
    let bus = Arc::new(EventBus::default());
    spawn_event_log(&bus);
    bus
}

/// Log every event published on `bus` until it is dropped. The task
/// yields the number of events it logged.
pub fn spawn_event_log(bus: &EventBus) -> JoinHandle<usize> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        let mut logged = 0usize;
        loop {
            match rx.recv().await {
                Ok(event) => {
                    logged += 1;
                    let data = serde_json::to_string(event.as_ref()).unwrap_or_default();
                    debug!(event = %data, "Domain event");
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event log fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
        logged
    })
}
