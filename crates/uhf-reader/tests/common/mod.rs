//! Shared helpers for reader integration tests.

#![allow(dead_code)]

use std::time::Duration;
use tokio::sync::broadcast;
use uhf_hardware::mock::{MockUhfDriver, MockUhfHandle};
use uhf_reader::{ReaderConfig, ReaderEvent, ReaderSession};

/// Upper bound for waiting on a notification the pump should deliver.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

/// Build and initialize a session around a fresh mock driver.
pub async fn ready_session(config: ReaderConfig) -> (ReaderSession, MockUhfHandle) {
    let (driver, handle) = MockUhfDriver::new();
    let session = ReaderSession::new(driver, config).expect("valid config");
    session.init().await.expect("mock init succeeds");
    (session, handle)
}

/// Receive until an event named `name` arrives, returning it and every
/// event skipped on the way.
pub async fn wait_for_event(
    events: &mut broadcast::Receiver<ReaderEvent>,
    name: &str,
) -> (ReaderEvent, Vec<ReaderEvent>) {
    let mut skipped = Vec::new();
    let found = tokio::time::timeout(EVENT_TIMEOUT, async {
        loop {
            let event = events.recv().await.expect("event bus open");
            if event.name() == name {
                return event;
            }
            skipped.push(event);
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {name}"));
    (found, skipped)
}

/// Everything currently queued for this subscriber.
pub fn drain_events(events: &mut broadcast::Receiver<ReaderEvent>) -> Vec<ReaderEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

pub fn names(events: &[ReaderEvent]) -> Vec<&'static str> {
    events.iter().map(ReaderEvent::name).collect()
}
