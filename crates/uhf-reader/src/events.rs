//! Notifications emitted to the application layer.
//!
//! Delivery is fire-and-forget over a broadcast channel: any number of
//! subscribers, and emitting with none attached is not an error. A
//! subscriber that falls behind receives `RecvError::Lagged` and skips
//! ahead. It never blocks the hardware path.
//!
//! Events serialize as `{"event": "<name>", "data": {...}}` with the
//! camelCase event names and payload fields the application expects.

use crate::trigger::{AUTO_RESET_REASON_TIMEOUT, TriggerTransition};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;
use uhf_core::{KeyCode, TagRecord};

/// Tag payload with capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagPayload {
    pub epc: String,
    pub rssi: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl From<&TagRecord> for TagPayload {
    fn from(record: &TagRecord) -> Self {
        Self {
            epc: record.epc.to_string(),
            rssi: record.rssi.to_string(),
            timestamp: Some(record.timestamp_millis()),
        }
    }
}

/// Tag payload of the inventory-callback stream (no timestamp).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryTagPayload {
    pub epc: String,
    pub rssi: String,
}

impl From<&TagRecord> for InventoryTagPayload {
    fn from(record: &TagRecord) -> Self {
        Self {
            epc: record.epc.to_string(),
            rssi: record.rssi.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerPayload {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoResetPayload {
    pub message: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStateResetPayload {
    pub message: String,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEventPayload {
    pub state: String,
    pub key_code: u16,
    pub key_name: String,
}

impl KeyEventPayload {
    fn new(state: &str, key: KeyCode) -> Self {
        Self {
            state: state.to_string(),
            key_code: key.as_u16(),
            key_name: key.name(),
        }
    }
}

/// Every notification the reader emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ReaderEvent {
    TagFound(TagPayload),
    FilteredTagFound(TagPayload),
    TagFoundInventory(InventoryTagPayload),
    InitSuccess(MessagePayload),
    InitError(MessagePayload),
    TriggerPressed(TriggerPayload),
    TriggerReleased(TriggerPayload),
    TriggerAutoReset(AutoResetPayload),
    KeyStateReset(KeyStateResetPayload),
    KeyEvent(KeyEventPayload),
}

impl ReaderEvent {
    /// Event name as seen by listeners.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TagFound(_) => "tagFound",
            Self::FilteredTagFound(_) => "filteredTagFound",
            Self::TagFoundInventory(_) => "tagFoundInventory",
            Self::InitSuccess(_) => "initSuccess",
            Self::InitError(_) => "initError",
            Self::TriggerPressed(_) => "triggerPressed",
            Self::TriggerReleased(_) => "triggerReleased",
            Self::TriggerAutoReset(_) => "triggerAutoReset",
            Self::KeyStateReset(_) => "keyStateReset",
            Self::KeyEvent(_) => "keyEvent",
        }
    }

    pub fn init_success(message: impl Into<String>) -> Self {
        Self::InitSuccess(MessagePayload {
            message: message.into(),
        })
    }

    pub fn init_error(message: impl Into<String>) -> Self {
        Self::InitError(MessagePayload {
            message: message.into(),
        })
    }

    /// Expand a trigger transition into its semantic notification followed
    /// by the generic `keyEvent` stream entries.
    pub fn from_transition(transition: &TriggerTransition) -> Vec<ReaderEvent> {
        let state = transition.state_name();
        match transition {
            TriggerTransition::Pressed { key, at } => vec![
                Self::TriggerPressed(TriggerPayload {
                    message: format!("Trigger {} pressed", key.name()),
                    key_code: Some(key.as_u16()),
                    timestamp: Some(at.timestamp_millis()),
                }),
                Self::KeyEvent(KeyEventPayload::new(state, *key)),
            ],
            TriggerTransition::Released { key, at, .. } => vec![
                Self::TriggerReleased(TriggerPayload {
                    message: format!("Trigger {} released", key.name()),
                    key_code: Some(key.as_u16()),
                    timestamp: Some(at.timestamp_millis()),
                }),
                Self::KeyEvent(KeyEventPayload::new(state, *key)),
            ],
            TriggerTransition::AutoReset { key, held } => vec![
                Self::TriggerAutoReset(AutoResetPayload {
                    message: format!(
                        "Trigger {} auto-reset after {}ms without release",
                        key.name(),
                        held.as_millis()
                    ),
                    reason: AUTO_RESET_REASON_TIMEOUT.to_string(),
                }),
                Self::KeyEvent(KeyEventPayload::new(state, *key)),
            ],
            TriggerTransition::Reset { released } => {
                let mut events = Vec::with_capacity(released.len() + 1);
                events.push(Self::KeyStateReset(KeyStateResetPayload {
                    message: format!("Key state reset ({} key(s) released)", released.len()),
                    success: true,
                }));
                events.extend(
                    released
                        .iter()
                        .map(|key| Self::KeyEvent(KeyEventPayload::new(state, *key))),
                );
                events
            }
        }
    }
}

/// One-to-many notification channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ReaderEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Attach a new listener. It receives events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: ReaderEvent) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            trace!(event = name, "no listeners attached, notification dropped");
        }
    }

    pub fn emit_all(&self, events: impl IntoIterator<Item = ReaderEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use std::time::Duration;
    use uhf_core::{Epc, Rssi};

    #[test]
    fn test_tag_found_serialization() {
        let record = TagRecord::from_raw("aabb", "-61", Some(1_000)).unwrap();
        let event = ReaderEvent::TagFound(TagPayload::from(&record));

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "tagFound",
                "data": {"epc": "AABB", "rssi": "-61", "timestamp": 1000}
            })
        );
    }

    #[test]
    fn test_event_names_match_serialized_tags() {
        let record = TagRecord::new(Epc::parse("AABB").unwrap(), Rssi::new(-50));
        let events = vec![
            ReaderEvent::TagFound(TagPayload::from(&record)),
            ReaderEvent::FilteredTagFound(TagPayload::from(&record)),
            ReaderEvent::TagFoundInventory(InventoryTagPayload::from(&record)),
            ReaderEvent::init_success("ok"),
            ReaderEvent::init_error("failed"),
        ];

        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["event"], event.name());
        }
    }

    #[test]
    fn test_pressed_transition_expands_to_semantic_and_key_event() {
        let transition = TriggerTransition::Pressed {
            key: KeyCode::new(293),
            at: Utc::now(),
        };
        let events = ReaderEvent::from_transition(&transition);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name(), "triggerPressed");
        assert_eq!(
            events[1],
            ReaderEvent::KeyEvent(KeyEventPayload {
                state: "pressed".to_string(),
                key_code: 293,
                key_name: "TRIGGER_293".to_string(),
            })
        );
    }

    #[test]
    fn test_auto_reset_carries_timeout_reason() {
        let transition = TriggerTransition::AutoReset {
            key: KeyCode::new(139),
            held: Duration::from_secs(5),
        };
        let events = ReaderEvent::from_transition(&transition);

        match &events[0] {
            ReaderEvent::TriggerAutoReset(payload) => assert_eq!(payload.reason, "timeout"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(events[1].name(), "keyEvent");
    }

    #[test]
    fn test_reset_emits_one_reset_and_key_event_per_released_key() {
        let transition = TriggerTransition::Reset {
            released: vec![KeyCode::new(139), KeyCode::new(293)],
        };
        let events = ReaderEvent::from_transition(&transition);

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].name(), "keyStateReset");
        assert!(events[1..].iter().all(|e| e.name() == "keyEvent"));
    }

    #[test]
    fn test_key_event_serialization_uses_camel_case() {
        let event = ReaderEvent::KeyEvent(KeyEventPayload::new("released", KeyCode::new(24)));
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "keyEvent",
                "data": {"state": "released", "keyCode": 24, "keyName": "KEY_24"}
            })
        );
    }

    #[tokio::test]
    async fn test_bus_fans_out_to_every_subscriber() {
        let bus = EventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.listener_count(), 2);

        bus.emit(ReaderEvent::init_success("ready"));

        assert_eq!(first.recv().await.unwrap().name(), "initSuccess");
        assert_eq!(second.recv().await.unwrap().name(), "initSuccess");
    }

    #[test]
    fn test_bus_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(8);
        bus.emit(ReaderEvent::init_success("nobody listening"));
        assert_eq!(bus.listener_count(), 0);
    }
}
