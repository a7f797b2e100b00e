//! Application-facing operations with structured results.
//!
//! Each operation maps one [`ReaderSession`] call onto the result shape the
//! application layer consumes. Failures never escape as `Err`: they become
//! `{"success": false, "message": "..."}` and the caller decides whether to
//! retry.
//!
//! ```
//! use uhf_hardware::mock::MockUhfDriver;
//! use uhf_reader::{ReaderBridge, ReaderConfig, ReaderSession, SetPowerOptions};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (driver, _handle) = MockUhfDriver::new();
//! let bridge = ReaderBridge::new(ReaderSession::new(driver, ReaderConfig::default()).unwrap());
//!
//! assert!(bridge.init_reader().await.success);
//! let reply = bridge.set_power(SetPowerOptions { power: 35 }).await;
//! assert!(!reply.success);
//! # }
//! ```

use crate::events::ReaderEvent;
use crate::session::ReaderSession;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, warn};
use uhf_core::{Error, PowerLevel};

/// Result envelope shared by every operation.
///
/// `data` is flattened, so its fields sit next to `success` and `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: Option<T>,
}

impl<T> Response<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    fn ok_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    fn failure(operation: &str, error: &Error) -> Self {
        match error {
            Error::HardwareUnavailable(_) => {
                error!(operation, error = %error, "reader hardware failed");
            }
            _ => warn!(operation, kind = error.kind(), error = %error, "reader operation failed"),
        }
        Self {
            success: false,
            message: Some(error.to_string()),
            data: None,
        }
    }

    fn from_result(operation: &str, result: uhf_core::Result<Self>) -> Self {
        result.unwrap_or_else(|e| Self::failure(operation, &e))
    }
}

/// Operations that carry no data beyond `success` and `message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceIdData {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PowerData {
    pub power: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryTagData {
    pub epc: String,
    pub rssi: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStatusData {
    pub is_running: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClearedData {
    pub cleared: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCountData {
    pub target_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCountsData {
    pub found_count: usize,
    pub target_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredStatusData {
    pub is_running: bool,
    pub found_count: usize,
    pub target_count: usize,
}

/// `setPower` input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SetPowerOptions {
    pub power: i64,
}

/// `startFilteredReading` input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartFilteredOptions {
    pub target_tags: Vec<String>,
}

/// `simulateKeyPress` input. A missing key code means the default trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateKeyOptions {
    #[serde(default)]
    pub key_code: Option<u16>,
}

/// Structured-result front of a [`ReaderSession`].
#[derive(Debug)]
pub struct ReaderBridge {
    session: ReaderSession,
}

impl ReaderBridge {
    pub fn new(session: ReaderSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &ReaderSession {
        &self.session
    }

    /// Register a notification listener.
    pub fn add_listener(&self) -> broadcast::Receiver<ReaderEvent> {
        self.session.subscribe()
    }

    pub async fn init_reader(&self) -> Response<Empty> {
        Response::from_result(
            "initReader",
            self.session
                .init()
                .await
                .map(|()| Response::ok_with_message("RFID reader initialized", Empty {})),
        )
    }

    /// Older name of [`init_reader`](Self::init_reader).
    pub async fn initialize(&self) -> Response<Empty> {
        self.init_reader().await
    }

    pub async fn start_reading(&self) -> Response<Empty> {
        Response::from_result(
            "startReading",
            self.session
                .start_reading()
                .await
                .map(|()| Response::ok_with_message("Reading started", Empty {})),
        )
    }

    pub async fn stop_reading(&self) -> Response<Empty> {
        Response::from_result(
            "stopReading",
            self.session
                .stop_reading()
                .await
                .map(|()| Response::ok_with_message("Reading stopped", Empty {})),
        )
    }

    pub async fn get_device_id(&self) -> Response<DeviceIdData> {
        Response::from_result(
            "getDeviceId",
            self.session
                .device_id()
                .await
                .map(|id| Response::ok(DeviceIdData { id })),
        )
    }

    pub async fn set_power(&self, options: SetPowerOptions) -> Response<PowerData> {
        let result = match PowerLevel::from_i64(options.power) {
            Ok(level) => self
                .session
                .set_power(level.as_u8())
                .await
                .map(|power| Response::ok(PowerData { power })),
            Err(e) => Err(e),
        };
        Response::from_result("setPower", result)
    }

    pub async fn get_power(&self) -> Response<PowerData> {
        Response::from_result(
            "getPower",
            self.session
                .get_power()
                .await
                .map(|power| Response::ok(PowerData { power })),
        )
    }

    pub async fn free(&self) -> Response<Empty> {
        Response::from_result(
            "free",
            self.session.free().await.map(|()| Response::ok(Empty {})),
        )
    }

    /// Pop the oldest buffered read. An empty buffer is a success without a tag.
    pub fn get_inventory_tag(&self) -> Response<InventoryTagData> {
        let result = self.session.get_inventory_tag().map(|tag| match tag {
            Some(record) => Response::ok(InventoryTagData {
                epc: record.epc.to_string(),
                rssi: record.rssi.to_string(),
            }),
            None => Response {
                success: true,
                message: Some("No tags in buffer".to_string()),
                data: None,
            },
        });
        Response::from_result("getInventoryTag", result)
    }

    pub fn get_inventory_status(&self) -> Response<InventoryStatusData> {
        Response::from_result(
            "getInventoryStatus",
            self.session
                .inventory_status()
                .map(|is_running| Response::ok(InventoryStatusData { is_running })),
        )
    }

    pub fn clear_buffer(&self) -> Response<ClearedData> {
        Response::from_result(
            "clearBuffer",
            self.session.clear_buffer().map(|cleared| {
                Response::ok_with_message(
                    format!("Cleared {cleared} tag(s) from buffer"),
                    ClearedData { cleared },
                )
            }),
        )
    }

    pub fn reset_key_state(&self) -> Response<Empty> {
        Response::from_result(
            "resetKeyState",
            self.session
                .reset_key_state()
                .map(|_| Response::ok_with_message("Key state reset", Empty {})),
        )
    }

    pub async fn start_filtered_reading(
        &self,
        options: StartFilteredOptions,
    ) -> Response<TargetCountData> {
        Response::from_result(
            "startFilteredReading",
            self.session
                .start_filtered_reading(&options.target_tags)
                .await
                .map(|target_count| {
                    Response::ok_with_message(
                        format!("Filtered reading started for {target_count} tag(s)"),
                        TargetCountData { target_count },
                    )
                }),
        )
    }

    pub async fn stop_filtered_reading(&self) -> Response<FilterCountsData> {
        Response::from_result(
            "stopFilteredReading",
            self.session.stop_filtered_reading().await.map(|summary| {
                Response::ok_with_message(
                    format!(
                        "Filtered reading stopped, found {} of {} tag(s)",
                        summary.found_count, summary.target_count
                    ),
                    FilterCountsData {
                        found_count: summary.found_count,
                        target_count: summary.target_count,
                    },
                )
            }),
        )
    }

    pub fn get_filtered_reading_status(&self) -> Response<FilteredStatusData> {
        Response::from_result(
            "getFilteredReadingStatus",
            self.session.filtered_reading_status().map(|status| {
                Response::ok(FilteredStatusData {
                    is_running: status.is_running,
                    found_count: status.found_count,
                    target_count: status.target_count,
                })
            }),
        )
    }

    pub fn clear_found_tags(&self) -> Response<ClearedData> {
        Response::from_result(
            "clearFoundTags",
            self.session.clear_found_tags().map(|cleared| {
                Response::ok_with_message(
                    format!("Cleared {cleared} found tag(s)"),
                    ClearedData { cleared },
                )
            }),
        )
    }

    pub fn simulate_key_press(&self, options: SimulateKeyOptions) -> Response<Empty> {
        Response::from_result(
            "simulateKeyPress",
            self.session.simulate_key_press(options.key_code).map(|key| {
                Response::ok_with_message(format!("Simulated {}", key.name()), Empty {})
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReaderConfig;
    use serde_json::json;
    use uhf_hardware::RawTagRead;
    use uhf_hardware::mock::{MockOperation, MockUhfDriver, MockUhfHandle};

    async fn ready_bridge() -> (ReaderBridge, MockUhfHandle) {
        let (driver, handle) = MockUhfDriver::new();
        let bridge =
            ReaderBridge::new(ReaderSession::new(driver, ReaderConfig::default()).unwrap());
        assert!(bridge.init_reader().await.success);
        (bridge, handle)
    }

    #[tokio::test]
    async fn test_init_reader_shape() {
        let (driver, _handle) = MockUhfDriver::new();
        let bridge =
            ReaderBridge::new(ReaderSession::new(driver, ReaderConfig::default()).unwrap());

        assert_eq!(
            serde_json::to_value(bridge.init_reader().await).unwrap(),
            json!({"success": true, "message": "RFID reader initialized"})
        );
    }

    #[tokio::test]
    async fn test_set_power_out_of_range_is_structured_failure() {
        let (bridge, handle) = ready_bridge().await;
        let before = handle.power();

        let reply = serde_json::to_value(bridge.set_power(SetPowerOptions { power: 35 }).await)
            .unwrap();
        assert_eq!(reply["success"], false);
        assert!(
            reply["message"]
                .as_str()
                .unwrap()
                .starts_with("Invalid argument")
        );
        assert!(reply.get("power").is_none());
        assert_eq!(handle.power(), before);
    }

    #[tokio::test]
    async fn test_set_and_get_power() {
        let (bridge, _handle) = ready_bridge().await;

        assert_eq!(
            serde_json::to_value(bridge.set_power(SetPowerOptions { power: 30 }).await).unwrap(),
            json!({"success": true, "power": 30})
        );
        assert_eq!(bridge.get_power().await.data, Some(PowerData { power: 30 }));
    }

    #[tokio::test]
    async fn test_get_inventory_tag_empty_is_success() {
        let (bridge, _handle) = ready_bridge().await;

        assert_eq!(
            serde_json::to_value(bridge.get_inventory_tag()).unwrap(),
            json!({"success": true, "message": "No tags in buffer"})
        );
    }

    #[tokio::test]
    async fn test_get_inventory_tag_returns_buffered_read() {
        let (bridge, _handle) = ready_bridge().await;
        bridge.start_reading().await;
        bridge.session().ingest_tag(&RawTagRead::new("e200aabb", "-61"));

        assert_eq!(
            serde_json::to_value(bridge.get_inventory_tag()).unwrap(),
            json!({"success": true, "epc": "E200AABB", "rssi": "-61"})
        );
    }

    #[tokio::test]
    async fn test_filtered_flow_shapes() {
        let (bridge, _handle) = ready_bridge().await;
        let options = StartFilteredOptions {
            target_tags: vec!["AABB".into(), "CCDD".into()],
        };

        let started = serde_json::to_value(bridge.start_filtered_reading(options).await).unwrap();
        assert_eq!(started["success"], true);
        assert_eq!(started["targetCount"], 2);

        for epc in ["AABB", "aabb", "EEFF"] {
            bridge.session().ingest_tag(&RawTagRead::new(epc, "-50"));
        }

        assert_eq!(
            serde_json::to_value(bridge.get_filtered_reading_status()).unwrap(),
            json!({"success": true, "isRunning": true, "foundCount": 1, "targetCount": 2})
        );

        let stopped = serde_json::to_value(bridge.stop_filtered_reading().await).unwrap();
        assert_eq!(stopped["foundCount"], 1);
        assert_eq!(stopped["targetCount"], 2);

        let again = bridge.stop_filtered_reading().await;
        assert!(!again.success);
        assert!(again.data.is_none());
    }

    #[tokio::test]
    async fn test_start_filtered_options_deserialize() {
        let options: StartFilteredOptions =
            serde_json::from_value(json!({"targetTags": ["AABB"]})).unwrap();
        assert_eq!(options.target_tags, vec!["AABB".to_string()]);

        let options: SimulateKeyOptions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(options.key_code, None);
    }

    #[tokio::test]
    async fn test_hardware_failure_is_structured() {
        let (bridge, handle) = ready_bridge().await;
        handle.fail(MockOperation::DeviceId);

        let reply = bridge.get_device_id().await;
        assert!(!reply.success);
        assert!(
            reply
                .message
                .unwrap()
                .starts_with("Hardware unavailable")
        );
    }

    #[tokio::test]
    async fn test_free_then_everything_fails() {
        let (bridge, _handle) = ready_bridge().await;

        assert_eq!(
            serde_json::to_value(bridge.free().await).unwrap(),
            json!({"success": true})
        );
        assert!(!bridge.get_inventory_status().success);
        assert!(!bridge.clear_buffer().success);
        assert!(!bridge.reset_key_state().success);
        assert!(!bridge.free().await.success);
    }

    #[tokio::test]
    async fn test_clear_found_tags_when_not_running() {
        let (bridge, _handle) = ready_bridge().await;
        let reply = bridge.clear_found_tags();
        assert!(reply.success);
        assert_eq!(reply.data, Some(ClearedData { cleared: 0 }));
    }
}
