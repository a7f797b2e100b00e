//! Types that cross the driver boundary.
//!
//! Raw signals are kept exactly as the vendor callback delivers them
//! (strings for EPC and RSSI, an optional epoch timestamp). Parsing and
//! normalization happen in the reader core.

use serde::{Deserialize, Serialize};

/// Identity of the radio module, as reported by the SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Handheld or module name, e.g. "C72 UHF".
    pub name: String,
    pub model: String,
    pub serial: Option<String>,
    pub firmware: Option<String>,
}

impl DeviceInfo {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            serial: None,
            firmware: None,
        }
    }

    pub fn serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    pub fn firmware(mut self, firmware: impl Into<String>) -> Self {
        self.firmware = Some(firmware.into());
        self
    }
}

/// One tag read as emitted by the radio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTagRead {
    /// Hex EPC, possibly mixed case or padded.
    pub epc: String,

    /// Signal strength as formatted by the driver.
    pub rssi: String,

    /// Capture time in milliseconds since the Unix epoch, if the driver knows it.
    pub timestamp_ms: Option<i64>,
}

impl RawTagRead {
    pub fn new(epc: impl Into<String>, rssi: impl Into<String>) -> Self {
        Self {
            epc: epc.into(),
            rssi: rssi.into(),
            timestamp_ms: None,
        }
    }

    pub fn with_timestamp_ms(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }
}

/// One hardware key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawKeyEvent {
    pub key_code: u16,
    pub pressed: bool,
}

impl RawKeyEvent {
    pub fn press(key_code: u16) -> Self {
        Self {
            key_code,
            pressed: true,
        }
    }

    pub fn release(key_code: u16) -> Self {
        Self {
            key_code,
            pressed: false,
        }
    }
}

/// Anything the driver signals asynchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DriverEvent {
    /// A tag was read during inventory.
    TagRead(RawTagRead),

    /// A hardware key changed state.
    Key(RawKeyEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_info_builder() {
        let info = DeviceInfo::new("C72", "UHF UART")
            .serial("SN-0001")
            .firmware("v3.1");

        assert_eq!(info.name, "C72");
        assert_eq!(info.model, "UHF UART");
        assert_eq!(info.serial.as_deref(), Some("SN-0001"));
        assert_eq!(info.firmware.as_deref(), Some("v3.1"));
    }

    #[test]
    fn test_raw_tag_read_builder() {
        let read = RawTagRead::new("aabb", "-61.0").with_timestamp_ms(42);
        assert_eq!(read.epc, "aabb");
        assert_eq!(read.timestamp_ms, Some(42));
    }

    #[test]
    fn test_raw_key_event_constructors() {
        assert!(RawKeyEvent::press(293).pressed);
        assert!(!RawKeyEvent::release(293).pressed);
    }

    #[test]
    fn test_raw_tag_read_serialization() {
        let read = RawTagRead::new("AABB", "-60");
        let json = serde_json::to_string(&read).unwrap();
        let back: RawTagRead = serde_json::from_str(&json).unwrap();
        assert_eq!(read, back);
    }
}
