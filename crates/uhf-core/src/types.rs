use crate::{
    Result,
    constants::{MAX_POWER, MIN_POWER, TRIGGER_KEY_CODES},
    error::Error,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Electronic Product Code read from a tag.
///
/// Stored in canonical form: surrounding whitespace removed, hex digits
/// uppercased. Two EPCs that differ only in case or padding whitespace
/// compare equal. Leading zeros are significant and kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Epc(String);

impl Epc {
    /// Parse and normalize an EPC.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` if the identifier is empty after
    /// trimming or contains non-hexadecimal characters.
    ///
    /// ```
    /// use uhf_core::Epc;
    ///
    /// let epc = Epc::parse("  e200aabb ").unwrap();
    /// assert_eq!(epc.as_str(), "E200AABB");
    /// assert!(Epc::parse("   ").is_err());
    /// assert!(Epc::parse("XYZ").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_argument("EPC must not be empty"));
        }
        if !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::invalid_argument(format!(
                "EPC must be hexadecimal, got {trimmed:?}"
            )));
        }
        Ok(Epc(trimmed.to_ascii_uppercase()))
    }

    /// Canonical uppercase hex form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of hex digits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a parsed EPC; present for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode the identifier into raw bytes.
    ///
    /// Returns `None` when the digit count is odd.
    #[must_use]
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        if self.0.len() % 2 != 0 {
            return None;
        }
        self.0
            .as_bytes()
            .chunks(2)
            .map(|pair| {
                let s = std::str::from_utf8(pair).ok()?;
                u8::from_str_radix(s, 16).ok()
            })
            .collect()
    }
}

impl fmt::Display for Epc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Epc {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Epc::parse(s)
    }
}

impl TryFrom<String> for Epc {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Epc::parse(&value)
    }
}

impl From<Epc> for String {
    fn from(epc: Epc) -> Self {
        epc.0
    }
}

/// Received signal strength in whole dBm.
///
/// Drivers report RSSI as decimal strings such as `"-65.30"`; the value is
/// rounded to the nearest integer on ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rssi(i16);

impl Rssi {
    /// Wrap an integer RSSI value.
    #[must_use]
    pub fn new(dbm: i16) -> Self {
        Rssi(dbm)
    }

    /// Parse a driver-formatted RSSI string.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` if the text is not a finite number
    /// that fits in an `i16`.
    ///
    /// ```
    /// use uhf_core::Rssi;
    ///
    /// assert_eq!(Rssi::parse("-65").unwrap().dbm(), -65);
    /// assert_eq!(Rssi::parse(" -65.6 ").unwrap().dbm(), -66);
    /// assert!(Rssi::parse("loud").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if let Ok(value) = trimmed.parse::<i16>() {
            return Ok(Rssi(value));
        }

        let value: f64 = trimmed
            .parse()
            .map_err(|_| Error::invalid_argument(format!("Invalid RSSI: {trimmed:?}")))?;
        let rounded = value.round();
        if !rounded.is_finite() || rounded < f64::from(i16::MIN) || rounded > f64::from(i16::MAX)
        {
            return Err(Error::invalid_argument(format!(
                "RSSI out of range: {trimmed:?}"
            )));
        }
        Ok(Rssi(rounded as i16))
    }

    /// Signal strength in dBm.
    #[must_use]
    pub fn dbm(&self) -> i16 {
        self.0
    }
}

impl fmt::Display for Rssi {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Rssi {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Rssi::parse(s)
    }
}

/// A single tag observation.
///
/// Immutable once built; consumers own the record they receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    /// Tag identifier.
    pub epc: Epc,

    /// Signal strength of this read.
    pub rssi: Rssi,

    /// Capture time of the read.
    pub timestamp: DateTime<Utc>,
}

impl TagRecord {
    /// Create a record stamped with the current time.
    pub fn new(epc: Epc, rssi: Rssi) -> Self {
        TagRecordBuilder::new(epc, rssi).build()
    }

    /// Create a builder for records with an explicit capture time.
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use uhf_core::{Epc, Rssi, TagRecord};
    ///
    /// let at = Utc.with_ymd_and_hms(2025, 1, 15, 12, 30, 0).unwrap();
    /// let record = TagRecord::builder(Epc::parse("AABB").unwrap(), Rssi::new(-60))
    ///     .timestamp(at)
    ///     .build();
    /// assert_eq!(record.timestamp, at);
    /// ```
    pub fn builder(epc: Epc, rssi: Rssi) -> TagRecordBuilder {
        TagRecordBuilder::new(epc, rssi)
    }

    /// Build a record from the raw strings a driver callback delivers.
    ///
    /// `timestamp_ms` is milliseconds since the Unix epoch; when absent the
    /// record is stamped with the ingestion time.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` for a malformed EPC, RSSI or
    /// timestamp.
    pub fn from_raw(epc: &str, rssi: &str, timestamp_ms: Option<i64>) -> Result<Self> {
        let mut builder = TagRecordBuilder::new(Epc::parse(epc)?, Rssi::parse(rssi)?);
        if let Some(ms) = timestamp_ms {
            let at = DateTime::from_timestamp_millis(ms).ok_or_else(|| {
                Error::invalid_argument(format!("Timestamp out of range: {ms}"))
            })?;
            builder = builder.timestamp(at);
        }
        Ok(builder.build())
    }

    /// Capture time in milliseconds since the Unix epoch.
    #[must_use]
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Builder for [`TagRecord`].
#[derive(Debug, Clone)]
pub struct TagRecordBuilder {
    epc: Epc,
    rssi: Rssi,
    timestamp: Option<DateTime<Utc>>,
}

impl TagRecordBuilder {
    fn new(epc: Epc, rssi: Rssi) -> Self {
        Self {
            epc,
            rssi,
            timestamp: None,
        }
    }

    /// Set the capture time.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Finish the record, defaulting the capture time to now.
    pub fn build(self) -> TagRecord {
        TagRecord {
            epc: self.epc,
            rssi: self.rssi,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
        }
    }
}

/// Hardware key code as reported by the platform key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(u16);

impl KeyCode {
    pub fn new(code: u16) -> Self {
        KeyCode(code)
    }

    #[must_use]
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Whether this code is one of the documented trigger keys.
    #[must_use]
    pub fn is_known_trigger(&self) -> bool {
        TRIGGER_KEY_CODES.contains(&self.0)
    }

    /// Human-readable name, e.g. `TRIGGER_293` or `KEY_24`.
    #[must_use]
    pub fn name(&self) -> String {
        if self.is_known_trigger() {
            format!("TRIGGER_{}", self.0)
        } else {
            format!("KEY_{}", self.0)
        }
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for KeyCode {
    fn from(code: u16) -> Self {
        KeyCode(code)
    }
}

/// Radio output power, validated to the supported range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PowerLevel(u8);

impl PowerLevel {
    /// Create a power level.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` if the value is outside
    /// `MIN_POWER..=MAX_POWER`.
    pub fn new(power: u8) -> Result<Self> {
        if !(MIN_POWER..=MAX_POWER).contains(&power) {
            return Err(Error::invalid_argument(format!(
                "Power must be {MIN_POWER}-{MAX_POWER}, got {power}"
            )));
        }
        Ok(PowerLevel(power))
    }

    /// Validate a wider integer coming from an untyped boundary.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` if the value is outside
    /// `MIN_POWER..=MAX_POWER`.
    pub fn from_i64(power: i64) -> Result<Self> {
        u8::try_from(power)
            .map_err(|_| {
                Error::invalid_argument(format!(
                    "Power must be {MIN_POWER}-{MAX_POWER}, got {power}"
                ))
            })
            .and_then(PowerLevel::new)
    }

    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for PowerLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for PowerLevel {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        PowerLevel::new(value)
    }
}

impl From<PowerLevel> for u8 {
    fn from(power: PowerLevel) -> Self {
        power.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("AABB", "AABB")]
    #[case("aabb", "AABB")]
    #[case("  aAbB\t", "AABB")]
    #[case("00e2", "00E2")]
    fn test_epc_normalization(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(Epc::parse(input).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("AB CD")]
    #[case("GHIJ")]
    #[case("E2-00")]
    fn test_epc_invalid(#[case] input: &str) {
        assert!(matches!(Epc::parse(input), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_epc_case_insensitive_equality() {
        assert_eq!(Epc::parse("aabb").unwrap(), Epc::parse("AABB ").unwrap());
    }

    #[test]
    fn test_epc_to_bytes() {
        let epc = Epc::parse("E200aBcD").unwrap();
        assert_eq!(epc.to_bytes(), Some(vec![0xE2, 0x00, 0xAB, 0xCD]));
        assert_eq!(Epc::parse("ABC").unwrap().to_bytes(), None);
    }

    #[test]
    fn test_epc_serde_validates() {
        let epc: Epc = serde_json::from_str("\"aabb\"").unwrap();
        assert_eq!(epc.as_str(), "AABB");
        assert!(serde_json::from_str::<Epc>("\"zz\"").is_err());
    }

    #[rstest]
    #[case("-65", -65)]
    #[case("-65.30", -65)]
    #[case("-65.5", -66)]
    #[case(" 12 ", 12)]
    fn test_rssi_parse(#[case] input: &str, #[case] expected: i16) {
        assert_eq!(Rssi::parse(input).unwrap().dbm(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("strong")]
    #[case("NaN")]
    #[case("99999999")]
    fn test_rssi_invalid(#[case] input: &str) {
        assert!(Rssi::parse(input).is_err());
    }

    #[test]
    fn test_tag_record_from_raw_with_timestamp() {
        let record = TagRecord::from_raw("aabb", "-60.2", Some(1_700_000_000_000)).unwrap();
        assert_eq!(record.epc.as_str(), "AABB");
        assert_eq!(record.rssi.dbm(), -60);
        assert_eq!(record.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_tag_record_from_raw_defaults_to_now() {
        let before = Utc::now();
        let record = TagRecord::from_raw("AABB", "-60", None).unwrap();
        assert!(record.timestamp >= before);
        assert!(record.timestamp <= Utc::now());
    }

    #[test]
    fn test_tag_record_from_raw_rejects_bad_epc() {
        assert!(TagRecord::from_raw("", "-60", None).is_err());
        assert!(TagRecord::from_raw("AABB", "n/a", None).is_err());
    }

    #[rstest]
    #[case(139, "TRIGGER_139")]
    #[case(280, "TRIGGER_280")]
    #[case(293, "TRIGGER_293")]
    #[case(24, "KEY_24")]
    fn test_key_code_name(#[case] code: u16, #[case] expected: &str) {
        assert_eq!(KeyCode::new(code).name(), expected);
    }

    #[rstest]
    #[case(5)]
    #[case(20)]
    #[case(30)]
    fn test_power_level_valid(#[case] power: u8) {
        assert_eq!(PowerLevel::new(power).unwrap().as_u8(), power);
    }

    #[rstest]
    #[case(0)]
    #[case(4)]
    #[case(31)]
    #[case(35)]
    fn test_power_level_invalid(#[case] power: u8) {
        assert!(matches!(
            PowerLevel::new(power),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_power_level_from_i64() {
        assert!(PowerLevel::from_i64(-1).is_err());
        assert!(PowerLevel::from_i64(300).is_err());
        assert_eq!(PowerLevel::from_i64(15).unwrap().as_u8(), 15);
    }
}
