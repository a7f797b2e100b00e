//! Filtered reading: report each target tag once per session.
//!
//! A session is armed with a set of target EPCs. Every raw read is matched
//! against it; a target seen for the first time is recorded as found and
//! handed back to the caller for notification. Non-targets and repeat
//! sightings are dropped without any notification, which keeps a dense read
//! burst from flooding the application.
//!
//! ```
//! use uhf_core::{Epc, Rssi, TagRecord};
//! use uhf_reader::FilteredReadingSession;
//!
//! let session = FilteredReadingSession::new();
//! session.start(["AABB", "CCDD"]).unwrap();
//!
//! let read = TagRecord::new(Epc::parse("aabb").unwrap(), Rssi::new(-58));
//! assert!(session.on_raw_tag(&read).is_some());
//! assert!(session.on_raw_tag(&read).is_none());
//!
//! let status = session.status();
//! assert_eq!((status.found_count, status.target_count), (1, 2));
//! ```

use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::{debug, info, trace};
use uhf_core::{Epc, Error, Result, TagRecord};

/// Validated, normalized set of target EPCs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSet(HashSet<Epc>);

impl TargetSet {
    /// Normalize and validate a caller-supplied target list.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` if the list is empty, or any entry is
    /// empty, non-hex, or a duplicate of another entry after normalization.
    pub fn parse<I, S>(targets: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = HashSet::new();
        for raw in targets {
            let raw = raw.as_ref();
            let epc = Epc::parse(raw).map_err(|e| {
                Error::invalid_argument(format!("Invalid target tag {raw:?}: {e}"))
            })?;
            if !set.insert(epc.clone()) {
                return Err(Error::invalid_argument(format!(
                    "Duplicate target tag: {epc}"
                )));
            }
        }

        if set.is_empty() {
            return Err(Error::invalid_argument("Target tag list must not be empty"));
        }
        Ok(TargetSet(set))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, epc: &Epc) -> bool {
        self.0.contains(epc)
    }
}

/// Non-mutating view of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterStatus {
    pub is_running: bool,
    pub found_count: usize,
    pub target_count: usize,
}

/// Final counters returned when a session stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSummary {
    pub found_count: usize,
    pub target_count: usize,
}

#[derive(Debug)]
struct ActiveFilter {
    targets: TargetSet,
    /// Always a subset of `targets`.
    found: HashSet<Epc>,
}

/// Thread-safe filtered reading session.
///
/// `None` inside the lock means no session is running; state is discarded
/// on stop.
#[derive(Debug, Default)]
pub struct FilteredReadingSession {
    active: Mutex<Option<ActiveFilter>>,
}

impl FilteredReadingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `targets` and arm a new session, replacing any running one.
    ///
    /// Returns the accepted target count.
    ///
    /// # Errors
    /// See [`TargetSet::parse`]. On error the previous session is untouched.
    pub fn start<I, S>(&self, targets: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let targets = TargetSet::parse(targets)?;
        Ok(self.arm(targets))
    }

    /// Arm a new session from an already validated target set.
    pub fn arm(&self, targets: TargetSet) -> usize {
        let target_count = targets.len();
        let replaced = self
            .active
            .lock()
            .replace(ActiveFilter {
                targets,
                found: HashSet::new(),
            })
            .is_some();

        info!(target_count, replaced, "filtered reading armed");
        target_count
    }

    /// Match one raw read against the armed targets.
    ///
    /// Returns the record when it is a target not yet found in this
    /// session; the caller notifies with it. Everything else, including any
    /// read while no session runs, returns `None` and changes nothing.
    pub fn on_raw_tag(&self, record: &TagRecord) -> Option<TagRecord> {
        let mut active = self.active.lock();
        let filter = active.as_mut()?;

        if !filter.targets.contains(&record.epc) {
            trace!(epc = %record.epc, "non-target read dropped");
            return None;
        }
        if !filter.found.insert(record.epc.clone()) {
            trace!(epc = %record.epc, "target already found, read dropped");
            return None;
        }

        debug!(
            epc = %record.epc,
            found = filter.found.len(),
            targets = filter.targets.len(),
            "target tag found"
        );
        Some(record.clone())
    }

    /// Stop the session and return its final counters.
    ///
    /// # Errors
    /// Returns `Error::InvalidState` if no session is running.
    pub fn stop(&self) -> Result<FilterSummary> {
        let filter = self
            .active
            .lock()
            .take()
            .ok_or_else(|| Error::invalid_state("Filtered reading is not running"))?;

        let summary = FilterSummary {
            found_count: filter.found.len(),
            target_count: filter.targets.len(),
        };
        info!(
            found = summary.found_count,
            targets = summary.target_count,
            "filtered reading stopped"
        );
        Ok(summary)
    }

    /// Drop the active session, if any, without producing a summary.
    pub fn discard(&self) {
        if let Some(filter) = self.active.lock().take() {
            debug!(
                found = filter.found.len(),
                targets = filter.targets.len(),
                "filtered reading discarded"
            );
        }
    }

    /// Forget found tags so they can be reported again. Targets stay armed.
    ///
    /// Returns how many found tags were forgotten (zero when not running).
    pub fn clear_found_tags(&self) -> usize {
        match self.active.lock().as_mut() {
            Some(filter) => {
                let cleared = filter.found.len();
                filter.found.clear();
                debug!(cleared, "found tags cleared");
                cleared
            }
            None => 0,
        }
    }

    pub fn status(&self) -> FilterStatus {
        match self.active.lock().as_ref() {
            Some(filter) => FilterStatus {
                is_running: true,
                found_count: filter.found.len(),
                target_count: filter.targets.len(),
            },
            None => FilterStatus::default(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Whether `epc` has already been reported in the running session.
    pub fn is_found(&self, epc: &Epc) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|filter| filter.found.contains(epc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use uhf_core::Rssi;

    fn read(epc: &str) -> TagRecord {
        TagRecord::new(Epc::parse(epc).unwrap(), Rssi::new(-55))
    }

    #[test]
    fn test_case_variant_reported_once() {
        let session = FilteredReadingSession::new();
        assert_eq!(session.start(["AABB", "CCDD"]).unwrap(), 2);

        let found: Vec<_> = ["AABB", "aabb", "EEFF"]
            .iter()
            .filter_map(|epc| session.on_raw_tag(&read(epc)))
            .collect();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].epc.as_str(), "AABB");
        assert_eq!(
            session.status(),
            FilterStatus {
                is_running: true,
                found_count: 1,
                target_count: 2,
            }
        );
    }

    #[test]
    fn test_found_record_is_the_original_observation() {
        let session = FilteredReadingSession::new();
        session.start(["AABB"]).unwrap();

        let observed = TagRecord::new(Epc::parse(" aabb ").unwrap(), Rssi::new(-42));
        let found = session.on_raw_tag(&observed).unwrap();
        assert_eq!(found, observed);
    }

    #[test]
    fn test_target_normalization_trims_whitespace() {
        let session = FilteredReadingSession::new();
        session.start([" aabb\n"]).unwrap();
        assert!(session.on_raw_tag(&read("AABB")).is_some());
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec!["AABB", ""])]
    #[case(vec!["AABB", "aabb"])]
    #[case(vec!["AABB", " AABB "])]
    #[case(vec!["not-hex"])]
    fn test_start_rejects_invalid_targets(#[case] targets: Vec<&str>) {
        let session = FilteredReadingSession::new();
        assert!(matches!(
            session.start(targets),
            Err(Error::InvalidArgument(_))
        ));
        assert!(!session.is_running());
    }

    #[test]
    fn test_invalid_start_keeps_previous_session() {
        let session = FilteredReadingSession::new();
        session.start(["AABB"]).unwrap();
        session.on_raw_tag(&read("AABB"));

        assert!(session.start(Vec::<&str>::new()).is_err());
        assert_eq!(session.status().found_count, 1);
    }

    #[test]
    fn test_start_replaces_running_session() {
        let session = FilteredReadingSession::new();
        session.start(["AABB", "CCDD"]).unwrap();
        session.on_raw_tag(&read("AABB"));

        session.start(["EEFF"]).unwrap();
        let status = session.status();
        assert_eq!(status.found_count, 0);
        assert_eq!(status.target_count, 1);
        assert!(session.on_raw_tag(&read("AABB")).is_none());
        assert!(session.on_raw_tag(&read("EEFF")).is_some());
    }

    #[test]
    fn test_stop_returns_summary_and_discards_state() {
        let session = FilteredReadingSession::new();
        session.start(["AABB", "CCDD"]).unwrap();
        session.on_raw_tag(&read("CCDD"));

        let summary = session.stop().unwrap();
        assert_eq!(summary.found_count, 1);
        assert_eq!(summary.target_count, 2);

        assert_eq!(session.status(), FilterStatus::default());
        assert!(session.on_raw_tag(&read("AABB")).is_none());
    }

    #[test]
    fn test_stop_when_not_running() {
        let session = FilteredReadingSession::new();
        assert!(matches!(session.stop(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_discard_is_idempotent() {
        let session = FilteredReadingSession::new();
        session.discard();

        session.start(["AABB"]).unwrap();
        session.on_raw_tag(&read("AABB"));
        session.discard();
        assert!(!session.is_running());
        assert_eq!(session.status(), FilterStatus::default());

        session.discard();
        assert!(matches!(session.stop(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_clear_found_tags_allows_redetection() {
        let session = FilteredReadingSession::new();
        session.start(["AABB", "CCDD"]).unwrap();
        session.on_raw_tag(&read("AABB"));
        session.on_raw_tag(&read("CCDD"));

        assert_eq!(session.clear_found_tags(), 2);
        let status = session.status();
        assert!(status.is_running);
        assert_eq!(status.found_count, 0);
        assert_eq!(status.target_count, 2);

        assert!(session.on_raw_tag(&read("aabb")).is_some());
        assert!(session.on_raw_tag(&read("AABB")).is_none());
    }

    #[test]
    fn test_clear_found_tags_when_not_running() {
        let session = FilteredReadingSession::new();
        assert_eq!(session.clear_found_tags(), 0);
    }

    #[test]
    fn test_is_found() {
        let session = FilteredReadingSession::new();
        session.start(["AABB"]).unwrap();
        let epc = Epc::parse("AABB").unwrap();

        assert!(!session.is_found(&epc));
        session.on_raw_tag(&read("AABB"));
        assert!(session.is_found(&epc));
    }
}
