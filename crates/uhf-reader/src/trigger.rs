//! Trigger key state machine.
//!
//! Tracks press/release state per hardware key code and turns raw key
//! events, which may be duplicated or arrive out of order, into clean
//! semantic transitions.
//!
//! # States
//!
//! Each key code is either [`KeyState::Idle`] or [`KeyState::Pressed`].
//!
//! # Transitions
//!
//! - Idle → Pressed on a raw press (`Pressed`)
//! - Pressed → Idle on a raw release (`Released`)
//! - Pressed → Idle when held past the auto-reset timeout (`AutoReset`)
//! - any → Idle on an explicit reset (`Reset`)
//!
//! A raw press while already pressed and a raw release while idle are
//! swallowed. A raw event for a key held past the timeout first performs
//! the auto-reset, so a stuck key is recovered even if the watchdog has not
//! run yet: a late release is then swallowed, a late press starts a new
//! episode.
//!
//! Timing uses `tokio::time::Instant` so it follows paused test time.
//!
//! ```
//! use std::time::Duration;
//! use uhf_core::KeyCode;
//! use uhf_reader::{KeyState, TriggerKeyMachine, TriggerTransition};
//!
//! let machine = TriggerKeyMachine::new(Duration::from_secs(5));
//! let key = KeyCode::new(293);
//!
//! let transitions = machine.on_raw_key(key, true);
//! assert!(matches!(transitions[..], [TriggerTransition::Pressed { .. }]));
//! assert!(machine.on_raw_key(key, true).is_empty());
//! assert_eq!(machine.state_of(key), KeyState::Pressed);
//! ```

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};
use uhf_core::KeyCode;

/// Reason attached to auto-reset notifications.
pub const AUTO_RESET_REASON_TIMEOUT: &str = "timeout";

/// Physical state of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyState {
    #[default]
    Idle,
    Pressed,
}

impl fmt::Display for KeyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyState::Idle => write!(f, "Idle"),
            KeyState::Pressed => write!(f, "Pressed"),
        }
    }
}

/// Semantic transition produced by the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerTransition {
    /// Idle → Pressed.
    Pressed { key: KeyCode, at: DateTime<Utc> },

    /// Pressed → Idle by a matching release.
    Released {
        key: KeyCode,
        at: DateTime<Utc>,
        held: Duration,
    },

    /// Pressed → Idle because no release arrived within the timeout.
    AutoReset { key: KeyCode, held: Duration },

    /// Explicit reset of every tracked key. `released` lists the keys that
    /// were pressed at the time.
    Reset { released: Vec<KeyCode> },
}

impl TriggerTransition {
    /// Raw state name used in generic key notifications.
    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Pressed { .. } => "pressed",
            Self::Released { .. } => "released",
            Self::AutoReset { .. } => "auto_reset",
            Self::Reset { .. } => "reset",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct KeyTrack {
    state: KeyState,
    pressed_at: Option<Instant>,
    pressed_wall: Option<DateTime<Utc>>,
}

impl KeyTrack {
    fn held(&self, now: Instant) -> Duration {
        self.pressed_at
            .map(|at| now.saturating_duration_since(at))
            .unwrap_or_default()
    }

    fn set_idle(&mut self) {
        self.state = KeyState::Idle;
        self.pressed_at = None;
        self.pressed_wall = None;
    }
}

/// Thread-safe per-key trigger state machine.
#[derive(Debug)]
pub struct TriggerKeyMachine {
    auto_reset_timeout: Duration,
    keys: Mutex<HashMap<KeyCode, KeyTrack>>,
}

impl TriggerKeyMachine {
    pub fn new(auto_reset_timeout: Duration) -> Self {
        Self {
            auto_reset_timeout,
            keys: Mutex::new(HashMap::new()),
        }
    }

    pub fn auto_reset_timeout(&self) -> Duration {
        self.auto_reset_timeout
    }

    /// Feed one raw key event observed now.
    pub fn on_raw_key(&self, key: KeyCode, pressed: bool) -> Vec<TriggerTransition> {
        self.on_raw_key_at(key, pressed, Instant::now())
    }

    /// Feed one raw key event observed at `now`.
    pub fn on_raw_key_at(
        &self,
        key: KeyCode,
        pressed: bool,
        now: Instant,
    ) -> Vec<TriggerTransition> {
        let mut keys = self.keys.lock();
        let track = keys.entry(key).or_default();
        let mut transitions = Vec::new();

        if track.state == KeyState::Pressed && track.held(now) >= self.auto_reset_timeout {
            transitions.push(Self::auto_reset(key, track, now));
            if !pressed {
                trace!(key = %key, "late release after auto-reset swallowed");
                return transitions;
            }
        }

        match (track.state, pressed) {
            (KeyState::Idle, true) => {
                let at = Utc::now();
                track.state = KeyState::Pressed;
                track.pressed_at = Some(now);
                track.pressed_wall = Some(at);
                debug!(key = %key, "trigger pressed");
                transitions.push(TriggerTransition::Pressed { key, at });
            }
            (KeyState::Pressed, false) => {
                let held = track.held(now);
                track.set_idle();
                debug!(key = %key, held_ms = held.as_millis() as u64, "trigger released");
                transitions.push(TriggerTransition::Released {
                    key,
                    at: Utc::now(),
                    held,
                });
            }
            (KeyState::Pressed, true) => {
                trace!(key = %key, "duplicate press swallowed");
            }
            (KeyState::Idle, false) => {
                trace!(key = %key, "release without press swallowed");
            }
        }

        transitions
    }

    /// Force every key held past the timeout back to idle.
    pub fn check_timeouts(&self) -> Vec<TriggerTransition> {
        self.check_timeouts_at(Instant::now())
    }

    /// Force every key held past the timeout at `now` back to idle.
    pub fn check_timeouts_at(&self, now: Instant) -> Vec<TriggerTransition> {
        let mut keys = self.keys.lock();
        let mut transitions: Vec<_> = keys
            .iter_mut()
            .filter(|(_, track)| {
                track.state == KeyState::Pressed && track.held(now) >= self.auto_reset_timeout
            })
            .map(|(key, track)| Self::auto_reset(*key, track, now))
            .collect();

        transitions.sort_by_key(|t| match t {
            TriggerTransition::AutoReset { key, .. } => *key,
            _ => KeyCode::new(0),
        });
        transitions
    }

    /// Force every tracked key to idle and clear all timestamps.
    pub fn reset(&self) -> TriggerTransition {
        let mut keys = self.keys.lock();
        let mut released: Vec<KeyCode> = keys
            .iter()
            .filter(|(_, track)| track.state == KeyState::Pressed)
            .map(|(key, _)| *key)
            .collect();
        released.sort();

        for track in keys.values_mut() {
            track.set_idle();
        }

        info!(released = released.len(), "key state reset");
        TriggerTransition::Reset { released }
    }

    /// Drop all tracked keys without producing transitions (teardown).
    pub fn clear(&self) {
        self.keys.lock().clear();
    }

    pub fn state_of(&self, key: KeyCode) -> KeyState {
        self.keys
            .lock()
            .get(&key)
            .map(|track| track.state)
            .unwrap_or_default()
    }

    /// Wall-clock time of the current press of `key`, if pressed.
    pub fn last_press(&self, key: KeyCode) -> Option<DateTime<Utc>> {
        self.keys.lock().get(&key).and_then(|track| track.pressed_wall)
    }

    /// Keys currently pressed, in ascending code order.
    pub fn pressed_keys(&self) -> Vec<KeyCode> {
        let mut pressed: Vec<_> = self
            .keys
            .lock()
            .iter()
            .filter(|(_, track)| track.state == KeyState::Pressed)
            .map(|(key, _)| *key)
            .collect();
        pressed.sort();
        pressed
    }

    fn auto_reset(key: KeyCode, track: &mut KeyTrack, now: Instant) -> TriggerTransition {
        let held = track.held(now);
        track.set_idle();
        warn!(
            key = %key,
            held_ms = held.as_millis() as u64,
            "trigger stuck pressed, auto-reset"
        );
        TriggerTransition::AutoReset { key, held }
    }
}
