//! Reader core of the UHF bridge.
//!
//! This crate turns raw driver signals into the reader's observable
//! behaviour:
//!
//! - [`InventoryBuffer`]: bounded FIFO of plain inventory reads
//! - [`FilteredReadingSession`]: first-sighting detection of target tags
//! - [`TriggerKeyMachine`]: press/release tracking with stuck-key auto-reset
//! - [`ReaderSession`]: lifecycle owner composing the above with a driver
//! - [`ReaderBridge`]: structured `{success, message, ...}` results
//!
//! Notifications fan out through [`EventBus`] as [`ReaderEvent`]s.

pub mod bridge;
pub mod buffer;
pub mod config;
pub mod events;
pub mod filtered;
mod pump;
pub mod session;
pub mod trigger;

pub use bridge::{
    ReaderBridge, Response, SetPowerOptions, SimulateKeyOptions, StartFilteredOptions,
};
pub use buffer::{BufferStats, InventoryBuffer, PushOutcome};
pub use config::{OverflowPolicy, ReaderConfig};
pub use events::{EventBus, ReaderEvent};
pub use filtered::{FilterStatus, FilterSummary, FilteredReadingSession, TargetSet};
pub use session::{Lifecycle, ReaderSession, ReadingMode};
pub use trigger::{KeyState, TriggerKeyMachine, TriggerTransition};
