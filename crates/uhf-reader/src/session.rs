//! Reader session facade.
//!
//! One [`ReaderSession`] owns one physical reader: the driver, the
//! inventory buffer, the filtered reading session and the trigger key state
//! machine. It sequences them through the reader lifecycle:
//!
//! ```text
//! Uninitialized ──init──► Ready ──free──► Freed
//!                           │
//!            Idle ◄──► Plain reading
//!              ▲
//!              └─────► Filtered reading
//! ```
//!
//! Every operation except `init` requires `Ready`; after `free` everything
//! fails with `InvalidState`.
//!
//! # Concurrency
//!
//! Raw driver events reach the session through [`SessionCore`], which holds
//! the read side of the lifecycle lock for the whole dispatch. Stop and free
//! take the write side, so once they return no raw event can mutate state,
//! including one that was mid-flight. Each component has its own lock;
//! driver control calls are serialized by an async mutex.
//!
//! # Examples
//!
//! ```no_run
//! use uhf_hardware::mock::MockUhfDriver;
//! use uhf_reader::{ReaderConfig, ReaderSession};
//!
//! #[tokio::main]
//! async fn main() -> uhf_core::Result<()> {
//!     let (driver, _handle) = MockUhfDriver::new();
//!     let session = ReaderSession::new(driver, ReaderConfig::default())?;
//!     let mut events = session.subscribe();
//!
//!     session.init().await?;
//!     session.set_power(25).await?;
//!     session.start_filtered_reading(["E200AABB", "E200CCDD"]).await?;
//!
//!     while let Ok(event) = events.recv().await {
//!         println!("{}", event.name());
//!     }
//!     Ok(())
//! }
//! ```

use crate::buffer::{BufferStats, InventoryBuffer};
use crate::config::ReaderConfig;
use crate::events::{EventBus, InventoryTagPayload, ReaderEvent, TagPayload};
use crate::filtered::{FilterStatus, FilterSummary, FilteredReadingSession, TargetSet};
use crate::pump::BackgroundTasks;
use crate::trigger::{KeyState, TriggerKeyMachine, TriggerTransition};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};
use uhf_core::constants::DEFAULT_SIMULATED_KEY_CODE;
use uhf_core::{Error, KeyCode, PowerLevel, Result, TagRecord};
use uhf_hardware::{AnyUhfDriver, DeviceInfo, RawKeyEvent, RawTagRead, UhfDriver};

/// Reader lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Ready,
    Freed,
}

/// Which inventory mode the radio is running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadingMode {
    #[default]
    Idle,
    /// Every read is buffered and notified.
    Plain,
    /// Only first sightings of target tags are notified.
    Filtered,
}

#[derive(Debug, Clone, Copy)]
struct ReaderState {
    lifecycle: Lifecycle,
    mode: ReadingMode,
}

impl ReaderState {
    fn require_ready(&self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Ready => Ok(()),
            Lifecycle::Uninitialized => Err(Error::invalid_state("Reader is not initialized")),
            Lifecycle::Freed => Err(Error::invalid_state("Reader has been freed")),
        }
    }
}

/// State shared between the facade and the background tasks.
#[derive(Debug)]
pub(crate) struct SessionCore {
    state: RwLock<ReaderState>,
    buffer: InventoryBuffer,
    filtered: FilteredReadingSession,
    trigger: TriggerKeyMachine,
    events: EventBus,
}

impl SessionCore {
    fn new(config: &ReaderConfig) -> Self {
        Self {
            state: RwLock::new(ReaderState {
                lifecycle: Lifecycle::Uninitialized,
                mode: ReadingMode::Idle,
            }),
            buffer: InventoryBuffer::new(config.buffer_capacity, config.overflow_policy),
            filtered: FilteredReadingSession::new(),
            trigger: TriggerKeyMachine::new(config.auto_reset_timeout_duration()),
            events: EventBus::new(config.event_channel_capacity),
        }
    }

    fn snapshot(&self) -> ReaderState {
        *self.state.read()
    }

    fn require_ready(&self) -> Result<()> {
        self.snapshot().require_ready()
    }

    /// Route one raw tag read according to the current reading mode.
    pub(crate) fn ingest_tag(&self, raw: &RawTagRead) {
        let state = self.state.read();
        if state.lifecycle != Lifecycle::Ready || state.mode == ReadingMode::Idle {
            trace!(epc = %raw.epc, "tag read outside inventory dropped");
            return;
        }

        let record = match TagRecord::from_raw(&raw.epc, &raw.rssi, raw.timestamp_ms) {
            Ok(record) => record,
            Err(e) => {
                warn!(epc = %raw.epc, rssi = %raw.rssi, error = %e, "malformed tag read dropped");
                return;
            }
        };

        match state.mode {
            ReadingMode::Plain => {
                self.buffer.push(record.clone());
                self.events
                    .emit(ReaderEvent::TagFound(TagPayload::from(&record)));
                self.events
                    .emit(ReaderEvent::TagFoundInventory(InventoryTagPayload::from(
                        &record,
                    )));
            }
            ReadingMode::Filtered => {
                if let Some(found) = self.filtered.on_raw_tag(&record) {
                    self.events
                        .emit(ReaderEvent::FilteredTagFound(TagPayload::from(&found)));
                }
            }
            ReadingMode::Idle => {}
        }
    }

    /// Feed one raw key event to the trigger state machine.
    pub(crate) fn ingest_key(&self, raw: RawKeyEvent) {
        let state = self.state.read();
        if state.lifecycle != Lifecycle::Ready {
            trace!(key_code = raw.key_code, "key event outside session dropped");
            return;
        }

        let transitions = self
            .trigger
            .on_raw_key(KeyCode::new(raw.key_code), raw.pressed);
        self.emit_transitions(&transitions);
    }

    /// Run the auto-reset check; returns the number of keys reset.
    pub(crate) fn check_key_timeouts(&self) -> usize {
        let state = self.state.read();
        if state.lifecycle != Lifecycle::Ready {
            return 0;
        }

        let transitions = self.trigger.check_timeouts();
        self.emit_transitions(&transitions);
        transitions.len()
    }

    fn emit_transitions(&self, transitions: &[TriggerTransition]) {
        for transition in transitions {
            self.events
                .emit_all(ReaderEvent::from_transition(transition));
        }
    }
}

/// Composition root for one physical reader.
#[derive(Debug)]
pub struct ReaderSession {
    driver: tokio::sync::Mutex<AnyUhfDriver>,
    core: Arc<SessionCore>,
    config: ReaderConfig,
    tasks: Mutex<Option<BackgroundTasks>>,
}

impl ReaderSession {
    /// Create a session around a driver. Nothing touches the hardware until `init`.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` if the configuration is invalid.
    pub fn new(driver: impl Into<AnyUhfDriver>, config: ReaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            driver: tokio::sync::Mutex::new(driver.into()),
            core: Arc::new(SessionCore::new(&config)),
            config,
            tasks: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Attach a notification listener.
    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.core.events.subscribe()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.core.snapshot().lifecycle
    }

    pub fn reading_mode(&self) -> ReadingMode {
        self.core.snapshot().mode
    }

    /// Open the radio, apply the configured initial power and start the
    /// event pump and auto-reset watchdog.
    ///
    /// Emits `initSuccess` or `initError`.
    ///
    /// # Errors
    /// `InvalidState` if already initialized or freed;
    /// `HardwareUnavailable` if the driver fails.
    pub async fn init(&self) -> Result<()> {
        let mut driver = self.driver.lock().await;

        match self.core.snapshot().lifecycle {
            Lifecycle::Uninitialized => {}
            Lifecycle::Ready => return Err(Error::invalid_state("Reader is already initialized")),
            Lifecycle::Freed => return Err(Error::invalid_state("Reader has been freed")),
        }

        if let Err(e) = driver.initialize().await {
            let error = Error::from(e);
            error!(error = %error, "reader initialization failed");
            self.core
                .events
                .emit(ReaderEvent::init_error(error.to_string()));
            return Err(error);
        }

        if let Some(power) = self.config.initial_power {
            let applied = match PowerLevel::new(power) {
                Ok(level) => driver.set_power(level).await.map_err(Error::from),
                Err(e) => Err(e),
            };
            if let Err(error) = applied {
                error!(power, error = %error, "initial power rejected, releasing reader");
                if let Err(e) = driver.free().await {
                    warn!(error = %e, "failed to release reader after init failure");
                }
                self.core
                    .events
                    .emit(ReaderEvent::init_error(error.to_string()));
                return Err(error);
            }
        }

        // Ready before the pump starts so its first events are not dropped.
        self.core.state.write().lifecycle = Lifecycle::Ready;
        let stream = driver.take_event_stream();
        let tasks = BackgroundTasks::spawn(
            Arc::clone(&self.core),
            stream,
            self.config.key_check_interval_duration(),
        );
        *self.tasks.lock() = Some(tasks);

        info!("reader initialized");
        self.core
            .events
            .emit(ReaderEvent::init_success("RFID reader initialized"));
        Ok(())
    }

    /// Configure radio output power.
    ///
    /// # Errors
    /// `InvalidState` unless ready; `InvalidArgument` outside 5-30, leaving
    /// the stored power untouched; `HardwareUnavailable` on driver failure.
    pub async fn set_power(&self, power: u8) -> Result<u8> {
        let mut driver = self.driver.lock().await;
        self.core.require_ready()?;
        let level = PowerLevel::new(power)?;

        driver.set_power(level).await?;
        info!(power = %level, "reader power set");
        Ok(level.as_u8())
    }

    pub async fn get_power(&self) -> Result<u8> {
        let driver = self.driver.lock().await;
        self.core.require_ready()?;
        Ok(driver.get_power().await?)
    }

    pub async fn device_id(&self) -> Result<String> {
        let driver = self.driver.lock().await;
        self.core.require_ready()?;
        Ok(driver.device_id().await?)
    }

    pub async fn device_info(&self) -> Result<DeviceInfo> {
        let driver = self.driver.lock().await;
        self.core.require_ready()?;
        Ok(driver.device_info().await?)
    }

    /// Start plain continuous reading: every read is buffered and notified.
    ///
    /// # Errors
    /// `InvalidState` if any reading mode is already active.
    pub async fn start_reading(&self) -> Result<()> {
        let mut driver = self.driver.lock().await;
        let state = self.core.snapshot();
        state.require_ready()?;
        match state.mode {
            ReadingMode::Idle => {}
            ReadingMode::Plain => return Err(Error::invalid_state("Reading is already in progress")),
            ReadingMode::Filtered => {
                return Err(Error::invalid_state("Filtered reading is in progress"));
            }
        }

        driver.start_inventory().await?;
        self.core.state.write().mode = ReadingMode::Plain;
        info!("plain reading started");
        Ok(())
    }

    /// Stop plain reading. Reads arriving after this returns are dropped.
    ///
    /// # Errors
    /// `InvalidState` if plain reading is not active.
    pub async fn stop_reading(&self) -> Result<()> {
        let mut driver = self.driver.lock().await;
        {
            let mut state = self.core.state.write();
            state.require_ready()?;
            if state.mode != ReadingMode::Plain {
                return Err(Error::invalid_state("Reading is not in progress"));
            }
            state.mode = ReadingMode::Idle;
        }

        if let Err(e) = driver.stop_inventory().await {
            self.core.state.write().mode = ReadingMode::Plain;
            warn!(error = %e, "radio refused to stop, plain reading still active");
            return Err(e.into());
        }
        info!("plain reading stopped");
        Ok(())
    }

    /// Arm filtered reading for `targets`, replacing a running filtered session.
    ///
    /// Returns the accepted target count.
    ///
    /// # Errors
    /// `InvalidState` if plain reading is active; `InvalidArgument` for an
    /// empty list or empty/duplicate identifiers.
    pub async fn start_filtered_reading<I, S>(&self, targets: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let targets = TargetSet::parse(targets);
        let mut driver = self.driver.lock().await;
        let state = self.core.snapshot();
        state.require_ready()?;
        if state.mode == ReadingMode::Plain {
            return Err(Error::invalid_state(
                "Plain reading is in progress, stop it before filtered reading",
            ));
        }
        let targets = targets?;

        if state.mode == ReadingMode::Idle {
            driver.start_inventory().await?;
        }

        let target_count = {
            let mut state = self.core.state.write();
            state.mode = ReadingMode::Filtered;
            self.core.filtered.arm(targets)
        };
        Ok(target_count)
    }

    /// Stop filtered reading and return its final counters.
    ///
    /// # Errors
    /// `InvalidState` if filtered reading is not running.
    pub async fn stop_filtered_reading(&self) -> Result<FilterSummary> {
        let mut driver = self.driver.lock().await;
        {
            let mut state = self.core.state.write();
            state.require_ready()?;
            if state.mode != ReadingMode::Filtered {
                return Err(Error::invalid_state("Filtered reading is not running"));
            }
            state.mode = ReadingMode::Idle;
        }

        if let Err(e) = driver.stop_inventory().await {
            self.core.state.write().mode = ReadingMode::Filtered;
            warn!(error = %e, "radio refused to stop, filtered reading still active");
            return Err(e.into());
        }
        self.core.filtered.stop()
    }

    pub fn filtered_reading_status(&self) -> Result<FilterStatus> {
        self.core.require_ready()?;
        Ok(self.core.filtered.status())
    }

    /// Forget found tags of the running filtered session.
    pub fn clear_found_tags(&self) -> Result<usize> {
        self.core.require_ready()?;
        Ok(self.core.filtered.clear_found_tags())
    }

    /// Remove and return the oldest buffered read; `None` when nothing is buffered.
    pub fn get_inventory_tag(&self) -> Result<Option<TagRecord>> {
        self.core.require_ready()?;
        Ok(self.core.buffer.pop())
    }

    /// Whether any reading mode is active.
    pub fn inventory_status(&self) -> Result<bool> {
        let state = self.core.snapshot();
        state.require_ready()?;
        Ok(state.mode != ReadingMode::Idle)
    }

    pub fn buffer_stats(&self) -> Result<BufferStats> {
        self.core.require_ready()?;
        Ok(self.core.buffer.stats())
    }

    /// Discard every buffered read; returns how many were discarded.
    pub fn clear_buffer(&self) -> Result<usize> {
        self.core.require_ready()?;
        let cleared = self.core.buffer.clear();
        debug!(cleared, "inventory buffer cleared");
        Ok(cleared)
    }

    /// Force every tracked key to idle and emit `keyStateReset`.
    ///
    /// Returns the keys that were pressed.
    pub fn reset_key_state(&self) -> Result<Vec<KeyCode>> {
        self.core.require_ready()?;
        let transition = self.core.trigger.reset();
        self.core
            .events
            .emit_all(ReaderEvent::from_transition(&transition));

        match transition {
            TriggerTransition::Reset { released } => Ok(released),
            _ => Ok(Vec::new()),
        }
    }

    pub fn key_state(&self, key: KeyCode) -> KeyState {
        self.core.trigger.state_of(key)
    }

    /// Inject a press and release of `key_code` (default 293) through the
    /// normal key ingestion path.
    pub fn simulate_key_press(&self, key_code: Option<u16>) -> Result<KeyCode> {
        self.core.require_ready()?;
        let code = key_code.unwrap_or(DEFAULT_SIMULATED_KEY_CODE);
        debug!(key_code = code, "simulating key press");

        self.core.ingest_key(RawKeyEvent::press(code));
        self.core.ingest_key(RawKeyEvent::release(code));
        Ok(KeyCode::new(code))
    }

    /// Ingest a raw tag read from an adapter that does not use the driver stream.
    pub fn ingest_tag(&self, raw: &RawTagRead) {
        self.core.ingest_tag(raw);
    }

    /// Ingest a raw key event from an adapter that does not use the driver stream.
    pub fn ingest_key(&self, raw: RawKeyEvent) {
        self.core.ingest_key(raw);
    }

    /// Run the auto-reset check immediately; returns the number of keys reset.
    pub fn check_key_timeouts(&self) -> usize {
        self.core.check_key_timeouts()
    }

    /// Release the radio and reset every sub-state. Terminal.
    ///
    /// # Errors
    /// `InvalidState` if already freed; `HardwareUnavailable` if the driver
    /// fails to release (the session is freed regardless).
    pub async fn free(&self) -> Result<()> {
        let mut driver = self.driver.lock().await;
        let previous = {
            let mut state = self.core.state.write();
            if state.lifecycle == Lifecycle::Freed {
                return Err(Error::invalid_state("Reader has already been freed"));
            }
            let previous = state.lifecycle;
            state.lifecycle = Lifecycle::Freed;
            state.mode = ReadingMode::Idle;
            previous
        };

        self.core.filtered.discard();
        let cleared = self.core.buffer.clear();
        self.core.trigger.clear();

        let tasks = self.tasks.lock().take();
        if let Some(tasks) = tasks {
            tasks.shutdown().await;
        }

        if previous == Lifecycle::Ready {
            driver.free().await?;
        }
        info!(discarded_reads = cleared, "reader freed");
        Ok(())
    }
}
