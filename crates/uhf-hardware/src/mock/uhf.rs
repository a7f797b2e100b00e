//! Mock UHF reader driver for testing and development.
//!
//! The mock keeps the radio's control state (initialized, inventory running,
//! power) behind a shared lock so tests can inspect it through the handle,
//! and forwards whatever raw signals the handle injects. It does not filter
//! reads by inventory state: deciding what to do with a read that arrives
//! while inventory is stopped is the reader core's job.

use crate::{
    HardwareError, Result,
    traits::UhfDriver,
    types::{DeviceInfo, DriverEvent, RawKeyEvent, RawTagRead},
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use uhf_core::{PowerLevel, constants::DEFAULT_POWER};

/// Capacity of the mock's raw event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Driver operations whose failure can be injected through the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    Initialize,
    Free,
    SetPower,
    GetPower,
    StartInventory,
    StopInventory,
    DeviceId,
}

#[derive(Debug)]
struct MockReaderState {
    initialized: bool,
    inventory_running: bool,
    power: u8,
    device_id: String,
    free_count: u32,
    failures: HashSet<MockOperation>,
}

impl MockReaderState {
    fn check(&self, operation: MockOperation, name: &str, needs_init: bool) -> Result<()> {
        if self.failures.contains(&operation) {
            return Err(HardwareError::sdk(name, "injected failure"));
        }
        if needs_init && !self.initialized {
            return Err(HardwareError::not_initialized(name));
        }
        Ok(())
    }
}

/// Mock UHF reader driver.
///
/// # Examples
///
/// ```
/// use uhf_hardware::mock::MockUhfDriver;
/// use uhf_hardware::traits::UhfDriver;
/// use uhf_hardware::types::DriverEvent;
///
/// #[tokio::main]
/// async fn main() -> uhf_hardware::Result<()> {
///     let (mut driver, handle) = MockUhfDriver::new();
///     let mut events = driver.take_event_stream().unwrap();
///
///     driver.initialize().await?;
///     driver.start_inventory().await?;
///
///     handle.read_tag("e200aabb", "-61.5").await?;
///
///     match events.recv().await {
///         Some(DriverEvent::TagRead(read)) => assert_eq!(read.epc, "e200aabb"),
///         other => panic!("unexpected event: {other:?}"),
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockUhfDriver {
    /// Receiver handed to the reader core on first request.
    event_rx: Option<mpsc::Receiver<DriverEvent>>,

    /// Device name
    name: String,

    state: Arc<Mutex<MockReaderState>>,
}

impl MockUhfDriver {
    /// Create a new mock driver with the default name.
    ///
    /// Returns the driver and a [`MockUhfHandle`] used to inject raw
    /// signals and failures.
    pub fn new() -> (Self, MockUhfHandle) {
        Self::with_name("Mock UHF Reader".to_string())
    }

    /// Create a new mock driver with a custom name.
    pub fn with_name(name: String) -> (Self, MockUhfHandle) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let state = Arc::new(Mutex::new(MockReaderState {
            initialized: false,
            inventory_running: false,
            power: DEFAULT_POWER,
            device_id: format!("MOCK-{}", uuid::Uuid::new_v4().simple()),
            free_count: 0,
            failures: HashSet::new(),
        }));

        let driver = Self {
            event_rx: Some(event_rx),
            name: name.clone(),
            state: Arc::clone(&state),
        };

        let handle = MockUhfHandle {
            event_tx,
            name,
            state,
        };

        (driver, handle)
    }
}

impl UhfDriver for MockUhfDriver {
    async fn initialize(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.check(MockOperation::Initialize, "initialize", false)?;
        state.initialized = true;
        debug!(device = %self.name, "mock reader initialized");
        Ok(())
    }

    async fn free(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.check(MockOperation::Free, "free", false)?;
        state.initialized = false;
        state.inventory_running = false;
        state.free_count += 1;
        debug!(device = %self.name, "mock reader freed");
        Ok(())
    }

    async fn set_power(&mut self, power: PowerLevel) -> Result<()> {
        let mut state = self.state.lock();
        state.check(MockOperation::SetPower, "set_power", true)?;
        state.power = power.as_u8();
        Ok(())
    }

    async fn get_power(&self) -> Result<u8> {
        let state = self.state.lock();
        state.check(MockOperation::GetPower, "get_power", true)?;
        Ok(state.power)
    }

    async fn start_inventory(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.check(MockOperation::StartInventory, "start_inventory", true)?;
        state.inventory_running = true;
        Ok(())
    }

    async fn stop_inventory(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.check(MockOperation::StopInventory, "stop_inventory", true)?;
        state.inventory_running = false;
        Ok(())
    }

    async fn device_id(&self) -> Result<String> {
        let state = self.state.lock();
        state.check(MockOperation::DeviceId, "device_id", true)?;
        Ok(state.device_id.clone())
    }

    async fn device_info(&self) -> Result<DeviceInfo> {
        let serial = self.state.lock().device_id.clone();
        Ok(DeviceInfo::new(self.name.clone(), "Mock UHF v1.0")
            .serial(serial)
            .firmware("1.0.0"))
    }

    fn take_event_stream(&mut self) -> Option<mpsc::Receiver<DriverEvent>> {
        self.event_rx.take()
    }
}

/// Handle for controlling a mock driver.
///
/// Cloneable; every clone injects into the same driver and observes the
/// same control state.
#[derive(Debug, Clone)]
pub struct MockUhfHandle {
    /// Channel sender for raw driver signals
    event_tx: mpsc::Sender<DriverEvent>,

    /// Device name
    name: String,

    state: Arc<Mutex<MockReaderState>>,
}

impl MockUhfHandle {
    /// Inject an arbitrary driver event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event stream receiver has been dropped.
    pub async fn send_event(&self, event: DriverEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| HardwareError::disconnected("UHF event channel closed"))
    }

    /// Inject a tag read without a driver timestamp.
    pub async fn read_tag(&self, epc: &str, rssi: &str) -> Result<()> {
        self.send_event(DriverEvent::TagRead(RawTagRead::new(epc, rssi)))
            .await
    }

    /// Inject a fully specified tag read.
    pub async fn read_raw(&self, read: RawTagRead) -> Result<()> {
        self.send_event(DriverEvent::TagRead(read)).await
    }

    /// Inject a key press.
    pub async fn press_key(&self, key_code: u16) -> Result<()> {
        self.send_event(DriverEvent::Key(RawKeyEvent::press(key_code)))
            .await
    }

    /// Inject a key release.
    pub async fn release_key(&self, key_code: u16) -> Result<()> {
        self.send_event(DriverEvent::Key(RawKeyEvent::release(key_code)))
            .await
    }

    /// Make every subsequent call of `operation` fail with an SDK error.
    pub fn fail(&self, operation: MockOperation) {
        self.state.lock().failures.insert(operation);
    }

    /// Undo [`fail`](Self::fail) for `operation`.
    pub fn recover(&self, operation: MockOperation) {
        self.state.lock().failures.remove(&operation);
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    pub fn is_inventory_running(&self) -> bool {
        self.state.lock().inventory_running
    }

    /// Power currently stored in the radio.
    pub fn power(&self) -> u8 {
        self.state.lock().power
    }

    /// Number of successful `free` calls.
    pub fn free_count(&self) -> u32 {
        self.state.lock().free_count
    }

    pub fn device_id(&self) -> String {
        self.state.lock().device_id.clone()
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }
}
