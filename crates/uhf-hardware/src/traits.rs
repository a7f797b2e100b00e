//! Radio driver trait definition.
//!
//! [`UhfDriver`] is the contract between the reader core and the vendor SDK
//! that talks to the UHF chipset. Control primitives are async methods;
//! asynchronous signals (tag reads, key transitions) are delivered over a
//! channel that the core takes once, at initialization.
//!
//! All methods use native `async fn` (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::{DeviceInfo, DriverEvent};
use tokio::sync::mpsc;
use uhf_core::PowerLevel;

/// UHF RFID reader driver abstraction.
///
/// # Object Safety and Dynamic Dispatch
///
/// This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generic parameters, or the enum wrapper in
/// [`devices`](crate::devices) when a concrete type is required:
///
/// ```no_run
/// use uhf_hardware::devices::AnyUhfDriver;
/// use uhf_hardware::mock::MockUhfDriver;
/// use uhf_hardware::traits::UhfDriver;
///
/// # async fn example() -> uhf_hardware::Result<()> {
/// let (driver, _handle) = MockUhfDriver::new();
/// let mut driver = AnyUhfDriver::Mock(driver);
///
/// driver.initialize().await?;
/// let id = driver.device_id().await?;
/// # Ok(())
/// # }
/// ```
///
/// # Event delivery
///
/// Tag reads and key transitions arrive on the receiver returned by
/// [`take_event_stream`](UhfDriver::take_event_stream). Drivers emit into it
/// from their own callback thread; nothing in this trait blocks on it.
pub trait UhfDriver: Send + Sync {
    /// Open the radio and prepare it for inventory.
    ///
    /// # Errors
    ///
    /// Returns an error if the radio cannot be opened.
    async fn initialize(&mut self) -> Result<()>;

    /// Release the radio. Further control calls fail until re-initialized.
    async fn free(&mut self) -> Result<()>;

    /// Set the output power.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver rejects the value or is not initialized.
    async fn set_power(&mut self, power: PowerLevel) -> Result<()>;

    /// Read back the configured output power in dBm.
    async fn get_power(&self) -> Result<u8>;

    /// Start continuous inventory. Tag reads begin flowing on the event stream.
    async fn start_inventory(&mut self) -> Result<()>;

    /// Stop continuous inventory.
    async fn stop_inventory(&mut self) -> Result<()>;

    /// Unique identifier of the handheld.
    async fn device_id(&self) -> Result<String>;

    /// Descriptive device metadata.
    async fn device_info(&self) -> Result<DeviceInfo>;

    /// Hand over the receiver of asynchronous driver signals.
    ///
    /// Returns `None` once the stream has already been taken.
    fn take_event_stream(&mut self) -> Option<mpsc::Receiver<DriverEvent>>;
}
