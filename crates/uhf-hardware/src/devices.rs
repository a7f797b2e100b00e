//! Enum wrapper for radio driver dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn UhfDriver>`
//! is unavailable. [`AnyUhfDriver`] gives the reader core one concrete type
//! whose futures are `Send`, with one variant per supported driver.
//!
//! ```
//! use uhf_hardware::devices::AnyUhfDriver;
//! use uhf_hardware::mock::MockUhfDriver;
//!
//! let (driver, _handle) = MockUhfDriver::new();
//! let any_driver = AnyUhfDriver::Mock(driver);
//! ```

use crate::mock::MockUhfDriver;
use crate::traits::UhfDriver;
use crate::types::{DeviceInfo, DriverEvent};
use crate::Result;
use tokio::sync::mpsc;
use uhf_core::PowerLevel;

/// Enum wrapper for UHF driver dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyUhfDriver {
    /// Mock driver for development and testing.
    Mock(MockUhfDriver),
    // TODO: add a `Uart` variant once the vendor UART bindings land behind
    // the `driver-uart` feature.
}

impl UhfDriver for AnyUhfDriver {
    async fn initialize(&mut self) -> Result<()> {
        match self {
            Self::Mock(driver) => driver.initialize().await,
        }
    }

    async fn free(&mut self) -> Result<()> {
        match self {
            Self::Mock(driver) => driver.free().await,
        }
    }

    async fn set_power(&mut self, power: PowerLevel) -> Result<()> {
        match self {
            Self::Mock(driver) => driver.set_power(power).await,
        }
    }

    async fn get_power(&self) -> Result<u8> {
        match self {
            Self::Mock(driver) => driver.get_power().await,
        }
    }

    async fn start_inventory(&mut self) -> Result<()> {
        match self {
            Self::Mock(driver) => driver.start_inventory().await,
        }
    }

    async fn stop_inventory(&mut self) -> Result<()> {
        match self {
            Self::Mock(driver) => driver.stop_inventory().await,
        }
    }

    async fn device_id(&self) -> Result<String> {
        match self {
            Self::Mock(driver) => driver.device_id().await,
        }
    }

    async fn device_info(&self) -> Result<DeviceInfo> {
        match self {
            Self::Mock(driver) => driver.device_info().await,
        }
    }

    fn take_event_stream(&mut self) -> Option<mpsc::Receiver<DriverEvent>> {
        match self {
            Self::Mock(driver) => driver.take_event_stream(),
        }
    }
}

impl From<MockUhfDriver> for AnyUhfDriver {
    fn from(driver: MockUhfDriver) -> Self {
        Self::Mock(driver)
    }
}
