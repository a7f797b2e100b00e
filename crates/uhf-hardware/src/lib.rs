//! Driver boundary for handheld UHF RFID readers.
//!
//! This crate defines what the reader core consumes from the vendor SDK:
//! control primitives (initialize, power, inventory start/stop, free) and
//! an asynchronous stream of raw signals (tag reads and hardware key
//! transitions). A programmable mock driver makes the core testable without
//! a handheld.
//!
//! # Design Philosophy
//!
//! - **Async-first**: control calls are native `async fn` in traits
//!   (Rust 1.90 + Edition 2024 RPITIT).
//! - **Raw at the edge**: signals carry the driver's own strings; parsing
//!   and normalization belong to the core.
//! - **Thread-safe**: drivers are `Send + Sync` for use with Tokio.
//!
//! # Example
//!
//! ```no_run
//! use uhf_core::PowerLevel;
//! use uhf_hardware::traits::UhfDriver;
//! use uhf_hardware::Result;
//!
//! async fn prepare<D: UhfDriver>(driver: &mut D) -> Result<()> {
//!     driver.initialize().await?;
//!     driver.set_power(PowerLevel::new(25).unwrap()).await?;
//!     driver.start_inventory().await
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return [`Result<T>`][error::Result] using
//! [`HardwareError`]. The reader core surfaces these unchanged as
//! `HardwareUnavailable`.

pub mod devices;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::AnyUhfDriver;
pub use error::{HardwareError, Result};
pub use traits::UhfDriver;
pub use types::{DeviceInfo, DriverEvent, RawKeyEvent, RawTagRead};
