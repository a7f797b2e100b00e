//! Mock driver implementations for testing and development.
//!
//! This module provides a simulated UHF reader that can be controlled
//! programmatically without requiring a handheld.

pub mod uhf;

// Re-export commonly used types
pub use uhf::{MockOperation, MockUhfDriver, MockUhfHandle};
