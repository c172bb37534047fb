#![deny(unsafe_code)]

//! Shared test utilities for the fwpush workspace.
//!
//! Provides a mock device, firmware fixtures, config builders, and tracing
//! helpers so that individual crate tests stay concise and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! fwpush-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod device;
pub mod firmware;
pub mod tracing_setup;

pub use config::TestConfigBuilder;
pub use device::{MockDevice, ReceivedPart, ReceivedUpload, unused_address};
pub use firmware::FirmwareFixture;
