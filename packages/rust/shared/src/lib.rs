//! Shared types, configuration, and error handling for Phonescout.

pub mod carrier;
pub mod config;
pub mod error;
pub mod types;

pub use carrier::CarrierGatewayTable;
pub use config::*;
pub use error::{PhonescoutError, Result};
pub use types::*;
