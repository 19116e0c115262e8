//! # Sphere Common Library
//!
//! Shared code for the sphere services:
//! - Error type and result alias
//! - TOML configuration loading and root folder resolution
//! - Sync progress records and the event bus that broadcasts them
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
