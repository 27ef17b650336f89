//! # skyweek Common Library
//!
//! Shared code for the skyweek services including:
//! - Error and result types
//! - Bootstrap configuration loading (TOML + environment)
//! - Logging initialization
//! - Clock and week-key utilities

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use error::{Error, Result};
pub use time::{Clock, SystemClock, WeekStart};
