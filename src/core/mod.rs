//! Core runtime support module
//!
//! This module provides the ambient pieces shared by the bus and the loader:
//! - Error handling and type system
//! - Configuration management
//! - Structured logging system

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CliArgs, Config};
pub use error::{BusError, ErrorResponse, Result};
pub use logging::Logger;
