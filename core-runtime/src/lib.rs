//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the cache reconciliation
//! core:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the logging conventions and the configuration every
//! reconciliation entry point is built from.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
