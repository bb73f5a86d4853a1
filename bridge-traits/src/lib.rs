//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! The cache reconciliation core reads a reading app's synced cache folder but
//! never touches the file system directly. Everything it needs from the host
//! goes through the traits defined here:
//!
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Read-only file access
//!   (existence, metadata, listing, whole-file reads)
//! - [`LoggerSink`](log_sink::LoggerSink) - Forward structured logs to host logging
//!
//! | Platform | Implementation Crate |
//! |----------|---------------------|
//! | Desktop  | `bridge-desktop`    |
//! | Mobile   | Injected by host    |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. A missing
//! path must surface as [`BridgeError::NotFound`] or an `Io` error of kind
//! `NotFound` so callers can tell "not produced yet" apart from real failures.

pub mod error;
pub mod log_sink;
pub mod storage;

pub use error::BridgeError;

pub use storage::{FileMetadata, FileSystemAccess};
pub use log_sink::{LogEntry, LogLevel, LoggerSink, StderrLogger};
