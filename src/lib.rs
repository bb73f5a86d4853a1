//! Umbrella crate for desktop hosts.
//!
//! With `desktop-shims` enabled the coordinator and its configuration are
//! re-exported, backed by the tokio file system from `bridge-desktop`.
//! Mobile hosts depend on `core-sync` directly and inject their own
//! `FileSystemAccess`.

#[cfg(feature = "desktop-shims")]
pub use core_runtime::{CoreConfig, CoreConfigBuilder};
#[cfg(feature = "desktop-shims")]
pub use core_sync::{BookSnapshot, CacheCoordinator};
