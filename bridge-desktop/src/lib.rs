//! Desktop host adapters
//!
//! [`TokioFileSystem`] reads the sync folder through `tokio::fs` and reports
//! modification times in epoch milliseconds.
//!
//! ```ignore
//! use bridge_desktop::TokioFileSystem;
//! use bridge_traits::FileSystemAccess;
//! use std::path::Path;
//!
//! let fs = TokioFileSystem::new();
//! let has_cache = fs.exists(Path::new("/sync/.Moon+/Cache")).await?;
//! ```

mod filesystem;

pub use filesystem::TokioFileSystem;
