//! # Cache Decoders
//!
//! Decodes the reading app's synced cache folder into library models.
//!
//! ## Overview
//!
//! This module handles:
//! - Annotation files (`*.an`): compressed highlight blocks
//! - Position files (`*.po`): one-line reading position records
//! - The sync file (`books.sync`): compressed JSON with per-book metadata
//! - Cover thumbnails (`Cover/*_2.png`)
//! - The highlight change fingerprint used for note diffing
//!
//! Decoders are pure functions over bytes where possible. Those that need to
//! look at the folder go through [`FileSystemAccess`](bridge_traits::FileSystemAccess)
//! and take a [`CacheLayout`] describing where each artifact lives.
//!
//! Book files are joined across artifacts by [`filename_key`].

pub mod annotation;
pub mod compression;
pub mod cover;
pub mod error;
pub mod fingerprint;
pub mod layout;
pub mod naming;
pub mod position;
pub mod sync_metadata;

pub use annotation::{decode_annotation_file, parse_annotation_text, AnnotationFile};
pub use cover::scan_covers;
pub use error::{MetadataError, Result};
pub use fingerprint::highlights_fingerprint;
pub use layout::CacheLayout;
pub use naming::{filename_key, title_from_filename};
pub use position::decode_position;
pub use sync_metadata::{
    decode_sync_file, load_sync_metadata, parse_category, CategoryInfo, SyncEntry,
};
