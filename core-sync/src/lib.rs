//! # Cache Reconciliation
//!
//! Turns the reading app's synced cache folder into one record per book.
//!
//! ## Overview
//!
//! This module handles:
//! - Resolving titles and filenames from different artifacts to one book
//! - Reconciling annotation and position files into book records
//! - Enriching books from sync metadata, covers and reading statistics
//! - Fingerprinting highlight sets for the note writer
//!
//! ## Components
//!
//! - **Identity Resolver** (`identity`): Canonical keys and the ordered matcher cascade
//! - **Reconciliation Engine** (`engine`): Annotation pass followed by position pass
//! - **Enrichment** (`enrichment`): Concurrent source fetch and fill-empty merge
//! - **Reading Statistics** (`statistics`): Pluggable statistics source
//! - **Cache Coordinator** (`coordinator`): Runs everything for a configured sync root

pub mod coordinator;
pub mod engine;
pub mod enrichment;
pub mod error;
pub mod identity;
pub mod statistics;

pub use coordinator::{BookSnapshot, CacheCoordinator};
pub use engine::ReconciliationEngine;
pub use enrichment::{enrich_books, fetch_enrichment_sources, EnrichmentSources};
pub use error::{Result, SyncError};
pub use identity::{
    canonical_key, identity_key, AuthorSuffixMatcher, ExactKeyMatcher, FilenameIndexMatcher,
    IdentityIndex, IdentityMatcher, IdentityResolver,
};
pub use statistics::{NoReadingStats, ReadingStatsSource};
