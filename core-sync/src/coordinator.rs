//! # Cache Coordinator
//!
//! Runs a full reconciliation for one configured sync root.
//!
//! ## Workflow
//!
//! 1. Reconcile annotation and position files into books
//! 2. Fetch sync metadata, covers and reading statistics concurrently
//! 3. Merge them into the books sequentially
//! 4. Sort by title and attach each book's highlight fingerprint
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_runtime::config::CoreConfig;
//! use core_sync::CacheCoordinator;
//!
//! let config = CoreConfig::builder()
//!     .sync_root("/storage/emulated/0/Books")
//!     .build()?;
//!
//! let coordinator = CacheCoordinator::new(config);
//! for snapshot in coordinator.snapshot().await {
//!     println!("{} [{}]", snapshot.book.title, snapshot.fingerprint);
//! }
//! ```

use crate::engine::ReconciliationEngine;
use crate::enrichment::{enrich_books, fetch_enrichment_sources};
use crate::identity::IdentityResolver;
use crate::statistics::{NoReadingStats, ReadingStatsSource};
use core_library::BookRecord;
use core_metadata::{highlights_fingerprint, CacheLayout};
use core_runtime::config::CoreConfig;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// A book together with its highlight change fingerprint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookSnapshot {
    pub book: BookRecord,
    /// Empty when the book has no highlights
    pub fingerprint: String,
}

impl BookSnapshot {
    pub fn new(book: BookRecord) -> Self {
        let fingerprint = highlights_fingerprint(&book.highlights);
        Self { book, fingerprint }
    }

    /// Whether the highlights differ from a previously stored fingerprint
    pub fn highlights_changed(&self, previous: &str) -> bool {
        self.fingerprint != previous
    }
}

/// Reconciliation entry point for hosts
pub struct CacheCoordinator {
    config: CoreConfig,
    engine: ReconciliationEngine,
    stats_source: Arc<dyn ReadingStatsSource>,
}

impl CacheCoordinator {
    pub fn new(config: CoreConfig) -> Self {
        let engine = ReconciliationEngine::new(config.file_system.clone())
            .with_max_concurrent_reads(config.max_concurrent_reads);

        Self {
            config,
            engine,
            stats_source: Arc::new(NoReadingStats),
        }
    }

    /// Plug in a reading statistics source
    pub fn with_stats_source(mut self, source: Arc<dyn ReadingStatsSource>) -> Self {
        self.stats_source = source;
        self
    }

    /// Replace the identity matcher cascade
    pub fn with_resolver(mut self, resolver: IdentityResolver) -> Self {
        self.engine = self.engine.with_resolver(resolver);
        self
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Books from annotation and position files only
    pub async fn reconcile(&self) -> Vec<BookRecord> {
        self.engine
            .reconcile(
                &self.config.sync_root,
                self.config.track_books_without_highlights,
            )
            .await
    }

    /// Fully enriched books, in identity-key order
    #[instrument(skip(self))]
    pub async fn books(&self) -> Vec<BookRecord> {
        let mut books = self.reconcile().await;

        let layout = CacheLayout::new(&self.config.sync_root);
        let sources = fetch_enrichment_sources(
            self.config.file_system.as_ref(),
            &layout,
            self.stats_source.as_ref(),
        )
        .await;

        enrich_books(
            &mut books,
            &sources,
            self.config.track_books_without_highlights,
        );
        books
    }

    /// Enriched books sorted by title, each with its fingerprint
    pub async fn snapshot(&self) -> Vec<BookSnapshot> {
        let mut books = self.books().await;
        books.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| a.filename.cmp(&b.filename))
        });

        let snapshots: Vec<BookSnapshot> = books.into_iter().map(BookSnapshot::new).collect();
        info!(books = snapshots.len(), "Built library snapshot");
        snapshots
    }
}
