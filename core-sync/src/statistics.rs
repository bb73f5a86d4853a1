//! Reading statistics supplied from outside the cache folder
//!
//! Usage time, words read and session dates live in the reading app's backup
//! archive, not in the synced cache. Hosts that can read the archive plug in a
//! [`ReadingStatsSource`]; everyone else gets [`NoReadingStats`].

use crate::error::Result;
use async_trait::async_trait;
use core_library::ReadingStats;
use std::collections::HashMap;
use std::path::Path;

/// Source of per-book reading statistics
#[async_trait]
pub trait ReadingStatsSource: Send + Sync {
    /// Statistics keyed by book file name (e.g. `Dune.epub`)
    async fn load_stats(&self, sync_root: &Path) -> Result<HashMap<String, ReadingStats>>;
}

/// Statistics source that never has data
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReadingStats;

#[async_trait]
impl ReadingStatsSource for NoReadingStats {
    async fn load_stats(&self, _sync_root: &Path) -> Result<HashMap<String, ReadingStats>> {
        Ok(HashMap::new())
    }
}
