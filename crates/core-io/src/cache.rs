//! Parse results keyed by path and modification time.
//!
//! The cache is owned by whoever opens documents (the host) and passed where
//! needed; there is no global instance. Entries expire after a TTL and the
//! oldest entry is evicted once capacity is reached. Every time-dependent
//! method has an `_at` form taking `now` so expiry is testable.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, trace};

use crate::{DocumentError, ParsedDocument, parse_file};

pub const DEFAULT_CACHE_CAPACITY: usize = 10;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug)]
struct CacheEntry {
    mtime: SystemTime,
    inserted: Instant,
    doc: Arc<ParsedDocument>,
}

#[derive(Debug)]
pub struct ParseCache {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<PathBuf, CacheEntry>,
    hits: u64,
    misses: u64,
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL)
    }
}

impl ParseCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get_or_parse(&mut self, path: &Path) -> Result<Arc<ParsedDocument>, DocumentError> {
        self.get_or_parse_at(path, Instant::now())
    }

    /// Cached document when `path` still has the cached mtime and the entry
    /// is younger than the TTL; otherwise parse and cache.
    pub fn get_or_parse_at(
        &mut self,
        path: &Path,
        now: Instant,
    ) -> Result<Arc<ParsedDocument>, DocumentError> {
        let mtime = modified(path)?;
        if let Some(doc) = self.get_at(path, mtime, now) {
            return Ok(doc);
        }
        let doc = Arc::new(parse_file(path)?);
        self.insert_at(path, mtime, doc.clone(), now);
        Ok(doc)
    }

    /// Lookup without parsing. Counts a hit or a miss.
    pub fn get_at(
        &mut self,
        path: &Path,
        mtime: SystemTime,
        now: Instant,
    ) -> Option<Arc<ParsedDocument>> {
        let fresh = self
            .entries
            .get(path)
            .filter(|e| e.mtime == mtime && now.saturating_duration_since(e.inserted) < self.ttl)
            .map(|e| e.doc.clone());
        match fresh {
            Some(doc) => {
                self.hits += 1;
                trace!(target: "io.cache", hits = self.hits, "cache_hit");
                Some(doc)
            }
            None => {
                self.misses += 1;
                if self.entries.remove(path).is_some() {
                    debug!(target: "io.cache", "cache_entry_stale");
                }
                None
            }
        }
    }

    pub fn insert_at(
        &mut self,
        path: &Path,
        mtime: SystemTime,
        doc: Arc<ParsedDocument>,
        now: Instant,
    ) {
        self.purge_expired_at(now);
        if !self.entries.contains_key(path) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                mtime,
                inserted: now,
                doc,
            },
        );
    }

    /// Drop entries older than the TTL. Returns how many were removed.
    pub fn purge_expired_at(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.inserted) < ttl);
        let purged = before - self.entries.len();
        if purged > 0 {
            debug!(target: "io.cache", purged, "cache_expired_purged");
        }
        purged
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.inserted)
            .map(|(p, _)| p.clone());
        if let Some(path) = oldest {
            self.entries.remove(&path);
            debug!(target: "io.cache", capacity = self.capacity, "cache_evicted_oldest");
        }
    }
}

fn modified(path: &Path) -> Result<SystemTime, DocumentError> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| DocumentError::from_io(path, e))
}
