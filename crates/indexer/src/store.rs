//! Persisted cache store: load, merge, persist, reset.
//!
//! One JSON document holds the whole aggregate. Writes are full-document
//! and atomic (temp file + rename), so an interrupted pass always leaves
//! the previous document on disk.

use alloy_primitives::{Address, B256};
use scry_core::error::{ScryError, ScryResult};
use scry_core::{Cache, ScannedBlock};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

const CACHE_FILE: &str = "cache.json";

/// Owns the on-disk cache document.
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file(&self) -> PathBuf {
        self.dir.join(CACHE_FILE)
    }

    /// Loads the persisted cache. Missing or unreadable state yields an
    /// empty cache: a corrupt document costs a full re-scan, not an outage.
    pub fn load(&self) -> Cache {
        let path = self.file();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Cache::empty(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable cache, starting empty");
                return Cache::empty();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt cache, starting empty");
                Cache::empty()
            }
        }
    }

    /// Atomic full overwrite of the persisted document.
    pub fn persist(&self, cache: &Cache) -> ScryResult<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| ScryError::Cache(format!("create {}: {e}", self.dir.display())))?;

        let path = self.file();
        let tmp = path.with_extension("json.tmp");
        let doc = serde_json::to_vec(cache)
            .map_err(|e| ScryError::Cache(format!("serialize cache: {e}")))?;

        fs::write(&tmp, &doc)
            .map_err(|e| ScryError::Cache(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path)
            .map_err(|e| ScryError::Cache(format!("rename to {}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), bytes = doc.len(), "cache persisted");
        Ok(())
    }

    /// Deletes the persisted document. The only destruction path.
    pub fn reset(&self) -> ScryResult<()> {
        let path = self.file();
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "cache reset");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ScryError::Cache(format!("remove {}: {e}", path.display()))),
        }
    }
}

/// Counts from one merge, plus the contracts first seen in it.
#[derive(Debug, Default)]
pub struct MergeStats {
    pub new_blocks: u64,
    pub new_transactions: u64,
    pub new_contracts: Vec<Address>,
}

/// Append-only union keyed by block number, tx hash, and contract address.
///
/// Historical entries are never mutated. Blocks and transactions are
/// re-sorted by block number afterwards (stable sort, so in-block order
/// survives), which puts retried older blocks in position.
pub fn merge(cache: &mut Cache, scanned: Vec<ScannedBlock>) -> MergeStats {
    let mut stats = MergeStats::default();
    let known_blocks: HashSet<u64> = cache.blocks.iter().map(|b| b.number).collect();
    let known_txs: HashSet<B256> = cache.transactions.iter().map(|t| t.hash).collect();
    let known_contracts: HashSet<Address> = cache.contracts.iter().copied().collect();

    for block in scanned {
        if known_blocks.contains(&block.summary.number) {
            continue;
        }

        for tx in block.transactions {
            if known_txs.contains(&tx.hash) {
                continue;
            }
            cache.transactions.push(tx);
            stats.new_transactions += 1;
        }

        for addr in block.created_contracts {
            if known_contracts.contains(&addr) || stats.new_contracts.contains(&addr) {
                continue;
            }
            cache.contracts.push(addr);
            stats.new_contracts.push(addr);
        }

        cache.blocks.push(block.summary);
        stats.new_blocks += 1;
    }

    cache.blocks.sort_by_key(|b| b.number);
    cache.transactions.sort_by_key(|t| t.block_number);
    stats
}
