//! Content-addressed cache of analysis results
//!
//! Identical uploads classify identically while the pipeline is
//! deterministic, so results are keyed by a hash of the uploaded bytes and
//! kept under a byte budget, evicting the least recently used entry first.

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

use crate::AnalysisResult;

/// Hex SHA-256 prefix (16 bytes) of an upload
pub fn content_key(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..16])
}

/// Approximate heap footprint of a cached result
pub fn estimated_size(result: &AnalysisResult) -> usize {
    std::mem::size_of::<AnalysisResult>()
        + result.features.len() * std::mem::size_of::<f32>()
        + result.corrections.entries().iter().map(|e| e.len() + std::mem::size_of::<String>()).sum::<usize>()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: usize,
    pub hits: u64,
    pub misses: u64,
}

struct Slot {
    result: AnalysisResult,
    bytes: usize,
    last_used: u64,
}

struct State {
    slots: HashMap<String, Slot>,
    bytes: usize,
    clock: u64,
    hits: u64,
    misses: u64,
}

pub struct ResultCache {
    budget: usize,
    state: Mutex<State>,
}

impl ResultCache {
    /// Create an empty cache with the given byte budget
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            state: Mutex::new(State {
                slots: HashMap::new(),
                bytes: 0,
                clock: 0,
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Get the maximum byte budget
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Look up a result and mark it as most recently used
    pub fn get(&self, key: &str) -> Option<AnalysisResult> {
        let mut state = self.state.lock();
        state.clock += 1;
        let now = state.clock;

        let found = state.slots.get_mut(key).map(|slot| {
            slot.last_used = now;
            slot.result.clone()
        });
        match found {
            Some(_) => state.hits += 1,
            None => state.misses += 1,
        }
        found
    }

    /// Store a result. Entries larger than the whole budget are not kept.
    pub fn insert(&self, key: String, result: AnalysisResult) {
        let bytes = estimated_size(&result);
        if bytes > self.budget {
            return;
        }

        let mut state = self.state.lock();
        state.clock += 1;
        let last_used = state.clock;

        if let Some(previous) = state.slots.insert(key, Slot { result, bytes, last_used }) {
            state.bytes -= previous.bytes;
        }
        state.bytes += bytes;

        while state.bytes > self.budget {
            let Some(oldest) = state
                .slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            if let Some(evicted) = state.slots.remove(&oldest) {
                state.bytes -= evicted.bytes;
            }
        }
    }

    /// Get the number of cached results
    pub fn len(&self) -> usize {
        self.state.lock().slots.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get entry, byte and hit/miss counts
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            entries: state.slots.len(),
            bytes: state.bytes,
            hits: state.hits,
            misses: state.misses,
        }
    }

    /// Remove every cached result
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.slots.clear();
        state.bytes = 0;
    }
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("ResultCache")
            .field("entries", &stats.entries)
            .field("bytes", &stats.bytes)
            .field("budget", &self.budget)
            .finish()
    }
}
