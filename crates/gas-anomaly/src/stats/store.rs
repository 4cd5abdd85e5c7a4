//! Per-key exponentially weighted statistics
//!
//! Keeps a running mean and variance for every key using exact integer
//! arithmetic and scores new observations by their distance from that history.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use lru::LruCache;
use malachite::Integer;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{isqrt, Alpha, StatKey};
use crate::error::{EngineError, Result};

/// Distance reported when a perfectly stable history sees any deviation
pub const ZERO_VARIANCE_DISTANCE: u64 = 1_000_000_000_000;

/// Policy deciding when an entry has enough history to be scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarmupGate {
    /// Entries with fewer than `ceil(1 / alpha)` observations score 0
    #[default]
    ObservationCount,
    /// Legacy policy: no count gate, entries whose mean and variance are
    /// both exactly zero score 0
    ZeroMoments,
    /// Every existing entry is scored
    Disabled,
}

/// Statistics store configuration
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    pub alpha: Alpha,
    pub warmup_gate: WarmupGate,
    /// Upper bound on tracked keys, `None` for unbounded
    pub max_keys: Option<usize>,
}

impl StoreConfig {
    pub fn new(alpha: Alpha) -> Self {
        Self {
            alpha,
            ..Default::default()
        }
    }

    pub fn with_warmup_gate(mut self, gate: WarmupGate) -> Self {
        self.warmup_gate = gate;
        self
    }

    /// Evict the least recently updated key once more than `max_keys` are tracked
    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = Some(max_keys.max(1));
        self
    }
}

/// Running statistics for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatEntry {
    pub mean: Integer,
    pub variance: Integer,
    /// Number of updates folded into this entry
    pub count: u64,
    /// Store sequence number of the latest update
    pub last_update: u64,
}

impl StatEntry {
    fn first(value: &Integer, sequence: u64) -> Self {
        Self {
            mean: value.clone(),
            variance: Integer::from(0),
            count: 1,
            last_update: sequence,
        }
    }

    /// mean' = mean + sigma * alpha
    /// variance' = (variance + sigma^2 * alpha) * (1 - alpha)
    fn fold(&mut self, value: &Integer, alpha: &Alpha, sequence: u64) {
        let sigma = value - &self.mean;
        let mean = &self.mean + alpha.weight(&sigma);
        let variance = alpha.weight_complement(&(&self.variance + alpha.weight(&(&sigma * &sigma))));

        self.mean = mean;
        self.variance = variance;
        self.count += 1;
        self.last_update = sequence;
    }
}

/// Statistics for every key of one observed quantity
///
/// Reads and writes of different keys proceed independently. `observe` scores
/// and updates one key under a single lock so that concurrent observations of
/// the same key never score against each other's partial state. Stores with a
/// key bound serialize their writes on the recency list.
pub struct StatisticsStore {
    config: StoreConfig,
    entries: DashMap<StatKey, StatEntry>,
    /// Update order of keys, only kept when `max_keys` is set
    recency: Option<Mutex<LruCache<StatKey, ()>>>,
    /// Aggregate over every update regardless of key
    global: Mutex<Option<StatEntry>>,
    sequence: AtomicU64,
    evictions: AtomicU64,
}

impl StatisticsStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            recency: config.max_keys.map(|_| Mutex::new(LruCache::unbounded())),
            config,
            entries: DashMap::new(),
            global: Mutex::new(None),
            sequence: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Store with the given smoothing factor and default policies
    pub fn with_alpha(alpha: Alpha) -> Self {
        Self::new(StoreConfig::new(alpha))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Normalized distance of `value` from the history of `key`
    ///
    /// Returns 0 for unknown keys and for keys that have not passed the
    /// warm-up gate. Never mutates the store.
    pub fn distance(&self, key: &StatKey, value: &Integer) -> Result<Integer> {
        ensure_non_negative(value)?;
        match self.entries.get(key) {
            Some(entry) => self.score(&entry, value),
            None => Ok(Integer::from(0)),
        }
    }

    /// Fold `value` into the statistics of `key`
    pub fn update(&self, key: &StatKey, value: &Integer) -> Result<()> {
        ensure_non_negative(value)?;
        let mut recency = self.lock_recency();
        let sequence = self.next_sequence();

        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                occupied.get_mut().fold(value, &self.config.alpha, sequence);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StatEntry::first(value, sequence));
            }
        }

        self.fold_global(value, sequence);
        if let Some(recency) = recency.as_mut() {
            self.touch(recency, key);
        }
        Ok(())
    }

    /// Score `value` against the history of `key`, then fold it in
    ///
    /// Both steps run while holding the key's lock.
    pub fn observe(&self, key: &StatKey, value: &Integer) -> Result<Integer> {
        ensure_non_negative(value)?;
        let mut recency = self.lock_recency();
        let sequence = self.next_sequence();

        let distance = match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let distance = self.score(occupied.get(), value)?;
                occupied.get_mut().fold(value, &self.config.alpha, sequence);
                distance
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StatEntry::first(value, sequence));
                Integer::from(0)
            }
        };

        self.fold_global(value, sequence);
        if let Some(recency) = recency.as_mut() {
            self.touch(recency, key);
        }
        Ok(distance)
    }

    /// Distance of `value` from the aggregate of all keys
    pub fn global_distance(&self, value: &Integer) -> Result<Integer> {
        ensure_non_negative(value)?;
        let global = self.global.lock().unwrap_or_else(PoisonError::into_inner);
        match global.as_ref() {
            Some(entry) => self.score(entry, value),
            None => Ok(Integer::from(0)),
        }
    }

    /// Snapshot of the statistics for `key`
    pub fn entry(&self, key: &StatKey) -> Option<StatEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Snapshot of the aggregate statistics
    pub fn global_entry(&self) -> Option<StatEntry> {
        self.global
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total keys evicted since creation
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    fn score(&self, entry: &StatEntry, value: &Integer) -> Result<Integer> {
        let zero = Integer::from(0);

        match self.config.warmup_gate {
            WarmupGate::ObservationCount => {
                if entry.count < self.config.alpha.warmup_count() {
                    return Ok(zero);
                }
            }
            WarmupGate::ZeroMoments => {
                if entry.mean == zero && entry.variance == zero {
                    return Ok(zero);
                }
            }
            WarmupGate::Disabled => {}
        }

        if entry.variance == zero {
            return Ok(if *value == entry.mean {
                zero
            } else {
                Integer::from(ZERO_VARIANCE_DISTANCE)
            });
        }

        let deviation = if *value > entry.mean {
            value - &entry.mean
        } else {
            &entry.mean - value
        };
        Ok(deviation / isqrt(&entry.variance)?)
    }

    fn fold_global(&self, value: &Integer, sequence: u64) {
        let mut global = self.global.lock().unwrap_or_else(PoisonError::into_inner);
        match global.as_mut() {
            Some(entry) => entry.fold(value, &self.config.alpha, sequence),
            None => *global = Some(StatEntry::first(value, sequence)),
        }
    }

    fn lock_recency(&self) -> Option<MutexGuard<'_, LruCache<StatKey, ()>>> {
        self.recency
            .as_ref()
            .map(|recency| recency.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Mark `key` as most recently updated and evict past the key bound
    fn touch(&self, recency: &mut LruCache<StatKey, ()>, key: &StatKey) {
        let Some(max_keys) = self.config.max_keys else {
            return;
        };

        recency.put(key.clone(), ());
        while recency.len() > max_keys {
            let Some((evicted, ())) = recency.pop_lru() else {
                break;
            };
            if self.entries.remove(&evicted).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(key = %evicted, max_keys, "Evicted least recently updated key");
            }
        }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for StatisticsStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

fn ensure_non_negative(value: &Integer) -> Result<()> {
    if *value < Integer::from(0) {
        return Err(EngineError::NegativeValue(value.to_string()));
    }
    Ok(())
}
