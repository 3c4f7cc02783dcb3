//! Key state machine and least-recently-used rotation
//!
//! Each key is either available or cooling down. Cooldown transitions back to
//! available happen lazily: whenever the pool is consulted, expired cooldowns
//! are cleared before any selection runs.
//!
//! All state (records, rotation cursor, counters) lives behind a single mutex
//! so that a sweep-then-select sequence is atomic under concurrent handlers.
//! No operation holds the lock across I/O or an await point.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Pool behavior settings.
///
/// `failure_threshold` counts consecutive non-rate-limit failures before a
/// key is forced onto cooldown. Rate-limit failures cool the key immediately
/// regardless of the threshold.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub rotation_enabled: bool,
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            rotation_enabled: false,
            failure_threshold: 3,
            cooldown: Duration::from_secs(60 * 60),
        }
    }
}

/// A selected key, ready for a request.
#[derive(Debug, Clone)]
pub struct SelectedKey {
    pub index: usize,
    pub credential: String,
}

/// Per-key state. `cooldown_until` doubles as the cooldown flag: a key is on
/// cooldown exactly while it holds a deadline.
#[derive(Debug)]
struct KeyRecord {
    credential: String,
    pool_index: usize,
    last_used_at: Option<Instant>,
    consecutive_failures: u32,
    cooldown_until: Option<Instant>,
}

impl KeyRecord {
    fn new(credential: String, pool_index: usize) -> Self {
        Self {
            credential,
            pool_index,
            last_used_at: None,
            consecutive_failures: 0,
            cooldown_until: None,
        }
    }

    fn on_cooldown(&self) -> bool {
        self.cooldown_until.is_some()
    }
}

/// Cumulative counters since construction.
#[derive(Debug, Default)]
struct Counters {
    total_requests: u64,
    successful_requests: u64,
    key_rotations: u64,
    rate_limit_hits: u64,
}

#[derive(Debug)]
struct PoolInner {
    records: Vec<KeyRecord>,
    cursor: usize,
    counters: Counters,
}

/// Per-key snapshot for the stats listing. Credentials are masked.
#[derive(Debug, Clone, Serialize)]
pub struct KeySnapshot {
    pub index: usize,
    pub masked: String,
    pub last_used_secs_ago: Option<u64>,
    pub failure_count: u32,
    pub on_cooldown: bool,
    pub cooldown_remaining_secs: Option<u64>,
}

/// Pool statistics: cumulative counters plus a live per-key snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub total_keys: usize,
    pub available_keys: usize,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub key_rotations: u64,
    pub rate_limit_hits: u64,
    pub keys: Vec<KeySnapshot>,
}

/// Rotating pool of Gemini API keys.
///
/// Membership is fixed at construction; duplicates are dropped keeping the
/// first occurrence. Acquisition never fails: when every key is cooling down
/// the pool degrades to the key that recovers soonest rather than refusing
/// the request.
#[derive(Debug)]
pub struct KeyPool {
    inner: Mutex<PoolInner>,
    config: PoolConfig,
}

impl KeyPool {
    /// Build a pool from the gathered credentials.
    ///
    /// Returns `Error::NoKeys` when the deduplicated list is empty — the one
    /// unrecoverable error in this crate, surfaced at startup.
    pub fn new(credentials: Vec<String>, config: PoolConfig) -> Result<Self> {
        let mut records: Vec<KeyRecord> = Vec::new();
        for credential in credentials {
            if records.iter().any(|r| r.credential == credential) {
                continue;
            }
            let pool_index = records.len();
            records.push(KeyRecord::new(credential, pool_index));
        }

        if records.is_empty() {
            return Err(Error::NoKeys);
        }

        info!(
            keys = records.len(),
            rotation_enabled = config.rotation_enabled,
            failure_threshold = config.failure_threshold,
            cooldown_secs = config.cooldown.as_secs(),
            "key pool initialized"
        );

        Ok(Self {
            inner: Mutex::new(PoolInner {
                records,
                cursor: 0,
                counters: Counters::default(),
            }),
            config,
        })
    }

    fn locked(&self) -> MutexGuard<'_, PoolInner> {
        self.inner.lock().expect("key pool mutex poisoned")
    }

    /// Select a key for the next upstream request.
    ///
    /// Expired cooldowns are cleared first (failure counts reset with them).
    /// With rotation disabled the lowest-index available key is returned with
    /// no bookkeeping. With rotation enabled the cursor key is reused while
    /// it stays available; otherwise the pool rotates to the least-recently
    /// used available key. When nothing is available the key with the soonest
    /// cooldown deadline is returned as the least-bad choice.
    pub fn acquire(&self) -> SelectedKey {
        let mut inner = self.locked();
        let now = Instant::now();
        sweep_expired(&mut inner, now);

        if !inner.records.iter().any(|r| !r.on_cooldown()) {
            // Degrade rather than fail: hand out the key that recovers
            // soonest, accepting that it may still be rejected upstream.
            let record = inner
                .records
                .iter()
                .min_by_key(|r| r.cooldown_until)
                .expect("pool is never empty");
            warn!(
                index = record.pool_index,
                "all keys on cooldown, returning soonest-recovering key"
            );
            return SelectedKey {
                index: record.pool_index,
                credential: record.credential.clone(),
            };
        }

        if !self.config.rotation_enabled {
            let record = inner
                .records
                .iter()
                .find(|r| !r.on_cooldown())
                .expect("an available key exists");
            return SelectedKey {
                index: record.pool_index,
                credential: record.credential.clone(),
            };
        }

        let cursor = inner.cursor;
        if !inner.records[cursor].on_cooldown() {
            inner.records[cursor].last_used_at = Some(now);
            inner.counters.total_requests += 1;
            let credential = inner.records[cursor].credential.clone();
            return SelectedKey {
                index: cursor,
                credential,
            };
        }

        self.rotate_locked(&mut inner, now)
            .expect("an available key exists")
    }

    /// Record an upstream failure for a key.
    ///
    /// Unknown credentials are ignored: failure reports are best-effort
    /// telemetry and a stale reference must not take down the request path.
    pub fn report_failure(&self, credential: &str, is_rate_limit: bool) {
        let mut inner = self.locked();
        let now = Instant::now();

        let Some(index) = inner
            .records
            .iter()
            .position(|r| r.credential == credential)
        else {
            warn!(
                key = %common::mask(credential),
                "failure reported for unknown key"
            );
            return;
        };

        inner.records[index].consecutive_failures += 1;

        if is_rate_limit {
            inner.counters.rate_limit_hits += 1;
            metrics::counter!("gemini_pool_cooldowns_total", "reason" => "rate_limit").increment(1);
            warn!(
                index,
                cooldown_secs = self.config.cooldown.as_secs(),
                "key rate limited, entering cooldown"
            );
            self.start_cooldown(&mut inner, index, now);
        } else if inner.records[index].consecutive_failures >= self.config.failure_threshold {
            metrics::counter!("gemini_pool_cooldowns_total", "reason" => "failure_threshold")
                .increment(1);
            warn!(
                index,
                failures = inner.records[index].consecutive_failures,
                cooldown_secs = self.config.cooldown.as_secs(),
                "key reached failure threshold, entering cooldown"
            );
            self.start_cooldown(&mut inner, index, now);
        }
    }

    /// Record a successful use of a key.
    ///
    /// A single success forgives one prior failure, not all of them: the
    /// counter steps down by one and floors at zero. Unknown credentials are
    /// ignored.
    pub fn report_success(&self, credential: &str) {
        let mut inner = self.locked();
        let Some(index) = inner
            .records
            .iter()
            .position(|r| r.credential == credential)
        else {
            return;
        };
        inner.records[index].consecutive_failures =
            inner.records[index].consecutive_failures.saturating_sub(1);
        inner.counters.successful_requests += 1;
    }

    /// Manually advance the rotation cursor to the next available key.
    ///
    /// With rotation disabled this is a plain acquisition. With rotation
    /// enabled the cursor moves unconditionally, even when the current key is
    /// still usable; errors with `PoolExhausted` when every key is cooling
    /// down.
    pub fn force_rotation(&self) -> Result<SelectedKey> {
        if !self.config.rotation_enabled {
            warn!("rotation disabled, treating forced rotation as plain acquisition");
            return Ok(self.acquire());
        }

        let mut inner = self.locked();
        let now = Instant::now();
        sweep_expired(&mut inner, now);
        self.rotate_locked(&mut inner, now)
    }

    /// Clear cooldowns and failure counts on every key. Administrative
    /// escape hatch.
    pub fn reset_all_cooldowns(&self) {
        let mut inner = self.locked();
        for record in &mut inner.records {
            record.cooldown_until = None;
            record.consecutive_failures = 0;
        }
        info!("all key cooldowns reset");
    }

    /// Cumulative counters plus a live per-key snapshot.
    ///
    /// Runs the same cooldown-expiry sweep as `acquire`, so a key whose
    /// deadline has passed already counts as available here.
    pub fn stats(&self) -> PoolStats {
        let mut inner = self.locked();
        let now = Instant::now();
        sweep_expired(&mut inner, now);

        let keys: Vec<KeySnapshot> = inner
            .records
            .iter()
            .map(|r| KeySnapshot {
                index: r.pool_index,
                masked: common::mask(&r.credential),
                last_used_secs_ago: r.last_used_at.map(|t| now.duration_since(t).as_secs()),
                failure_count: r.consecutive_failures,
                on_cooldown: r.on_cooldown(),
                cooldown_remaining_secs: r
                    .cooldown_until
                    .map(|until| until.saturating_duration_since(now).as_secs()),
            })
            .collect();

        let available_keys = inner.records.iter().filter(|r| !r.on_cooldown()).count();

        PoolStats {
            total_keys: inner.records.len(),
            available_keys,
            total_requests: inner.counters.total_requests,
            successful_requests: inner.counters.successful_requests,
            key_rotations: inner.counters.key_rotations,
            rate_limit_hits: inner.counters.rate_limit_hits,
            keys,
        }
    }

    /// Pool health summary for the health endpoint.
    ///
    /// Status mapping: all keys available → healthy, some available →
    /// degraded, none available → unhealthy.
    pub fn health(&self) -> serde_json::Value {
        let stats = self.stats();
        let status = if stats.available_keys == stats.total_keys {
            "healthy"
        } else if stats.available_keys > 0 {
            "degraded"
        } else {
            "unhealthy"
        };

        serde_json::json!({
            "status": status,
            "keys_total": stats.total_keys,
            "keys_available": stats.available_keys,
            "keys": stats.keys,
        })
    }

    /// Put a key on cooldown, then move the cursor off it while another key
    /// is still usable so the next acquisition does not have to route around
    /// a stale cursor.
    fn start_cooldown(&self, inner: &mut PoolInner, index: usize, now: Instant) {
        inner.records[index].cooldown_until = Some(now + self.config.cooldown);

        if self.config.rotation_enabled && inner.records.iter().any(|r| !r.on_cooldown()) {
            let _ = self.rotate_locked(inner, now);
        }
    }

    /// Rotate the cursor to the least-recently-used available key.
    ///
    /// Never-used keys sort before any used key; ties break toward the
    /// lowest pool index. Updates rotation bookkeeping on the target.
    fn rotate_locked(&self, inner: &mut PoolInner, now: Instant) -> Result<SelectedKey> {
        let target = inner
            .records
            .iter()
            .filter(|r| !r.on_cooldown())
            .min_by_key(|r| r.last_used_at)
            .map(|r| r.pool_index)
            .ok_or(Error::PoolExhausted)?;

        inner.cursor = target;
        inner.records[target].last_used_at = Some(now);
        inner.counters.total_requests += 1;
        inner.counters.key_rotations += 1;

        info!(
            index = target,
            rotations = inner.counters.key_rotations,
            "rotated to key"
        );

        Ok(SelectedKey {
            index: target,
            credential: inner.records[target].credential.clone(),
        })
    }
}

/// Clear expired cooldowns. Expiry fully resets the failure count — the key
/// re-enters the pool with a clean slate.
fn sweep_expired(inner: &mut PoolInner, now: Instant) {
    for record in &mut inner.records {
        if let Some(until) = record.cooldown_until {
            if now >= until {
                record.cooldown_until = None;
                record.consecutive_failures = 0;
                info!(index = record.pool_index, "cooldown expired, key available again");
            }
        }
    }
}
