//! Rotating key pool for Gemini API credentials
//!
//! Manages multiple API keys with least-recently-used rotation, failure
//! counting, and rate-limit cooldowns. The pool is populated once at
//! construction from the configured credential sources and its membership
//! never changes afterwards; only per-key state (last use, failures,
//! cooldown) mutates over the process lifetime.
//!
//! Key lifecycle:
//! 1. Keys are gathered from the environment and registered in order
//! 2. `acquire` selects a key — sticky while the current key stays usable
//! 3. A rate-limited call (429) puts the key on cooldown immediately
//! 4. Repeated plain failures put the key on cooldown at the threshold
//! 5. Cooldown expiry is observed lazily on the next acquire/stats call —
//!    there is no background timer

pub mod error;
pub mod pool;

pub use error::{Error, Result};
pub use pool::{KeyPool, KeySnapshot, PoolConfig, PoolStats, SelectedKey};
