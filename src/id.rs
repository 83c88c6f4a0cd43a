//! Document identifiers
//!
//! Every stored document is keyed by a 24-character lowercase hex id laid out
//! like a Mongo ObjectId:
//!
//! | hex digits | content                                     |
//! |------------|---------------------------------------------|
//! | 0..8       | creation time, big-endian Unix seconds      |
//! | 8..18      | random value fixed for the process lifetime |
//! | 18..24     | per-process counter                         |
//!
//! Within one process, ids therefore sort in creation order even when many are
//! made in the same second, and each id carries its own timestamp.
//!
//! Documents imported from the old flat files keep their short alphanumeric
//! ids. Those are accepted by [`DocId::parse`] but carry no timestamp.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use chrono::{DateTime, TimeZone, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

const ID_LEN: usize = 24;
const TIMESTAMP_LEN: usize = 8;
const LEGACY_MAX_LEN: usize = 64;
const COUNTER_MASK: u32 = 0x00ff_ffff;

static PROCESS_RANDOM: OnceLock<u64> = OnceLock::new();
static COUNTER: AtomicU32 = AtomicU32::new(0);

/// 5 random bytes chosen once per process
fn process_random() -> u64 {
    *PROCESS_RANDOM.get_or_init(|| rand::rng().random::<u64>() & 0xff_ffff_ffff)
}

/// Opaque document identifier
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    /// Generates a fresh id stamped with the current time
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    /// Generates an id stamped with `at` (seconds precision)
    ///
    /// Ids from the same process and second are ordered by a 24-bit counter,
    /// which wraps after 16,777,216 ids.
    pub fn generate_at(at: DateTime<Utc>) -> Self {
        let secs = u32::try_from(at.timestamp().max(0)).unwrap_or(u32::MAX);
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;
        DocId(format!("{secs:08x}{:010x}{count:06x}", process_random()))
    }

    /// Parses a client-supplied id
    ///
    /// Accepts the 24-hex-digit form (normalized to lowercase) and the short
    /// alphanumeric ids of imported flat-file data (kept as-is). Returns `None`
    /// for anything else so callers can reject the request before it reaches
    /// the storage layer.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() == ID_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Some(DocId(raw.to_ascii_lowercase()));
        }

        let legacy = !raw.is_empty()
            && raw.len() <= LEGACY_MAX_LEN
            && raw.bytes().all(|b| b.is_ascii_alphanumeric());
        legacy.then(|| DocId(raw.to_string()))
    }

    /// Creation time embedded in the id
    ///
    /// Ids that did not come from [`DocId::generate`] (legacy flat-file ids)
    /// carry no timestamp and yield `None`.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        if self.0.len() != ID_LEN {
            return None;
        }
        let secs = u32::from_str_radix(self.0.get(..TIMESTAMP_LEN)?, 16).ok()?;
        Utc.timestamp_opt(i64::from(secs), 0).single()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
