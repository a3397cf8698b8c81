//! TTL cache for AI-assisted match results.
//!
//! Entries are keyed by a SHA-256 digest of the serialised
//! (idea features, opportunity features) pair, so any change to either side
//! misses the cache.

use std::{
  collections::HashMap,
  sync::{Mutex, MutexGuard, PoisonError},
  time::Duration,
};

use sha2::{Digest, Sha256};
use tokio::time::Instant;
use uplink_core::matching::{IdeaFeatures, MatchCandidate, OpportunityFeatures};

pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

pub fn cache_key(idea: &IdeaFeatures, opportunity: &OpportunityFeatures) -> String {
  let bytes = serde_json::to_vec(&(idea, opportunity)).unwrap_or_default();
  hex::encode(Sha256::digest(&bytes))
}

#[derive(Debug)]
struct Entry {
  expires_at: Instant,
  candidate:  MatchCandidate,
}

#[derive(Debug)]
pub struct MatchCache {
  ttl:     Duration,
  entries: Mutex<Entries>,
}

#[derive(Debug)]
struct Entries {
  map:        HashMap<String, Entry>,
  next_sweep: Instant,
}

impl Default for MatchCache {
  fn default() -> Self { Self::new(DEFAULT_TTL) }
}

impl MatchCache {
  pub fn new(ttl: Duration) -> Self {
    let entries = Entries { map: HashMap::new(), next_sweep: Instant::now() + ttl };
    Self { ttl, entries: Mutex::new(entries) }
  }

  fn lock(&self) -> MutexGuard<'_, Entries> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn ttl(&self) -> Duration { self.ttl }

  pub fn get(&self, key: &str) -> Option<MatchCandidate> {
    let mut entries = self.lock();
    match entries.map.get(key) {
      Some(e) if e.expires_at > Instant::now() => Some(e.candidate.clone()),
      Some(_) => {
        entries.map.remove(key);
        None
      }
      None => None,
    }
  }

  /// Store a result. At most once per TTL period an insert also drops every
  /// expired entry, so the map holds roughly two periods' worth of keys.
  pub fn insert(&self, key: String, candidate: MatchCandidate) {
    let now = Instant::now();
    let mut entries = self.lock();
    if now >= entries.next_sweep {
      entries.map.retain(|_, e| e.expires_at > now);
      entries.next_sweep = now + self.ttl;
    }
    entries.map.insert(key, Entry { expires_at: now + self.ttl, candidate });
  }

  /// Drop expired entries; returns how many were removed.
  pub fn purge_expired(&self) -> usize {
    let now = Instant::now();
    let mut entries = self.lock();
    let before = entries.map.len();
    entries.map.retain(|_, e| e.expires_at > now);
    entries.next_sweep = now + self.ttl;
    before - entries.map.len()
  }

  pub fn clear(&self) { self.lock().map.clear(); }

  pub fn len(&self) -> usize { self.lock().map.len() }

  pub fn is_empty(&self) -> bool { self.lock().map.is_empty() }
}
