//! A TTL-based cache of resource records, with binary on-disk persistence.
//!
//! Keyed by `(qtype, name)`; each bucket holds `(record, inserted_at)`
//! pairs. Shared across the tasks serving concurrent queries behind an
//! `Arc<Mutex<_>>` wrapper (`SharedCache`).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::protocol::types::{DomainName, RecordType, ResourceRecord};

/// The cache key deliberately excludes record class: every record this
/// resolver handles is class IN.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub qtype: RecordType,
    pub name: DomainName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedRecord {
    record: ResourceRecord,
    #[serde(with = "system_time_as_unix_secs")]
    inserted_at: SystemTime,
}

impl CachedRecord {
    fn is_expired(&self, now: SystemTime) -> bool {
        let age = now
            .duration_since(self.inserted_at)
            .unwrap_or(Duration::ZERO);
        age.as_secs() >= self.record.ttl as u64
    }
}

/// The cache proper: an in-memory map, loaded from and periodically
/// flushed back to disk.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Cache {
    entries: HashMap<CacheKey, Vec<CachedRecord>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer, deduplicating against any existing entry with
    /// the same record contents (re-inserting a record refreshes its
    /// age).
    pub fn put(&mut self, record: ResourceRecord, now: SystemTime) {
        let key = CacheKey {
            qtype: record.rtype,
            name: record.name.clone(),
        };
        let bucket = self.entries.entry(key).or_default();
        bucket.retain(|cached| cached.record != record);
        bucket.push(CachedRecord {
            record,
            inserted_at: now,
        });
    }

    /// Look up unexpired records for `(qtype, name)`. Expired records are
    /// left for the next `refresh` to sweep rather than removed here, so
    /// that a read-only lookup never needs `&mut self`... except the
    /// cache is always accessed through the mutex anyway, so this takes
    /// `&self` purely for clarity of intent.
    pub fn get(&self, qtype: RecordType, name: &DomainName, now: SystemTime) -> Vec<ResourceRecord> {
        let key = CacheKey {
            qtype,
            name: name.clone(),
        };
        match self.entries.get(&key) {
            Some(bucket) => bucket
                .iter()
                .filter(|cached| !cached.is_expired(now))
                .map(|cached| cached.record.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Drop every expired record, and any key left with an empty bucket.
    pub fn refresh(&mut self, now: SystemTime) {
        self.entries.retain(|_, bucket| {
            bucket.retain(|cached| !cached.is_expired(now));
            !bucket.is_empty()
        });
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Load a cache snapshot from `path`. A missing file is treated as an
    /// empty cache (first run); a corrupt file is also treated as empty,
    /// with a warning logged, rather than refusing to start.
    pub async fn load(path: &Path) -> Self {
        match tokio::fs::read(path).await {
            Ok(bytes) => match bincode::deserialize::<Cache>(&bytes) {
                Ok(mut cache) => {
                    cache.refresh(SystemTime::now());
                    cache
                }
                Err(err) => {
                    tracing::warn!(error = %err, path = %path.display(), "cache file is corrupt, starting empty");
                    Cache::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Cache::new(),
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "could not read cache file, starting empty");
                Cache::new()
            }
        }
    }

    /// Persist a snapshot to `path`, writing to a temp file in the same
    /// directory and renaming over the target so a crash mid-write never
    /// leaves a truncated cache file behind.
    pub async fn save(&self, path: &Path) -> std::io::Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;

        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }
}

/// A cache shared between the server's query-handling tasks and its
/// periodic-snapshot task.
#[derive(Debug, Clone)]
pub struct SharedCache(Arc<Mutex<Cache>>);

impl SharedCache {
    pub fn new(cache: Cache) -> Self {
        Self(Arc::new(Mutex::new(cache)))
    }

    pub async fn put(&self, record: ResourceRecord, now: SystemTime) {
        self.0.lock().await.put(record, now);
    }

    pub async fn get(&self, qtype: RecordType, name: &DomainName, now: SystemTime) -> Vec<ResourceRecord> {
        self.0.lock().await.get(qtype, name, now)
    }

    pub async fn refresh(&self, now: SystemTime) {
        self.0.lock().await.refresh(now);
    }

    pub async fn save(&self, path: &Path) -> std::io::Result<()> {
        self.0.lock().await.save(path).await
    }
}

/// `SystemTime` has no stable wire representation in `bincode` by
/// default portable across platforms, so cached timestamps are stored as
/// whole seconds since the Unix epoch.
mod system_time_as_unix_secs {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
        let secs = time
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        serializer.serialize_u64(secs)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SystemTime, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::RecordClass;

    fn a_record(name: &str, ttl: u32) -> ResourceRecord {
        ResourceRecord {
            name: DomainName::from_dotted_string(name).unwrap(),
            rtype: RecordType::A,
            rclass: RecordClass::IN,
            ttl,
            rdata: vec![127, 0, 0, 1],
            decoded_name: None,
        }
    }

    #[test]
    fn put_then_get_returns_the_record() {
        let mut cache = Cache::new();
        let now = SystemTime::now();
        cache.put(a_record("example.com", 300), now);
        let name = DomainName::from_dotted_string("example.com").unwrap();
        assert_eq!(1, cache.get(RecordType::A, &name, now).len());
    }

    #[test]
    fn put_is_idempotent_for_identical_records() {
        let mut cache = Cache::new();
        let now = SystemTime::now();
        cache.put(a_record("example.com", 300), now);
        cache.put(a_record("example.com", 300), now);
        assert_eq!(1, cache.len());
    }

    #[test]
    fn get_excludes_expired_records() {
        let mut cache = Cache::new();
        let inserted_at = SystemTime::now() - Duration::from_secs(10);
        cache.put(a_record("example.com", 5), inserted_at);
        let name = DomainName::from_dotted_string("example.com").unwrap();
        assert!(cache.get(RecordType::A, &name, SystemTime::now()).is_empty());
    }

    #[test]
    fn zero_ttl_record_is_immediately_expired() {
        let mut cache = Cache::new();
        let now = SystemTime::now();
        cache.put(a_record("example.com", 0), now);
        let name = DomainName::from_dotted_string("example.com").unwrap();
        assert!(cache.get(RecordType::A, &name, now).is_empty());
    }

    #[test]
    fn refresh_drops_expired_entries_and_empty_buckets() {
        let mut cache = Cache::new();
        let inserted_at = SystemTime::now() - Duration::from_secs(10);
        cache.put(a_record("example.com", 5), inserted_at);
        assert_eq!(1, cache.len());
        cache.refresh(SystemTime::now());
        assert_eq!(0, cache.len());
    }

    #[tokio::test]
    async fn save_then_load_round_trips_unexpired_records() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("resolvd-cache-test-{}.db", std::process::id()));

        let mut cache = Cache::new();
        let now = SystemTime::now();
        cache.put(a_record("example.com", 300), now);
        cache.save(&path).await.unwrap();

        let loaded = Cache::load(&path).await;
        let name = DomainName::from_dotted_string("example.com").unwrap();
        assert_eq!(1, loaded.get(RecordType::A, &name, now).len());

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn load_of_missing_file_is_an_empty_cache() {
        let path = std::env::temp_dir().join("resolvd-cache-does-not-exist.db");
        let _ = tokio::fs::remove_file(&path).await;
        let cache = Cache::load(&path).await;
        assert_eq!(0, cache.len());
    }
}
