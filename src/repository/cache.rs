use base64::prelude::{Engine, BASE64_STANDARD};
use std::collections::{HashMap, VecDeque};
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, serde::Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_size")]
    size: usize,
    #[serde(default = "Config::default_path")]
    path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            size: Self::default_size(),
            path: Self::default_path(),
        }
    }
}

impl Config {
    pub fn default_size() -> usize {
        1000
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("cash.json")
    }
}

impl Config {
    pub async fn build(self) -> std::io::Result<MemoryCacheService> {
        let service = MemoryCacheService::new(self.size, self.path);
        service.restore();
        Ok(service)
    }
}

#[derive(Debug)]
pub enum SnapshotError {
    Corrupt(serde_json::Error),
    Io(std::io::Error),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Corrupt(inner) => write!(f, "snapshot unparseable: {inner}"),
            Self::Io(inner) => write!(f, "snapshot file unreachable: {inner}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<serde_json::Error> for SnapshotError {
    fn from(value: serde_json::Error) -> Self {
        Self::Corrupt(value)
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

#[async_trait::async_trait]
pub trait CacheService {
    /// Check for an unexpired entry. An expired entry found on the way is
    /// removed before answering.
    async fn contains(&self, key: &[u8]) -> bool;
    /// Fetch the cached response body, transaction id excluded. A hit
    /// grants the entry its second chance back.
    async fn request(&self, key: &[u8]) -> Option<Vec<u8>>;
    /// Insert a response body valid for `ttl` seconds, evicting when full.
    async fn persist(&self, key: &[u8], response: &[u8], ttl: u32);
    /// Write every live entry to the snapshot file.
    async fn save(&self) -> Result<(), SnapshotError>;
}

#[derive(Debug, Clone)]
struct CacheRecord {
    /// Response bytes without the transaction id.
    response: Vec<u8>,
    /// Absolute expiry.
    deadline: SystemTime,
    /// Second chance bit, granted on insert and on every read hit.
    fresh: bool,
}

impl CacheRecord {
    fn expired(&self, now: SystemTime) -> bool {
        self.deadline <= now
    }
}

/// On-disk form of a cache entry. Key and response bytes are base64 so
/// arbitrary binary survives the file.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct SnapshotRecord {
    response: String,
    #[serde(rename = "let")]
    deadline: f64,
    r: bool,
}

/// Entries live in `records` and their keys sit exactly once in `queue`,
/// both guarded by the same mutex.
#[derive(Debug, Default)]
struct CacheInner {
    queue: VecDeque<Vec<u8>>,
    records: HashMap<Vec<u8>, CacheRecord>,
}

pub struct MemoryCacheService {
    capacity: usize,
    path: PathBuf,
    inner: Mutex<CacheInner>,
}

impl MemoryCacheService {
    fn new(capacity: usize, path: PathBuf) -> Self {
        Self {
            capacity,
            path,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().expect("cache lock poisoned")
    }

    fn remove(inner: &mut CacheInner, key: &[u8]) {
        inner.records.remove(key);
        inner.queue.retain(|queued| queued != key);
    }

    /// Load the snapshot file if there is one. A missing or unreadable
    /// file leaves the cache empty, it never fails startup.
    fn restore(&self) {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return,
            Err(error) => {
                tracing::warn!("couldn't read cache snapshot: {error}");
                return;
            }
        };
        let snapshot: HashMap<String, SnapshotRecord> = match serde_json::from_slice(&data) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!("cache snapshot corrupted, starting empty: {error}");
                return;
            }
        };

        let now = SystemTime::now();
        let mut inner = self.lock();
        for (key, record) in snapshot {
            if inner.records.len() >= self.capacity {
                break;
            }
            let Ok(key) = BASE64_STANDARD.decode(&key) else {
                tracing::warn!("skipping snapshot record with invalid key");
                continue;
            };
            let Ok(response) = BASE64_STANDARD.decode(&record.response) else {
                tracing::warn!("skipping snapshot record with invalid response");
                continue;
            };
            if !record.deadline.is_finite() || record.deadline < 0.0 {
                continue;
            }
            let deadline = UNIX_EPOCH + Duration::from_secs_f64(record.deadline);
            if deadline <= now {
                continue;
            }
            let previous = inner.records.insert(
                key.clone(),
                CacheRecord {
                    response,
                    deadline,
                    fresh: record.r,
                },
            );
            if previous.is_none() {
                inner.queue.push_back(key);
            }
        }
        tracing::info!("restored {} cache entries", inner.records.len());
    }
}

#[async_trait::async_trait]
impl CacheService for MemoryCacheService {
    async fn contains(&self, key: &[u8]) -> bool {
        let now = SystemTime::now();
        let mut inner = self.lock();
        let expired = match inner.records.get(key) {
            Some(record) => record.expired(now),
            None => return false,
        };
        if expired {
            Self::remove(&mut inner, key);
            return false;
        }
        true
    }

    async fn request(&self, key: &[u8]) -> Option<Vec<u8>> {
        let now = SystemTime::now();
        let mut inner = self.lock();
        let expired = inner.records.get(key)?.expired(now);
        if expired {
            Self::remove(&mut inner, key);
            return None;
        }
        let record = inner.records.get_mut(key)?;
        record.fresh = true;
        Some(record.response.clone())
    }

    #[tracing::instrument(skip_all)]
    async fn persist(&self, key: &[u8], response: &[u8], ttl: u32) {
        if self.capacity == 0 {
            return;
        }
        let now = SystemTime::now();
        let deadline = now + Duration::from_secs(u64::from(ttl));
        let mut inner = self.lock();

        if let Some(record) = inner.records.get_mut(key) {
            // the key already holds its single queue slot
            *record = CacheRecord {
                response: response.to_vec(),
                deadline,
                fresh: true,
            };
            return;
        }

        while inner.records.len() >= self.capacity {
            let Some(candidate) = inner.queue.pop_front() else {
                break;
            };
            let keep = match inner.records.get_mut(&candidate) {
                Some(record) => {
                    let keep = record.fresh && !record.expired(now);
                    record.fresh = false;
                    keep
                }
                None => false,
            };
            if keep {
                inner.queue.push_back(candidate);
            } else {
                tracing::debug!("evicting cache entry");
                inner.records.remove(&candidate);
            }
        }

        inner.records.insert(
            key.to_vec(),
            CacheRecord {
                response: response.to_vec(),
                deadline,
                fresh: true,
            },
        );
        inner.queue.push_back(key.to_vec());
    }

    #[tracing::instrument(skip_all)]
    async fn save(&self) -> Result<(), SnapshotError> {
        let snapshot: HashMap<String, SnapshotRecord> = {
            let inner = self.lock();
            inner
                .records
                .iter()
                .map(|(key, record)| {
                    (
                        BASE64_STANDARD.encode(key),
                        SnapshotRecord {
                            response: BASE64_STANDARD.encode(&record.response),
                            deadline: record
                                .deadline
                                .duration_since(UNIX_EPOCH)
                                .map(|since| since.as_secs_f64())
                                .unwrap_or(0.0),
                            r: record.fresh,
                        },
                    )
                })
                .collect()
        };
        let data = serde_json::to_vec(&snapshot)?;
        std::fs::write(&self.path, data)?;
        tracing::info!("saved {} cache entries to {:?}", snapshot.len(), self.path);
        Ok(())
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockCacheService {
    inner: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
}

#[cfg(test)]
impl MockCacheService {
    pub fn with_entry(self, key: &[u8], response: &[u8]) -> Self {
        self.inner
            .lock()
            .unwrap()
            .insert(key.to_vec(), response.to_vec());
        self
    }

    pub fn entry(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().get(key).cloned()
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl CacheService for MockCacheService {
    async fn contains(&self, key: &[u8]) -> bool {
        self.inner.lock().unwrap().contains_key(key)
    }

    async fn request(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().get(key).cloned()
    }

    async fn persist(&self, key: &[u8], response: &[u8], _ttl: u32) {
        self.inner
            .lock()
            .unwrap()
            .insert(key.to_vec(), response.to_vec());
    }

    async fn save(&self) -> Result<(), SnapshotError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheService, MemoryCacheService};
    use std::time::{Duration, SystemTime};

    fn service(capacity: usize) -> MemoryCacheService {
        MemoryCacheService::new(capacity, "cash.json".into())
    }

    #[tokio::test]
    async fn should_return_persisted_response() {
        let srv = service(10);
        srv.persist(b"key", b"response", 60).await;
        assert!(srv.contains(b"key").await);
        assert_eq!(srv.request(b"key").await.unwrap(), b"response");
    }

    #[tokio::test]
    async fn should_replace_existing_key_without_duplicating_queue_slot() {
        let srv = service(10);
        srv.persist(b"key", b"first", 60).await;
        srv.persist(b"key", b"second", 60).await;
        assert_eq!(srv.request(b"key").await.unwrap(), b"second");
        let inner = srv.lock();
        assert_eq!(inner.queue.len(), 1);
        assert_eq!(inner.records.len(), 1);
    }

    #[tokio::test]
    async fn should_evict_oldest_entry_first() {
        let srv = service(3);
        srv.persist(b"k1", b"r1", 600).await;
        srv.persist(b"k2", b"r2", 600).await;
        srv.persist(b"k3", b"r3", 600).await;
        srv.persist(b"k4", b"r4", 600).await;

        assert!(!srv.contains(b"k1").await);
        assert!(srv.contains(b"k2").await);
        assert!(srv.contains(b"k3").await);
        assert!(srv.contains(b"k4").await);
        assert_eq!(srv.lock().records.len(), 3);
    }

    #[tokio::test]
    async fn should_let_read_entry_survive_an_extra_eviction_cycle() {
        let srv = service(3);
        srv.persist(b"k1", b"r1", 600).await;
        srv.persist(b"k2", b"r2", 600).await;
        srv.persist(b"k3", b"r3", 600).await;
        // the first eviction pass takes everyone's second chance
        srv.persist(b"k4", b"r4", 600).await;

        let _ = srv.request(b"k2").await.unwrap();
        srv.persist(b"k5", b"r5", 600).await;

        assert!(srv.contains(b"k2").await);
        assert!(!srv.contains(b"k3").await);
    }

    #[tokio::test]
    async fn should_not_keep_entry_with_zero_ttl() {
        let srv = service(10);
        srv.persist(b"key", b"response", 0).await;
        std::thread::sleep(Duration::from_millis(5));
        assert!(!srv.contains(b"key").await);
        let inner = srv.lock();
        assert!(inner.records.is_empty());
        assert!(inner.queue.is_empty());
    }

    #[tokio::test]
    async fn should_flush_expired_entry_on_request() {
        let srv = service(10);
        srv.persist(b"key", b"response", 60).await;
        srv.lock()
            .records
            .get_mut(b"key".as_slice())
            .unwrap()
            .deadline = SystemTime::now() - Duration::from_secs(10);

        assert!(srv.request(b"key").await.is_none());
        let inner = srv.lock();
        assert!(inner.records.is_empty());
        assert!(inner.queue.is_empty());
    }

    #[tokio::test]
    async fn should_not_persist_with_zero_capacity() {
        let srv = service(0);
        srv.persist(b"key", b"response", 60).await;
        assert!(!srv.contains(b"key").await);
        assert!(srv.lock().records.is_empty());
    }

    #[tokio::test]
    async fn should_roundtrip_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cash.json");
        let key = b"\x07example\x03com\x00\x00\x01\x00\x01";
        let response = [0x00, 0xFF, 0x80, 0x7F, b'a'];

        let srv = MemoryCacheService::new(10, path.clone());
        srv.persist(key, &response, 600).await;
        srv.save().await.unwrap();

        let restored = MemoryCacheService::new(10, path);
        restored.restore();
        assert!(restored.contains(key).await);
        assert_eq!(restored.request(key).await.unwrap(), response);
    }

    #[tokio::test]
    async fn should_skip_expired_snapshot_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cash.json");

        let srv = MemoryCacheService::new(10, path.clone());
        srv.persist(b"gone", b"r1", 600).await;
        srv.persist(b"kept", b"r2", 600).await;
        srv.lock()
            .records
            .get_mut(b"gone".as_slice())
            .unwrap()
            .deadline = SystemTime::now() - Duration::from_secs(10);
        srv.save().await.unwrap();

        let restored = MemoryCacheService::new(10, path);
        restored.restore();
        assert!(!restored.contains(b"gone").await);
        assert!(restored.contains(b"kept").await);
    }

    #[tokio::test]
    async fn should_start_empty_with_corrupt_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cash.json");
        std::fs::write(&path, b"{ definitely not json").unwrap();

        let srv = MemoryCacheService::new(10, path);
        srv.restore();
        assert!(srv.lock().records.is_empty());
    }

    #[tokio::test]
    async fn should_start_empty_without_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let srv = MemoryCacheService::new(10, dir.path().join("cash.json"));
        srv.restore();
        assert!(srv.lock().records.is_empty());
    }

    #[tokio::test]
    async fn should_restore_at_most_capacity_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cash.json");

        let srv = MemoryCacheService::new(10, path.clone());
        for key in [b"k1", b"k2", b"k3", b"k4"] {
            srv.persist(key, b"response", 600).await;
        }
        srv.save().await.unwrap();

        let restored = MemoryCacheService::new(2, path);
        restored.restore();
        let inner = restored.lock();
        assert_eq!(inner.records.len(), 2);
        assert_eq!(inner.queue.len(), 2);
    }
}
