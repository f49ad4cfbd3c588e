//! Read-through entity cache with per-key single-flight population.
//!
//! Hits are non-blocking reads of already-populated entries. On a miss the
//! caller joins the in-flight load for that key if one exists, otherwise it
//! starts one; exactly one backing-store load happens per missing key no
//! matter how many callers race on it. Loads for distinct keys never share a
//! lock.
//!
//! Population runs on a spawned task: a caller that is cancelled while
//! waiting does not cancel the shared load, which still completes and
//! populates the entry for later callers. A failed load leaves the key
//! unpopulated (never poisoned) and clears the in-flight slot so the next
//! caller retries.
//!
//! Invalidation supersedes any load still in flight: the population task
//! captures the key's generation when it starts and discards its result if
//! the generation moved while it ran, so a stale read can never repopulate
//! an entry that was invalidated underneath it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use metrics::{counter, histogram};
use time::OffsetDateTime;
use tracing::debug;

use crate::application::repos::StoreError;
use crate::domain::types::Namespace;

use super::lock::{rw_read, rw_write};

const METRIC_CACHE_HIT: &str = "mortar_cache_hit_total";
const METRIC_CACHE_MISS: &str = "mortar_cache_miss_total";
const METRIC_CACHE_LOAD: &str = "mortar_cache_load_total";
const METRIC_CACHE_LOAD_ERROR: &str = "mortar_cache_load_error_total";
const METRIC_CACHE_LOAD_MS: &str = "mortar_cache_load_ms";

type LoadResult<T> = Result<Option<Arc<T>>, StoreError>;
type SharedLoad<T> = Shared<BoxFuture<'static, LoadResult<T>>>;

/// Loader future handed to [`EntityCache::get_or_load`]; owns everything it
/// needs so the population task can outlive the caller.
pub type LoadFuture<T> = BoxFuture<'static, Result<Option<T>, StoreError>>;

struct CacheEntry<T> {
    entity: Arc<T>,
    populated_at: OffsetDateTime,
}

/// An in-flight population, tagged with the key generation and reset epoch
/// it was started under so a superseded task can neither repopulate the
/// entry nor evict a newer load's slot.
struct FlightSlot<T> {
    generation: u64,
    epoch: u64,
    shared: SharedLoad<T>,
}

/// One namespace's keyed read-through cache.
pub struct EntityCache<T> {
    namespace: Namespace,
    enabled: bool,
    entries: Arc<RwLock<HashMap<String, CacheEntry<T>>>>,
    in_flight: Arc<DashMap<String, FlightSlot<T>>>,
    /// Per-key invalidation counter; bumped under the entries write lock so
    /// generation checks serialize against entry removal.
    generations: Arc<DashMap<String, u64>>,
    /// Bumped by [`clear`](Self::clear); supersedes every in-flight load at
    /// once.
    epoch: Arc<AtomicU64>,
}

impl<T> EntityCache<T>
where
    T: Send + Sync + 'static,
{
    /// A disabled cache stores nothing and every `get_or_load` goes to the
    /// backing store, but population stays single-flight so concurrent
    /// callers still cannot stampede it.
    pub fn new(namespace: Namespace, enabled: bool) -> Self {
        Self {
            namespace,
            enabled,
            entries: Arc::new(RwLock::new(HashMap::new())),
            in_flight: Arc::new(DashMap::new()),
            generations: Arc::new(DashMap::new()),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Non-blocking hit path; never touches the backing store.
    pub fn get_if_cached(&self, key: &str) -> Option<Arc<T>> {
        if !self.enabled {
            return None;
        }
        rw_read(&self.entries, self.namespace.as_str(), "get")
            .get(key)
            .map(|entry| Arc::clone(&entry.entity))
    }

    /// When the entry was last populated, if it is currently cached.
    pub fn populated_at(&self, key: &str) -> Option<OffsetDateTime> {
        rw_read(&self.entries, self.namespace.as_str(), "populated_at")
            .get(key)
            .map(|entry| entry.populated_at)
    }

    /// Read-through lookup. `Ok(None)` means the backing store has no record
    /// for the key; not-found results are never cached.
    pub async fn get_or_load<F>(&self, key: &str, load: F) -> LoadResult<T>
    where
        F: FnOnce(String) -> LoadFuture<T> + Send,
    {
        if let Some(hit) = self.get_if_cached(key) {
            counter!(METRIC_CACHE_HIT, "namespace" => self.namespace.as_str()).increment(1);
            return Ok(Some(hit));
        }

        let shared = match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(slot) => {
                counter!(METRIC_CACHE_MISS, "namespace" => self.namespace.as_str()).increment(1);
                slot.get().shared.clone()
            }
            Entry::Vacant(slot) => {
                // A load that finished between the lookup above and taking
                // the slot has already populated the entry; that counts as
                // a hit, not a miss.
                if let Some(hit) = self.get_if_cached(key) {
                    counter!(METRIC_CACHE_HIT, "namespace" => self.namespace.as_str())
                        .increment(1);
                    return Ok(Some(hit));
                }
                counter!(METRIC_CACHE_MISS, "namespace" => self.namespace.as_str()).increment(1);
                let flight = self.spawn_load(key.to_string(), load);
                let shared = flight.shared.clone();
                slot.insert(flight);
                shared
            }
        };

        shared.await
    }

    fn spawn_load<F>(&self, key: String, load: F) -> FlightSlot<T>
    where
        F: FnOnce(String) -> LoadFuture<T>,
    {
        let entries = Arc::clone(&self.entries);
        let in_flight = Arc::clone(&self.in_flight);
        let generations = Arc::clone(&self.generations);
        let epoch_counter = Arc::clone(&self.epoch);
        let namespace = self.namespace;
        let enabled = self.enabled;
        let generation = self.generation_of(&key);
        let epoch = self.epoch.load(Ordering::Acquire);
        let fut = load(key.clone());

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let result = fut.await.map(|loaded| loaded.map(Arc::new));
            histogram!(METRIC_CACHE_LOAD_MS, "namespace" => namespace.as_str())
                .record(started.elapsed().as_secs_f64() * 1000.0);

            match &result {
                Ok(Some(entity)) => {
                    counter!(METRIC_CACHE_LOAD, "namespace" => namespace.as_str()).increment(1);
                    if enabled {
                        // The generation check happens under the entries
                        // write lock, where invalidation bumps it, so a load
                        // superseded mid-flight can never repopulate the
                        // entry with its stale read.
                        let mut populated = rw_write(&entries, namespace.as_str(), "populate");
                        let current = generations.get(&key).map(|g| *g).unwrap_or(0);
                        if current == generation
                            && epoch_counter.load(Ordering::Acquire) == epoch
                        {
                            populated.insert(
                                key.clone(),
                                CacheEntry {
                                    entity: Arc::clone(entity),
                                    populated_at: OffsetDateTime::now_utc(),
                                },
                            );
                        } else {
                            debug!(
                                namespace = namespace.as_str(),
                                key, "load superseded by invalidation, result discarded"
                            );
                        }
                    }
                }
                Ok(None) => {
                    counter!(METRIC_CACHE_LOAD, "namespace" => namespace.as_str()).increment(1);
                    debug!(namespace = namespace.as_str(), key, "backing store miss");
                }
                Err(error) => {
                    counter!(METRIC_CACHE_LOAD_ERROR, "namespace" => namespace.as_str())
                        .increment(1);
                    debug!(namespace = namespace.as_str(), key, %error, "backing store load failed");
                }
            }

            // Clear the slot only after the entry is visible, so a late
            // joiner either hits the entry or shares this result. Matching
            // on generation and epoch keeps a superseded task from evicting
            // the slot of a load started after the invalidation.
            in_flight.remove_if(&key, |_, slot| {
                slot.generation == generation && slot.epoch == epoch
            });
            result
        });

        let shared = async move {
            match handle.await {
                Ok(result) => result,
                Err(join_error) => Err(StoreError::backend(format!(
                    "cache population task aborted: {join_error}"
                ))),
            }
        }
        .boxed()
        .shared();

        FlightSlot {
            generation,
            epoch,
            shared,
        }
    }

    fn generation_of(&self, key: &str) -> u64 {
        self.generations.get(key).map(|g| *g).unwrap_or(0)
    }

    /// Remove the entry if present and supersede any load still in flight
    /// for the key: the next lookup goes back to the backing store, and the
    /// superseded load's result is discarded rather than cached. Idempotent.
    pub fn invalidate(&self, key: &str) {
        {
            let mut entries = rw_write(&self.entries, self.namespace.as_str(), "invalidate");
            self.generations
                .entry(key.to_string())
                .and_modify(|generation| *generation += 1)
                .or_insert(1);
            entries.remove(key);
        }
        self.in_flight.remove(key);
    }

    /// Drop every entry (process-wide reset signal). Loads in flight when
    /// the reset lands are superseded like an invalidation.
    pub fn clear(&self) {
        {
            let mut entries = rw_write(&self.entries, self.namespace.as_str(), "clear");
            self.epoch.fetch_add(1, Ordering::AcqRel);
            entries.clear();
        }
        self.generations.clear();
        self.in_flight.clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, self.namespace.as_str(), "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    fn counting_loader(
        loads: Arc<AtomicUsize>,
        value: Option<u32>,
    ) -> impl FnOnce(String) -> LoadFuture<u32> + Send {
        move |_key| {
            async move {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(value)
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn second_lookup_serves_cached_entry() {
        let cache = EntityCache::<u32>::new(Namespace::Pages, true);
        let loads = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get_or_load("home", counting_loader(Arc::clone(&loads), Some(7)))
            .await
            .expect("load should succeed");
        assert_eq!(first.as_deref(), Some(&7));

        let second = cache
            .get_or_load("home", counting_loader(Arc::clone(&loads), Some(99)))
            .await
            .expect("cached lookup should succeed");
        assert_eq!(second.as_deref(), Some(&7));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(cache.populated_at("home").is_some());
    }

    #[tokio::test]
    async fn not_found_is_not_cached() {
        let cache = EntityCache::<u32>::new(Namespace::Files, true);
        let loads = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let missing = cache
                .get_or_load("ghost", counting_loader(Arc::clone(&loads), None))
                .await
                .expect("load should succeed");
            assert!(missing.is_none());
        }
        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn failed_load_leaves_key_retryable() {
        let cache = EntityCache::<u32>::new(Namespace::Projects, true);
        let loads = Arc::new(AtomicUsize::new(0));

        let failing = {
            let loads = Arc::clone(&loads);
            move |_key: String| {
                async move {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Err::<Option<u32>, _>(StoreError::backend("boom"))
                }
                .boxed()
            }
        };
        let error = cache
            .get_or_load("main", failing)
            .await
            .expect_err("injected failure should surface");
        assert!(matches!(error, StoreError::Backend { .. }));
        assert!(cache.is_empty());

        let recovered = cache
            .get_or_load("main", counting_loader(Arc::clone(&loads), Some(3)))
            .await
            .expect("retry should succeed");
        assert_eq!(recovered.as_deref(), Some(&3));
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_is_idempotent_and_forces_reload() {
        let cache = EntityCache::<u32>::new(Namespace::Uris, true);
        let loads = Arc::new(AtomicUsize::new(0));

        cache
            .get_or_load("news", counting_loader(Arc::clone(&loads), Some(1)))
            .await
            .expect("load should succeed");
        cache.invalidate("news");
        cache.invalidate("news");
        assert!(cache.is_empty());

        cache
            .get_or_load("news", counting_loader(Arc::clone(&loads), Some(2)))
            .await
            .expect("reload should succeed");
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_during_in_flight_load_discards_the_stale_result() {
        let cache = Arc::new(EntityCache::<u32>::new(Namespace::Pages, true));
        let backing = Arc::new(RwLock::new(1u32));
        let loads = Arc::new(AtomicUsize::new(0));

        // Reads the backing value, then stalls long enough for the update
        // and the invalidation to land before it completes.
        let slow_loader = {
            let backing = Arc::clone(&backing);
            let loads = Arc::clone(&loads);
            move |_key: String| {
                async move {
                    loads.fetch_add(1, Ordering::SeqCst);
                    let snapshot = *backing.read().unwrap();
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(Some(snapshot))
                }
                .boxed()
            }
        };
        let stale = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get_or_load("home", slow_loader).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        *backing.write().unwrap() = 2;
        cache.invalidate("home");

        let fresh = cache
            .get_or_load("home", counting_loader(Arc::clone(&loads), Some(2)))
            .await
            .expect("reload should succeed");
        assert_eq!(fresh.as_deref(), Some(&2));

        // The superseded load still completes for its own waiter with the
        // value it read, but must not clobber the fresh entry.
        let stale = stale
            .await
            .expect("task should not panic")
            .expect("superseded load should still complete");
        assert_eq!(stale.as_deref(), Some(&1));
        assert_eq!(cache.get_if_cached("home").as_deref(), Some(&2));
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn clear_supersedes_loads_in_flight() {
        let cache = Arc::new(EntityCache::<u32>::new(Namespace::Files, true));
        let loads = Arc::new(AtomicUsize::new(0));

        let slow_loader = {
            let loads = Arc::clone(&loads);
            move |_key: String| {
                async move {
                    loads.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(Some(1u32))
                }
                .boxed()
            }
        };
        let in_flight = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get_or_load("logo", slow_loader).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.clear();

        in_flight
            .await
            .expect("task should not panic")
            .expect("superseded load should still complete");
        assert!(cache.is_empty(), "a load crossing a reset must not repopulate");
    }

    #[tokio::test]
    async fn disabled_cache_passes_every_lookup_through() {
        let cache = EntityCache::<u32>::new(Namespace::Parameters, false);
        let loads = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let value = cache
                .get_or_load("limit", counting_loader(Arc::clone(&loads), Some(10)))
                .await
                .expect("passthrough load should succeed");
            assert_eq!(value.as_deref(), Some(&10));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 3);
        assert!(cache.is_empty());
    }
}
