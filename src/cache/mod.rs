pub mod keys;

pub use keys::QueryKey;

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::types::ApiError;
use crate::utils::spawn::Spawner;
use crate::utils::time::Clock;

pub const DEFAULT_STALE_MS: i64 = 5 * 60 * 1000;
pub const DEFAULT_GC_MS: i64 = 10 * 60 * 1000;
const MAX_RETRIES: u32 = 2;

#[derive(Clone, Copy, Debug)]
pub struct CachePolicy {
    pub stale_ms: i64,
    pub gc_ms: i64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            stale_ms: DEFAULT_STALE_MS,
            gc_ms: DEFAULT_GC_MS,
        }
    }
}

struct CacheEntry {
    data: Value,
    fetched_at: DateTime<Utc>,
    stale_at: DateTime<Utc>,
    gc_at: DateTime<Utc>,
}

type FetchResult = Result<Value, ApiError>;
type SharedFetch = Shared<LocalBoxFuture<'static, FetchResult>>;

/// Key-addressed store of server responses with staleness windows and
/// in-flight deduplication. Explicitly constructed and injected; holds no
/// global state. Per-key writes are last-writer-wins; there is no cross-tab
/// coordination.
///
/// Reads never refetch on window focus. Views that must revalidate on mount
/// use [`QueryCache::read_revalidate`].
pub struct QueryCache {
    entries: RefCell<HashMap<QueryKey, CacheEntry>>,
    inflight: RefCell<HashMap<QueryKey, SharedFetch>>,
    policy: CachePolicy,
    clock: Rc<dyn Clock>,
    spawner: Rc<dyn Spawner>,
}

impl QueryCache {
    pub fn new(clock: Rc<dyn Clock>, spawner: Rc<dyn Spawner>) -> Self {
        Self::with_policy(clock, spawner, CachePolicy::default())
    }

    pub fn with_policy(
        clock: Rc<dyn Clock>,
        spawner: Rc<dyn Spawner>,
        policy: CachePolicy,
    ) -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
            inflight: RefCell::new(HashMap::new()),
            policy,
            clock,
            spawner,
        }
    }

    /// Returns a fresh cached value directly; otherwise joins (or starts) the
    /// single in-flight fetch for `key`. When a stale value exists it is
    /// returned immediately and the refetch completes in the background.
    pub async fn read<F>(self: &Rc<Self>, key: QueryKey, fetch: F) -> FetchResult
    where
        F: Fn() -> LocalBoxFuture<'static, FetchResult> + 'static,
    {
        self.read_with(key, fetch, false).await
    }

    /// Like [`QueryCache::read`] but always revalidates, even when the entry
    /// is still fresh. Consuming views call this on every mount.
    pub async fn read_revalidate<F>(self: &Rc<Self>, key: QueryKey, fetch: F) -> FetchResult
    where
        F: Fn() -> LocalBoxFuture<'static, FetchResult> + 'static,
    {
        self.read_with(key, fetch, true).await
    }

    pub async fn read_as<T, F>(self: &Rc<Self>, key: QueryKey, fetch: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Fn() -> LocalBoxFuture<'static, FetchResult> + 'static,
    {
        let value = self.read(key, fetch).await?;
        decode_value(value)
    }

    /// Typed counterpart of [`QueryCache::read_revalidate`].
    pub async fn read_revalidate_as<T, F>(
        self: &Rc<Self>,
        key: QueryKey,
        fetch: F,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Fn() -> LocalBoxFuture<'static, FetchResult> + 'static,
    {
        let value = self.read_revalidate(key, fetch).await?;
        decode_value(value)
    }

    async fn read_with<F>(
        self: &Rc<Self>,
        key: QueryKey,
        fetch: F,
        force_revalidate: bool,
    ) -> FetchResult
    where
        F: Fn() -> LocalBoxFuture<'static, FetchResult> + 'static,
    {
        let now = self.clock.now();
        self.sweep(now);

        let cached = {
            let mut entries = self.entries.borrow_mut();
            entries.get_mut(&key).map(|entry| {
                entry.gc_at = now + Duration::milliseconds(self.policy.gc_ms);
                (entry.data.clone(), now < entry.stale_at)
            })
        };
        if let Some((value, fresh)) = &cached {
            if *fresh && !force_revalidate {
                return Ok(value.clone());
            }
        }

        let shared = self.join_or_start_fetch(&key, fetch);
        if let Some((value, _)) = cached {
            let background = shared.clone();
            self.spawner.spawn(
                async move {
                    let _ = background.await;
                }
                .boxed_local(),
            );
            return Ok(value);
        }
        shared.await
    }

    fn join_or_start_fetch<F>(self: &Rc<Self>, key: &QueryKey, fetch: F) -> SharedFetch
    where
        F: Fn() -> LocalBoxFuture<'static, FetchResult> + 'static,
    {
        if let Some(existing) = self.inflight.borrow().get(key) {
            return existing.clone();
        }
        let weak = Rc::downgrade(self);
        let task_key = key.clone();
        let shared = async move {
            let result = retry_fetch(&task_key, fetch).await;
            if let Some(cache) = weak.upgrade() {
                cache.complete(&task_key, &result);
            }
            result
        }
        .boxed_local()
        .shared();
        self.inflight.borrow_mut().insert(key.clone(), shared.clone());
        shared
    }

    fn complete(&self, key: &QueryKey, result: &FetchResult) {
        self.inflight.borrow_mut().remove(key);
        match result {
            Ok(value) => {
                let now = self.clock.now();
                self.entries.borrow_mut().insert(
                    key.clone(),
                    CacheEntry {
                        data: value.clone(),
                        fetched_at: now,
                        stale_at: now + Duration::milliseconds(self.policy.stale_ms),
                        gc_at: now + Duration::milliseconds(self.policy.gc_ms),
                    },
                );
            }
            Err(err) => log::warn!("Fetch for {} failed: {}", key, err),
        }
    }

    /// Runs the mutation, then marks every entry covered by `deps` stale so
    /// the next read refetches. Cached data is never patched in place.
    pub async fn mutate<T, Fut>(&self, deps: &[QueryKey], mutation: Fut) -> Result<T, ApiError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let value = mutation.await?;
        self.invalidate(deps);
        Ok(value)
    }

    pub fn invalidate(&self, deps: &[QueryKey]) {
        let mut entries = self.entries.borrow_mut();
        for (key, entry) in entries.iter_mut() {
            if deps.iter().any(|dep| dep.covers(key)) {
                entry.stale_at = entry.fetched_at;
            }
        }
    }

    /// Non-mutating lookup; does not touch freshness or usage accounting.
    pub fn peek(&self, key: &QueryKey) -> Option<Value> {
        self.entries.borrow().get(key).map(|entry| entry.data.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn sweep(&self, now: DateTime<Utc>) {
        self.entries.borrow_mut().retain(|_, entry| entry.gc_at > now);
    }
}

fn decode_value<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::unknown(format!("Failed to decode cached value: {}", e)))
}

async fn retry_fetch<F>(key: &QueryKey, fetch: F) -> FetchResult
where
    F: Fn() -> LocalBoxFuture<'static, FetchResult>,
{
    let mut attempt = 0u32;
    loop {
        match fetch().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_auth_error() => return Err(err),
            Err(err) if attempt >= MAX_RETRIES => return Err(err),
            Err(err) => {
                attempt += 1;
                log::warn!(
                    "Retrying {} after failure ({}/{}): {}",
                    key,
                    attempt,
                    MAX_RETRIES,
                    err
                );
            }
        }
    }
}
