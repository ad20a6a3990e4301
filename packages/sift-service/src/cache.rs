//! Two-tier read-through cache for search results.
//!
//! The memory tier is a bounded LRU; the optional persistent tier is any [`CacheStore`]. Reads
//! for the same fingerprint are coalesced so concurrent misses run a single lookup chain.

use std::{
	collections::HashMap,
	sync::{
		Arc, Mutex, Weak,
		atomic::{AtomicU64, Ordering},
	},
	time::Duration as StdDuration,
};

use moka::{policy::EvictionPolicy, sync::Cache};
use time::{Duration, OffsetDateTime};
use tokio::{runtime::Handle, sync::OnceCell, time as tokio_time};
use tokio_util::sync::CancellationToken;

use sift_domain::Evidence;
use sift_storage::models::CacheRecord;

use crate::CacheStore;

pub type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

type Lookup = Arc<OnceCell<Option<Vec<u8>>>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
	pub memory_hits: u64,
	pub persistent_hits: u64,
	pub misses: u64,
	/// Reads that joined a lookup already in flight.
	pub coalesced: u64,
}

#[derive(Debug, Clone)]
struct MemoryEntry {
	payload: Vec<u8>,
	created_at: OffsetDateTime,
	ttl: Duration,
}
impl MemoryEntry {
	fn is_expired(&self, now: OffsetDateTime) -> bool {
		now - self.created_at > self.ttl
	}
}

#[derive(Debug, Default)]
struct Counters {
	memory_hits: AtomicU64,
	persistent_hits: AtomicU64,
	misses: AtomicU64,
	coalesced: AtomicU64,
}

pub struct MultiLevelCache {
	memory: Cache<String, MemoryEntry>,
	store: Option<Arc<dyn CacheStore>>,
	ttl: Duration,
	warmup_limit: u32,
	sweep_interval: StdDuration,
	in_flight: Mutex<HashMap<String, Lookup>>,
	counters: Counters,
	clock: Clock,
	cancel: CancellationToken,
}
impl MultiLevelCache {
	pub fn new(
		cfg: &sift_config::Cache,
		store: Option<Arc<dyn CacheStore>>,
		cancel: CancellationToken,
	) -> Arc<Self> {
		Self::with_clock(cfg, store, cancel, Arc::new(OffsetDateTime::now_utc))
	}

	/// Warm-up and sweep start only when a persistent tier exists and a runtime is available.
	pub fn with_clock(
		cfg: &sift_config::Cache,
		store: Option<Arc<dyn CacheStore>>,
		cancel: CancellationToken,
		clock: Clock,
	) -> Arc<Self> {
		let memory = Cache::builder()
			.max_capacity(cfg.memory_capacity)
			.eviction_policy(EvictionPolicy::lru())
			.build();
		let cache = Arc::new(Self {
			memory,
			store,
			ttl: Duration::seconds(cfg.ttl_seconds),
			warmup_limit: cfg.warmup_limit,
			sweep_interval: StdDuration::from_secs(cfg.sweep_interval_seconds),
			in_flight: Mutex::new(HashMap::new()),
			counters: Counters::default(),
			clock,
			cancel,
		});

		if cache.store.is_some() {
			cache.spawn_background();
		}

		cache
	}

	pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
		let fingerprint = fingerprint(key);
		let lookup = {
			let mut in_flight = self.in_flight.lock().unwrap_or_else(|err| err.into_inner());

			in_flight.entry(fingerprint.clone()).or_insert_with(|| Arc::new(OnceCell::new())).clone()
		};
		let mut ran_lookup = false;
		let value = lookup
			.get_or_init(|| {
				ran_lookup = true;

				self.lookup_chain(&fingerprint)
			})
			.await
			.clone();

		// A cell left behind by an aborted caller is re-initialized here, which is not a join.
		if !ran_lookup {
			self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
		}

		let mut in_flight = self.in_flight.lock().unwrap_or_else(|err| err.into_inner());

		if in_flight.get(&fingerprint).is_some_and(|current| Arc::ptr_eq(current, &lookup)) {
			in_flight.remove(&fingerprint);
		}

		value
	}

	/// Writes memory first, then the persistent tier. Persistence failures are logged only.
	pub async fn set(&self, key: &str, value: Vec<u8>) {
		let fingerprint = fingerprint(key);
		let now = (self.clock)();

		self.memory.insert(
			fingerprint.clone(),
			MemoryEntry { payload: value.clone(), created_at: now, ttl: self.ttl },
		);

		let Some(store) = &self.store else { return };
		let record = CacheRecord {
			fingerprint,
			cache_key: key.to_string(),
			payload: value,
			created_at: now,
			ttl_seconds: self.ttl.whole_seconds(),
		};

		if let Err(err) = store.upsert(&record).await {
			tracing::warn!(error = %err, key, "Failed to persist cache entry.");
		}
	}

	pub async fn get_evidence(&self, key: &str) -> Option<Vec<Evidence>> {
		let payload = self.get(key).await?;

		match serde_json::from_slice(&payload) {
			Ok(evidence) => Some(evidence),
			Err(err) => {
				tracing::warn!(error = %err, key, "Discarding undecodable cache payload.");

				None
			},
		}
	}

	pub async fn set_evidence(&self, key: &str, evidence: &[Evidence]) {
		match serde_json::to_vec(evidence) {
			Ok(payload) => self.set(key, payload).await,
			Err(err) => tracing::warn!(error = %err, key, "Failed to encode evidence for caching."),
		}
	}

	pub fn stats(&self) -> CacheStats {
		CacheStats {
			memory_hits: self.counters.memory_hits.load(Ordering::Relaxed),
			persistent_hits: self.counters.persistent_hits.load(Ordering::Relaxed),
			misses: self.counters.misses.load(Ordering::Relaxed),
			coalesced: self.counters.coalesced.load(Ordering::Relaxed),
		}
	}

	/// Whether the memory tier holds an unexpired entry for `key`. Does not touch counters.
	pub fn contains_in_memory(&self, key: &str) -> bool {
		let now = (self.clock)();

		self.memory.get(&fingerprint(key)).is_some_and(|entry| !entry.is_expired(now))
	}

	/// Loads the newest unexpired persistent records into memory. Returns how many were loaded.
	pub async fn warm_up(&self) -> usize {
		let Some(store) = &self.store else { return 0 };
		let now = (self.clock)();
		let records = match store.load_recent(now, self.warmup_limit).await {
			Ok(records) => records,
			Err(err) => {
				tracing::warn!(error = %err, "Cache warm-up failed.");

				return 0;
			},
		};
		let mut loaded = 0;

		for record in records {
			if record.is_expired(now) || self.memory.contains_key(&record.fingerprint) {
				continue;
			}

			self.memory.insert(
				record.fingerprint,
				MemoryEntry {
					payload: record.payload,
					created_at: record.created_at,
					ttl: Duration::seconds(record.ttl_seconds),
				},
			);

			loaded += 1;
		}

		tracing::info!(loaded, "Cache warm-up finished.");

		loaded
	}

	/// Deletes expired persistent records. Returns how many were removed.
	pub async fn sweep(&self) -> u64 {
		let Some(store) = &self.store else { return 0 };

		match store.delete_expired((self.clock)()).await {
			Ok(removed) => {
				if removed > 0 {
					tracing::info!(count = removed, "Purged expired cache entries.");
				}

				removed
			},
			Err(err) => {
				tracing::error!(error = %err, "Cache sweep failed.");

				0
			},
		}
	}

	async fn lookup_chain(&self, fingerprint: &str) -> Option<Vec<u8>> {
		let now = (self.clock)();

		if let Some(entry) = self.memory.get(fingerprint) {
			if !entry.is_expired(now) {
				self.counters.memory_hits.fetch_add(1, Ordering::Relaxed);

				return Some(entry.payload);
			}

			self.memory.invalidate(fingerprint);
		}

		let Some(store) = &self.store else {
			return self.miss();
		};

		match store.lookup(fingerprint).await {
			Ok(Some(record)) if record.is_expired(now) => {
				let store = store.clone();
				let fingerprint = fingerprint.to_string();

				tokio::spawn(async move {
					if let Err(err) = store.delete(&fingerprint).await {
						tracing::warn!(error = %err, "Failed to delete expired cache entry.");
					}
				});

				self.miss()
			},
			Ok(Some(record)) => {
				self.memory.insert(
					record.fingerprint,
					MemoryEntry {
						payload: record.payload.clone(),
						created_at: record.created_at,
						ttl: Duration::seconds(record.ttl_seconds),
					},
				);
				self.counters.persistent_hits.fetch_add(1, Ordering::Relaxed);

				Some(record.payload)
			},
			Ok(None) => self.miss(),
			Err(err) => {
				tracing::warn!(
					error = %err,
					"Persistent cache lookup failed; serving from memory only."
				);

				self.miss()
			},
		}
	}

	fn miss(&self) -> Option<Vec<u8>> {
		self.counters.misses.fetch_add(1, Ordering::Relaxed);

		None
	}

	fn spawn_background(self: &Arc<Self>) {
		let Ok(handle) = Handle::try_current() else {
			tracing::warn!("No async runtime available; cache warm-up and sweep are disabled.");

			return;
		};
		let cache = Arc::downgrade(self);
		let cancel = self.cancel.clone();

		handle.spawn(async move {
			if let Some(cache) = cache.upgrade() {
				tokio::select! {
					_ = cancel.cancelled() => return,
					_ = cache.warm_up() => {},
				}
			}

			run_sweeper(cache, cancel).await;
		});
	}
}

async fn run_sweeper(cache: Weak<MultiLevelCache>, cancel: CancellationToken) {
	loop {
		let Some(interval) = cache.upgrade().map(|cache| cache.sweep_interval) else { return };

		tokio::select! {
			_ = cancel.cancelled() => return,
			_ = tokio_time::sleep(interval) => {},
		}

		let Some(cache) = cache.upgrade() else { return };

		tokio::select! {
			_ = cancel.cancelled() => return,
			_ = cache.sweep() => {},
		}
	}
}

/// Fixed-width blake3 hex digest used as the storage key in both tiers.
pub fn fingerprint(key: &str) -> String {
	blake3::hash(key.as_bytes()).to_hex().to_string()
}
