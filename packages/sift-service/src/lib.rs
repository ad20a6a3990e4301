pub mod cache;
pub mod executor;
pub mod store;

mod error;

pub use cache::{CacheStats, Clock, MultiLevelCache};
pub use error::{Error, Result};
pub use executor::{Executor, RunOutcome};
pub use store::PgCacheStore;

use std::{future::Future, pin::Pin, sync::Arc};

use serde::Serialize;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use sift_config::{Config, SearchProviderConfig};
use sift_domain::{Evidence, Idea, Location, Normalizer, Planner, RawResult, SearchQuery};
use sift_providers::{RateLimiter, search};
use sift_storage::models::CacheRecord;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait SearchProvider
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		cfg: &'a SearchProviderConfig,
		query: &'a str,
		location: Option<&'a Location>,
	) -> BoxFuture<'a, Result<Vec<RawResult>>>;
}

/// Persistent cache tier keyed by fingerprint.
pub trait CacheStore
where
	Self: Send + Sync,
{
	fn lookup<'a>(&'a self, fingerprint: &'a str) -> BoxFuture<'a, Result<Option<CacheRecord>>>;

	fn upsert<'a>(&'a self, record: &'a CacheRecord) -> BoxFuture<'a, Result<()>>;

	fn delete<'a>(&'a self, fingerprint: &'a str) -> BoxFuture<'a, Result<()>>;

	/// Deletes every record older than its own TTL, returning how many went.
	fn delete_expired(&self, now: OffsetDateTime) -> BoxFuture<'_, Result<u64>>;

	/// Newest unexpired records first, at most `limit`.
	fn load_recent(
		&self,
		now: OffsetDateTime,
		limit: u32,
	) -> BoxFuture<'_, Result<Vec<CacheRecord>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub search: Arc<dyn SearchProvider>,
}
impl Providers {
	pub fn new(search: Arc<dyn SearchProvider>) -> Self {
		Self { search }
	}
}
impl Default for Providers {
	fn default() -> Self {
		Self { search: Arc::new(DefaultProviders) }
	}
}

/// Result of one end-to-end evidence run.
#[derive(Debug, Clone, Serialize)]
pub struct Gathered {
	pub queries: Vec<SearchQuery>,
	pub evidence: Vec<Evidence>,
	/// Set when the deadline or the caller cut the search short.
	pub partial: bool,
}

pub struct SiftService {
	pub cfg: Config,
	pub providers: Providers,
	planner: Planner,
	normalizer: Normalizer,
	cache: Arc<MultiLevelCache>,
	executor: Executor,
}
impl SiftService {
	/// Must be called inside a Tokio runtime; the cache starts its background workers here.
	pub fn new(cfg: Config, store: Option<Arc<dyn CacheStore>>, cancel: CancellationToken) -> Self {
		Self::with_providers(cfg, store, Providers::default(), cancel)
	}

	pub fn with_providers(
		cfg: Config,
		store: Option<Arc<dyn CacheStore>>,
		providers: Providers,
		cancel: CancellationToken,
	) -> Self {
		let store = if cfg.cache.enabled { store } else { None };
		let cache = MultiLevelCache::new(&cfg.cache, store, cancel);

		Self::with_cache(cfg, providers, cache)
	}

	pub fn with_cache(cfg: Config, providers: Providers, cache: Arc<MultiLevelCache>) -> Self {
		let planner = Planner::new(&cfg.planner);
		let normalizer = Normalizer::new(&cfg.normalizer);
		let limiter = Arc::new(RateLimiter::from_config(&cfg.providers.search));
		let executor = Executor::new(
			&cfg.executor,
			cfg.providers.search.clone(),
			providers.search.clone(),
			cache.clone(),
			limiter,
		);

		Self { cfg, providers, planner, normalizer, cache, executor }
	}

	pub fn cache(&self) -> &MultiLevelCache {
		&self.cache
	}

	pub fn plan(&self, idea: &Idea) -> Vec<SearchQuery> {
		self.planner.plan(idea)
	}

	/// Plans, searches, and ranks evidence for an idea.
	///
	/// An explicit `location` overrides the idea's own location hint. Never fails: provider and
	/// cache problems shrink the result instead.
	pub async fn gather(
		&self,
		idea: &Idea,
		location: Option<&Location>,
		cancel: &CancellationToken,
	) -> Gathered {
		let queries = self.planner.plan(idea);
		let hint = idea.location_hint();
		let location = location.or(hint.as_ref());

		tracing::info!(queries = queries.len(), title = %idea.title, "Planned search queries.");

		let outcome = self.executor.run(&queries, location, cancel).await;
		let collected = outcome.evidence.len();
		let mut evidence = self.normalizer.normalize(outcome.evidence);

		evidence.truncate(self.cfg.normalizer.max_evidence as usize);

		tracing::info!(
			collected,
			kept = evidence.len(),
			partial = outcome.interrupted,
			"Evidence gathered."
		);

		Gathered { queries, evidence, partial: outcome.interrupted }
	}
}

struct DefaultProviders;
impl SearchProvider for DefaultProviders {
	fn search<'a>(
		&'a self,
		cfg: &'a SearchProviderConfig,
		query: &'a str,
		location: Option<&'a Location>,
	) -> BoxFuture<'a, Result<Vec<RawResult>>> {
		Box::pin(async move { Ok(search::search(cfg, query, location).await?) })
	}
}
