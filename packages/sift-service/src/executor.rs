use std::{collections::HashSet, sync::Arc, time::Duration};

use time::OffsetDateTime;
use tokio::{sync::Semaphore, task::JoinSet, time as tokio_time};
use tokio_util::sync::CancellationToken;

use sift_config::SearchProviderConfig;
use sift_domain::{
	Evidence, Location, SearchQuery,
	query::{HIGHEST_PRIORITY, LOWEST_PRIORITY},
};
use sift_providers::RateLimiter;

use crate::{MultiLevelCache, SearchProvider};

#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
	/// Merged results, unique by (url, title), higher tiers first.
	pub evidence: Vec<Evidence>,
	/// Set when the deadline or the caller's token fired before every tier finished.
	pub interrupted: bool,
}

/// Runs queries tier by tier, in parallel within a tier.
#[derive(Clone)]
pub struct Executor {
	inner: Arc<Inner>,
}

struct Inner {
	max_concurrency: usize,
	deadline: Duration,
	search_cfg: SearchProviderConfig,
	provider: Arc<dyn SearchProvider>,
	cache: Arc<MultiLevelCache>,
	limiter: Arc<RateLimiter>,
}

impl Executor {
	pub fn new(
		cfg: &sift_config::Executor,
		search_cfg: SearchProviderConfig,
		provider: Arc<dyn SearchProvider>,
		cache: Arc<MultiLevelCache>,
		limiter: Arc<RateLimiter>,
	) -> Self {
		Self {
			inner: Arc::new(Inner {
				max_concurrency: cfg.max_concurrency.max(1) as usize,
				deadline: Duration::from_millis(cfg.deadline_ms),
				search_cfg,
				provider,
				cache,
				limiter,
			}),
		}
	}

	/// Tier 1 is fully joined before tier 2 starts, and so on. Cancellation or the run deadline
	/// stops new work and returns whatever was already collected.
	pub async fn run(
		&self,
		queries: &[SearchQuery],
		location: Option<&Location>,
		cancel: &CancellationToken,
	) -> RunOutcome {
		let run_cancel = cancel.child_token();
		let _stop_timer = run_cancel.clone().drop_guard();
		let timer = run_cancel.clone();
		let deadline = self.inner.deadline;

		tokio::spawn(async move {
			tokio::select! {
				_ = timer.cancelled() => {},
				_ = tokio_time::sleep(deadline) => {
					tracing::warn!(
						deadline_ms = deadline.as_millis() as u64,
						"Search deadline reached."
					);

					timer.cancel();
				},
			}
		});

		let semaphore = Arc::new(Semaphore::new(self.inner.max_concurrency));
		let mut collected = Vec::new();

		for tier in HIGHEST_PRIORITY..=LOWEST_PRIORITY {
			if run_cancel.is_cancelled() {
				break;
			}

			let mut tasks = JoinSet::new();

			for query in queries.iter().filter(|query| query.tier() == tier) {
				let inner = self.inner.clone();
				let query = query.clone();
				let location = location.cloned();
				let semaphore = semaphore.clone();
				let cancel = run_cancel.clone();

				tasks.spawn(async move {
					let Ok(_permit) = (tokio::select! {
						permit = semaphore.acquire_owned() => permit,
						_ = cancel.cancelled() => return Vec::new(),
					}) else {
						return Vec::new();
					};

					tokio::select! {
						evidence = inner.execute(&query, location.as_ref(), &cancel) => evidence,
						_ = cancel.cancelled() => Vec::new(),
					}
				});
			}

			while let Some(joined) = tasks.join_next().await {
				match joined {
					Ok(evidence) => collected.extend(evidence),
					Err(err) => tracing::error!(error = %err, tier, "Search task panicked."),
				}
			}

			tracing::debug!(tier, collected = collected.len(), "Search tier finished.");
		}

		RunOutcome { evidence: merge_unique(collected), interrupted: run_cancel.is_cancelled() }
	}
}

impl Inner {
	async fn execute(
		&self,
		query: &SearchQuery,
		location: Option<&Location>,
		cancel: &CancellationToken,
	) -> Vec<Evidence> {
		let key = cache_key(&query.text, location);

		if let Some(hit) = self.cache.get_evidence(&key).await {
			tracing::debug!(query = %query.text, results = hit.len(), "Search cache hit.");

			return hit;
		}
		if self.limiter.acquire(cancel).await.is_err() {
			return Vec::new();
		}

		let raw = match self.provider.search(&self.search_cfg, &query.text, location).await {
			Ok(raw) => raw,
			Err(err) => {
				tracing::warn!(error = %err, query = %query.text, "Search query failed.");

				return Vec::new();
			},
		};
		let retrieved_at = OffsetDateTime::now_utc();
		let evidence =
			raw.into_iter().map(|raw| Evidence::from_raw(raw, retrieved_at)).collect::<Vec<_>>();

		self.cache.set_evidence(&key, &evidence).await;

		evidence
	}
}

/// Cache key scoping a query to its location.
pub fn cache_key(query: &str, location: Option<&Location>) -> String {
	let mut key = query.to_string();

	if let Some(location) = location {
		if let Some(country) = location.country() {
			key.push_str("|country:");
			key.push_str(country);
		}
		if let Some(region) = location.region() {
			key.push_str("|region:");
			key.push_str(region);
		}
	}

	key
}

/// First occurrence of each (url, title) pair wins.
fn merge_unique(evidence: Vec<Evidence>) -> Vec<Evidence> {
	let mut seen = HashSet::new();

	evidence
		.into_iter()
		.filter(|item| seen.insert((item.url.clone(), item.title.clone())))
		.collect()
}
