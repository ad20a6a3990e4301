use std::{collections::HashSet, sync::Arc};

use tokio_util::sync::CancellationToken;

use sift_config::Config;
use sift_domain::{Idea, Location};
use sift_service::{CacheStore, Providers, SiftService};
use sift_testkit::{MemoryCacheStore, ScriptedProvider};

fn loom() -> Idea {
	Idea::new("Loom", "Async video messaging for remote teams")
}

fn service(
	cfg: Config,
	provider: &Arc<ScriptedProvider>,
	store: Option<Arc<dyn CacheStore>>,
) -> SiftService {
	SiftService::with_providers(cfg, store, Providers::new(provider.clone()), CancellationToken::new())
}

#[tokio::test]
async fn gather_plans_searches_and_ranks() {
	let provider = Arc::new(ScriptedProvider::new().with_echo());
	let service = service(sift_testkit::test_config("postgres://unused"), &provider, None);
	let gathered = service.gather(&loom(), None, &CancellationToken::new()).await;
	let ids = gathered.evidence.iter().map(|item| item.id.as_str()).collect::<HashSet<_>>();

	assert!(!gathered.partial);
	assert_eq!(gathered.queries, service.plan(&loom()));
	assert_eq!(provider.call_count(), gathered.queries.len());
	assert!(!gathered.evidence.is_empty());
	assert!(gathered.evidence.len() <= 20);
	assert_eq!(ids.len(), gathered.evidence.len());
}

#[tokio::test]
async fn gather_truncates_to_max_evidence() {
	let provider = Arc::new(ScriptedProvider::new().with_echo());
	let mut cfg = sift_testkit::test_config("postgres://unused");

	cfg.normalizer.max_evidence = 2;

	let service = service(cfg, &provider, None);
	let gathered = service.gather(&loom(), None, &CancellationToken::new()).await;

	assert_eq!(gathered.evidence.len(), 2);
}

#[tokio::test]
async fn explicit_location_overrides_idea_hint() {
	let provider = Arc::new(ScriptedProvider::new().with_echo());
	let service = service(sift_testkit::test_config("postgres://unused"), &provider, None);
	let mut idea = loom();

	idea.location = Some("Germany".to_string());

	service.gather(&idea, None, &CancellationToken::new()).await;

	let override_location =
		Location { country: Some("US".to_string()), region: Some("Ohio".to_string()) };

	service.gather(&idea, Some(&override_location), &CancellationToken::new()).await;

	let calls = provider.calls();
	let hinted = Location { country: Some("Germany".to_string()), region: None };
	let half = calls.len() / 2;

	assert!(calls[..half].iter().all(|call| call.location.as_ref() == Some(&hinted)));
	assert!(calls[half..].iter().all(|call| call.location.as_ref() == Some(&override_location)));
}

#[tokio::test]
async fn disabled_cache_skips_the_persistent_tier() {
	let provider = Arc::new(ScriptedProvider::new().with_echo());
	let store = Arc::new(MemoryCacheStore::new());
	let dyn_store: Arc<dyn CacheStore> = store.clone();
	let mut cfg = sift_testkit::test_config("postgres://unused");

	cfg.cache.enabled = false;

	let service = service(cfg, &provider, Some(dyn_store));

	service.gather(&loom(), None, &CancellationToken::new()).await;
	service.gather(&loom(), None, &CancellationToken::new()).await;

	assert_eq!(store.upserts(), 0);
	assert_eq!(store.lookups(), 0);
	assert_eq!(provider.call_count(), service.plan(&loom()).len());
	assert!(service.cache().stats().memory_hits > 0);
}

#[tokio::test]
async fn enabled_cache_persists_every_search() {
	let provider = Arc::new(ScriptedProvider::new().with_echo());
	let store = Arc::new(MemoryCacheStore::new());
	let dyn_store: Arc<dyn CacheStore> = store.clone();
	let service =
		service(sift_testkit::test_config("postgres://unused"), &provider, Some(dyn_store));
	let gathered = service.gather(&loom(), None, &CancellationToken::new()).await;

	assert_eq!(store.len(), gathered.queries.len());
}
