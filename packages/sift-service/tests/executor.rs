use std::{collections::HashSet, sync::Arc, time::Duration};

use tokio::time as tokio_time;
use tokio_util::sync::CancellationToken;

use sift_domain::{Intent, Location, SearchQuery};
use sift_providers::RateLimiter;
use sift_service::{Executor, MultiLevelCache, SearchProvider, executor};
use sift_testkit::{ScriptedProvider, raw_result};

fn build(provider: &Arc<ScriptedProvider>, cfg: sift_config::Executor) -> Executor {
	let search_cfg = sift_testkit::test_config("postgres://unused").providers.search;
	let provider: Arc<dyn SearchProvider> = provider.clone();
	let cache =
		MultiLevelCache::new(&sift_config::Cache::default(), None, CancellationToken::new());

	Executor::new(&cfg, search_cfg, provider, cache, Arc::new(RateLimiter::new(1_000.0, 1_000)))
}

fn query(text: &str, priority: i64) -> SearchQuery {
	SearchQuery::new(text, Intent::Market, priority)
}

fn tier_of(queries: &[SearchQuery], text: &str) -> u8 {
	queries.iter().find(|query| query.text == text).map(SearchQuery::tier).unwrap_or(0)
}

#[tokio::test(start_paused = true)]
async fn tiers_are_joined_before_the_next_starts() {
	let provider =
		Arc::new(ScriptedProvider::new().with_echo().with_delay(Duration::from_millis(100)));
	let executor = build(&provider, sift_config::Executor::default());
	let queries = vec![
		query("postmortem one", 3),
		query("funding one", 2),
		query("market one", 1),
		query("market two", 1),
		query("funding two", 2),
		query("market three", 1),
		query("market four", 1),
	];
	let outcome = executor.run(&queries, None, &CancellationToken::new()).await;
	let calls = provider.calls();

	assert!(!outcome.interrupted);
	assert_eq!(outcome.evidence.len(), 7);
	assert_eq!(calls.len(), 7);
	assert_eq!(provider.max_in_flight(), 3);

	for earlier in 1..=2 {
		let last_finish = calls
			.iter()
			.filter(|call| tier_of(&queries, &call.query) == earlier)
			.filter_map(|call| call.finished)
			.max()
			.expect("Expected finished calls.");
		let first_start = calls
			.iter()
			.filter(|call| tier_of(&queries, &call.query) == earlier + 1)
			.map(|call| call.started)
			.min()
			.expect("Expected later calls.");

		assert!(last_finish <= first_start);
	}

	let tiers = outcome
		.evidence
		.iter()
		.map(|item| tier_of(&queries, &item.title))
		.collect::<Vec<_>>();

	assert!(tiers.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn cached_queries_skip_the_provider() {
	let provider = Arc::new(ScriptedProvider::new().with_echo());
	let executor = build(&provider, sift_config::Executor::default());
	let queries = vec![query("loom competitors", 1), query("loom funding", 2)];
	let first = executor.run(&queries, None, &CancellationToken::new()).await;
	let second = executor.run(&queries, None, &CancellationToken::new()).await;
	let ids = |evidence: &[sift_domain::Evidence]| {
		evidence.iter().map(|item| item.id.clone()).collect::<HashSet<_>>()
	};

	assert_eq!(provider.call_count(), 2);
	assert_eq!(ids(first.evidence.as_slice()), ids(second.evidence.as_slice()));
}

#[tokio::test]
async fn cache_entries_are_scoped_by_location() {
	let provider = Arc::new(ScriptedProvider::new().with_echo());
	let executor = build(&provider, sift_config::Executor::default());
	let queries = vec![query("loom competitors", 1)];
	let location = Location { country: Some("DE".to_string()), region: None };

	executor.run(&queries, None, &CancellationToken::new()).await;
	executor.run(&queries, Some(&location), &CancellationToken::new()).await;

	let calls = provider.calls();

	assert_eq!(calls.len(), 2);
	assert_eq!(calls[0].location, None);
	assert_eq!(calls[1].location, Some(location));
}

#[tokio::test]
async fn provider_failures_are_dropped_and_duplicates_merged() {
	let shared = raw_result("https://example.com/loom", "Loom review");
	let provider = Arc::new(
		ScriptedProvider::new()
			.with_failure("loom funding", "Upstream returned 500.")
			.with_results("loom competitors", vec![shared.clone()])
			.with_results("loom market", vec![
				shared,
				raw_result("https://example.org/video", "Async video tools"),
			]),
	);
	let executor = build(&provider, sift_config::Executor::default());
	let queries =
		vec![query("loom competitors", 1), query("loom funding", 2), query("loom market", 3)];
	let outcome = executor.run(&queries, None, &CancellationToken::new()).await;
	let urls = outcome.evidence.iter().map(|item| item.url.as_str()).collect::<Vec<_>>();

	assert!(!outcome.interrupted);
	assert_eq!(provider.call_count(), 3);
	assert_eq!(urls, vec!["https://example.com/loom", "https://example.org/video"]);
}

#[tokio::test(start_paused = true)]
async fn cancellation_returns_completed_tiers() {
	let provider = Arc::new(ScriptedProvider::new().with_echo().with_delay(Duration::from_secs(5)));
	let executor = build(&provider, sift_config::Executor::default());
	let queries =
		vec![query("loom competitors", 1), query("loom funding", 2), query("loom failures", 3)];
	let cancel = CancellationToken::new();
	let trigger = cancel.clone();

	tokio::spawn(async move {
		tokio_time::sleep(Duration::from_secs(7)).await;
		trigger.cancel();
	});

	let outcome = executor.run(&queries, None, &cancel).await;
	let titles = outcome.evidence.iter().map(|item| item.title.as_str()).collect::<Vec<_>>();

	assert!(outcome.interrupted);
	assert_eq!(titles, vec!["loom competitors"]);
	assert_eq!(provider.call_count(), 2);
	assert!(provider.calls()[1].finished.is_none());
}

#[tokio::test(start_paused = true)]
async fn cancellation_releases_tasks_waiting_for_a_permit() {
	let provider = Arc::new(ScriptedProvider::new().with_echo().with_delay(Duration::from_secs(5)));
	let executor = build(&provider, sift_config::Executor::default());
	let queries = (1..=5).map(|n| query(&format!("loom market {n}"), 1)).collect::<Vec<_>>();
	let cancel = CancellationToken::new();
	let trigger = cancel.clone();

	tokio::spawn(async move {
		tokio_time::sleep(Duration::from_secs(2)).await;
		trigger.cancel();
	});

	let outcome = executor.run(&queries, None, &cancel).await;

	assert!(outcome.interrupted);
	assert!(outcome.evidence.is_empty());
	assert_eq!(provider.call_count(), 3);
	assert!(provider.calls().iter().all(|call| call.finished.is_none()));

	tokio_time::sleep(Duration::from_secs(10)).await;

	assert_eq!(provider.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn deadline_stops_the_run_without_cancelling_the_caller() {
	let provider = Arc::new(ScriptedProvider::new().with_echo().with_delay(Duration::from_secs(5)));
	let cfg = sift_config::Executor { max_concurrency: 3, deadline_ms: 7_000 };
	let executor = build(&provider, cfg);
	let queries =
		vec![query("loom competitors", 1), query("loom funding", 2), query("loom failures", 3)];
	let cancel = CancellationToken::new();
	let outcome = executor.run(&queries, None, &cancel).await;

	assert!(outcome.interrupted);
	assert_eq!(outcome.evidence.len(), 1);
	assert_eq!(provider.call_count(), 2);
	assert!(!cancel.is_cancelled());
}

#[tokio::test]
async fn cancelled_before_start_runs_nothing() {
	let provider = Arc::new(ScriptedProvider::new().with_echo());
	let executor = build(&provider, sift_config::Executor::default());
	let cancel = CancellationToken::new();

	cancel.cancel();

	let outcome = executor.run(&[query("loom competitors", 1)], None, &cancel).await;

	assert!(outcome.interrupted);
	assert!(outcome.evidence.is_empty());
	assert_eq!(provider.call_count(), 0);
}

#[test]
fn cache_key_includes_location_parts() {
	let location = Location { country: Some("US".to_string()), region: Some("Texas".to_string()) };

	assert_eq!(executor::cache_key("loom", Some(&location)), "loom|country:US|region:Texas");
}
