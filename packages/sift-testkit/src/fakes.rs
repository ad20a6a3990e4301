use std::{
	collections::HashMap,
	sync::{
		Arc, Mutex,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	time::Duration,
};

use time::OffsetDateTime;
use tokio::time::{self as tokio_time, Instant};

use sift_config::SearchProviderConfig;
use sift_domain::{Location, RawResult};
use sift_service::{BoxFuture, CacheStore, Clock, Error, Result, SearchProvider};
use sift_storage::models::CacheRecord;

/// Settable wall clock for cache expiry tests.
#[derive(Clone)]
pub struct ManualClock {
	now: Arc<Mutex<OffsetDateTime>>,
}
impl ManualClock {
	pub fn new(start: OffsetDateTime) -> Self {
		Self { now: Arc::new(Mutex::new(start)) }
	}

	pub fn now(&self) -> OffsetDateTime {
		*self.now.lock().unwrap_or_else(|err| err.into_inner())
	}

	pub fn advance(&self, by: time::Duration) {
		let mut now = self.now.lock().unwrap_or_else(|err| err.into_inner());

		*now += by;
	}

	pub fn clock(&self) -> Clock {
		let now = self.now.clone();

		Arc::new(move || *now.lock().unwrap_or_else(|err| err.into_inner()))
	}
}

/// In-process persistent tier with call counters and failure injection.
#[derive(Default)]
pub struct MemoryCacheStore {
	records: Mutex<HashMap<String, CacheRecord>>,
	lookup_delay: Duration,
	failing: AtomicBool,
	lookups: AtomicUsize,
	upserts: AtomicUsize,
	deletes: AtomicUsize,
}
impl MemoryCacheStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Every lookup sleeps this long first, which widens the window for concurrent readers.
	pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
		self.lookup_delay = delay;

		self
	}

	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	pub fn insert(&self, record: CacheRecord) {
		self.records().insert(record.fingerprint.clone(), record);
	}

	pub fn get(&self, fingerprint: &str) -> Option<CacheRecord> {
		self.records().get(fingerprint).cloned()
	}

	pub fn len(&self) -> usize {
		self.records().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn lookups(&self) -> usize {
		self.lookups.load(Ordering::SeqCst)
	}

	pub fn upserts(&self) -> usize {
		self.upserts.load(Ordering::SeqCst)
	}

	pub fn deletes(&self) -> usize {
		self.deletes.load(Ordering::SeqCst)
	}

	fn records(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheRecord>> {
		self.records.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn check(&self) -> Result<()> {
		if self.failing.load(Ordering::SeqCst) {
			return Err(Error::Storage { message: "Injected store failure.".to_string() });
		}

		Ok(())
	}
}
impl CacheStore for MemoryCacheStore {
	fn lookup<'a>(&'a self, fingerprint: &'a str) -> BoxFuture<'a, Result<Option<CacheRecord>>> {
		Box::pin(async move {
			self.lookups.fetch_add(1, Ordering::SeqCst);

			if !self.lookup_delay.is_zero() {
				tokio_time::sleep(self.lookup_delay).await;
			}

			self.check()?;

			Ok(self.get(fingerprint))
		})
	}

	fn upsert<'a>(&'a self, record: &'a CacheRecord) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.upserts.fetch_add(1, Ordering::SeqCst);
			self.check()?;
			self.insert(record.clone());

			Ok(())
		})
	}

	fn delete<'a>(&'a self, fingerprint: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.deletes.fetch_add(1, Ordering::SeqCst);
			self.check()?;
			self.records().remove(fingerprint);

			Ok(())
		})
	}

	fn delete_expired(&self, now: OffsetDateTime) -> BoxFuture<'_, Result<u64>> {
		Box::pin(async move {
			self.check()?;

			let mut records = self.records();
			let before = records.len();

			records.retain(|_, record| !record.is_expired(now));

			Ok((before - records.len()) as u64)
		})
	}

	fn load_recent(
		&self,
		now: OffsetDateTime,
		limit: u32,
	) -> BoxFuture<'_, Result<Vec<CacheRecord>>> {
		Box::pin(async move {
			self.check()?;

			let mut recent = self
				.records()
				.values()
				.filter(|record| !record.is_expired(now))
				.cloned()
				.collect::<Vec<_>>();

			recent.sort_by(|lhs, rhs| rhs.created_at.cmp(&lhs.created_at));
			recent.truncate(limit as usize);

			Ok(recent)
		})
	}
}

#[derive(Debug, Clone)]
pub struct CallRecord {
	pub query: String,
	pub location: Option<Location>,
	pub started: Instant,
	/// `None` while running or when the call was dropped before finishing.
	pub finished: Option<Instant>,
}

enum Script {
	Results(Vec<RawResult>),
	Failure(String),
}

/// Search provider answering from per-query scripts and recording every call.
///
/// Unscripted queries get one result derived from the query text when `echo` is on, otherwise
/// none.
#[derive(Default)]
pub struct ScriptedProvider {
	scripts: HashMap<String, Script>,
	delay: Duration,
	echo: bool,
	calls: Mutex<Vec<CallRecord>>,
	in_flight: AtomicUsize,
	max_in_flight: AtomicUsize,
}
impl ScriptedProvider {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = delay;

		self
	}

	pub fn with_echo(mut self) -> Self {
		self.echo = true;

		self
	}

	pub fn with_results(mut self, query: &str, results: Vec<RawResult>) -> Self {
		self.scripts.insert(query.to_string(), Script::Results(results));

		self
	}

	pub fn with_failure(mut self, query: &str, message: &str) -> Self {
		self.scripts.insert(query.to_string(), Script::Failure(message.to_string()));

		self
	}

	pub fn calls(&self) -> Vec<CallRecord> {
		self.call_log().clone()
	}

	pub fn call_count(&self) -> usize {
		self.call_log().len()
	}

	pub fn max_in_flight(&self) -> usize {
		self.max_in_flight.load(Ordering::SeqCst)
	}

	fn call_log(&self) -> std::sync::MutexGuard<'_, Vec<CallRecord>> {
		self.calls.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn respond(&self, query: &str) -> Result<Vec<RawResult>> {
		match self.scripts.get(query) {
			Some(Script::Results(results)) => Ok(results.clone()),
			Some(Script::Failure(message)) => Err(Error::Provider { message: message.clone() }),
			None if self.echo => Ok(vec![echo_result(query)]),
			None => Ok(Vec::new()),
		}
	}
}
impl SearchProvider for ScriptedProvider {
	fn search<'a>(
		&'a self,
		_cfg: &'a SearchProviderConfig,
		query: &'a str,
		location: Option<&'a Location>,
	) -> BoxFuture<'a, Result<Vec<RawResult>>> {
		Box::pin(async move {
			let index = {
				let mut calls = self.call_log();

				calls.push(CallRecord {
					query: query.to_string(),
					location: location.cloned(),
					started: Instant::now(),
					finished: None,
				});

				calls.len() - 1
			};
			let _in_flight = InFlight::enter(&self.in_flight, &self.max_in_flight);

			if !self.delay.is_zero() {
				tokio_time::sleep(self.delay).await;
			}

			self.call_log()[index].finished = Some(Instant::now());

			self.respond(query)
		})
	}
}

struct InFlight<'a> {
	counter: &'a AtomicUsize,
}
impl<'a> InFlight<'a> {
	fn enter(counter: &'a AtomicUsize, max: &AtomicUsize) -> Self {
		let current = counter.fetch_add(1, Ordering::SeqCst) + 1;

		max.fetch_max(current, Ordering::SeqCst);

		Self { counter }
	}
}
impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		self.counter.fetch_sub(1, Ordering::SeqCst);
	}
}

/// Raw result whose snippet repeats the title, so snippets resemble each other only as much as
/// the titles do.
pub fn raw_result(url: &str, title: &str) -> RawResult {
	RawResult {
		url: url.to_string(),
		title: title.to_string(),
		content: [title; 4].join(". "),
		published_at: None,
	}
}

fn echo_result(query: &str) -> RawResult {
	let slug = query
		.chars()
		.map(|ch| if ch.is_ascii_alphanumeric() { ch.to_ascii_lowercase() } else { '-' })
		.collect::<String>();

	raw_result(&format!("https://techcrunch.com/{slug}"), query)
}
