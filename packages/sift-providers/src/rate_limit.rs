use std::time::Duration;

use tokio::{
	sync::Mutex,
	time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Token bucket shared by every outbound search call.
#[derive(Debug)]
pub struct RateLimiter {
	requests_per_second: f64,
	burst: f64,
	bucket: Mutex<Bucket>,
}
impl RateLimiter {
	pub fn new(requests_per_second: f64, burst: u32) -> Self {
		let burst = f64::from(burst.max(1));

		Self {
			requests_per_second,
			burst,
			bucket: Mutex::new(Bucket { tokens: burst, refreshed_at: Instant::now() }),
		}
	}

	pub fn from_config(cfg: &sift_config::SearchProviderConfig) -> Self {
		Self::new(cfg.requests_per_second, cfg.burst)
	}

	/// Waits for one token. A token is only taken once available, so dropping the future
	/// mid-wait never leaks capacity.
	pub async fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
		loop {
			let wait = {
				let mut bucket = self.bucket.lock().await;

				bucket.refill(Instant::now(), self.requests_per_second, self.burst);

				if bucket.tokens >= 1.0 {
					bucket.tokens -= 1.0;

					return Ok(());
				}

				Duration::from_secs_f64((1.0 - bucket.tokens) / self.requests_per_second)
			};

			tokio::select! {
				_ = cancel.cancelled() => return Err(Error::Cancelled),
				_ = time::sleep(wait) => {},
			}
		}
	}
}

#[derive(Debug)]
struct Bucket {
	tokens: f64,
	refreshed_at: Instant,
}
impl Bucket {
	fn refill(&mut self, now: Instant, requests_per_second: f64, burst: f64) {
		let elapsed = now.saturating_duration_since(self.refreshed_at).as_secs_f64();

		self.tokens = (self.tokens + elapsed * requests_per_second).min(burst);
		self.refreshed_at = now;
	}
}
