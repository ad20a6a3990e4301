use time::OffsetDateTime;

/// One persisted cache row. `cache_key` is the unhashed key, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CacheRecord {
	pub fingerprint: String,
	pub cache_key: String,
	pub payload: Vec<u8>,
	pub created_at: OffsetDateTime,
	pub ttl_seconds: i64,
}
impl CacheRecord {
	pub fn is_expired(&self, now: OffsetDateTime) -> bool {
		now - self.created_at > time::Duration::seconds(self.ttl_seconds)
	}
}
