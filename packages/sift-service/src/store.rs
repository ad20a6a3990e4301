use time::OffsetDateTime;

use sift_storage::{db::Db, models::CacheRecord, queries};

use crate::{BoxFuture, CacheStore, Result};

/// `web_cache` table as the persistent cache tier.
pub struct PgCacheStore {
	db: Db,
}
impl PgCacheStore {
	pub fn new(db: Db) -> Self {
		Self { db }
	}
}
impl CacheStore for PgCacheStore {
	fn lookup<'a>(&'a self, fingerprint: &'a str) -> BoxFuture<'a, Result<Option<CacheRecord>>> {
		Box::pin(async move { Ok(queries::get_cache_entry(&self.db, fingerprint).await?) })
	}

	fn upsert<'a>(&'a self, record: &'a CacheRecord) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(queries::upsert_cache_entry(&self.db, record).await?) })
	}

	fn delete<'a>(&'a self, fingerprint: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			queries::delete_cache_entry(&self.db, fingerprint).await?;

			Ok(())
		})
	}

	fn delete_expired(&self, now: OffsetDateTime) -> BoxFuture<'_, Result<u64>> {
		Box::pin(async move { Ok(queries::delete_expired_cache_entries(&self.db, now).await?) })
	}

	fn load_recent(
		&self,
		now: OffsetDateTime,
		limit: u32,
	) -> BoxFuture<'_, Result<Vec<CacheRecord>>> {
		Box::pin(async move { Ok(queries::load_recent_cache_entries(&self.db, now, limit).await?) })
	}
}
