use time::OffsetDateTime;

use crate::{Error, Result, db::Db, models::CacheRecord};

pub async fn get_cache_entry(db: &Db, fingerprint: &str) -> Result<Option<CacheRecord>> {
	let record = sqlx::query_as::<_, CacheRecord>(
		"\
SELECT fingerprint, cache_key, payload, created_at, ttl_seconds
FROM web_cache
WHERE fingerprint = $1",
	)
	.bind(fingerprint)
	.fetch_optional(&db.pool)
	.await?;

	Ok(record)
}

/// Idempotent on `fingerprint`; the newest write wins.
pub async fn upsert_cache_entry(db: &Db, record: &CacheRecord) -> Result<()> {
	if record.ttl_seconds <= 0 {
		return Err(Error::InvalidArgument("ttl_seconds must be greater than zero.".to_string()));
	}

	sqlx::query(
		"\
INSERT INTO web_cache (fingerprint, cache_key, payload, created_at, ttl_seconds)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (fingerprint) DO UPDATE
SET
	cache_key = EXCLUDED.cache_key,
	payload = EXCLUDED.payload,
	created_at = EXCLUDED.created_at,
	ttl_seconds = EXCLUDED.ttl_seconds",
	)
	.bind(record.fingerprint.as_str())
	.bind(record.cache_key.as_str())
	.bind(record.payload.as_slice())
	.bind(record.created_at)
	.bind(record.ttl_seconds)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn delete_cache_entry(db: &Db, fingerprint: &str) -> Result<bool> {
	let result = sqlx::query("DELETE FROM web_cache WHERE fingerprint = $1")
		.bind(fingerprint)
		.execute(&db.pool)
		.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn delete_expired_cache_entries(db: &Db, now: OffsetDateTime) -> Result<u64> {
	let result = sqlx::query(
		"DELETE FROM web_cache WHERE created_at + make_interval(secs => ttl_seconds) < $1",
	)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected())
}

/// Newest unexpired rows first.
pub async fn load_recent_cache_entries(
	db: &Db,
	now: OffsetDateTime,
	limit: u32,
) -> Result<Vec<CacheRecord>> {
	let records = sqlx::query_as::<_, CacheRecord>(
		"\
SELECT fingerprint, cache_key, payload, created_at, ttl_seconds
FROM web_cache
WHERE created_at + make_interval(secs => ttl_seconds) >= $1
ORDER BY created_at DESC
LIMIT $2",
	)
	.bind(now)
	.bind(i64::from(limit))
	.fetch_all(&db.pool)
	.await?;

	Ok(records)
}
