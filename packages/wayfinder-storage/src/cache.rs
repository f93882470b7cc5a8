use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, db::Db};

pub async fn get_cached_embedding(
	db: &Db,
	cache_key: &str,
	now: OffsetDateTime,
) -> Result<Option<Vec<f32>>> {
	let row: Option<Vec<f32>> = sqlx::query_scalar(
		"\
SELECT embedding
FROM embedding_cache
WHERE cache_key = $1 AND expires_at > $2",
	)
	.bind(cache_key)
	.bind(now)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

pub async fn put_cached_embedding(
	db: &Db,
	cache_key: &str,
	embedding: &[f32],
	expires_at: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO embedding_cache (cache_key, embedding, expires_at)
VALUES ($1, $2, $3)
ON CONFLICT (cache_key) DO UPDATE
SET embedding = EXCLUDED.embedding, expires_at = EXCLUDED.expires_at",
	)
	.bind(cache_key)
	.bind(embedding)
	.bind(expires_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Deletes cache entries and lock leases that expired at or before `now`.
pub async fn purge_expired(db: &Db, now: OffsetDateTime) -> Result<u64> {
	let entries = sqlx::query("DELETE FROM embedding_cache WHERE expires_at <= $1")
		.bind(now)
		.execute(&db.pool)
		.await?
		.rows_affected();
	let locks = sqlx::query("DELETE FROM cache_locks WHERE expires_at <= $1")
		.bind(now)
		.execute(&db.pool)
		.await?
		.rows_affected();

	Ok(entries + locks)
}

/// Takes the lock when it is free or when the previous holder's lease has expired.
pub async fn try_acquire_lock(
	db: &Db,
	lock_key: &str,
	owner_token: Uuid,
	now: OffsetDateTime,
	expires_at: OffsetDateTime,
) -> Result<bool> {
	let acquired: Option<Uuid> = sqlx::query_scalar(
		"\
INSERT INTO cache_locks (lock_key, owner_token, expires_at)
VALUES ($1, $2, $3)
ON CONFLICT (lock_key) DO UPDATE
SET owner_token = EXCLUDED.owner_token, expires_at = EXCLUDED.expires_at
WHERE cache_locks.expires_at <= $4
RETURNING owner_token",
	)
	.bind(lock_key)
	.bind(owner_token)
	.bind(expires_at)
	.bind(now)
	.fetch_optional(&db.pool)
	.await?;

	Ok(acquired == Some(owner_token))
}

pub async fn release_lock(db: &Db, lock_key: &str, owner_token: Uuid) -> Result<()> {
	sqlx::query("DELETE FROM cache_locks WHERE lock_key = $1 AND owner_token = $2")
		.bind(lock_key)
		.bind(owner_token)
		.execute(&db.pool)
		.await?;

	Ok(())
}

pub async fn is_lock_held(db: &Db, lock_key: &str, now: OffsetDateTime) -> Result<bool> {
	let held: bool = sqlx::query_scalar(
		"SELECT EXISTS (SELECT 1 FROM cache_locks WHERE lock_key = $1 AND expires_at > $2)",
	)
	.bind(lock_key)
	.bind(now)
	.fetch_one(&db.pool)
	.await?;

	Ok(held)
}
