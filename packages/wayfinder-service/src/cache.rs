//! Embedding cache and singleflight lock backends.
//!
//! Locks carry an owner token and a TTL. Only the owner can release a lock, and an expired lock
//! can be taken by anyone, so a crashed owner never blocks followers for longer than the TTL.

use std::{
	sync::{Arc, Mutex},
	time::Duration,
};

use ahash::AHashMap;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{BoxFuture, Result, clock::Clock};
use wayfinder_storage::{cache, db::Db};

pub trait CacheBackend
where
	Self: Send + Sync,
{
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<f32>>>>;

	fn set<'a>(&'a self, key: &'a str, value: &'a [f32], ttl: Duration)
	-> BoxFuture<'a, Result<()>>;

	/// Returns `true` when `token` now owns the lock.
	fn try_lock<'a>(&'a self, key: &'a str, token: Uuid, ttl: Duration)
	-> BoxFuture<'a, Result<bool>>;

	fn unlock<'a>(&'a self, key: &'a str, token: Uuid) -> BoxFuture<'a, Result<()>>;

	fn is_locked<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool>>;

	/// Drops expired entries and lock leases, returning how many were removed.
	fn purge_expired(&self) -> BoxFuture<'_, Result<u64>>;
}

struct Expiring<T> {
	value: T,
	expires_at: Duration,
}

/// Process-local backend. Expiry follows the injected [`Clock`].
pub struct MemoryCache {
	clock: Arc<dyn Clock>,
	entries: Mutex<AHashMap<String, Expiring<Vec<f32>>>>,
	locks: Mutex<AHashMap<String, Expiring<Uuid>>>,
}
impl MemoryCache {
	pub fn new(clock: Arc<dyn Clock>) -> Self {
		Self { clock, entries: Mutex::new(AHashMap::new()), locks: Mutex::new(AHashMap::new()) }
	}

	pub fn len(&self) -> usize {
		let now = self.clock.now();
		let entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

		entries.values().filter(|entry| entry.expires_at > now).count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn clear(&self) {
		self.entries.lock().unwrap_or_else(|err| err.into_inner()).clear();
		self.locks.lock().unwrap_or_else(|err| err.into_inner()).clear();
	}

	fn read(&self, key: &str) -> Option<Vec<f32>> {
		let now = self.clock.now();
		let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

		match entries.get(key) {
			Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
			Some(_) => {
				entries.remove(key);

				None
			},
			None => None,
		}
	}

	fn write(&self, key: &str, value: &[f32], ttl: Duration) {
		let now = self.clock.now();
		let expires_at = now.saturating_add(ttl);
		let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

		entries.retain(|_, entry| entry.expires_at > now);
		entries.insert(key.to_string(), Expiring { value: value.to_vec(), expires_at });
	}

	fn sweep(&self) -> u64 {
		let now = self.clock.now();
		let mut removed = 0;

		{
			let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
			let before = entries.len();

			entries.retain(|_, entry| entry.expires_at > now);
			removed += before - entries.len();
		}

		let mut locks = self.locks.lock().unwrap_or_else(|err| err.into_inner());
		let before = locks.len();

		locks.retain(|_, lock| lock.expires_at > now);
		removed += before - locks.len();

		removed as u64
	}

	/// Stored entries, expired or not.
	pub fn stored_len(&self) -> usize {
		self.entries.lock().unwrap_or_else(|err| err.into_inner()).len()
	}

	fn acquire(&self, key: &str, token: Uuid, ttl: Duration) -> bool {
		let now = self.clock.now();
		let mut locks = self.locks.lock().unwrap_or_else(|err| err.into_inner());

		if let Some(existing) = locks.get(key)
			&& existing.expires_at > now
		{
			return existing.value == token;
		}

		let expires_at = now.saturating_add(ttl);

		locks.insert(key.to_string(), Expiring { value: token, expires_at });

		true
	}

	fn release(&self, key: &str, token: Uuid) {
		let mut locks = self.locks.lock().unwrap_or_else(|err| err.into_inner());

		if locks.get(key).is_some_and(|existing| existing.value == token) {
			locks.remove(key);
		}
	}

	fn held(&self, key: &str) -> bool {
		let now = self.clock.now();
		let locks = self.locks.lock().unwrap_or_else(|err| err.into_inner());

		locks.get(key).is_some_and(|existing| existing.expires_at > now)
	}
}
impl CacheBackend for MemoryCache {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<f32>>>> {
		Box::pin(async move { Ok(self.read(key)) })
	}

	fn set<'a>(
		&'a self,
		key: &'a str,
		value: &'a [f32],
		ttl: Duration,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.write(key, value, ttl);

			Ok(())
		})
	}

	fn try_lock<'a>(
		&'a self,
		key: &'a str,
		token: Uuid,
		ttl: Duration,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(self.acquire(key, token, ttl)) })
	}

	fn unlock<'a>(&'a self, key: &'a str, token: Uuid) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.release(key, token);

			Ok(())
		})
	}

	fn is_locked<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(self.held(key)) })
	}

	fn purge_expired(&self) -> BoxFuture<'_, Result<u64>> {
		Box::pin(async move { Ok(self.sweep()) })
	}
}

/// Postgres backend shared by every process that points at the same database.
pub struct PgCache {
	db: Arc<Db>,
}
impl PgCache {
	pub fn new(db: Arc<Db>) -> Self {
		Self { db }
	}
}
impl CacheBackend for PgCache {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<f32>>>> {
		Box::pin(async move {
			Ok(cache::get_cached_embedding(&self.db, key, OffsetDateTime::now_utc()).await?)
		})
	}

	fn set<'a>(
		&'a self,
		key: &'a str,
		value: &'a [f32],
		ttl: Duration,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let expires_at = expires_after(ttl);

			Ok(cache::put_cached_embedding(&self.db, key, value, expires_at).await?)
		})
	}

	fn try_lock<'a>(
		&'a self,
		key: &'a str,
		token: Uuid,
		ttl: Duration,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let expires_at = expires_after(ttl);

			Ok(cache::try_acquire_lock(&self.db, key, token, now, expires_at).await?)
		})
	}

	fn unlock<'a>(&'a self, key: &'a str, token: Uuid) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(cache::release_lock(&self.db, key, token).await?) })
	}

	fn is_locked<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			Ok(cache::is_lock_held(&self.db, key, OffsetDateTime::now_utc()).await?)
		})
	}

	fn purge_expired(&self) -> BoxFuture<'_, Result<u64>> {
		Box::pin(async move {
			Ok(cache::purge_expired(&self.db, OffsetDateTime::now_utc()).await?)
		})
	}
}

fn expires_after(ttl: Duration) -> OffsetDateTime {
	let ttl = time::Duration::try_from(ttl).unwrap_or(time::Duration::MAX);

	OffsetDateTime::now_utc().saturating_add(ttl)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::clock::ManualClock;

	#[tokio::test]
	async fn entries_expire_with_the_clock() {
		let clock = Arc::new(ManualClock::new());
		let cache = MemoryCache::new(clock.clone());

		cache.set("k", &[1.0, 2.0], Duration::from_secs(10)).await.expect("set");

		assert_eq!(cache.get("k").await.expect("get"), Some(vec![1.0, 2.0]));

		clock.advance(Duration::from_secs(10));

		assert_eq!(cache.get("k").await.expect("get"), None);
		assert!(cache.is_empty());
	}

	#[tokio::test]
	async fn expired_entries_do_not_accumulate() {
		let clock = Arc::new(ManualClock::new());
		let cache = MemoryCache::new(clock.clone());
		let short = Duration::from_secs(10);

		cache.set("guitar", &[1.0], short).await.expect("set");
		cache.set("violin", &[2.0], short).await.expect("set");
		cache.try_lock("lock:guitar", Uuid::new_v4(), short).await.expect("lock");
		clock.advance(short);
		cache.set("cello", &[3.0], short).await.expect("set");

		assert_eq!(cache.stored_len(), 1);
		assert_eq!(cache.purge_expired().await.expect("purge"), 1);

		clock.advance(short);

		assert_eq!(cache.purge_expired().await.expect("purge"), 1);
		assert_eq!(cache.stored_len(), 0);
	}

	#[tokio::test]
	async fn lock_is_exclusive_until_released_or_expired() {
		let clock = Arc::new(ManualClock::new());
		let cache = MemoryCache::new(clock.clone());
		let owner = Uuid::new_v4();
		let other = Uuid::new_v4();
		let ttl = Duration::from_millis(500);

		assert!(cache.try_lock("lock", owner, ttl).await.expect("lock"));
		assert!(!cache.try_lock("lock", other, ttl).await.expect("lock"));

		cache.unlock("lock", other).await.expect("unlock");

		assert!(cache.is_locked("lock").await.expect("held"));

		clock.advance(ttl);

		assert!(!cache.is_locked("lock").await.expect("held"));
		assert!(cache.try_lock("lock", other, ttl).await.expect("lock"));

		cache.unlock("lock", other).await.expect("unlock");

		assert!(!cache.is_locked("lock").await.expect("held"));
	}
}
