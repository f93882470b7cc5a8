pub mod text;

pub use text::{CatalogEntry, Taxonomy, generate_embedding_text};

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use uuid::Uuid;

use crate::{
	EmbeddingProvider, Result,
	cache::CacheBackend,
	circuit_breaker::{CircuitBreaker, CircuitState},
	clock::Clock,
};
use wayfinder_config::Config;
use wayfinder_domain::hash::{self, compute_text_hash};

/// How `embed_query_traced` produced (or failed to produce) its vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedPath {
	Empty,
	CacheHit,
	Leader,
	Follower,
	Fallback,
	CircuitOpen,
	Uncached,
	Failed,
}
impl EmbedPath {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Empty => "empty",
			Self::CacheHit => "cache_hit",
			Self::Leader => "leader",
			Self::Follower => "follower",
			Self::Fallback => "fallback",
			Self::CircuitOpen => "circuit_open",
			Self::Uncached => "uncached",
			Self::Failed => "failed",
		}
	}
}

#[derive(Clone, Debug)]
pub struct EmbedOutcome {
	pub vector: Option<Vec<f32>>,
	pub path: EmbedPath,
}

enum Flight {
	Acquire,
	Follow { polls: u64 },
	Fallback,
}

pub struct EmbeddingService {
	provider: Arc<dyn EmbeddingProvider>,
	cache: Option<Arc<dyn CacheBackend>>,
	breaker: CircuitBreaker,
	clock: Arc<dyn Clock>,
	dimensions: usize,
	provider_timeout: Duration,
	cache_ttl: Duration,
	lock_ttl: Duration,
	poll_interval: Duration,
	max_polls: u64,
}
impl EmbeddingService {
	pub fn new(
		cfg: &Config,
		provider: Arc<dyn EmbeddingProvider>,
		cache: Option<Arc<dyn CacheBackend>>,
		clock: Arc<dyn Clock>,
	) -> Self {
		let settings = &cfg.embedding;
		let poll_interval_ms = settings.poll_interval_ms.max(1);

		Self {
			provider,
			cache,
			breaker: CircuitBreaker::new(&settings.circuit_breaker, clock.clone()),
			clock,
			dimensions: cfg.providers.embedding.dimensions as usize,
			provider_timeout: Duration::from_millis(cfg.providers.embedding.timeout_ms),
			cache_ttl: Duration::from_secs(settings.cache_ttl_secs),
			lock_ttl: Duration::from_millis(settings.lock_ttl_ms),
			poll_interval: Duration::from_millis(poll_interval_ms),
			max_polls: settings.max_wait_ms.div_ceil(poll_interval_ms),
		}
	}

	pub fn model_name(&self) -> &str {
		self.provider.model_name()
	}

	pub fn circuit_state(&self) -> CircuitState {
		self.breaker.state()
	}

	/// Closes the circuit breaker. Tests and operators use this after a provider outage.
	pub fn reset(&self) {
		self.breaker.reset();
	}

	/// Sweeps expired cache entries and lock leases. Without a cache there is nothing to do.
	pub async fn purge_expired_cache(&self) -> Result<u64> {
		let Some(cache) = self.cache.as_ref() else {
			return Ok(0);
		};
		let removed = cache.purge_expired().await?;

		tracing::info!(removed, "Purged expired embedding cache rows.");

		Ok(removed)
	}

	pub fn cache_key(&self, text: &str) -> String {
		format!("embed:{}:{}", self.provider.model_name(), compute_text_hash(text.trim()))
	}

	pub async fn embed_query(&self, text: &str) -> Option<Vec<f32>> {
		self.embed_query_traced(text).await.vector
	}

	pub async fn embed_query_traced(&self, text: &str) -> EmbedOutcome {
		let text = text.trim();

		if text.is_empty() {
			return EmbedOutcome { vector: None, path: EmbedPath::Empty };
		}

		let key = self.cache_key(text);

		if let Some(cache) = self.cache.as_ref() {
			match cache.get(&key).await {
				Ok(Some(vector)) => {
					return EmbedOutcome { vector: Some(vector), path: EmbedPath::CacheHit };
				},
				Ok(None) => {},
				Err(err) => {
					tracing::warn!(
						error = %err,
						cache_key_prefix = key_prefix(&key),
						"Embedding cache read failed."
					);
				},
			}
		}

		if !self.breaker.allow_request() {
			return EmbedOutcome { vector: None, path: EmbedPath::CircuitOpen };
		}

		let Some(cache) = self.cache.as_ref() else {
			let vector = self.call_provider(text).await;

			return outcome(vector, EmbedPath::Uncached);
		};

		self.singleflight(cache.as_ref(), &key, text).await
	}

	/// Uncached batch call for precomputing region vectors. Returns `None` on any failure.
	pub async fn embed_batch(&self, texts: &[String]) -> Option<Vec<Vec<f32>>> {
		if texts.is_empty() {
			return Some(Vec::new());
		}
		if !self.breaker.allow_request() {
			return None;
		}

		let vectors = match tokio::time::timeout(self.provider_timeout, self.provider.embed(texts))
			.await
		{
			Ok(Ok(vectors)) => vectors,
			Ok(Err(err)) => {
				tracing::warn!(error = %err, batch_size = texts.len(), "Embedding batch failed.");
				self.breaker.record_failure();

				return None;
			},
			Err(_) => {
				tracing::warn!(batch_size = texts.len(), "Embedding batch timed out.");
				self.breaker.record_failure();

				return None;
			},
		};

		if vectors.len() != texts.len()
			|| vectors.iter().any(|vector| vector.len() != self.dimensions)
		{
			tracing::warn!(
				batch_size = texts.len(),
				returned = vectors.len(),
				"Embedding batch returned malformed vectors."
			);
			self.breaker.record_failure();

			return None;
		}

		self.breaker.record_success();

		Some(vectors)
	}

	async fn singleflight(&self, cache: &dyn CacheBackend, key: &str, text: &str) -> EmbedOutcome {
		let token = Uuid::new_v4();
		let lock_key = format!("lock:{key}");
		let mut flight = Flight::Acquire;

		loop {
			flight = match flight {
				Flight::Acquire => match cache.try_lock(&lock_key, token, self.lock_ttl).await {
					Ok(true) => {
						// A previous owner may have written and released between our miss and the
						// lock grant.
						let (vector, path) = match cache.get(key).await {
							Ok(Some(vector)) => (Some(vector), EmbedPath::CacheHit),
							_ => (self.call_and_store(cache, key, text).await, EmbedPath::Leader),
						};

						if let Err(err) = cache.unlock(&lock_key, token).await {
							tracing::warn!(
								error = %err,
								cache_key_prefix = key_prefix(key),
								"Embedding lock release failed."
							);
						}

						return outcome(vector, path);
					},
					Ok(false) => Flight::Follow { polls: 0 },
					Err(err) => {
						tracing::warn!(
							error = %err,
							cache_key_prefix = key_prefix(key),
							"Embedding lock acquisition failed."
						);

						Flight::Fallback
					},
				},
				Flight::Follow { polls } if polls >= self.max_polls => {
					tracing::info!(
						cache_key_prefix = key_prefix(key),
						polls,
						"Embedding lock owner did not finish in time."
					);

					Flight::Fallback
				},
				Flight::Follow { polls } => {
					self.clock.sleep(self.poll_interval).await;

					if let Ok(Some(vector)) = cache.get(key).await {
						return EmbedOutcome { vector: Some(vector), path: EmbedPath::Follower };
					}

					match cache.is_locked(&lock_key).await {
						Ok(true) => Flight::Follow { polls: polls + 1 },
						// The owner may have written and released after the read above.
						Ok(false) => match cache.get(key).await {
							Ok(Some(vector)) => {
								return EmbedOutcome {
									vector: Some(vector),
									path: EmbedPath::Follower,
								};
							},
							_ => Flight::Fallback,
						},
						Err(err) => {
							tracing::warn!(
								error = %err,
								cache_key_prefix = key_prefix(key),
								"Embedding lock check failed."
							);

							Flight::Fallback
						},
					}
				},
				Flight::Fallback => {
					let vector = self.call_and_store(cache, key, text).await;

					return outcome(vector, EmbedPath::Fallback);
				},
			};
		}
	}

	async fn call_and_store(
		&self,
		cache: &dyn CacheBackend,
		key: &str,
		text: &str,
	) -> Option<Vec<f32>> {
		let vector = self.call_provider(text).await?;

		if let Err(err) = cache.set(key, &vector, self.cache_ttl).await {
			tracing::warn!(
				error = %err,
				cache_key_prefix = key_prefix(key),
				"Embedding cache write failed."
			);
		}

		Some(vector)
	}

	async fn call_provider(&self, text: &str) -> Option<Vec<f32>> {
		let texts = [text.to_string()];
		let result = tokio::time::timeout(self.provider_timeout, self.provider.embed(&texts)).await;
		let vector = match result {
			Ok(Ok(vectors)) => vectors.into_iter().next(),
			Ok(Err(err)) => {
				tracing::warn!(error = %err, "Embedding provider call failed.");

				None
			},
			Err(_) => {
				tracing::warn!(
					timeout_ms = self.provider_timeout.as_millis() as u64,
					"Embedding provider call timed out."
				);

				None
			},
		};

		match vector {
			Some(vector) if vector.len() == self.dimensions => {
				self.breaker.record_success();

				Some(vector)
			},
			Some(vector) => {
				tracing::warn!(
					expected = self.dimensions,
					actual = vector.len(),
					"Embedding vector dimension mismatch."
				);
				self.breaker.record_failure();

				None
			},
			None => {
				self.breaker.record_failure();

				None
			},
		}
	}
}

/// True when `text` no longer matches the hash stored alongside its vector.
pub fn needs_reembedding(text: &str, stored_hash: Option<&str>) -> bool {
	match stored_hash {
		Some(stored) => compute_text_hash(text) != stored,
		None => true,
	}
}

fn outcome(vector: Option<Vec<f32>>, path: EmbedPath) -> EmbedOutcome {
	match vector {
		Some(vector) => EmbedOutcome { vector: Some(vector), path },
		None => EmbedOutcome { vector: None, path: EmbedPath::Failed },
	}
}

fn key_prefix(key: &str) -> &str {
	let hash = key.rsplit(':').next().unwrap_or(key);

	hash::hash_prefix(hash)
}
