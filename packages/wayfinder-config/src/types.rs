use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub budget: Budget,
	#[serde(default)]
	pub embedding: Embedding,
	pub location: Location,
	#[serde(default)]
	pub ranking: Ranking,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm_resolver: LlmProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Budget {
	/// Per-request budget handed to `RequestBudget::new` by callers that have no override.
	pub default_total_ms: u64,
}
impl Default for Budget {
	fn default() -> Self {
		Self { default_total_ms: 500 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Embedding {
	pub cache_ttl_secs: u64,
	/// Lifetime of the singleflight lock. A crashed owner releases it implicitly after this long.
	pub lock_ttl_ms: u64,
	pub poll_interval_ms: u64,
	/// Upper bound a follower waits for the lock owner before calling the provider itself.
	pub max_wait_ms: u64,
	pub circuit_breaker: CircuitBreaker,
}
impl Default for Embedding {
	fn default() -> Self {
		Self {
			cache_ttl_secs: 86_400,
			lock_ttl_ms: 5_000,
			poll_interval_ms: 50,
			max_wait_ms: 2_000,
			circuit_breaker: CircuitBreaker::default(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CircuitBreaker {
	pub failure_threshold: u32,
	pub recovery_timeout_ms: u64,
}
impl Default for CircuitBreaker {
	fn default() -> Self {
		Self { failure_threshold: 5, recovery_timeout_ms: 30_000 }
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct Location {
	/// Scope key for regions and aliases, e.g. "nyc".
	pub metro: String,
	#[serde(default = "default_min_query_length")]
	pub min_query_length: usize,
	#[serde(default = "default_substring_min_length")]
	pub substring_min_length: usize,
	#[serde(default = "default_fuzzy_threshold")]
	pub fuzzy_threshold: f32,
	#[serde(default = "default_embedding_min_similarity")]
	pub embedding_min_similarity: f32,
	/// Required. Minimum lead of the best region over the runner-up for a single embedding match.
	pub embedding_confidence_gap: f32,
	#[serde(default = "default_embedding_top_n")]
	pub embedding_top_n: u32,
	#[serde(default = "default_true")]
	pub llm_enabled: bool,
	pub seed_aliases_path: Option<PathBuf>,
	#[serde(default)]
	pub perf_log_enabled: bool,
	#[serde(default = "default_perf_log_threshold_ms")]
	pub perf_log_threshold_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Ranking {
	pub freshness_weight: f32,
	pub skill_boost: f32,
	pub audience_boost: f32,
	/// Percentage as written by operators ("5", "5.0", "5%"). Parsed leniently at ranking time.
	pub founding_boost_pct: String,
	pub soft_filter_penalty: f32,
	pub trust: RankingTrust,
	pub perf_log_enabled: bool,
	pub perf_log_threshold_ms: u64,
}
impl Default for Ranking {
	fn default() -> Self {
		Self {
			freshness_weight: 0.1,
			skill_boost: 0.1,
			audience_boost: 0.1,
			founding_boost_pct: "5".to_string(),
			soft_filter_penalty: 0.25,
			trust: RankingTrust::default(),
			perf_log_enabled: false,
			perf_log_threshold_ms: default_perf_log_threshold_ms(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RankingTrust {
	pub photo: f32,
	pub bio: f32,
	pub background_check: f32,
	pub identity: f32,
	pub response_rate: f32,
	pub rating: f32,
	/// Pseudo-review count that shrinks the rating term for instructors with few reviews.
	pub rating_prior_reviews: f32,
}
impl Default for RankingTrust {
	fn default() -> Self {
		Self {
			photo: 0.02,
			bio: 0.02,
			background_check: 0.03,
			identity: 0.02,
			response_rate: 0.03,
			rating: 0.05,
			rating_prior_reviews: 10.0,
		}
	}
}

fn default_min_query_length() -> usize {
	2
}

fn default_substring_min_length() -> usize {
	3
}

fn default_fuzzy_threshold() -> f32 {
	0.45
}

fn default_embedding_min_similarity() -> f32 {
	0.5
}

fn default_embedding_top_n() -> u32 {
	5
}

fn default_perf_log_threshold_ms() -> u64 {
	50
}

fn default_true() -> bool {
	true
}
