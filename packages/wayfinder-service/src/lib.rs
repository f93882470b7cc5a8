pub mod admin;
pub mod cache;
pub mod circuit_breaker;
pub mod clock;
pub mod embedding;
pub mod location;
pub mod ranking;
pub mod repository;

mod error;

pub use admin::RebuildReport;
pub use cache::{CacheBackend, MemoryCache, PgCache};
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use embedding::{EmbedOutcome, EmbedPath, EmbeddingService};
pub use error::{Error, Result};
pub use location::{LlmResolution, LocationResolver, ResolvedLocation};
pub use ranking::{Candidate, ParsedQuery, RankingResult, RankingService};
pub use repository::{MetricsRepository, PgMetricsRepository, PgRegionRepository, RegionRepository};
pub use wayfinder_domain::budget::{DegradationLevel, RequestBudget};

use std::{future::Future, pin::Pin, sync::Arc};

use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

use wayfinder_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use wayfinder_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(&'a self, texts: &'a [String])
	-> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;

	fn model_name(&self) -> &str;
}

pub trait LlmResolver
where
	Self: Send + Sync,
{
	/// Maps `query` onto zero or more of the `allowed` region names.
	fn resolve<'a>(
		&'a self,
		query: &'a str,
		allowed: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<LlmResolution>>;
}

/// OpenAI-compatible `/embeddings` endpoint.
pub struct HttpEmbeddingProvider {
	cfg: EmbeddingProviderConfig,
}
impl HttpEmbeddingProvider {
	pub fn new(cfg: EmbeddingProviderConfig) -> Self {
		Self { cfg }
	}
}
impl EmbeddingProvider for HttpEmbeddingProvider {
	fn embed<'a>(
		&'a self,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(wayfinder_providers::embedding::embed(&self.cfg, texts))
	}

	fn model_name(&self) -> &str {
		&self.cfg.model
	}
}

/// Chat-completion backed resolver for the last cascade tier.
pub struct HttpLlmResolver {
	cfg: LlmProviderConfig,
}
impl HttpLlmResolver {
	pub fn new(cfg: LlmProviderConfig) -> Self {
		Self { cfg }
	}
}
impl LlmResolver for HttpLlmResolver {
	fn resolve<'a>(
		&'a self,
		query: &'a str,
		allowed: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<LlmResolution>> {
		Box::pin(async move {
			let messages = location::llm::build_messages(query, allowed);
			let value = wayfinder_providers::llm::complete_json(&self.cfg, &messages).await?;

			location::llm::parse_resolution(&value)
		})
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub llm: Arc<dyn LlmResolver>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, llm: Arc<dyn LlmResolver>) -> Self {
		Self { embedding, llm }
	}

	pub fn from_config(cfg: &Config) -> Self {
		Self {
			embedding: Arc::new(HttpEmbeddingProvider::new(cfg.providers.embedding.clone())),
			llm: Arc::new(HttpLlmResolver::new(cfg.providers.llm_resolver.clone())),
		}
	}
}

/// Everything a search endpoint needs, wired against one Postgres database.
pub struct Wayfinder {
	pub cfg: Config,
	pub db: Arc<Db>,
	pub embedding: Arc<EmbeddingService>,
	pub location: LocationResolver,
	pub ranking: RankingService,
}
impl Wayfinder {
	pub fn new(cfg: Config, db: Db) -> Result<Self> {
		let providers = Providers::from_config(&cfg);

		Self::with_providers(cfg, db, providers)
	}

	pub fn with_providers(cfg: Config, db: Db, providers: Providers) -> Result<Self> {
		let db = Arc::new(db);
		let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
		let cache: Arc<dyn CacheBackend> = Arc::new(PgCache::new(db.clone()));
		let embedding =
			Arc::new(EmbeddingService::new(&cfg, providers.embedding, Some(cache), clock));
		let location = LocationResolver::from_config(
			&cfg,
			Arc::new(PgRegionRepository::new(db.clone())),
			Some(embedding.clone()),
			Some(providers.llm),
		)?;
		let metrics = Arc::new(PgMetricsRepository::new(db.clone()));
		let ranking = RankingService::new(cfg.ranking.clone(), metrics);

		Ok(Self { cfg, db, embedding, location, ranking })
	}

	/// Fresh per-request budget using `budget.default_total_ms`.
	pub fn new_budget(&self) -> RequestBudget {
		RequestBudget::new(self.cfg.budget.default_total_ms)
	}
}

/// Installs a global `fmt` subscriber filtered by `service.log_level`.
pub fn init_tracing(cfg: &Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&cfg.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.try_init()
		.map_err(|err| eyre::eyre!("Failed to install tracing subscriber: {err}"))
}
