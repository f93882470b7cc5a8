mod error;
mod seeds;
mod types;

pub use error::{Error, Result};
pub use seeds::{SeedAliasFile, SeedAliasRecord, load_seed_aliases, parse_seed_aliases};
pub use types::{
	Budget, CircuitBreaker, Config, Embedding, EmbeddingProviderConfig, LlmProviderConfig,
	Location, Postgres, Providers, Ranking, RankingTrust, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("llm_resolver", &cfg.providers.llm_resolver.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if cfg.budget.default_total_ms == 0 {
		return Err(Error::Validation {
			message: "budget.default_total_ms must be greater than zero.".to_string(),
		});
	}

	validate_embedding(cfg)?;
	validate_location(cfg)?;
	validate_ranking(cfg)?;

	Ok(())
}

fn validate_embedding(cfg: &Config) -> Result<()> {
	let embedding = &cfg.embedding;

	if embedding.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "embedding.poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if embedding.max_wait_ms < embedding.poll_interval_ms {
		return Err(Error::Validation {
			message: "embedding.max_wait_ms must be at least embedding.poll_interval_ms."
				.to_string(),
		});
	}
	if embedding.lock_ttl_ms == 0 {
		return Err(Error::Validation {
			message: "embedding.lock_ttl_ms must be greater than zero.".to_string(),
		});
	}
	if embedding.circuit_breaker.failure_threshold == 0 {
		return Err(Error::Validation {
			message: "embedding.circuit_breaker.failure_threshold must be greater than zero."
				.to_string(),
		});
	}

	Ok(())
}

fn validate_location(cfg: &Config) -> Result<()> {
	let location = &cfg.location;

	if location.metro.trim().is_empty() {
		return Err(Error::Validation { message: "location.metro must be non-empty.".to_string() });
	}
	if location.min_query_length == 0 {
		return Err(Error::Validation {
			message: "location.min_query_length must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("location.fuzzy_threshold", location.fuzzy_threshold),
		("location.embedding_min_similarity", location.embedding_min_similarity),
		("location.embedding_confidence_gap", location.embedding_confidence_gap),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if !(0.0..=1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if location.embedding_top_n < 2 {
		return Err(Error::Validation {
			message: "location.embedding_top_n must be at least 2.".to_string(),
		});
	}

	Ok(())
}

fn validate_ranking(cfg: &Config) -> Result<()> {
	let ranking = &cfg.ranking;
	let trust = &ranking.trust;

	for (label, value) in [
		("ranking.freshness_weight", ranking.freshness_weight),
		("ranking.skill_boost", ranking.skill_boost),
		("ranking.audience_boost", ranking.audience_boost),
		("ranking.soft_filter_penalty", ranking.soft_filter_penalty),
		("ranking.trust.photo", trust.photo),
		("ranking.trust.bio", trust.bio),
		("ranking.trust.background_check", trust.background_check),
		("ranking.trust.identity", trust.identity),
		("ranking.trust.response_rate", trust.response_rate),
		("ranking.trust.rating", trust.rating),
		("ranking.trust.rating_prior_reviews", trust.rating_prior_reviews),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if value < 0.0 {
			return Err(Error::Validation { message: format!("{label} must be zero or greater.") });
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg
		.location
		.seed_aliases_path
		.as_deref()
		.map(|path| path.as_os_str().to_string_lossy().trim().is_empty())
		.unwrap_or(false)
	{
		cfg.location.seed_aliases_path = None;
	}

	cfg.location.metro = cfg.location.metro.trim().to_lowercase();
}
