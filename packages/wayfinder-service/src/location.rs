pub mod catalog;
pub mod llm;
pub mod seeds;
pub mod types;

pub use catalog::{CatalogBorough, CatalogRegion, RegionCatalog};
pub use llm::LlmResolution;
pub use seeds::{SeedAlias, SeedAliases, SeedTarget};
pub use types::{
	LocationCandidate, LocationKind, ResolutionMethod, ResolutionTier, ResolvedLocation,
	TierOutcome,
};

use std::{
	sync::{Arc, RwLock},
	thread,
	time::{Duration, Instant},
};

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	LlmResolver, Result, embedding::EmbeddingService, location::types::clamp_unit,
	repository::RegionRepository,
};
use wayfinder_config::{Config, Location};
use wayfinder_domain::{
	budget::{RequestBudget, SKIP_TIER4_EMBEDDING, SKIP_TIER5_LLM},
	normalize::{char_len, collapse_whitespace, normalize_location_text},
	similarity::{cosine_similarity, fuzzy_score},
};
use wayfinder_storage::models::{LocationAlias, NewLlmAlias, RegionEmbedding};

const LLM_ALIAS_TYPE: &str = "colloquial";
const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(3);

/// Tiered resolver from free text to a region, a borough, an explicit ambiguous set, or nothing.
///
/// Tiers run strictly in order (exact, alias, substring, fuzzy, embedding, LLM) and the first
/// tier that resolves or finds an ambiguity ends the cascade. The semantic tiers only run when the
/// caller enables them and, when a budget is supplied, when the budget can afford them.
pub struct LocationResolver {
	settings: Location,
	regions: Arc<dyn RegionRepository>,
	embedding: Option<Arc<EmbeddingService>>,
	llm: Option<Arc<dyn LlmResolver>>,
	llm_timeout: Duration,
	seeds: RwLock<Arc<SeedAliases>>,
	catalog: RwLock<Option<Arc<RegionCatalog>>>,
	region_vectors: RwLock<Option<Arc<Vec<RegionEmbedding>>>>,
}
impl LocationResolver {
	pub fn new(settings: Location, regions: Arc<dyn RegionRepository>) -> Self {
		Self {
			settings,
			regions,
			embedding: None,
			llm: None,
			llm_timeout: DEFAULT_LLM_TIMEOUT,
			seeds: RwLock::new(Arc::new(SeedAliases::new())),
			catalog: RwLock::new(None),
			region_vectors: RwLock::new(None),
		}
	}

	/// Builds a resolver from `[location]`, loading seed aliases from `seed_aliases_path` if set.
	pub fn from_config(
		cfg: &Config,
		regions: Arc<dyn RegionRepository>,
		embedding: Option<Arc<EmbeddingService>>,
		llm: Option<Arc<dyn LlmResolver>>,
	) -> Result<Self> {
		let seeds = match cfg.location.seed_aliases_path.as_deref() {
			Some(path) => SeedAliases::load(path)?,
			None => SeedAliases::new(),
		};
		let mut resolver = Self::new(cfg.location.clone(), regions).with_seeds(seeds);

		resolver.embedding = embedding;
		resolver.llm = llm;
		resolver.llm_timeout = Duration::from_millis(cfg.providers.llm_resolver.timeout_ms);

		Ok(resolver)
	}

	pub fn with_embedding(mut self, embedding: Arc<EmbeddingService>) -> Self {
		self.embedding = Some(embedding);

		self
	}

	pub fn with_llm(mut self, llm: Arc<dyn LlmResolver>) -> Self {
		self.llm = Some(llm);

		self
	}

	/// Ceiling for one tier-5 call, retries included.
	pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
		self.llm_timeout = timeout;

		self
	}

	pub fn with_seeds(self, seeds: SeedAliases) -> Self {
		self.reset_seeds(seeds);

		self
	}

	pub fn settings(&self) -> &Location {
		&self.settings
	}

	pub fn reset_seeds(&self, seeds: SeedAliases) {
		*self.seeds.write().unwrap_or_else(|err| err.into_inner()) = Arc::new(seeds);
	}

	/// Drops the region and region-vector snapshots; the next call reloads them.
	pub fn invalidate(&self) {
		*self.catalog.write().unwrap_or_else(|err| err.into_inner()) = None;
		*self.region_vectors.write().unwrap_or_else(|err| err.into_inner()) = None;
	}

	pub async fn resolve(&self, text: &str, enable_semantic: bool) -> ResolvedLocation {
		self.resolve_with_budget(text, enable_semantic, None).await
	}

	pub async fn resolve_with_budget(
		&self,
		text: &str,
		enable_semantic: bool,
		budget: Option<&mut RequestBudget>,
	) -> ResolvedLocation {
		let started = Instant::now();
		let normalized = normalize_location_text(text);
		let result = self.run_cascade(text, &normalized, enable_semantic, budget).await;

		self.log_perf(&normalized, &result, started);

		result
	}

	/// Synchronous entry point. Runs the cascade on a scoped helper thread with its own
	/// current-thread runtime, so it works both inside and outside a Tokio runtime.
	pub fn resolve_blocking(&self, text: &str, enable_semantic: bool) -> ResolvedLocation {
		thread::scope(|scope| {
			let handle = scope.spawn(|| {
				match tokio::runtime::Builder::new_current_thread().enable_all().build() {
					Ok(runtime) => runtime.block_on(self.resolve(text, enable_semantic)),
					Err(err) => {
						tracing::warn!(error = %err, "Failed to build resolver runtime.");

						ResolvedLocation::not_found()
					},
				}
			});

			handle.join().unwrap_or_else(|_| {
				tracing::warn!("Location resolution thread panicked.");

				ResolvedLocation::not_found()
			})
		})
	}

	async fn run_cascade(
		&self,
		text: &str,
		normalized: &str,
		enable_semantic: bool,
		mut budget: Option<&mut RequestBudget>,
	) -> ResolvedLocation {
		if char_len(normalized) < self.settings.min_query_length.max(1) {
			return ResolvedLocation::not_found();
		}

		let Some(catalog) = self.catalog().await else {
			return ResolvedLocation::not_found();
		};

		if let Some(found) = self.exact_tier(&catalog, normalized).into_result() {
			return found;
		}
		if let Some(found) = self.alias_tier(&catalog, normalized).await.into_result() {
			return found;
		}
		if let Some(found) = self.substring_tier(&catalog, normalized).into_result() {
			return found;
		}
		if let Some(found) = self.fuzzy_tier(&catalog, normalized).into_result() {
			return found;
		}
		if enable_semantic {
			if let Some(found) = self
				.embedding_tier(&catalog, normalized, budget.as_deref_mut())
				.await
				.into_result()
			{
				return found;
			}
			if let Some(found) = self
				.llm_tier(&catalog, text, normalized, budget.as_deref_mut())
				.await
				.into_result()
			{
				return found;
			}
		}

		self.record_unresolved(text, normalized).await;

		ResolvedLocation::not_found()
	}

	fn exact_tier(&self, catalog: &RegionCatalog, normalized: &str) -> TierOutcome {
		if let Some(region) = catalog.region_by_normalized(normalized) {
			return TierOutcome::Resolved(ResolvedLocation::region(
				catalog.candidate(region, 1.0),
				ResolutionTier::Exact,
				ResolutionMethod::Exact,
			));
		}
		if let Some(borough) = catalog.borough_by_normalized(normalized) {
			return TierOutcome::Resolved(ResolvedLocation::borough(
				&borough.name,
				ResolutionTier::Exact,
				ResolutionMethod::Exact,
				1.0,
			));
		}

		TierOutcome::NotFound
	}

	async fn alias_tier(&self, catalog: &RegionCatalog, normalized: &str) -> TierOutcome {
		let seeds = self.seeds.read().unwrap_or_else(|err| err.into_inner()).clone();

		if let Some(seed) = seeds.get(normalized) {
			match seed_outcome(catalog, seed) {
				TierOutcome::Skip => {
					tracing::warn!(
						alias = normalized,
						"Seed alias points at regions missing from the catalog."
					);
				},
				outcome => return outcome,
			}
		}

		match self.regions.find_alias(&self.settings.metro, normalized, true).await {
			Ok(Some(alias)) =>
				self.persisted_alias_outcome(catalog, &alias, ResolutionTier::Alias).await,
			Ok(None) => TierOutcome::NotFound,
			Err(err) => {
				tracing::warn!(error = %err, alias = normalized, "Alias lookup failed.");

				TierOutcome::Skip
			},
		}
	}

	fn substring_tier(&self, catalog: &RegionCatalog, normalized: &str) -> TierOutcome {
		let query_len = char_len(normalized);

		if query_len < self.settings.substring_min_length {
			return TierOutcome::Skip;
		}

		let candidates: Vec<LocationCandidate> = catalog
			.regions_containing(normalized)
			.into_iter()
			.map(|region| {
				let score = query_len as f32 / char_len(&region.normalized).max(1) as f32;

				catalog.candidate(region, score)
			})
			.collect();

		candidates_outcome(candidates, ResolutionTier::Substring, ResolutionMethod::Substring)
	}

	fn fuzzy_tier(&self, catalog: &RegionCatalog, normalized: &str) -> TierOutcome {
		let threshold = self.settings.fuzzy_threshold;
		let mut best_region: Option<(&CatalogRegion, f32)> = None;
		let mut best_borough: Option<(&CatalogBorough, f32)> = None;

		for region in catalog.regions() {
			let score = fuzzy_score(normalized, &region.normalized);

			if score >= threshold && best_region.is_none_or(|(_, best)| score > best) {
				best_region = Some((region, score));
			}
		}
		for borough in catalog.boroughs() {
			let score = fuzzy_score(normalized, &borough.normalized);

			if score >= threshold && best_borough.is_none_or(|(_, best)| score > best) {
				best_borough = Some((borough, score));
			}
		}

		match (best_region, best_borough) {
			(Some((_, region_score)), Some((borough, borough_score)))
				if borough_score > region_score =>
				TierOutcome::Resolved(ResolvedLocation::borough(
					&borough.name,
					ResolutionTier::Fuzzy,
					ResolutionMethod::Fuzzy,
					borough_score,
				)),
			(Some((region, score)), _) => TierOutcome::Resolved(ResolvedLocation::region(
				catalog.candidate(region, score),
				ResolutionTier::Fuzzy,
				ResolutionMethod::Fuzzy,
			)),
			(None, Some((borough, score))) => TierOutcome::Resolved(ResolvedLocation::borough(
				&borough.name,
				ResolutionTier::Fuzzy,
				ResolutionMethod::Fuzzy,
				score,
			)),
			(None, None) => TierOutcome::NotFound,
		}
	}

	async fn embedding_tier(
		&self,
		catalog: &RegionCatalog,
		normalized: &str,
		budget: Option<&mut RequestBudget>,
	) -> TierOutcome {
		let Some(embedding) = self.embedding.as_ref() else {
			return TierOutcome::Skip;
		};

		if let Some(budget) = budget
			&& !budget.can_afford_tier4_embedding()
		{
			budget.skip(SKIP_TIER4_EMBEDDING);

			return TierOutcome::Skip;
		}

		let Some(vectors) = self.region_vectors(embedding).await else {
			return TierOutcome::Skip;
		};

		if vectors.is_empty() {
			return TierOutcome::Skip;
		}

		let Some(query) = embedding.embed_query(normalized).await else {
			return TierOutcome::Skip;
		};
		let mut scored: Vec<(&CatalogRegion, f32)> = vectors
			.iter()
			.filter_map(|stored| {
				let region = catalog.region_by_id(stored.region_id)?;
				let score = cosine_similarity(&query, &stored.embedding);

				(score >= self.settings.embedding_min_similarity).then_some((region, score))
			})
			.collect();

		scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.name.cmp(&b.0.name)));

		let confident = match scored.as_slice() {
			[] => return TierOutcome::NotFound,
			[_] => true,
			[(_, best), (_, runner_up), ..] =>
				best - runner_up >= self.settings.embedding_confidence_gap,
		};

		if confident {
			let (region, score) = scored[0];

			return TierOutcome::Resolved(ResolvedLocation::region(
				catalog.candidate(region, score),
				ResolutionTier::Embedding,
				ResolutionMethod::Embedding,
			));
		}

		let candidates = scored
			.into_iter()
			.take(self.settings.embedding_top_n as usize)
			.map(|(region, score)| catalog.candidate(region, score))
			.collect();

		TierOutcome::Ambiguous(ResolvedLocation::ambiguous(
			candidates,
			ResolutionTier::Embedding,
			ResolutionMethod::Embedding,
		))
	}

	async fn llm_tier(
		&self,
		catalog: &RegionCatalog,
		text: &str,
		normalized: &str,
		budget: Option<&mut RequestBudget>,
	) -> TierOutcome {
		if !self.settings.llm_enabled {
			return TierOutcome::Skip;
		}

		let Some(llm) = self.llm.as_ref() else {
			return TierOutcome::Skip;
		};

		// Earlier LLM answers are stored as pending_review aliases, which tier 2 ignores. Curated
		// rows were already counted there and must not be replaced by a new guess.
		let mut writable = true;

		match self.regions.find_alias(&self.settings.metro, normalized, false).await {
			Ok(Some(alias)) if alias.is_curated() => writable = false,
			Ok(Some(alias)) => {
				let outcome =
					self.persisted_alias_outcome(catalog, &alias, ResolutionTier::Llm).await;

				if matches!(outcome, TierOutcome::Resolved(_) | TierOutcome::Ambiguous(_)) {
					return outcome;
				}
			},
			Ok(None) => {},
			Err(err) => {
				tracing::warn!(
					error = %err,
					alias = normalized,
					"Cached LLM alias lookup failed."
				);
			},
		}

		if let Some(budget) = budget
			&& !budget.can_afford_tier5_llm()
		{
			budget.skip(SKIP_TIER5_LLM);

			return TierOutcome::Skip;
		}
		if catalog.is_empty() {
			return TierOutcome::Skip;
		}

		let allowed = catalog.region_names();
		let query = collapse_whitespace(text);
		let resolution = match tokio::time::timeout(self.llm_timeout, llm.resolve(&query, &allowed))
			.await
		{
			Ok(Ok(resolution)) => resolution,
			Ok(Err(err)) => {
				tracing::warn!(error = %err, query = %query, "LLM location resolution failed.");

				return TierOutcome::Skip;
			},
			Err(_) => {
				tracing::warn!(
					timeout_ms = self.llm_timeout.as_millis() as u64,
					query = %query,
					"LLM location resolution timed out."
				);

				return TierOutcome::Skip;
			},
		};
		let confidence = clamp_unit(resolution.confidence);
		let mut matched: Vec<&CatalogRegion> = Vec::new();

		for name in &resolution.neighborhoods {
			match catalog.match_name(name) {
				Some(region) if !matched.iter().any(|existing| existing.id == region.id) =>
					matched.push(region),
				Some(_) => {},
				None => {
					tracing::warn!(name = %name, query = %query, "Discarding unknown LLM region.");
				},
			}
		}

		match matched.as_slice() {
			[] => TierOutcome::NotFound,
			[region] => {
				if writable {
					self.persist_llm_alias(normalized, region.id, confidence).await;
				}

				TierOutcome::Resolved(ResolvedLocation::region(
					catalog.candidate(region, confidence),
					ResolutionTier::Llm,
					ResolutionMethod::Llm,
				))
			},
			regions => TierOutcome::Ambiguous(ResolvedLocation::ambiguous(
				regions.iter().map(|region| catalog.candidate(region, confidence)).collect(),
				ResolutionTier::Llm,
				ResolutionMethod::Llm,
			)),
		}
	}

	async fn persisted_alias_outcome(
		&self,
		catalog: &RegionCatalog,
		alias: &LocationAlias,
		tier: ResolutionTier,
	) -> TierOutcome {
		self.record_alias_hit(alias.alias_id).await;

		if alias.is_ambiguous() {
			let candidates = alias
				.candidate_region_ids
				.iter()
				.filter_map(|id| catalog.region_by_id(*id))
				.map(|region| catalog.candidate(region, alias.confidence))
				.collect();

			return candidates_outcome(candidates, tier, ResolutionMethod::Alias);
		}

		match alias.region_boundary_id.and_then(|id| catalog.region_by_id(id)) {
			Some(region) => TierOutcome::Resolved(ResolvedLocation::region(
				catalog.candidate(region, alias.confidence),
				tier,
				ResolutionMethod::Alias,
			)),
			None => {
				tracing::warn!(
					alias_id = %alias.alias_id,
					"Alias points at a region missing from the catalog."
				);

				TierOutcome::Skip
			},
		}
	}

	async fn catalog(&self) -> Option<Arc<RegionCatalog>> {
		let cached = self.catalog.read().unwrap_or_else(|err| err.into_inner()).clone();

		if cached.is_some() {
			return cached;
		}

		match self.regions.list_regions(&self.settings.metro).await {
			Ok(rows) => {
				let catalog = Arc::new(RegionCatalog::new(rows));

				*self.catalog.write().unwrap_or_else(|err| err.into_inner()) =
					Some(catalog.clone());

				Some(catalog)
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					metro = %self.settings.metro,
					"Region catalog load failed."
				);

				None
			},
		}
	}

	async fn region_vectors(
		&self,
		embedding: &EmbeddingService,
	) -> Option<Arc<Vec<RegionEmbedding>>> {
		let cached = self.region_vectors.read().unwrap_or_else(|err| err.into_inner()).clone();

		if cached.is_some() {
			return cached;
		}

		match self.regions.region_embeddings(&self.settings.metro, embedding.model_name()).await {
			Ok(rows) => {
				let vectors = Arc::new(rows);

				*self.region_vectors.write().unwrap_or_else(|err| err.into_inner()) =
					Some(vectors.clone());

				Some(vectors)
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					metro = %self.settings.metro,
					"Region embeddings load failed."
				);

				None
			},
		}
	}

	async fn record_alias_hit(&self, alias_id: Uuid) {
		if let Err(err) = self.regions.record_alias_hit(alias_id).await {
			tracing::warn!(error = %err, alias_id = %alias_id, "Failed to record alias hit.");
		}
	}

	async fn persist_llm_alias(&self, normalized: &str, region_id: Uuid, confidence: f32) {
		let alias = NewLlmAlias {
			metro: &self.settings.metro,
			alias_normalized: normalized,
			region_boundary_id: region_id,
			confidence,
			alias_type: LLM_ALIAS_TYPE,
			now: OffsetDateTime::now_utc(),
		};

		if let Err(err) = self.regions.upsert_llm_alias(alias).await {
			tracing::warn!(
				error = %err,
				alias = normalized,
				"LLM alias write-back failed and was rolled back."
			);
		}
	}

	async fn record_unresolved(&self, text: &str, normalized: &str) {
		let original = collapse_whitespace(text);

		if let Err(err) = self
			.regions
			.record_unresolved(
				&self.settings.metro,
				normalized,
				&original,
				OffsetDateTime::now_utc(),
			)
			.await
		{
			tracing::warn!(error = %err, query = normalized, "Failed to record unresolved query.");
		}
	}

	fn log_perf(&self, normalized: &str, result: &ResolvedLocation, started: Instant) {
		if !self.settings.perf_log_enabled {
			return;
		}

		let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

		if elapsed_ms < self.settings.perf_log_threshold_ms {
			return;
		}

		tracing::info!(
			target: "wayfinder::perf",
			query = normalized,
			method = result.method.as_str(),
			tier = ?result.tier.map(ResolutionTier::number),
			elapsed_ms,
			"Slow location resolution."
		);
	}
}

fn seed_outcome(catalog: &RegionCatalog, seed: &SeedAlias) -> TierOutcome {
	match &seed.target {
		SeedTarget::Region(name) => {
			let Some(region) = catalog.region_by_normalized(&normalize_location_text(name)) else {
				return TierOutcome::Skip;
			};

			TierOutcome::Resolved(ResolvedLocation::region(
				catalog.candidate(region, 1.0),
				ResolutionTier::Alias,
				ResolutionMethod::Alias,
			))
		},
		SeedTarget::Borough(name) => {
			let display = catalog
				.borough_by_normalized(&normalize_location_text(name))
				.map(|borough| borough.name.as_str())
				.unwrap_or_else(|| name.trim());

			TierOutcome::Resolved(ResolvedLocation::borough(
				display,
				ResolutionTier::Alias,
				ResolutionMethod::Alias,
				1.0,
			))
		},
		SeedTarget::Regions(names) => {
			let mut candidates: Vec<LocationCandidate> = Vec::new();

			for name in names {
				if let Some(region) = catalog.region_by_normalized(&normalize_location_text(name))
					&& !candidates.iter().any(|candidate| candidate.region_id == region.id)
				{
					candidates.push(catalog.candidate(region, 1.0));
				}
			}

			match candidates_outcome(candidates, ResolutionTier::Alias, ResolutionMethod::Alias) {
				TierOutcome::NotFound => TierOutcome::Skip,
				outcome => outcome,
			}
		},
	}
}

/// One candidate resolves, several are ambiguous, none is a miss.
fn candidates_outcome(
	mut candidates: Vec<LocationCandidate>,
	tier: ResolutionTier,
	method: ResolutionMethod,
) -> TierOutcome {
	match candidates.len() {
		0 => TierOutcome::NotFound,
		1 => TierOutcome::Resolved(ResolvedLocation::region(candidates.remove(0), tier, method)),
		_ => TierOutcome::Ambiguous(ResolvedLocation::ambiguous(candidates, tier, method)),
	}
}
