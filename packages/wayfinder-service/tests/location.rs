use std::{
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::{Duration, Instant},
};

use time::OffsetDateTime;
use uuid::Uuid;

use wayfinder_config::Config;
use wayfinder_domain::budget::{SKIP_TIER4_EMBEDDING, SKIP_TIER5_LLM};
use wayfinder_service::{
	BoxFuture, EmbeddingProvider, EmbeddingService, Error, LlmResolution, LlmResolver,
	LocationResolver, ManualClock, RequestBudget, Result,
	location::{LocationKind, ResolutionMethod, ResolutionTier, SeedAliases, SeedTarget},
	repository::RegionRepository,
};
use wayfinder_storage::models::{LocationAlias, NewLlmAlias, RegionBoundary, RegionEmbedding};

const CONFIG_TOML: &str = include_str!("fixtures/config.toml");

fn test_config() -> Config {
	toml::from_str(CONFIG_TOML).expect("Failed to parse test config.")
}

fn region(name: &str, borough: &str) -> RegionBoundary {
	RegionBoundary {
		id: Uuid::new_v4(),
		metro: "nyc".to_string(),
		region_name: name.to_string(),
		parent_region: Some(borough.to_string()),
	}
}

fn nyc_regions() -> Vec<RegionBoundary> {
	vec![
		region("SoHo", "Manhattan"),
		region("Upper East Side", "Manhattan"),
		region("Upper West Side", "Manhattan"),
		region("Carnegie Hill", "Manhattan"),
		region("Williamsburg", "Brooklyn"),
		region("Park Slope", "Brooklyn"),
	]
}

#[derive(Default)]
struct SpyRegions {
	regions: Vec<RegionBoundary>,
	embeddings: Vec<RegionEmbedding>,
	aliases: Mutex<Vec<LocationAlias>>,
	unresolved: Mutex<Vec<String>>,
	fail_upserts: bool,
	list_calls: AtomicUsize,
	find_alias_calls: AtomicUsize,
	alias_hits: AtomicUsize,
	upsert_calls: AtomicUsize,
}
impl SpyRegions {
	fn new(regions: Vec<RegionBoundary>) -> Self {
		Self { regions, ..Default::default() }
	}

	fn id_of(&self, name: &str) -> Uuid {
		self.regions
			.iter()
			.find(|region| region.region_name == name)
			.map(|region| region.id)
			.expect("Region must exist in the fixture.")
	}

	fn with_embedding(mut self, name: &str, embedding: Vec<f32>) -> Self {
		let region_id = self.id_of(name);

		self.embeddings.push(RegionEmbedding {
			region_id,
			model: "text-embedding-3-small".to_string(),
			embedding,
			text_hash: String::new(),
		});

		self
	}

	fn with_alias(
		self,
		alias: &str,
		region_boundary_id: Option<Uuid>,
		candidate_region_ids: Vec<Uuid>,
		source: &str,
	) -> Self {
		let now = OffsetDateTime::now_utc();

		self.aliases.lock().expect("Alias lock poisoned.").push(LocationAlias {
			alias_id: Uuid::new_v4(),
			metro: "nyc".to_string(),
			alias_normalized: alias.to_string(),
			region_boundary_id,
			candidate_region_ids,
			source: source.to_string(),
			status: "active".to_string(),
			confidence: 0.9,
			user_count: 0,
			alias_type: "colloquial".to_string(),
			created_at: now,
			updated_at: now,
		});

		self
	}

	fn total_calls(&self) -> usize {
		self.list_calls.load(Ordering::SeqCst)
			+ self.find_alias_calls.load(Ordering::SeqCst)
			+ self.upsert_calls.load(Ordering::SeqCst)
			+ self.unresolved.lock().expect("Unresolved lock poisoned.").len()
	}
}
impl RegionRepository for SpyRegions {
	fn list_regions<'a>(&'a self, _metro: &'a str) -> BoxFuture<'a, Result<Vec<RegionBoundary>>> {
		self.list_calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move { Ok(self.regions.clone()) })
	}

	fn find_alias<'a>(
		&'a self,
		_metro: &'a str,
		alias_normalized: &'a str,
		active_only: bool,
	) -> BoxFuture<'a, Result<Option<LocationAlias>>> {
		self.find_alias_calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			let aliases = self.aliases.lock().expect("Alias lock poisoned.");

			Ok(aliases
				.iter()
				.find(|alias| {
					alias.alias_normalized == alias_normalized
						&& (!active_only || alias.status == "active")
				})
				.cloned())
		})
	}

	fn record_alias_hit<'a>(&'a self, _alias_id: Uuid) -> BoxFuture<'a, Result<()>> {
		self.alias_hits.fetch_add(1, Ordering::SeqCst);

		Box::pin(async { Ok(()) })
	}

	fn upsert_llm_alias<'a>(
		&'a self,
		alias: NewLlmAlias<'a>,
	) -> BoxFuture<'a, Result<LocationAlias>> {
		self.upsert_calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			if self.fail_upserts {
				return Err(Error::Storage { message: "alias write rejected".to_string() });
			}

			let row = LocationAlias {
				alias_id: Uuid::new_v4(),
				metro: alias.metro.to_string(),
				alias_normalized: alias.alias_normalized.to_string(),
				region_boundary_id: Some(alias.region_boundary_id),
				candidate_region_ids: Vec::new(),
				source: "llm".to_string(),
				status: "pending_review".to_string(),
				confidence: alias.confidence,
				user_count: 1,
				alias_type: alias.alias_type.to_string(),
				created_at: alias.now,
				updated_at: alias.now,
			};

			self.aliases.lock().expect("Alias lock poisoned.").push(row.clone());

			Ok(row)
		})
	}

	fn record_unresolved<'a>(
		&'a self,
		_metro: &'a str,
		query_normalized: &'a str,
		_original_query: &'a str,
		_now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		let mut unresolved = self.unresolved.lock().expect("Unresolved lock poisoned.");

		unresolved.push(query_normalized.to_string());

		Box::pin(async { Ok(()) })
	}

	fn region_embeddings<'a>(
		&'a self,
		_metro: &'a str,
		_model: &'a str,
	) -> BoxFuture<'a, Result<Vec<RegionEmbedding>>> {
		Box::pin(async move { Ok(self.embeddings.clone()) })
	}
}

struct FixedEmbedder {
	vector: Vec<f32>,
	calls: AtomicUsize,
}
impl FixedEmbedder {
	fn new(vector: Vec<f32>) -> Self {
		Self { vector, calls: AtomicUsize::new(0) }
	}
}
impl EmbeddingProvider for FixedEmbedder {
	fn embed<'a>(
		&'a self,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move { Ok(texts.iter().map(|_| self.vector.clone()).collect()) })
	}

	fn model_name(&self) -> &str {
		"text-embedding-3-small"
	}
}

struct StubLlm {
	neighborhoods: Vec<String>,
	delay: Duration,
	calls: AtomicUsize,
}
impl StubLlm {
	fn answering(names: &[&str]) -> Self {
		Self {
			neighborhoods: names.iter().map(|name| name.to_string()).collect(),
			delay: Duration::ZERO,
			calls: AtomicUsize::new(0),
		}
	}
}
impl LlmResolver for StubLlm {
	fn resolve<'a>(
		&'a self,
		_query: &'a str,
		_allowed: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<LlmResolution>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			if !self.delay.is_zero() {
				tokio::time::sleep(self.delay).await;
			}

			Ok(LlmResolution { neighborhoods: self.neighborhoods.clone(), confidence: 0.8 })
		})
	}
}

fn resolver(regions: Arc<SpyRegions>) -> LocationResolver {
	LocationResolver::new(test_config().location, regions)
}

fn embedding_service(provider: Arc<FixedEmbedder>) -> Arc<EmbeddingService> {
	Arc::new(EmbeddingService::new(&test_config(), provider, None, Arc::new(ManualClock::new())))
}

#[tokio::test]
async fn exact_match_ignores_case_and_whitespace() {
	let regions = Arc::new(SpyRegions::new(nyc_regions()));
	let resolver = resolver(regions.clone());
	let found = resolver.resolve("  upper   EAST\tside ", false).await;

	assert!(found.resolved);
	assert_eq!(found.tier, Some(ResolutionTier::Exact));
	assert_eq!(found.method, ResolutionMethod::Exact);
	assert_eq!(found.region_name.as_deref(), Some("Upper East Side"));
	assert_eq!(found.borough.as_deref(), Some("Manhattan"));
	assert_eq!(regions.find_alias_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn borough_name_resolves_exactly() {
	let resolver = resolver(Arc::new(SpyRegions::new(nyc_regions())));
	let found = resolver.resolve("brooklyn", true).await;

	assert_eq!(found.kind, LocationKind::Borough);
	assert_eq!(found.tier, Some(ResolutionTier::Exact));
	assert_eq!(found.borough.as_deref(), Some("Brooklyn"));
}

#[tokio::test]
async fn seed_abbreviation_resolves_borough_without_network() {
	let regions = Arc::new(SpyRegions::new(nyc_regions()));
	let embedder = Arc::new(FixedEmbedder::new(vec![1.0, 0.0, 0.0]));
	let llm = Arc::new(StubLlm::answering(&["Park Slope"]));
	let mut seeds = SeedAliases::new();

	seeds.insert("BK", SeedTarget::Borough("Brooklyn".to_string()), "abbreviation");

	let resolver = resolver(regions.clone())
		.with_seeds(seeds)
		.with_embedding(embedding_service(embedder.clone()))
		.with_llm(llm.clone());
	let found = resolver.resolve("bk", true).await;

	assert!(found.resolved);
	assert_eq!(found.kind, LocationKind::Borough);
	assert_eq!(found.tier, Some(ResolutionTier::Alias));
	assert_eq!(found.method, ResolutionMethod::Alias);
	assert_eq!(found.borough.as_deref(), Some("Brooklyn"));
	assert_eq!(regions.find_alias_calls.load(Ordering::SeqCst), 0);
	assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
	assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn ambiguous_seed_alias_lists_every_region() {
	let regions = Arc::new(SpyRegions::new(nyc_regions()));
	let mut seeds = SeedAliases::new();

	seeds.insert(
		"uptown",
		SeedTarget::Regions(vec!["Upper East Side".to_string(), "Upper West Side".to_string()]),
		"colloquial",
	);

	let resolver = resolver(regions.clone()).with_seeds(seeds);
	let found = resolver.resolve("Uptown", true).await;

	assert!(!found.resolved);
	assert!(found.requires_clarification);
	assert_eq!(found.tier, Some(ResolutionTier::Alias));
	assert_eq!(found.method, ResolutionMethod::Alias);

	let names: Vec<&str> = found.candidates.iter().map(|c| c.name.as_str()).collect();

	assert_eq!(names, ["Upper East Side", "Upper West Side"]);
	assert_eq!(regions.find_alias_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn active_persisted_alias_resolves_at_the_alias_tier() {
	let regions = SpyRegions::new(nyc_regions());
	let park_slope = regions.id_of("Park Slope");
	let regions = Arc::new(regions.with_alias("the slope", Some(park_slope), Vec::new(), "manual"));
	let llm = Arc::new(StubLlm::answering(&["Williamsburg"]));
	let resolver = resolver(regions.clone()).with_llm(llm.clone());
	let found = resolver.resolve("The  Slope", true).await;

	assert!(found.resolved);
	assert_eq!(found.tier, Some(ResolutionTier::Alias));
	assert_eq!(found.method, ResolutionMethod::Alias);
	assert_eq!(found.region_id, Some(park_slope));
	assert_eq!(found.borough.as_deref(), Some("Brooklyn"));
	assert_eq!(regions.alias_hits.load(Ordering::SeqCst), 1);
	assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn ambiguous_persisted_alias_returns_full_candidates() {
	let regions = SpyRegions::new(nyc_regions());
	let candidate_ids = vec![regions.id_of("Upper East Side"), regions.id_of("Upper West Side")];
	let regions =
		Arc::new(regions.with_alias("the upper side", None, candidate_ids.clone(), "manual"));
	let resolver = resolver(regions.clone());
	let found = resolver.resolve("the upper side", false).await;

	assert!(!found.resolved);
	assert!(found.requires_clarification);
	assert_eq!(found.tier, Some(ResolutionTier::Alias));
	assert_eq!(found.method, ResolutionMethod::Alias);
	assert_eq!(found.candidates.len(), 2);

	for (candidate, id) in found.candidates.iter().zip(&candidate_ids) {
		assert_eq!(candidate.region_id, *id);
		assert_eq!(candidate.borough.as_deref(), Some("Manhattan"));
		assert!((candidate.score - 0.9).abs() < 1e-6);
	}

	let names: Vec<&str> = found.candidates.iter().map(|c| c.name.as_str()).collect();

	assert_eq!(names, ["Upper East Side", "Upper West Side"]);
}

#[tokio::test]
async fn curated_alias_is_never_replaced_by_an_llm_answer() {
	// The alias targets a region the cached catalog does not know yet.
	let regions = Arc::new(SpyRegions::new(nyc_regions()).with_alias(
		"below houston",
		Some(Uuid::new_v4()),
		Vec::new(),
		"manual",
	));
	let llm = Arc::new(StubLlm::answering(&["SoHo"]));
	let resolver = resolver(regions.clone()).with_llm(llm.clone());
	let found = resolver.resolve("below houston", true).await;

	assert!(found.resolved);
	assert_eq!(found.tier, Some(ResolutionTier::Llm));
	assert_eq!(found.region_name.as_deref(), Some("SoHo"));
	assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
	assert_eq!(regions.upsert_calls.load(Ordering::SeqCst), 0);
	assert_eq!(regions.alias_hits.load(Ordering::SeqCst), 1);

	let aliases = regions.aliases.lock().expect("Alias lock poisoned.");

	assert_eq!(aliases.len(), 1);
	assert_eq!(aliases[0].source, "manual");
	assert_eq!(aliases[0].status, "active");
}

#[tokio::test]
async fn blank_and_short_input_never_reaches_a_tier() {
	let regions = Arc::new(SpyRegions::new(nyc_regions()));
	let resolver = resolver(regions.clone());

	for input in ["", "   \t ", "a", "..."] {
		let found = resolver.resolve(input, true).await;

		assert!(found.not_found, "input = {input:?}");
		assert!(!found.resolved);
	}

	assert_eq!(regions.total_calls(), 0);
}

#[tokio::test]
async fn shared_substring_requires_clarification() {
	let resolver = resolver(Arc::new(SpyRegions::new(nyc_regions())));
	let found = resolver.resolve("upper", false).await;

	assert!(!found.resolved);
	assert!(found.requires_clarification);
	assert_eq!(found.tier, Some(ResolutionTier::Substring));
	assert_eq!(found.candidates.len(), 2);

	let mut names: Vec<&str> = found.candidates.iter().map(|c| c.name.as_str()).collect();

	names.sort_unstable();

	assert_eq!(names, ["Upper East Side", "Upper West Side"]);
}

#[tokio::test]
async fn unique_substring_resolves() {
	let resolver = resolver(Arc::new(SpyRegions::new(nyc_regions())));
	let found = resolver.resolve("carnegie", false).await;

	assert!(found.resolved);
	assert_eq!(found.tier, Some(ResolutionTier::Substring));
	assert_eq!(found.region_name.as_deref(), Some("Carnegie Hill"));
}

#[tokio::test]
async fn typo_resolves_fuzzily() {
	let resolver = resolver(Arc::new(SpyRegions::new(nyc_regions())));
	let found = resolver.resolve("Willamsburg", false).await;

	assert!(found.resolved);
	assert_eq!(found.tier, Some(ResolutionTier::Fuzzy));
	assert_eq!(found.region_name.as_deref(), Some("Williamsburg"));
	assert!(found.confidence >= 0.45);
}

#[tokio::test]
async fn landmark_resolves_by_embedding_when_confident() {
	let regions = Arc::new(
		SpyRegions::new(nyc_regions())
			.with_embedding("Upper East Side", vec![1.0, 0.0, 0.0])
			.with_embedding("Carnegie Hill", vec![0.6, 0.8, 0.0])
			.with_embedding("Williamsburg", vec![0.0, 0.0, 1.0]),
	);
	let embedder = Arc::new(FixedEmbedder::new(vec![1.0, 0.0, 0.0]));
	let resolver = resolver(regions).with_embedding(embedding_service(embedder.clone()));
	let found = resolver.resolve("museum mile", true).await;

	assert!(found.resolved);
	assert_eq!(found.tier, Some(ResolutionTier::Embedding));
	assert_eq!(found.method, ResolutionMethod::Embedding);
	assert_eq!(found.region_name.as_deref(), Some("Upper East Side"));
	assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn close_embedding_scores_require_clarification() {
	let regions = Arc::new(
		SpyRegions::new(nyc_regions())
			.with_embedding("Upper East Side", vec![1.0, 0.0, 0.0])
			.with_embedding("Carnegie Hill", vec![0.0, 1.0, 0.0]),
	);
	let embedder = Arc::new(FixedEmbedder::new(vec![1.0, 1.0, 0.0]));
	let resolver = resolver(regions).with_embedding(embedding_service(embedder));
	let found = resolver.resolve("museum mile", true).await;

	assert!(!found.resolved);
	assert!(found.requires_clarification);
	assert_eq!(found.tier, Some(ResolutionTier::Embedding));
	assert!(found.candidates.len() >= 2);
}

#[tokio::test]
async fn semantic_tiers_stay_off_unless_enabled() {
	let regions = Arc::new(
		SpyRegions::new(nyc_regions()).with_embedding("Upper East Side", vec![1.0, 0.0, 0.0]),
	);
	let embedder = Arc::new(FixedEmbedder::new(vec![1.0, 0.0, 0.0]));
	let llm = Arc::new(StubLlm::answering(&["Upper East Side"]));
	let resolver = resolver(regions.clone())
		.with_embedding(embedding_service(embedder.clone()))
		.with_llm(llm.clone());
	let found = resolver.resolve("museum mile", false).await;

	assert!(found.not_found);
	assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
	assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn llm_single_match_is_cached_for_the_next_request() {
	let regions = Arc::new(SpyRegions::new(nyc_regions()));
	let llm = Arc::new(StubLlm::answering(&["carnegie hill"]));
	let resolver = resolver(regions.clone()).with_llm(llm.clone());
	let first = resolver.resolve("Museum Mile", true).await;

	assert!(first.resolved);
	assert_eq!(first.tier, Some(ResolutionTier::Llm));
	assert_eq!(first.method, ResolutionMethod::Llm);
	assert_eq!(first.region_name.as_deref(), Some("Carnegie Hill"));
	assert_eq!(regions.upsert_calls.load(Ordering::SeqCst), 1);

	let second = resolver.resolve("museum mile", true).await;

	assert!(second.resolved);
	assert_eq!(second.tier, Some(ResolutionTier::Llm));
	assert_eq!(second.method, ResolutionMethod::Alias);
	assert_eq!(second.region_id, Some(regions.id_of("Carnegie Hill")));
	assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn llm_multiple_matches_are_not_persisted() {
	let regions = Arc::new(SpyRegions::new(nyc_regions()));
	let llm = Arc::new(StubLlm::answering(&["Upper East Side", "Carnegie Hill", "Atlantis"]));
	let resolver = resolver(regions.clone()).with_llm(llm);
	let found = resolver.resolve("museum mile", true).await;

	assert!(found.requires_clarification);
	assert_eq!(found.tier, Some(ResolutionTier::Llm));
	assert_eq!(found.candidates.len(), 2);
	assert_eq!(regions.upsert_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn llm_write_back_failure_still_resolves() {
	let regions = Arc::new(SpyRegions { fail_upserts: true, ..SpyRegions::new(nyc_regions()) });
	let resolver = resolver(regions.clone()).with_llm(Arc::new(StubLlm::answering(&["SoHo"])));
	let found = resolver.resolve("museum mile", true).await;

	assert!(found.resolved);
	assert_eq!(found.region_name.as_deref(), Some("SoHo"));
	assert_eq!(regions.upsert_calls.load(Ordering::SeqCst), 1);
	assert!(regions.unresolved.lock().expect("Unresolved lock poisoned.").is_empty());
}

#[tokio::test]
async fn slow_llm_is_cut_off_at_its_timeout() {
	let regions = Arc::new(SpyRegions::new(nyc_regions()));
	let llm = Arc::new(StubLlm { delay: Duration::from_secs(5), ..StubLlm::answering(&["SoHo"]) });
	let resolver = resolver(regions.clone())
		.with_llm(llm.clone())
		.with_llm_timeout(Duration::from_millis(50));
	let started = Instant::now();
	let found = resolver.resolve("museum mile", true).await;

	assert!(found.not_found);
	assert!(started.elapsed() < Duration::from_secs(2));
	assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
	assert_eq!(regions.upsert_calls.load(Ordering::SeqCst), 0);
	assert_eq!(
		regions.unresolved.lock().expect("Unresolved lock poisoned.").as_slice(),
		["museum mile"]
	);
}

#[tokio::test]
async fn exhausted_budget_skips_semantic_tiers() {
	let regions = Arc::new(
		SpyRegions::new(nyc_regions()).with_embedding("Upper East Side", vec![1.0, 0.0, 0.0]),
	);
	let embedder = Arc::new(FixedEmbedder::new(vec![1.0, 0.0, 0.0]));
	let llm = Arc::new(StubLlm::answering(&["Upper East Side"]));
	let resolver = resolver(regions)
		.with_embedding(embedding_service(embedder.clone()))
		.with_llm(llm.clone());
	let mut budget = RequestBudget::new(0);
	let found = resolver.resolve_with_budget("museum mile", true, Some(&mut budget)).await;

	assert!(found.not_found);
	assert!(budget.was_skipped(SKIP_TIER4_EMBEDDING));
	assert!(budget.was_skipped(SKIP_TIER5_LLM));
	assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
	assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn only_terminal_misses_are_recorded() {
	let regions = Arc::new(SpyRegions::new(nyc_regions()));
	let resolver = resolver(regions.clone());

	assert!(resolver.resolve("SoHo", false).await.resolved);
	assert!(resolver.resolve("upper", false).await.requires_clarification);
	assert!(resolver.resolve("Zzyzx  Qrst", false).await.not_found);

	let unresolved = regions.unresolved.lock().expect("Unresolved lock poisoned.");

	assert_eq!(unresolved.as_slice(), ["zzyzx qrst"]);
}

#[tokio::test]
async fn catalog_is_loaded_once_until_invalidated() {
	let regions = Arc::new(SpyRegions::new(nyc_regions()));
	let resolver = resolver(regions.clone());

	resolver.resolve("soho", false).await;
	resolver.resolve("park slope", false).await;

	assert_eq!(regions.list_calls.load(Ordering::SeqCst), 1);

	resolver.invalidate();
	resolver.resolve("soho", false).await;

	assert_eq!(regions.list_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn blocking_variant_matches_async_result() {
	let resolver = resolver(Arc::new(SpyRegions::new(nyc_regions())));
	let found = resolver.resolve_blocking("Park Slope", false);

	assert!(found.resolved);
	assert_eq!(found.tier, Some(ResolutionTier::Exact));
	assert_eq!(found.borough.as_deref(), Some("Brooklyn"));
}
