use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use uuid::Uuid;

use wayfinder_config::{Config, Postgres};
use wayfinder_service::{
	BoxFuture, CacheBackend, EmbedPath, EmbeddingProvider, EmbeddingService, LlmResolution,
	LlmResolver, LocationResolver, PgCache, PgRegionRepository, SystemClock,
	admin::rebuild_region_embeddings, location::ResolutionMethod,
};
use wayfinder_storage::{db::Db, models::RegionBoundary, regions, unresolved};
use wayfinder_testkit::TestDatabase;

const CONFIG_TOML: &str = include_str!("fixtures/config.toml");

struct CountingProvider {
	calls: AtomicUsize,
}
impl EmbeddingProvider for CountingProvider {
	fn embed<'a>(
		&'a self,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			Ok(texts.iter().map(|text| vec![text.len() as f32, 1.0, 0.0]).collect())
		})
	}

	fn model_name(&self) -> &str {
		"text-embedding-3-small"
	}
}

struct OneAnswer {
	calls: AtomicUsize,
}
impl LlmResolver for OneAnswer {
	fn resolve<'a>(
		&'a self,
		_query: &'a str,
		_allowed: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<LlmResolution>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async {
			Ok(LlmResolution { neighborhoods: vec!["Tribeca".to_string()], confidence: 0.7 })
		})
	}
}

fn test_config(metro: &str) -> Config {
	let mut cfg: Config = toml::from_str(CONFIG_TOML).expect("Failed to parse test config.");

	cfg.location.metro = metro.to_string();

	cfg
}

async fn bootstrap(test_db: &TestDatabase) -> Db {
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 4 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	db
}

async fn seed_regions(db: &Db, metro: &str) {
	for (name, borough) in [("SoHo", "Manhattan"), ("Tribeca", "Manhattan"), ("DUMBO", "Brooklyn")]
	{
		let region = RegionBoundary {
			id: Uuid::new_v4(),
			metro: metro.to_string(),
			region_name: name.to_string(),
			parent_region: Some(borough.to_string()),
		};

		regions::insert_region(db, &region).await.expect("Failed to insert region.");
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set WAYFINDER_PG_DSN to run."]
async fn region_embedding_rebuild_skips_unchanged_regions() {
	let Some(base_dsn) = wayfinder_testkit::env_dsn() else {
		eprintln!(
			"Skipping region_embedding_rebuild_skips_unchanged_regions; \
			 set WAYFINDER_PG_DSN to run."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let metro = test_db.metro("nyc");

	seed_regions(&db, &metro).await;

	let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0) });
	let embedding = EmbeddingService::new(
		&test_config(&metro),
		provider.clone(),
		None,
		Arc::new(SystemClock::new()),
	);
	let first =
		rebuild_region_embeddings(&db, &metro, &embedding).await.expect("First rebuild failed.");

	assert_eq!((first.scanned, first.embedded, first.unchanged), (3, 3, 0));

	let second =
		rebuild_region_embeddings(&db, &metro, &embedding).await.expect("Second rebuild failed.");

	assert_eq!((second.scanned, second.embedded, second.unchanged), (3, 0, 3));
	assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set WAYFINDER_PG_DSN to run."]
async fn pg_cache_serves_the_second_lookup() {
	let Some(base_dsn) = wayfinder_testkit::env_dsn() else {
		eprintln!("Skipping pg_cache_serves_the_second_lookup; set WAYFINDER_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = Arc::new(bootstrap(&test_db).await);
	let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0) });
	let cache: Arc<dyn CacheBackend> = Arc::new(PgCache::new(db.clone()));
	let embedding = EmbeddingService::new(
		&test_config("nyc"),
		provider.clone(),
		Some(cache),
		Arc::new(SystemClock::new()),
	);

	assert_eq!(embedding.embed_query_traced("piano lessons").await.path, EmbedPath::Leader);
	assert_eq!(embedding.embed_query_traced("piano lessons").await.path, EmbedPath::CacheHit);
	assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

	drop(embedding);
	drop(db);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set WAYFINDER_PG_DSN to run."]
async fn llm_answer_is_persisted_and_reused() {
	let Some(base_dsn) = wayfinder_testkit::env_dsn() else {
		eprintln!("Skipping llm_answer_is_persisted_and_reused; set WAYFINDER_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = Arc::new(bootstrap(&test_db).await);
	let metro = test_db.metro("nyc");

	seed_regions(&db, &metro).await;

	let llm = Arc::new(OneAnswer { calls: AtomicUsize::new(0) });
	let resolver = LocationResolver::from_config(
		&test_config(&metro),
		Arc::new(PgRegionRepository::new(db.clone())),
		None,
		Some(llm.clone()),
	)
	.expect("Failed to build resolver.");
	let first = resolver.resolve("below canal", true).await;
	let second = resolver.resolve("Below Canal", true).await;

	assert_eq!(first.method, ResolutionMethod::Llm);
	assert_eq!(second.method, ResolutionMethod::Alias);
	assert_eq!(second.region_name.as_deref(), Some("Tribeca"));
	assert_eq!(llm.calls.load(Ordering::SeqCst), 1);

	let missed = resolver.resolve("qqzzx", false).await;

	assert!(missed.not_found);

	let rows = unresolved::list_unresolved(&db, &metro, 10).await.expect("Failed to list misses.");

	assert!(rows.iter().any(|row| row.query_normalized == "qqzzx"));

	drop(resolver);
	drop(db);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
