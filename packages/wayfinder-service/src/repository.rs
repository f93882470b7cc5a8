use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{BoxFuture, Result};
use wayfinder_storage::{
	aliases,
	db::Db,
	metrics,
	models::{InstructorMetrics, LocationAlias, NewLlmAlias, RegionBoundary, RegionEmbedding},
	regions, unresolved,
};

pub trait RegionRepository
where
	Self: Send + Sync,
{
	fn list_regions<'a>(&'a self, metro: &'a str) -> BoxFuture<'a, Result<Vec<RegionBoundary>>>;

	fn find_alias<'a>(
		&'a self,
		metro: &'a str,
		alias_normalized: &'a str,
		active_only: bool,
	) -> BoxFuture<'a, Result<Option<LocationAlias>>>;

	fn record_alias_hit<'a>(&'a self, alias_id: Uuid) -> BoxFuture<'a, Result<()>>;

	fn upsert_llm_alias<'a>(&'a self, alias: NewLlmAlias<'a>)
	-> BoxFuture<'a, Result<LocationAlias>>;

	fn record_unresolved<'a>(
		&'a self,
		metro: &'a str,
		query_normalized: &'a str,
		original_query: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>>;

	fn region_embeddings<'a>(
		&'a self,
		metro: &'a str,
		model: &'a str,
	) -> BoxFuture<'a, Result<Vec<RegionEmbedding>>>;
}

pub trait MetricsRepository
where
	Self: Send + Sync,
{
	fn instructor_metrics<'a>(
		&'a self,
		instructor_ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<Vec<InstructorMetrics>>>;

	/// Review-weighted mean rating across the marketplace, if any reviews exist.
	fn global_average_rating<'a>(&'a self) -> BoxFuture<'a, Result<Option<f32>>>;
}

pub struct PgRegionRepository {
	db: Arc<Db>,
}
impl PgRegionRepository {
	pub fn new(db: Arc<Db>) -> Self {
		Self { db }
	}
}
impl RegionRepository for PgRegionRepository {
	fn list_regions<'a>(&'a self, metro: &'a str) -> BoxFuture<'a, Result<Vec<RegionBoundary>>> {
		Box::pin(async move { Ok(regions::list_regions(&self.db, metro).await?) })
	}

	fn find_alias<'a>(
		&'a self,
		metro: &'a str,
		alias_normalized: &'a str,
		active_only: bool,
	) -> BoxFuture<'a, Result<Option<LocationAlias>>> {
		Box::pin(async move {
			Ok(aliases::find_alias(&self.db, metro, alias_normalized, active_only).await?)
		})
	}

	fn record_alias_hit<'a>(&'a self, alias_id: Uuid) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(aliases::record_alias_hit(&self.db, alias_id).await?) })
	}

	fn upsert_llm_alias<'a>(
		&'a self,
		alias: NewLlmAlias<'a>,
	) -> BoxFuture<'a, Result<LocationAlias>> {
		Box::pin(async move { Ok(aliases::upsert_llm_alias(&self.db, alias).await?) })
	}

	fn record_unresolved<'a>(
		&'a self,
		metro: &'a str,
		query_normalized: &'a str,
		original_query: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			Ok(unresolved::record_unresolved(&self.db, metro, query_normalized, original_query, now)
				.await?)
		})
	}

	fn region_embeddings<'a>(
		&'a self,
		metro: &'a str,
		model: &'a str,
	) -> BoxFuture<'a, Result<Vec<RegionEmbedding>>> {
		Box::pin(async move { Ok(regions::list_region_embeddings(&self.db, metro, model).await?) })
	}
}

pub struct PgMetricsRepository {
	db: Arc<Db>,
}
impl PgMetricsRepository {
	pub fn new(db: Arc<Db>) -> Self {
		Self { db }
	}
}
impl MetricsRepository for PgMetricsRepository {
	fn instructor_metrics<'a>(
		&'a self,
		instructor_ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<Vec<InstructorMetrics>>> {
		Box::pin(async move {
			Ok(metrics::fetch_instructor_metrics(&self.db, instructor_ids).await?)
		})
	}

	fn global_average_rating<'a>(&'a self) -> BoxFuture<'a, Result<Option<f32>>> {
		Box::pin(async move { Ok(metrics::global_average_rating(&self.db).await?) })
	}
}
