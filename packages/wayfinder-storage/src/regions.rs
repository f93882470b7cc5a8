use uuid::Uuid;

use crate::{
	Result,
	db::Db,
	models::{RegionBoundary, RegionEmbedding},
};

pub async fn list_regions(db: &Db, metro: &str) -> Result<Vec<RegionBoundary>> {
	let rows = sqlx::query_as::<_, RegionBoundary>(
		"\
SELECT id, metro, region_name, parent_region
FROM region_boundaries
WHERE metro = $1
ORDER BY region_name",
	)
	.bind(metro)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn insert_region(db: &Db, region: &RegionBoundary) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO region_boundaries (id, metro, region_name, parent_region)
VALUES ($1, $2, $3, $4)
ON CONFLICT (metro, region_name) DO UPDATE
SET parent_region = EXCLUDED.parent_region",
	)
	.bind(region.id)
	.bind(region.metro.as_str())
	.bind(region.region_name.as_str())
	.bind(region.parent_region.as_deref())
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn list_region_embeddings(
	db: &Db,
	metro: &str,
	model: &str,
) -> Result<Vec<RegionEmbedding>> {
	let rows = sqlx::query_as::<_, RegionEmbedding>(
		"\
SELECT e.region_id, e.model, e.embedding, e.text_hash
FROM region_embeddings e
JOIN region_boundaries r ON r.id = e.region_id
WHERE r.metro = $1 AND e.model = $2",
	)
	.bind(metro)
	.bind(model)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn upsert_region_embedding(
	db: &Db,
	region_id: Uuid,
	model: &str,
	embedding: &[f32],
	text_hash: &str,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO region_embeddings (region_id, model, embedding, text_hash, updated_at)
VALUES ($1, $2, $3, $4, now())
ON CONFLICT (region_id, model) DO UPDATE
SET
	embedding = EXCLUDED.embedding,
	text_hash = EXCLUDED.text_hash,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(region_id)
	.bind(model)
	.bind(embedding)
	.bind(text_hash)
	.execute(&db.pool)
	.await?;

	Ok(())
}
