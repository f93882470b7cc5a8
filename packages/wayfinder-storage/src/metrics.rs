use uuid::Uuid;

use crate::{Result, db::Db, models::InstructorMetrics};

pub async fn fetch_instructor_metrics(
	db: &Db,
	instructor_ids: &[Uuid],
) -> Result<Vec<InstructorMetrics>> {
	if instructor_ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, InstructorMetrics>(
		"\
SELECT
	instructor_id,
	last_active_at,
	is_founding_instructor,
	has_photo,
	has_bio,
	background_check_verified,
	identity_verified,
	response_rate,
	review_count,
	average_rating
FROM instructor_metrics
WHERE instructor_id = ANY($1)",
	)
	.bind(instructor_ids)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Review-weighted mean rating across all instructors with at least one review.
pub async fn global_average_rating(db: &Db) -> Result<Option<f32>> {
	let value: Option<f64> = sqlx::query_scalar(
		"\
SELECT
	SUM(average_rating::float8 * review_count) / NULLIF(SUM(review_count)::float8, 0)
FROM instructor_metrics
WHERE average_rating IS NOT NULL AND review_count > 0",
	)
	.fetch_one(&db.pool)
	.await?;

	Ok(value.map(|value| value as f32))
}

pub async fn upsert_instructor_metrics(db: &Db, metrics: &InstructorMetrics) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO instructor_metrics (
	instructor_id,
	last_active_at,
	is_founding_instructor,
	has_photo,
	has_bio,
	background_check_verified,
	identity_verified,
	response_rate,
	review_count,
	average_rating,
	updated_at
)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,now())
ON CONFLICT (instructor_id) DO UPDATE
SET
	last_active_at = EXCLUDED.last_active_at,
	is_founding_instructor = EXCLUDED.is_founding_instructor,
	has_photo = EXCLUDED.has_photo,
	has_bio = EXCLUDED.has_bio,
	background_check_verified = EXCLUDED.background_check_verified,
	identity_verified = EXCLUDED.identity_verified,
	response_rate = EXCLUDED.response_rate,
	review_count = EXCLUDED.review_count,
	average_rating = EXCLUDED.average_rating,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(metrics.instructor_id)
	.bind(metrics.last_active_at)
	.bind(metrics.is_founding_instructor)
	.bind(metrics.has_photo)
	.bind(metrics.has_bio)
	.bind(metrics.background_check_verified)
	.bind(metrics.identity_verified)
	.bind(metrics.response_rate)
	.bind(metrics.review_count)
	.bind(metrics.average_rating)
	.execute(&db.pool)
	.await?;

	Ok(())
}
