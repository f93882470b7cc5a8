use time::OffsetDateTime;

use crate::{Result, db::Db, models::UnresolvedLocationQuery};

pub async fn record_unresolved(
	db: &Db,
	metro: &str,
	query_normalized: &str,
	original_query: &str,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO unresolved_location_queries (
	metro,
	query_normalized,
	original_query,
	search_count,
	first_seen_at,
	last_seen_at
)
VALUES ($1, $2, $3, 1, $4, $4)
ON CONFLICT (metro, query_normalized) DO UPDATE
SET
	search_count = unresolved_location_queries.search_count + 1,
	last_seen_at = EXCLUDED.last_seen_at",
	)
	.bind(metro)
	.bind(query_normalized)
	.bind(original_query)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Most frequent misses first, for offline alias seeding.
pub async fn list_unresolved(
	db: &Db,
	metro: &str,
	limit: i64,
) -> Result<Vec<UnresolvedLocationQuery>> {
	let rows = sqlx::query_as::<_, UnresolvedLocationQuery>(
		"\
SELECT metro, query_normalized, original_query, search_count, first_seen_at, last_seen_at
FROM unresolved_location_queries
WHERE metro = $1
ORDER BY search_count DESC, last_seen_at DESC
LIMIT $2",
	)
	.bind(metro)
	.bind(limit)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}
