use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{LocationAlias, NewLlmAlias},
};

const ALIAS_COLUMNS: &str = "\
alias_id,
	metro,
	alias_normalized,
	region_boundary_id,
	candidate_region_ids,
	source,
	status,
	confidence,
	user_count,
	alias_type,
	created_at,
	updated_at";

pub async fn find_alias(
	db: &Db,
	metro: &str,
	alias_normalized: &str,
	active_only: bool,
) -> Result<Option<LocationAlias>> {
	let sql = format!(
		"\
SELECT
	{ALIAS_COLUMNS}
FROM location_aliases
WHERE metro = $1
	AND alias_normalized = $2
	AND ($3 = false OR status = 'active')"
	);
	let row = sqlx::query_as::<_, LocationAlias>(&sql)
		.bind(metro)
		.bind(alias_normalized)
		.bind(active_only)
		.fetch_optional(&db.pool)
		.await?;

	Ok(row)
}

pub async fn record_alias_hit(db: &Db, alias_id: Uuid) -> Result<()> {
	sqlx::query(
		"\
UPDATE location_aliases
SET user_count = user_count + 1
WHERE alias_id = $1",
	)
	.bind(alias_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn insert_alias(db: &Db, alias: &LocationAlias) -> Result<()> {
	if alias.region_boundary_id.is_none() && alias.candidate_region_ids.is_empty() {
		return Err(Error::InvalidArgument(
			"An ambiguous alias must list candidate regions.".to_string(),
		));
	}

	sqlx::query(
		"\
INSERT INTO location_aliases (
	alias_id,
	metro,
	alias_normalized,
	region_boundary_id,
	candidate_region_ids,
	source,
	status,
	confidence,
	user_count,
	alias_type,
	created_at,
	updated_at
)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)",
	)
	.bind(alias.alias_id)
	.bind(alias.metro.as_str())
	.bind(alias.alias_normalized.as_str())
	.bind(alias.region_boundary_id)
	.bind(alias.candidate_region_ids.as_slice())
	.bind(alias.source.as_str())
	.bind(alias.status.as_str())
	.bind(alias.confidence)
	.bind(alias.user_count)
	.bind(alias.alias_type.as_str())
	.bind(alias.created_at)
	.bind(alias.updated_at)
	.execute(&db.pool)
	.await
	.map_err(|err| match err {
		sqlx::Error::Database(db_err) if db_err.is_unique_violation() =>
			Error::Conflict(format!("Alias {:?} already exists.", alias.alias_normalized)),
		other => Error::Sqlx(other),
	})?;

	Ok(())
}

/// Writes an LLM-derived alias as `pending_review`. An existing pending LLM row for the same alias
/// is loaded under a row lock and updated in place; the whole write is one transaction, so any
/// failure leaves the table untouched. A curated row is returned as is.
pub async fn upsert_llm_alias(db: &Db, alias: NewLlmAlias<'_>) -> Result<LocationAlias> {
	if !(0.0..=1.0).contains(&alias.confidence) {
		return Err(Error::InvalidArgument("Alias confidence must be within 0.0-1.0.".to_string()));
	}

	let mut tx = db.pool.begin().await?;
	let select_sql = format!(
		"\
SELECT
	{ALIAS_COLUMNS}
FROM location_aliases
WHERE metro = $1 AND alias_normalized = $2
FOR UPDATE"
	);
	let existing = sqlx::query_as::<_, LocationAlias>(&select_sql)
		.bind(alias.metro)
		.bind(alias.alias_normalized)
		.fetch_optional(&mut *tx)
		.await?;

	if let Some(curated) = existing.as_ref().filter(|row| row.is_curated()) {
		tx.rollback().await?;

		return Ok(curated.clone());
	}

	let returning_sql = match existing.as_ref() {
		Some(_) => format!(
			"\
UPDATE location_aliases
SET
	region_boundary_id = $3,
	candidate_region_ids = '{{}}',
	source = 'llm',
	status = 'pending_review',
	confidence = $4,
	alias_type = $5,
	updated_at = $6
WHERE metro = $1 AND alias_normalized = $2 AND source = 'llm' AND status = 'pending_review'
RETURNING
	{ALIAS_COLUMNS}"
		),
		None => format!(
			"\
INSERT INTO location_aliases (
	alias_id,
	metro,
	alias_normalized,
	region_boundary_id,
	candidate_region_ids,
	source,
	status,
	confidence,
	user_count,
	alias_type,
	created_at,
	updated_at
)
VALUES ($7, $1, $2, $3, '{{}}', 'llm', 'pending_review', $4, 0, $5, $6, $6)
RETURNING
	{ALIAS_COLUMNS}"
		),
	};
	let query = sqlx::query_as::<_, LocationAlias>(&returning_sql)
		.bind(alias.metro)
		.bind(alias.alias_normalized)
		.bind(alias.region_boundary_id)
		.bind(alias.confidence)
		.bind(alias.alias_type)
		.bind(alias.now);
	let query = if existing.is_none() { query.bind(Uuid::new_v4()) } else { query };
	let row = query.fetch_one(&mut *tx).await?;

	tx.commit().await?;

	Ok(row)
}
