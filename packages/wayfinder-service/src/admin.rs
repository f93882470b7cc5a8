use ahash::AHashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::{
	Error, Result,
	embedding::{EmbeddingService, needs_reembedding},
};
use wayfinder_domain::hash::compute_text_hash;
use wayfinder_storage::{db::Db, models::RegionBoundary, regions};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
	pub scanned: usize,
	pub embedded: usize,
	pub unchanged: usize,
}

/// Text embedded for a region: its name, followed by the borough when known.
pub fn region_embedding_text(region: &RegionBoundary) -> String {
	match region.parent_region.as_deref().map(str::trim).filter(|borough| !borough.is_empty()) {
		Some(borough) => format!("{}, {borough}", region.region_name.trim()),
		None => region.region_name.trim().to_string(),
	}
}

/// Precomputes the vectors the embedding tier compares against.
///
/// Regions whose text hash matches the stored row for the current model are left alone, so a
/// rerun after a partial failure only pays for what changed.
pub async fn rebuild_region_embeddings(
	db: &Db,
	metro: &str,
	embedding: &EmbeddingService,
) -> Result<RebuildReport> {
	let model = embedding.model_name().to_string();
	let boundaries = regions::list_regions(db, metro).await?;
	let stored: AHashMap<Uuid, String> = regions::list_region_embeddings(db, metro, &model)
		.await?
		.into_iter()
		.map(|row| (row.region_id, row.text_hash))
		.collect();
	let mut report = RebuildReport { scanned: boundaries.len(), ..Default::default() };
	let mut pending = Vec::new();

	for region in &boundaries {
		let text = region_embedding_text(region);

		if needs_reembedding(&text, stored.get(&region.id).map(String::as_str)) {
			pending.push((region.id, text));
		} else {
			report.unchanged += 1;
		}
	}

	if pending.is_empty() {
		return Ok(report);
	}

	let texts: Vec<String> = pending.iter().map(|(_, text)| text.clone()).collect();
	let Some(vectors) = embedding.embed_batch(&texts).await else {
		return Err(Error::Provider {
			message: format!("Embedding provider failed while rebuilding {metro} regions."),
		});
	};

	for ((region_id, text), vector) in pending.iter().zip(&vectors) {
		regions::upsert_region_embedding(db, *region_id, &model, vector, &compute_text_hash(text))
			.await?;

		report.embedded += 1;
	}

	tracing::info!(
		metro,
		model = %model,
		scanned = report.scanned,
		embedded = report.embedded,
		unchanged = report.unchanged,
		"Rebuilt region embeddings."
	);

	Ok(report)
}
