use ahash::AHashMap;
use uuid::Uuid;

use crate::location::types::LocationCandidate;
use wayfinder_domain::normalize::normalize_location_text;
use wayfinder_storage::models::RegionBoundary;

#[derive(Clone, Debug)]
pub struct CatalogRegion {
	pub id: Uuid,
	pub name: String,
	pub normalized: String,
	pub borough: Option<String>,
}

#[derive(Clone, Debug)]
pub struct CatalogBorough {
	pub name: String,
	pub normalized: String,
}

/// Immutable snapshot of one metro's regions, sorted by name so every scan is deterministic.
#[derive(Debug, Default)]
pub struct RegionCatalog {
	regions: Vec<CatalogRegion>,
	boroughs: Vec<CatalogBorough>,
	by_normalized: AHashMap<String, usize>,
	by_id: AHashMap<Uuid, usize>,
}
impl RegionCatalog {
	pub fn new(rows: Vec<RegionBoundary>) -> Self {
		let mut regions: Vec<CatalogRegion> = rows
			.into_iter()
			.filter_map(|row| {
				let normalized = normalize_location_text(&row.region_name);

				if normalized.is_empty() {
					return None;
				}

				let borough = row
					.parent_region
					.map(|borough| borough.trim().to_string())
					.filter(|borough| !borough.is_empty());

				Some(CatalogRegion {
					id: row.id,
					name: row.region_name.trim().to_string(),
					normalized,
					borough,
				})
			})
			.collect();

		regions.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

		let mut by_normalized = AHashMap::new();
		let mut by_id = AHashMap::new();
		let mut boroughs: Vec<CatalogBorough> = Vec::new();

		for (idx, region) in regions.iter().enumerate() {
			by_normalized.entry(region.normalized.clone()).or_insert(idx);
			by_id.insert(region.id, idx);

			if let Some(name) = region.borough.as_deref() {
				let normalized = normalize_location_text(name);

				if !normalized.is_empty()
					&& !boroughs.iter().any(|borough| borough.normalized == normalized)
				{
					boroughs.push(CatalogBorough { name: name.to_string(), normalized });
				}
			}
		}

		boroughs.sort_by(|a, b| a.name.cmp(&b.name));

		Self { regions, boroughs, by_normalized, by_id }
	}

	pub fn regions(&self) -> &[CatalogRegion] {
		&self.regions
	}

	pub fn boroughs(&self) -> &[CatalogBorough] {
		&self.boroughs
	}

	pub fn is_empty(&self) -> bool {
		self.regions.is_empty()
	}

	pub fn region_by_normalized(&self, normalized: &str) -> Option<&CatalogRegion> {
		self.by_normalized.get(normalized).map(|idx| &self.regions[*idx])
	}

	pub fn region_by_id(&self, id: Uuid) -> Option<&CatalogRegion> {
		self.by_id.get(&id).map(|idx| &self.regions[*idx])
	}

	pub fn borough_by_normalized(&self, normalized: &str) -> Option<&CatalogBorough> {
		self.boroughs.iter().find(|borough| borough.normalized == normalized)
	}

	/// Regions whose normalized name contains `fragment`, in name order.
	pub fn regions_containing(&self, fragment: &str) -> Vec<&CatalogRegion> {
		if fragment.is_empty() {
			return Vec::new();
		}

		self.regions.iter().filter(|region| region.normalized.contains(fragment)).collect()
	}

	/// Maps a free-form name (from an LLM or a seed file) onto one known region: exact match
	/// first, then a substring match that must be unique.
	pub fn match_name(&self, name: &str) -> Option<&CatalogRegion> {
		let normalized = normalize_location_text(name);

		if let Some(region) = self.region_by_normalized(&normalized) {
			return Some(region);
		}

		match self.regions_containing(&normalized).as_slice() {
			[only] => Some(*only),
			_ => None,
		}
	}

	pub fn region_names(&self) -> Vec<String> {
		self.regions.iter().map(|region| region.name.clone()).collect()
	}

	pub fn candidate(&self, region: &CatalogRegion, score: f32) -> LocationCandidate {
		LocationCandidate {
			region_id: region.id,
			name: region.name.clone(),
			borough: region.borough.clone(),
			score,
		}
	}
}
