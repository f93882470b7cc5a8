use std::path::Path;

use ahash::AHashMap;

use crate::Result;
use wayfinder_config::SeedAliasRecord;
use wayfinder_domain::normalize::normalize_location_text;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SeedTarget {
	Region(String),
	Borough(String),
	/// Deliberately ambiguous alias; resolution asks the user to pick.
	Regions(Vec<String>),
}

#[derive(Clone, Debug)]
pub struct SeedAlias {
	pub target: SeedTarget,
	pub alias_type: String,
}

/// Curated aliases consulted before the persisted alias table. Keys are normalized.
#[derive(Clone, Debug, Default)]
pub struct SeedAliases {
	entries: AHashMap<String, SeedAlias>,
}
impl SeedAliases {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn load(path: &Path) -> Result<Self> {
		let file = wayfinder_config::load_seed_aliases(path)?;

		Ok(Self::from_records(&file.alias))
	}

	pub fn from_records(records: &[SeedAliasRecord]) -> Self {
		let mut seeds = Self::new();

		for record in records {
			let target = if let Some(region) = record.region.as_ref() {
				SeedTarget::Region(region.clone())
			} else if let Some(borough) = record.borough.as_ref() {
				SeedTarget::Borough(borough.clone())
			} else if let [only] = record.regions.as_slice() {
				SeedTarget::Region(only.clone())
			} else {
				SeedTarget::Regions(record.regions.clone())
			};

			seeds.insert(&record.alias, target, &record.alias_type);
		}

		seeds
	}

	/// Later inserts for the same normalized alias replace earlier ones.
	pub fn insert(&mut self, alias: &str, target: SeedTarget, alias_type: &str) {
		let key = normalize_location_text(alias);

		if key.is_empty() {
			return;
		}

		self.entries.insert(key, SeedAlias { target, alias_type: alias_type.to_string() });
	}

	pub fn get(&self, normalized: &str) -> Option<&SeedAlias> {
		self.entries.get(normalized)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
