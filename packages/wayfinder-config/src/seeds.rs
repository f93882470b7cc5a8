use std::{fs, path::Path};

use serde::Deserialize;

use crate::{Error, Result};

#[derive(Debug, Default, Deserialize)]
pub struct SeedAliasFile {
	#[serde(default)]
	pub alias: Vec<SeedAliasRecord>,
}

/// One `[[alias]]` entry. Exactly one of `region`, `borough`, or `regions` is set.
#[derive(Clone, Debug, Deserialize)]
pub struct SeedAliasRecord {
	pub alias: String,
	pub region: Option<String>,
	pub borough: Option<String>,
	#[serde(default)]
	pub regions: Vec<String>,
	#[serde(default = "default_alias_type")]
	pub alias_type: String,
}

pub fn load_seed_aliases(path: &Path) -> Result<SeedAliasFile> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse_seed_aliases(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } =>
			Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

pub fn parse_seed_aliases(raw: &str) -> Result<SeedAliasFile> {
	let file: SeedAliasFile = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	for record in &file.alias {
		validate_record(record)?;
	}

	Ok(file)
}

fn validate_record(record: &SeedAliasRecord) -> Result<()> {
	if record.alias.trim().is_empty() {
		return Err(Error::Validation { message: "alias.alias must be non-empty.".to_string() });
	}

	let targets = [record.region.is_some(), record.borough.is_some(), !record.regions.is_empty()]
		.into_iter()
		.filter(|set| *set)
		.count();

	if targets != 1 {
		return Err(Error::Validation {
			message: format!(
				"alias {:?} must set exactly one of region, borough, or regions.",
				record.alias
			),
		});
	}
	if !record.regions.is_empty() && record.regions.len() < 2 {
		return Err(Error::Validation {
			message: format!(
				"alias {:?} lists a single region under regions; use region instead.",
				record.alias
			),
		});
	}

	Ok(())
}

fn default_alias_type() -> String {
	"colloquial".to_string()
}
