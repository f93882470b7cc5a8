use serde::{Deserialize, Serialize};

use wayfinder_domain::normalize::collapse_whitespace;

/// Where a catalog entry's category comes from, in priority order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Taxonomy {
	Subcategory { name: String, category_name: Option<String> },
	DirectCategory { name: String },
	CategoryName { name: String },
	None,
}
impl Taxonomy {
	/// Label used in the `Category:` segment, or `None` when nothing usable is set.
	pub fn label(&self) -> Option<String> {
		match self {
			Self::Subcategory { name, category_name } => {
				let sub = clean_segment(name);
				let category = category_name.as_deref().map(clean_segment).unwrap_or_default();

				match (category.is_empty(), sub.is_empty()) {
					(false, false) => Some(format!("{category} > {sub}")),
					(false, true) => Some(category),
					(true, false) => Some(sub),
					(true, true) => None,
				}
			},
			Self::DirectCategory { name } | Self::CategoryName { name } => {
				let name = clean_segment(name);

				(!name.is_empty()).then_some(name)
			},
			Self::None => None,
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogEntry {
	pub name: String,
	#[serde(default)]
	pub description: Option<String>,
	pub taxonomy: Taxonomy,
	#[serde(default)]
	pub age_groups: Vec<String>,
	#[serde(default)]
	pub audience: Vec<String>,
	#[serde(default)]
	pub skill_levels: Vec<String>,
}

/// Deterministic embedding input for a catalog entry, e.g.
/// `"Piano Lessons. Classical and jazz. Category: Music > Piano. Skill levels: beginner"`.
pub fn generate_embedding_text(entry: &CatalogEntry) -> String {
	let mut segments = Vec::new();

	push_segment(&mut segments, &entry.name);

	if let Some(description) = entry.description.as_deref() {
		push_segment(&mut segments, description);
	}
	if let Some(label) = entry.taxonomy.label() {
		segments.push(format!("Category: {label}"));
	}

	push_list(&mut segments, "Age groups", &entry.age_groups);
	push_list(&mut segments, "Audience", &entry.audience);
	push_list(&mut segments, "Skill levels", &entry.skill_levels);

	segments.join(". ")
}

fn push_segment(segments: &mut Vec<String>, raw: &str) {
	let cleaned = clean_segment(raw);

	if !cleaned.is_empty() {
		segments.push(cleaned);
	}
}

fn push_list(segments: &mut Vec<String>, label: &str, values: &[String]) {
	let values: Vec<String> =
		values.iter().map(|value| clean_segment(value)).filter(|value| !value.is_empty()).collect();

	if !values.is_empty() {
		segments.push(format!("{label}: {}", values.join(", ")));
	}
}

fn clean_segment(raw: &str) -> String {
	collapse_whitespace(raw).trim_end_matches('.').trim_end().to_string()
}
