use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
	Region,
	Borough,
	None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
	Exact,
	Alias,
	Substring,
	Fuzzy,
	Embedding,
	Llm,
	None,
}
impl ResolutionMethod {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Exact => "exact",
			Self::Alias => "alias",
			Self::Substring => "substring",
			Self::Fuzzy => "fuzzy",
			Self::Embedding => "embedding",
			Self::Llm => "llm",
			Self::None => "none",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
	Exact,
	Alias,
	Substring,
	Fuzzy,
	Embedding,
	Llm,
}
impl ResolutionTier {
	pub fn number(self) -> f32 {
		match self {
			Self::Exact => 1.0,
			Self::Alias => 2.0,
			Self::Substring => 2.5,
			Self::Fuzzy => 3.0,
			Self::Embedding => 4.0,
			Self::Llm => 5.0,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LocationCandidate {
	pub region_id: Uuid,
	pub name: String,
	pub borough: Option<String>,
	pub score: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedLocation {
	pub kind: LocationKind,
	pub method: ResolutionMethod,
	pub resolved: bool,
	pub tier: Option<ResolutionTier>,
	pub region_id: Option<Uuid>,
	pub region_name: Option<String>,
	pub borough: Option<String>,
	pub confidence: f32,
	pub requires_clarification: bool,
	pub candidates: Vec<LocationCandidate>,
	pub not_found: bool,
}
impl ResolvedLocation {
	pub fn not_found() -> Self {
		Self {
			kind: LocationKind::None,
			method: ResolutionMethod::None,
			resolved: false,
			tier: None,
			region_id: None,
			region_name: None,
			borough: None,
			confidence: 0.0,
			requires_clarification: false,
			candidates: Vec::new(),
			not_found: true,
		}
	}

	pub fn region(
		candidate: LocationCandidate,
		tier: ResolutionTier,
		method: ResolutionMethod,
	) -> Self {
		Self {
			kind: LocationKind::Region,
			method,
			resolved: true,
			tier: Some(tier),
			region_id: Some(candidate.region_id),
			region_name: Some(candidate.name),
			borough: candidate.borough,
			confidence: clamp_unit(candidate.score),
			requires_clarification: false,
			candidates: Vec::new(),
			not_found: false,
		}
	}

	pub fn borough(
		name: &str,
		tier: ResolutionTier,
		method: ResolutionMethod,
		confidence: f32,
	) -> Self {
		Self {
			kind: LocationKind::Borough,
			method,
			resolved: true,
			tier: Some(tier),
			region_id: None,
			region_name: None,
			borough: Some(name.to_string()),
			confidence: clamp_unit(confidence),
			requires_clarification: false,
			candidates: Vec::new(),
			not_found: false,
		}
	}

	pub fn ambiguous(
		mut candidates: Vec<LocationCandidate>,
		tier: ResolutionTier,
		method: ResolutionMethod,
	) -> Self {
		for candidate in &mut candidates {
			candidate.score = clamp_unit(candidate.score);
		}

		let confidence = candidates.iter().map(|candidate| candidate.score).fold(0.0, f32::max);

		Self {
			kind: LocationKind::None,
			method,
			resolved: false,
			tier: Some(tier),
			region_id: None,
			region_name: None,
			borough: None,
			confidence,
			requires_clarification: true,
			candidates,
			not_found: false,
		}
	}
}

/// Result of a single cascade tier. `Skip` means the tier could not run (disabled, over budget,
/// or an upstream failure) and `NotFound` means it ran without a match; both fall through.
#[derive(Clone, Debug)]
pub enum TierOutcome {
	Resolved(ResolvedLocation),
	Ambiguous(ResolvedLocation),
	Skip,
	NotFound,
}
impl TierOutcome {
	pub fn into_result(self) -> Option<ResolvedLocation> {
		match self {
			Self::Resolved(location) | Self::Ambiguous(location) => Some(location),
			Self::Skip | Self::NotFound => None,
		}
	}
}

pub(crate) fn clamp_unit(value: f32) -> f32 {
	if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 }
}
