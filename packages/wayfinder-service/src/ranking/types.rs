use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Candidate {
	pub service_id: Uuid,
	pub instructor_id: Uuid,
	pub hybrid_score: f32,
	#[serde(default)]
	pub price_per_hour: Option<f32>,
	#[serde(default)]
	pub skill_levels: Vec<String>,
	#[serde(default)]
	pub audiences: Vec<String>,
	#[serde(default)]
	pub soft_filtered: bool,
	#[serde(default)]
	pub soft_filter_reasons: Vec<String>,
	#[serde(default)]
	pub available_today: Option<bool>,
	#[serde(default)]
	pub next_available_in_days: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
	Today,
	ThisWeek,
	Flexible,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ParsedQuery {
	#[serde(default)]
	pub skill_level: Option<String>,
	#[serde(default)]
	pub audience: Option<String>,
	#[serde(default)]
	pub max_price: Option<f32>,
	#[serde(default)]
	pub urgency: Option<Urgency>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
	pub hybrid: f32,
	pub freshness: f32,
	pub skill: f32,
	pub audience: f32,
	pub founding: f32,
	pub trust: f32,
	pub soft_filter_penalty: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct RankedCandidate {
	/// 1-based.
	pub rank: usize,
	pub candidate: Candidate,
	pub composite_score: f32,
	pub breakdown: ScoreBreakdown,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RankingResult {
	pub candidates: Vec<RankedCandidate>,
	pub total_results: usize,
}
