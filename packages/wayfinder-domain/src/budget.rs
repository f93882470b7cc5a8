use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

pub const TIER5_LLM_COST_MS: u64 = 150;
pub const TIER4_EMBEDDING_COST_MS: u64 = 100;
pub const VECTOR_SEARCH_COST_MS: u64 = 80;
pub const HYDRATION_COST_MS: u64 = 50;
pub const FULL_BURST2_COST_MS: u64 = 80;
pub const DEFAULT_BUFFER_MS: u64 = 20;
pub const CRITICAL_REMAINING_MS: u64 = 100;
pub const EXHAUSTED_REMAINING_MS: u64 = 30;

pub const SKIP_TIER5_LLM: &str = "tier5_llm";
pub const SKIP_TIER4_EMBEDDING: &str = "tier4_embedding";
pub const SKIP_VECTOR_SEARCH: &str = "vector_search";
pub const SKIP_EMBEDDING: &str = "embedding";

const OVERRUN_REASON: &str = "budget_overrun";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegradationLevel {
	None,
	Light,
	Moderate,
	Heavy,
	Critical,
}
impl DegradationLevel {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Light => "light",
			Self::Moderate => "moderate",
			Self::Heavy => "heavy",
			Self::Critical => "critical",
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetSnapshot {
	pub total_ms: u64,
	pub elapsed_ms: u64,
	pub remaining_ms: u64,
	pub skipped: Vec<String>,
	pub level: DegradationLevel,
	pub reasons: Vec<String>,
}

/// Time ledger for a single search request.
///
/// The budget never cancels anything on its own. Callers ask `can_afford_*` before each optional
/// stage and call [`RequestBudget::skip`] when they decline to run it, which leaves an ordered,
/// duplicate-free trail that [`RequestBudget::degradation_level`] summarizes.
#[derive(Clone, Debug)]
pub struct RequestBudget {
	total_ms: u64,
	start: Instant,
	skipped: Vec<String>,
}
impl RequestBudget {
	pub fn new(total_ms: u64) -> Self {
		Self::started_at(total_ms, Instant::now())
	}

	pub fn started_at(total_ms: u64, start: Instant) -> Self {
		Self { total_ms, start, skipped: Vec::new() }
	}

	pub fn total_ms(&self) -> u64 {
		self.total_ms
	}

	pub fn elapsed(&self) -> Duration {
		self.start.elapsed()
	}

	pub fn elapsed_ms(&self) -> u64 {
		u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
	}

	pub fn remaining_ms(&self) -> u64 {
		self.total_ms.saturating_sub(self.elapsed_ms())
	}

	pub fn can_afford(&self, cost_ms: u64) -> bool {
		self.can_afford_with_buffer(cost_ms, DEFAULT_BUFFER_MS)
	}

	pub fn can_afford_with_buffer(&self, cost_ms: u64, buffer_ms: u64) -> bool {
		self.remaining_ms() >= cost_ms.saturating_add(buffer_ms)
	}

	pub fn can_afford_tier5_llm(&self) -> bool {
		self.can_afford(TIER5_LLM_COST_MS)
	}

	pub fn can_afford_tier4_embedding(&self) -> bool {
		self.can_afford(TIER4_EMBEDDING_COST_MS)
	}

	pub fn can_afford_vector_search(&self) -> bool {
		self.can_afford(VECTOR_SEARCH_COST_MS)
	}

	pub fn can_afford_hydration(&self) -> bool {
		self.can_afford(HYDRATION_COST_MS)
	}

	pub fn can_afford_full_burst2(&self) -> bool {
		self.can_afford(FULL_BURST2_COST_MS)
	}

	pub fn skip(&mut self, operation: &str) {
		if self.skipped.iter().any(|existing| existing == operation) {
			return;
		}

		self.skipped.push(operation.to_string());
	}

	pub fn skipped_operations(&self) -> &[String] {
		&self.skipped
	}

	pub fn was_skipped(&self, operation: &str) -> bool {
		self.skipped.iter().any(|existing| existing == operation)
	}

	pub fn is_critical(&self) -> bool {
		self.remaining_ms() < CRITICAL_REMAINING_MS
	}

	pub fn is_exhausted(&self) -> bool {
		self.remaining_ms() < EXHAUSTED_REMAINING_MS
	}

	pub fn is_over_budget(&self) -> bool {
		self.elapsed() > Duration::from_millis(self.total_ms)
	}

	pub fn degradation_level(&self) -> DegradationLevel {
		if self.is_over_budget() {
			return DegradationLevel::Critical;
		}
		if self.was_skipped(SKIP_VECTOR_SEARCH) || self.was_skipped(SKIP_EMBEDDING) {
			return DegradationLevel::Heavy;
		}
		if self.skipped.is_empty() {
			return DegradationLevel::None;
		}
		if self
			.skipped
			.iter()
			.all(|operation| operation == SKIP_TIER5_LLM || operation == SKIP_TIER4_EMBEDDING)
		{
			return DegradationLevel::Light;
		}

		DegradationLevel::Moderate
	}

	pub fn degradation_reasons(&self) -> Vec<String> {
		let mut reasons: Vec<String> =
			self.skipped.iter().map(|operation| format!("budget_skip_{operation}")).collect();

		if self.is_over_budget() {
			reasons.push(OVERRUN_REASON.to_string());
		}

		reasons
	}

	pub fn snapshot(&self) -> BudgetSnapshot {
		BudgetSnapshot {
			total_ms: self.total_ms,
			elapsed_ms: self.elapsed_ms(),
			remaining_ms: self.remaining_ms(),
			skipped: self.skipped.clone(),
			level: self.degradation_level(),
			reasons: self.degradation_reasons(),
		}
	}
}
