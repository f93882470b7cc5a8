pub mod filter;
pub mod score;
pub mod types;

pub use types::{Candidate, ParsedQuery, RankedCandidate, RankingResult, ScoreBreakdown, Urgency};

use std::{cmp::Ordering, sync::Arc, time::Instant};

use ahash::{AHashMap, AHashSet};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, repository::MetricsRepository};
use wayfinder_config::Ranking;
use wayfinder_storage::models::InstructorMetrics;

/// Multi-factor ranking over retrieved candidates.
///
/// Soft constraints never drop a candidate. A violating candidate keeps its place in the list
/// with `soft_filtered` set, its reasons attached, and a fixed penalty on its composite score.
pub struct RankingService {
	settings: Ranking,
	founding_pct: f32,
	metrics: Arc<dyn MetricsRepository>,
}
impl RankingService {
	pub fn new(settings: Ranking, metrics: Arc<dyn MetricsRepository>) -> Self {
		let founding_pct = match score::parse_founding_pct(&settings.founding_boost_pct) {
			Some(pct) => pct,
			None => {
				tracing::warn!(
					configured = %settings.founding_boost_pct,
					fallback = score::DEFAULT_FOUNDING_BOOST_PCT,
					"Invalid ranking.founding_boost_pct; using the default."
				);

				score::DEFAULT_FOUNDING_BOOST_PCT
			},
		};

		Self { settings, founding_pct, metrics }
	}

	pub fn founding_boost_pct(&self) -> f32 {
		self.founding_pct
	}

	pub async fn rank_candidates(
		&self,
		candidates: Vec<Candidate>,
		query: Option<&ParsedQuery>,
	) -> Result<RankingResult> {
		self.rank_candidates_at(candidates, query, OffsetDateTime::now_utc()).await
	}

	pub async fn rank_candidates_at(
		&self,
		candidates: Vec<Candidate>,
		query: Option<&ParsedQuery>,
		now: OffsetDateTime,
	) -> Result<RankingResult> {
		if candidates.is_empty() {
			return Ok(RankingResult::default());
		}

		let started = Instant::now();
		let default_query = ParsedQuery::default();
		let query = query.unwrap_or(&default_query);
		let mut seen = AHashSet::new();
		let instructor_ids: Vec<Uuid> = candidates
			.iter()
			.map(|candidate| candidate.instructor_id)
			.filter(|id| seen.insert(*id))
			.collect();
		let metrics: AHashMap<Uuid, InstructorMetrics> = self
			.metrics
			.instructor_metrics(&instructor_ids)
			.await?
			.into_iter()
			.map(|row| (row.instructor_id, row))
			.collect();
		let global_average_rating = self.metrics.global_average_rating().await?;
		let mut ranked: Vec<RankedCandidate> = candidates
			.into_iter()
			.map(|candidate| {
				let row = metrics.get(&candidate.instructor_id);

				self.score_candidate(candidate, row, query, global_average_rating, now)
			})
			.collect();

		ranked.sort_by(compare_ranked);

		for (idx, item) in ranked.iter_mut().enumerate() {
			item.rank = idx + 1;
		}

		let total_results = ranked.len();

		self.log_perf(total_results, started);

		Ok(RankingResult { candidates: ranked, total_results })
	}

	fn score_candidate(
		&self,
		mut candidate: Candidate,
		metrics: Option<&InstructorMetrics>,
		query: &ParsedQuery,
		global_average_rating: Option<f32>,
		now: OffsetDateTime,
	) -> RankedCandidate {
		let hybrid = if candidate.hybrid_score.is_finite() { candidate.hybrid_score } else { 0.0 };
		let freshness = self.settings.freshness_weight
			* score::freshness_score(metrics.and_then(|row| row.last_active_at), now);
		let skill = query
			.skill_level
			.as_deref()
			.map(|level| {
				self.settings.skill_boost * score::skill_match(level, &candidate.skill_levels)
			})
			.unwrap_or(0.0);
		let audience = query
			.audience
			.as_deref()
			.map(|audience| {
				self.settings.audience_boost * score::audience_match(audience, &candidate.audiences)
			})
			.unwrap_or(0.0);
		let trust = metrics
			.map(|row| score::trust_score(row, &self.settings.trust, global_average_rating))
			.unwrap_or(0.0);
		let base = hybrid + freshness + skill + audience + trust;
		let founding = match metrics {
			Some(row) if row.is_founding_instructor => base * self.founding_pct / 100.0,
			_ => 0.0,
		};
		let reasons = filter::soft_filter_reasons(&candidate, query);

		candidate.soft_filtered = candidate.soft_filtered || !reasons.is_empty();
		candidate.soft_filter_reasons = reasons;

		let soft_filter_penalty =
			if candidate.soft_filtered { self.settings.soft_filter_penalty } else { 0.0 };
		let composite = base + founding - soft_filter_penalty;
		let composite_score = if composite.is_finite() { composite } else { 0.0 };

		RankedCandidate {
			rank: 0,
			candidate,
			composite_score,
			breakdown: ScoreBreakdown {
				hybrid,
				freshness,
				skill,
				audience,
				founding,
				trust,
				soft_filter_penalty,
			},
		}
	}

	fn log_perf(&self, total_results: usize, started: Instant) {
		if !self.settings.perf_log_enabled {
			return;
		}

		let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

		if elapsed_ms < self.settings.perf_log_threshold_ms {
			return;
		}

		tracing::info!(
			target: "wayfinder::perf",
			total_results,
			elapsed_ms,
			"Slow candidate ranking."
		);
	}
}

/// Descending by composite score, then ascending by service id.
pub fn compare_ranked(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
	b.composite_score
		.total_cmp(&a.composite_score)
		.then_with(|| a.candidate.service_id.cmp(&b.candidate.service_id))
}
