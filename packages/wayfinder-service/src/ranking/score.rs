use time::OffsetDateTime;

use wayfinder_config::RankingTrust;
use wayfinder_storage::models::InstructorMetrics;

pub const DEFAULT_FOUNDING_BOOST_PCT: f32 = 5.0;
pub const UNKNOWN_FRESHNESS: f32 = 0.5;

const MAX_RATING: f32 = 5.0;

/// Step function over whole days since the instructor was last active. Future timestamps count
/// as today.
pub fn freshness_score(last_active_at: Option<OffsetDateTime>, now: OffsetDateTime) -> f32 {
	let Some(last_active_at) = last_active_at else { return UNKNOWN_FRESHNESS };

	freshness_for_days((now - last_active_at).whole_days().max(0))
}

pub fn freshness_for_days(days: i64) -> f32 {
	match days {
		i64::MIN..=0 => 1.0,
		1..=7 => 0.9,
		8..=30 => 0.7,
		31..=90 => 0.5,
		_ => 0.3,
	}
}

/// 1.0 for an exact level or an "all levels" listing, 0.5 for a neighbouring level, else 0.
pub fn skill_match(query_level: &str, candidate_levels: &[String]) -> f32 {
	let query_level = query_level.trim().to_lowercase();

	if query_level.is_empty() {
		return 0.0;
	}

	let mut best: f32 = 0.0;

	for level in candidate_levels {
		let level = level.trim().to_lowercase();
		let score = if level == query_level || level == "all" {
			1.0
		} else if adjacent_levels(&query_level, &level) {
			0.5
		} else {
			0.0
		};

		best = best.max(score);
	}

	best
}

pub fn audience_match(query_audience: &str, candidate_audiences: &[String]) -> f32 {
	let Some(query_audience) = canonical_audience(query_audience) else { return 0.0 };
	let matched = candidate_audiences.iter().any(|audience| {
		let audience = audience.trim().to_lowercase();

		audience == "both" || canonical_audience(&audience) == Some(query_audience)
	});

	if matched { 1.0 } else { 0.0 }
}

pub fn canonical_audience(raw: &str) -> Option<&'static str> {
	match raw.trim().to_lowercase().as_str() {
		"kids" | "children" | "child" => Some("kids"),
		"adults" | "adult" => Some("adults"),
		_ => None,
	}
}

/// Accepts "5", "5.0", and "5%". Negative, non-finite, or unparsable values yield `None`.
pub fn parse_founding_pct(raw: &str) -> Option<f32> {
	let trimmed = raw.trim();
	let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
	let value: f32 = number.parse().ok()?;

	(value.is_finite() && value >= 0.0).then_some(value)
}

/// Profile completeness, verification, responsiveness, and a shrunk rating term.
pub fn trust_score(
	metrics: &InstructorMetrics,
	weights: &RankingTrust,
	global_average_rating: Option<f32>,
) -> f32 {
	let mut score = 0.0;

	if metrics.has_photo {
		score += weights.photo;
	}
	if metrics.has_bio {
		score += weights.bio;
	}
	if metrics.background_check_verified {
		score += weights.background_check;
	}
	if metrics.identity_verified {
		score += weights.identity;
	}
	if let Some(rate) = metrics.response_rate.filter(|rate| rate.is_finite()) {
		score += weights.response_rate * rate.clamp(0.0, 1.0);
	}

	score + rating_term(metrics, weights, global_average_rating)
}

/// `weight * ((avg - global) / 5) * n / (n + prior)`; zero without reviews or a global baseline.
pub fn rating_term(
	metrics: &InstructorMetrics,
	weights: &RankingTrust,
	global_average_rating: Option<f32>,
) -> f32 {
	let (Some(average), Some(global)) = (metrics.average_rating, global_average_rating) else {
		return 0.0;
	};

	if metrics.review_count <= 0 || !average.is_finite() || !global.is_finite() {
		return 0.0;
	}

	let reviews = metrics.review_count as f32;
	let shrink = reviews / (reviews + weights.rating_prior_reviews.max(0.0));

	weights.rating * ((average - global) / MAX_RATING) * shrink
}

fn adjacent_levels(left: &str, right: &str) -> bool {
	matches!(
		(left, right),
		("beginner", "intermediate")
			| ("intermediate", "beginner")
			| ("advanced", "intermediate")
			| ("intermediate", "advanced")
	)
}
