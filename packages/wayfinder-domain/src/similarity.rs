use std::collections::HashSet;

/// Trigram similarity with the same padding and word splitting as Postgres `pg_trgm`.
pub fn trigram_similarity(left: &str, right: &str) -> f32 {
	let left = trigrams(left);
	let right = trigrams(right);

	if left.is_empty() || right.is_empty() {
		return 0.0;
	}

	let shared = left.intersection(&right).count();
	let union = left.len() + right.len() - shared;

	shared as f32 / union as f32
}

pub fn edit_similarity(left: &str, right: &str) -> f32 {
	if left.is_empty() && right.is_empty() {
		return 0.0;
	}

	strsim::normalized_damerau_levenshtein(left, right) as f32
}

/// Score used by the fuzzy tier: the better of trigram overlap and edit distance, so both
/// reordered words ("village east") and typos ("willamsburg") score well.
pub fn fuzzy_score(query: &str, candidate: &str) -> f32 {
	trigram_similarity(query, candidate).max(edit_similarity(query, candidate))
}

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
	if left.len() != right.len() || left.is_empty() {
		return 0.0;
	}

	let mut dot = 0.0_f32;
	let mut left_norm = 0.0_f32;
	let mut right_norm = 0.0_f32;

	for (a, b) in left.iter().zip(right) {
		dot += a * b;
		left_norm += a * a;
		right_norm += b * b;
	}

	if left_norm <= 0.0 || right_norm <= 0.0 {
		return 0.0;
	}

	let score = dot / (left_norm.sqrt() * right_norm.sqrt());

	if score.is_finite() { score } else { 0.0 }
}

fn trigrams(input: &str) -> HashSet<[char; 3]> {
	let mut out = HashSet::new();

	for word in input.split(|ch: char| !ch.is_alphanumeric()).filter(|word| !word.is_empty()) {
		let mut padded = vec![' ', ' '];

		padded.extend(word.chars().flat_map(char::to_lowercase));
		padded.push(' ');

		for window in padded.windows(3) {
			out.insert([window[0], window[1], window[2]]);
		}
	}

	out
}
