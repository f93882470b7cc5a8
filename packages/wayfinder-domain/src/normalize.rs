use unicode_normalization::UnicodeNormalization;

/// Canonical form used for every location comparison: NFKC, lowercase, apostrophes dropped, other
/// punctuation turned into spaces, whitespace collapsed. Applying it twice is a no-op.
pub fn normalize_location_text(input: &str) -> String {
	let folded: String = input.nfkc().flat_map(char::to_lowercase).nfkc().collect();
	let mut out = String::with_capacity(folded.len());
	let mut pending_space = false;

	for ch in folded.chars() {
		if matches!(ch, '\'' | '\u{2018}' | '\u{2019}' | '`') {
			continue;
		}
		if ch.is_alphanumeric() || ch == '&' {
			if pending_space && !out.is_empty() {
				out.push(' ');
			}

			pending_space = false;

			out.push(ch);
		} else {
			pending_space = true;
		}
	}

	out
}

/// Whitespace-only cleanup used for free text that is not compared against region names.
pub fn collapse_whitespace(input: &str) -> String {
	input.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn char_len(input: &str) -> usize {
	input.chars().count()
}
