/// Stable content hash used for cache keys and re-embedding change detection.
pub fn compute_text_hash(text: &str) -> String {
	blake3::hash(text.as_bytes()).to_hex().to_string()
}

pub fn hash_prefix(hash: &str) -> &str {
	let len = hash.len().min(12);

	&hash[..len]
}
