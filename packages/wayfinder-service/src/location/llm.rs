use color_eyre::{Result, eyre};
use serde_json::Value;

const DEFAULT_CONFIDENCE: f32 = 0.5;

const SYSTEM_PROMPT: &str = "\
You map informal location phrases to neighborhoods of a single metro area. \
Answer with a JSON object: {\"neighborhoods\": [string], \"confidence\": number}. \
Only use names from the allowed list, copied exactly. \
Return several names only when the phrase genuinely spans or could mean several of them. \
Return an empty list when none of the allowed names fit. \
confidence is between 0 and 1.";

#[derive(Clone, Debug, PartialEq)]
pub struct LlmResolution {
	pub neighborhoods: Vec<String>,
	pub confidence: f32,
}

pub fn build_messages(query: &str, allowed: &[String]) -> Vec<Value> {
	let user = serde_json::json!({
		"query": query,
		"allowed_neighborhoods": allowed,
	});

	vec![
		serde_json::json!({ "role": "system", "content": SYSTEM_PROMPT }),
		serde_json::json!({ "role": "user", "content": user.to_string() }),
	]
}

/// Reads `{ "neighborhoods": [..], "confidence": f }`. A single `"neighborhood"` string is
/// accepted too; a missing confidence defaults to 0.5.
pub fn parse_resolution(value: &Value) -> Result<LlmResolution> {
	let neighborhoods = match (value.get("neighborhoods"), value.get("neighborhood")) {
		(Some(Value::Array(items)), _) => items
			.iter()
			.filter_map(Value::as_str)
			.map(str::trim)
			.filter(|name| !name.is_empty())
			.map(str::to_string)
			.collect(),
		(None, Some(Value::String(name))) if !name.trim().is_empty() =>
			vec![name.trim().to_string()],
		(None, Some(Value::Null)) | (None, None) => Vec::new(),
		_ => return Err(eyre::eyre!("LLM resolution has an invalid neighborhoods field.")),
	};
	let confidence = match value.get("confidence") {
		Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0) as f32,
		Some(Value::String(raw)) => raw.trim().parse::<f32>().unwrap_or(DEFAULT_CONFIDENCE),
		_ => DEFAULT_CONFIDENCE,
	};

	Ok(LlmResolution { neighborhoods, confidence })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_list_and_confidence() {
		let value = serde_json::json!({ "neighborhoods": ["SoHo", " ", 3], "confidence": 0.82 });
		let parsed = parse_resolution(&value).expect("Resolution must parse.");

		assert_eq!(parsed.neighborhoods, vec!["SoHo".to_string()]);
		assert!((parsed.confidence - 0.82).abs() < 1e-6);
	}

	#[test]
	fn missing_fields_mean_no_match() {
		let parsed = parse_resolution(&serde_json::json!({})).expect("Resolution must parse.");

		assert!(parsed.neighborhoods.is_empty());
		assert!((parsed.confidence - DEFAULT_CONFIDENCE).abs() < f32::EPSILON);
	}

	#[test]
	fn rejects_non_list_neighborhoods() {
		assert!(parse_resolution(&serde_json::json!({ "neighborhoods": "SoHo" })).is_err());
	}

	#[test]
	fn prompt_lists_allowed_names() {
		let messages = build_messages("cast iron district", &["SoHo".to_string()]);
		let user = messages[1]["content"].as_str().expect("User content must be a string.");

		assert!(user.contains("\"allowed_neighborhoods\":[\"SoHo\"]"));
	}
}
