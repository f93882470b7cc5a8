use crate::ranking::types::{Candidate, ParsedQuery, Urgency};

const THIS_WEEK_DAYS: u32 = 7;

/// Soft constraint violations for one candidate, merged after any reasons set upstream.
/// Never removes the candidate; an empty list means it passes every soft constraint.
pub fn soft_filter_reasons(candidate: &Candidate, query: &ParsedQuery) -> Vec<String> {
	let mut reasons: Vec<String> = Vec::new();

	for reason in &candidate.soft_filter_reasons {
		push_unique(&mut reasons, reason.trim().to_string());
	}

	if let (Some(max_price), Some(price)) = (query.max_price, candidate.price_per_hour)
		&& max_price.is_finite()
		&& max_price > 0.0
		&& price.is_finite()
		&& price > max_price
	{
		push_unique(
			&mut reasons,
			format!("Price {price:.2}/hr is above the requested maximum of {max_price:.2}/hr."),
		);
	}

	match query.urgency {
		Some(Urgency::Today) if candidate.available_today == Some(false) => {
			push_unique(&mut reasons, "Not available today.".to_string());
		},
		Some(Urgency::ThisWeek)
			if candidate.next_available_in_days.is_some_and(|days| days > THIS_WEEK_DAYS) =>
		{
			push_unique(&mut reasons, "Not available this week.".to_string());
		},
		_ => {},
	}

	reasons
}

fn push_unique(reasons: &mut Vec<String>, reason: String) {
	if !reason.is_empty() && !reasons.contains(&reason) {
		reasons.push(reason);
	}
}
