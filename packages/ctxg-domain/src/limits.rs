use std::ops::RangeInclusive;

use crate::{Error, Result};

pub const DECISION_CHARS: RangeInclusive<usize> = 10..=5_000;
pub const CATEGORY_CHARS: RangeInclusive<usize> = 1..=50;
pub const QUERY_CHARS: RangeInclusive<usize> = 3..=500;
pub const QUERY_LIMIT: RangeInclusive<u32> = 1..=50;
pub const LIST_LIMIT: RangeInclusive<u32> = 1..=100;
pub const LIST_OFFSET: RangeInclusive<u32> = 0..=u32::MAX;

pub const DEFAULT_CATEGORY: &str = "general";
pub const DEFAULT_QUERY_LIMIT: u32 = 5;
pub const DEFAULT_LIST_LIMIT: u32 = 20;

/// Characters of the decision echoed back by the store operation.
pub const DECISION_ECHO_CHARS: usize = 200;

/// Trims `value` and checks its length in characters.
pub fn text(field: &str, value: &str, range: RangeInclusive<usize>) -> Result<String> {
	let trimmed = value.trim();
	let len = trimmed.chars().count();

	if !range.contains(&len) {
		return Err(Error::validation(
			field,
			format!(
				"must be between {} and {} characters, got {len}.",
				range.start(),
				range.end()
			),
		));
	}

	Ok(trimmed.to_string())
}

/// Trims an optional value; blank strings count as absent.
pub fn optional_text(value: Option<&str>) -> Option<String> {
	value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}

/// Checks a caller-supplied integer against `range`, reporting the value as it was sent.
pub fn number(field: &str, value: i64, range: RangeInclusive<u32>) -> Result<u32> {
	u32::try_from(value).ok().filter(|number| range.contains(number)).ok_or_else(|| {
		Error::validation(
			field,
			format!("must be between {} and {}, got {value}.", range.start(), range.end()),
		)
	})
}

pub fn required(field: &str, value: &str) -> Result<String> {
	let trimmed = value.trim();

	if trimmed.is_empty() {
		return Err(Error::validation(field, "must be non-empty."));
	}

	Ok(trimmed.to_string())
}

/// Keeps the first `max` characters and marks a cut with `...`.
pub fn truncate_chars(text: &str, max: usize) -> String {
	match text.char_indices().nth(max) {
		Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
		None => text.to_string(),
	}
}
