//! Formatting helpers for log output.

/// Shortens an identifier for log lines.
///
/// Keeps the first 8 characters followed by ".." for longer ids.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((idx, _)) => format!("{}..", &id[..idx]),
		None => id.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("short"), "short");
		assert_eq!(truncate_id("12345678"), "12345678");
		assert_eq!(
			truncate_id("2f1c9a0e-7b44-4c1e-9d4e-0b1f6c7d8e9f"),
			"2f1c9a0e.."
		);
	}
}
