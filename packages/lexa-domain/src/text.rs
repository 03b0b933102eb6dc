use unicode_segmentation::UnicodeSegmentation;

/// Lowercases, trims and collapses internal whitespace.
pub fn normalize_query(query: &str) -> String {
	query.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}

/// Returns at most `max_chars` graphemes of `text`.
pub fn truncate_graphemes(text: &str, max_chars: usize) -> &str {
	match text.grapheme_indices(true).nth(max_chars) {
		Some((byte_idx, _)) => &text[..byte_idx],
		None => text,
	}
}

/// Splits a query into lowercase alphanumeric terms, dropping duplicates while keeping order.
pub fn query_terms(query: &str, max_terms: usize) -> Vec<String> {
	let mut out: Vec<String> = Vec::new();

	for word in query.unicode_words() {
		let term = word.to_lowercase();

		if out.iter().any(|existing| existing == &term) {
			continue;
		}

		out.push(term);

		if out.len() >= max_terms {
			break;
		}
	}

	out
}
