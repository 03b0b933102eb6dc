use lexa_domain::text;

use super::fusion::{FusedCandidate, cmp_f32_desc};
use crate::RerankDocument;

/// Documents for the head of the fused ranking, truncated to `max_chars` graphemes each.
pub(crate) fn rerank_documents(
	fused: &[FusedCandidate],
	window: usize,
	max_chars: usize,
) -> Vec<RerankDocument> {
	fused
		.iter()
		.take(window)
		.map(|item| RerankDocument {
			passage_id: item.candidate.passage_id.clone(),
			text: text::truncate_graphemes(&item.candidate.content, max_chars).to_string(),
			fused_score: item.fused_score,
			vector_score: item.vector_score,
			lexical_score: item.lexical_score,
		})
		.collect()
}

/// Attaches rerank scores to the head of `fused`, re-sorts the whole list, and keeps `top_n`.
///
/// Entries without a rerank score are ordered by their fused score. Returns `false` and leaves
/// `fused` untouched when no document was scored.
pub(crate) fn apply_rerank_scores(
	fused: &mut Vec<FusedCandidate>,
	scores: &[Option<f32>],
	top_n: usize,
) -> bool {
	if scores.iter().all(Option::is_none) {
		return false;
	}

	for (item, score) in fused.iter_mut().zip(scores) {
		item.rerank_score = *score;
	}

	fused.sort_by(|a, b| cmp_f32_desc(a.ranking_score(), b.ranking_score()));
	fused.truncate(top_n);

	true
}
