//! Reciprocal Rank Fusion of the vector and lexical rankings.

use std::{
	cmp::Ordering,
	collections::{HashMap, HashSet},
};

use crate::index::Candidate;

/// A candidate after fusion, carrying every score that contributed to its rank.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedCandidate {
	pub candidate: Candidate,
	pub fused_score: f32,
	/// Raw similarity from the vector index.
	pub vector_score: Option<f32>,
	/// Lexical score divided by the largest lexical score of the same query (floored at 1).
	pub lexical_score: Option<f32>,
	pub rerank_score: Option<f32>,
}
impl FusedCandidate {
	fn new(candidate: Candidate) -> Self {
		Self {
			candidate,
			fused_score: 0.0,
			vector_score: None,
			lexical_score: None,
			rerank_score: None,
		}
	}

	/// Score the final ordering is based on.
	pub fn ranking_score(&self) -> f32 {
		self.rerank_score.unwrap_or(self.fused_score)
	}
}

pub fn rrf_contribution(k: u32, rank: usize) -> f32 {
	1.0 / (k as f32 + rank as f32 + 1.0)
}

/// Fuses two best-first rankings and keeps the top `limit`.
///
/// Only rank positions feed the fused score. Equal fused scores keep first-encounter order,
/// vector list first. A passage listed twice by the same index counts once, at its best rank.
pub fn fuse(
	vector: Vec<Candidate>,
	lexical: Vec<Candidate>,
	k: u32,
	limit: usize,
) -> Vec<FusedCandidate> {
	let max_lexical = lexical.iter().map(|candidate| candidate.score).fold(1.0_f32, f32::max);
	let mut fused: Vec<FusedCandidate> = Vec::with_capacity(vector.len() + lexical.len());
	let mut positions: HashMap<String, usize> = HashMap::new();

	for (idx, score) in accumulate(&mut fused, &mut positions, vector, k) {
		fused[idx].vector_score = Some(score);
	}
	for (idx, score) in accumulate(&mut fused, &mut positions, lexical, k) {
		fused[idx].lexical_score = Some(score / max_lexical);
	}

	fused.sort_by(|a, b| cmp_f32_desc(a.fused_score, b.fused_score));
	fused.truncate(limit);

	fused
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

/// Adds one ranking's RRF contributions and returns `(position, raw score)` per accepted entry.
fn accumulate(
	fused: &mut Vec<FusedCandidate>,
	positions: &mut HashMap<String, usize>,
	ranking: Vec<Candidate>,
	k: u32,
) -> Vec<(usize, f32)> {
	let mut seen = HashSet::new();
	let mut accepted = Vec::with_capacity(ranking.len());

	for (rank, candidate) in ranking.into_iter().enumerate() {
		if !seen.insert(candidate.passage_id.clone()) {
			continue;
		}

		let score = candidate.score;
		let idx = match positions.get(&candidate.passage_id) {
			Some(idx) => *idx,
			None => {
				positions.insert(candidate.passage_id.clone(), fused.len());
				fused.push(FusedCandidate::new(candidate));

				fused.len() - 1
			},
		};

		fused[idx].fused_score += rrf_contribution(k, rank);
		accepted.push((idx, score));
	}

	accepted
}
