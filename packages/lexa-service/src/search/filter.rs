use qdrant_client::qdrant::{Condition, Filter};

use lexa_domain::scope::Scope;
use lexa_storage::qdrant::{PAYLOAD_CATEGORY, PAYLOAD_ORGANIZATION_ID, PAYLOAD_SCOPE};

use crate::index::Candidate;

/// Payload filter that restricts a vector query to one scope and, optionally, one category.
pub(crate) fn qdrant_scope_filter(scope: &Scope, category: Option<&str>) -> Filter {
	let mut must = vec![Condition::matches(PAYLOAD_SCOPE, scope.label().to_string())];

	match scope.organization_id() {
		Some(organization_id) =>
			must.push(Condition::matches(PAYLOAD_ORGANIZATION_ID, organization_id.to_string())),
		None => must.push(Condition::is_empty(PAYLOAD_ORGANIZATION_ID)),
	}

	if let Some(category) = category {
		must.push(Condition::matches(PAYLOAD_CATEGORY, category.to_string()));
	}

	Filter::must(must)
}

/// Drops candidates that do not belong to `scope` and reports how many were removed.
pub(crate) fn retain_in_scope(candidates: &mut Vec<Candidate>, scope: &Scope) -> usize {
	let before = candidates.len();

	candidates.retain(|candidate| scope.admits(&candidate.scope));

	before - candidates.len()
}
