//! Tenant isolation boundary applied to every retrieval.

use serde::{Deserialize, Serialize};

pub const ORGANIZATION_LABEL: &str = "organization";
pub const SAMPLE_LABEL: &str = "sample";

/// The corpus a query is allowed to see.
///
/// Supplied by the upstream scope resolver and trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Scope {
	Organization { organization_id: String },
	Sample,
}
impl Scope {
	pub fn organization(organization_id: impl Into<String>) -> Self {
		Self::Organization { organization_id: organization_id.into() }
	}

	pub fn label(&self) -> &'static str {
		match self {
			Self::Organization { .. } => ORGANIZATION_LABEL,
			Self::Sample => SAMPLE_LABEL,
		}
	}

	pub fn organization_id(&self) -> Option<&str> {
		match self {
			Self::Organization { organization_id } => Some(organization_id.as_str()),
			Self::Sample => None,
		}
	}

	/// Whether a passage carrying `tag` belongs to this scope.
	pub fn admits(&self, tag: &ScopeTag) -> bool {
		match self {
			Self::Organization { organization_id } =>
				tag.scope == ORGANIZATION_LABEL
					&& tag.organization_id.as_deref() == Some(organization_id.as_str()),
			Self::Sample => tag.scope == SAMPLE_LABEL && tag.organization_id.is_none(),
		}
	}
}

/// Ownership metadata stored with every indexed passage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeTag {
	pub scope: String,
	pub organization_id: Option<String>,
}
impl ScopeTag {
	pub fn organization(organization_id: impl Into<String>) -> Self {
		Self { scope: ORGANIZATION_LABEL.to_string(), organization_id: Some(organization_id.into()) }
	}

	pub fn sample() -> Self {
		Self { scope: SAMPLE_LABEL.to_string(), organization_id: None }
	}
}
