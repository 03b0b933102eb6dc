mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Chat, Config, EmbeddingProviderConfig, LlmProviderConfig, Postgres, ProviderConfig, Providers,
	Qdrant, Search, SearchLexical, SearchRerank, Service, Storage, Synthesis, SynthesisCache,
	Telemetry,
};

use std::{fs, path::Path};

/// Most candidates a single rerank request may carry.
pub const MAX_RERANK_WINDOW: u32 = 10;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("rerank", &cfg.providers.rerank.api_key),
		("llm_synthesis", &cfg.providers.llm_synthesis.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}
	for (label, timeout_ms) in [
		("embedding", cfg.providers.embedding.timeout_ms),
		("rerank", cfg.providers.rerank.timeout_ms),
		("llm_synthesis", cfg.providers.llm_synthesis.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("providers.{label}.timeout_ms must be greater than zero."),
			});
		}
	}

	validate_search(&cfg.search)?;

	if cfg.synthesis.max_sources == 0 {
		return Err(Error::Validation {
			message: "synthesis.max_sources must be greater than zero.".to_string(),
		});
	}
	if cfg.synthesis.max_source_chars == 0 {
		return Err(Error::Validation {
			message: "synthesis.max_source_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.synthesis.cache.ttl_secs <= 0 {
		return Err(Error::Validation {
			message: "synthesis.cache.ttl_secs must be greater than zero.".to_string(),
		});
	}

	if cfg.synthesis.cache.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "synthesis.cache.timeout_ms must be greater than zero.".to_string(),
		});
	}

	if let Some(max) = cfg.synthesis.cache.max_payload_bytes
		&& max == 0
	{
		return Err(Error::Validation {
			message: "synthesis.cache.max_payload_bytes must be greater than zero.".to_string(),
		});
	}

	if cfg.chat.max_sources == 0 {
		return Err(Error::Validation {
			message: "chat.max_sources must be greater than zero.".to_string(),
		});
	}
	if cfg.chat.max_source_chars == 0 {
		return Err(Error::Validation {
			message: "chat.max_source_chars must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_search(search: &Search) -> Result<()> {
	if search.default_limit == 0 {
		return Err(Error::Validation {
			message: "search.default_limit must be greater than zero.".to_string(),
		});
	}
	if search.default_limit > search.max_limit {
		return Err(Error::Validation {
			message: "search.default_limit must not exceed search.max_limit.".to_string(),
		});
	}
	if search.retrieval_limit_multiplier == 0 {
		return Err(Error::Validation {
			message: "search.retrieval_limit_multiplier must be greater than zero.".to_string(),
		});
	}
	if search.candidate_breadth_multiplier <= search.retrieval_limit_multiplier {
		return Err(Error::Validation {
			message: "search.candidate_breadth_multiplier must be greater than search.retrieval_limit_multiplier."
				.to_string(),
		});
	}
	if search.retrieval_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "search.retrieval_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if !search.lexical.title_boost.is_finite() {
		return Err(Error::Validation {
			message: "search.lexical.title_boost must be a finite number.".to_string(),
		});
	}
	if search.lexical.title_boost <= 0.0 {
		return Err(Error::Validation {
			message: "search.lexical.title_boost must be greater than zero.".to_string(),
		});
	}
	if search.lexical.fuzzy_max_edits > 2 {
		return Err(Error::Validation {
			message: "search.lexical.fuzzy_max_edits must be 2 or less.".to_string(),
		});
	}
	if search.rerank.window == 0 {
		return Err(Error::Validation {
			message: "search.rerank.window must be greater than zero.".to_string(),
		});
	}
	if search.rerank.window > MAX_RERANK_WINDOW {
		return Err(Error::Validation {
			message: format!("search.rerank.window must be {MAX_RERANK_WINDOW} or less."),
		});
	}
	if search.rerank.top_n == 0 {
		return Err(Error::Validation {
			message: "search.rerank.top_n must be greater than zero.".to_string(),
		});
	}
	if search.rerank.top_n > search.rerank.window {
		return Err(Error::Validation {
			message: "search.rerank.top_n must not exceed search.rerank.window.".to_string(),
		});
	}
	if search.rerank.max_doc_chars == 0 {
		return Err(Error::Validation {
			message: "search.rerank.max_doc_chars must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.providers.embedding.api_base =
		cfg.providers.embedding.api_base.trim_end_matches('/').to_string();
	cfg.providers.rerank.api_base = cfg.providers.rerank.api_base.trim_end_matches('/').to_string();
	cfg.providers.llm_synthesis.api_base =
		cfg.providers.llm_synthesis.api_base.trim_end_matches('/').to_string();

	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}
}
