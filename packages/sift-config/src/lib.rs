mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cache, Config, Executor, Normalizer, Planner, Postgres, Providers, SearchProviderConfig,
	Service, Storage,
};

use std::{fs, path::Path};

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
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	let search = &cfg.providers.search;

	for (label, value) in [
		("providers.search.provider_id", &search.provider_id),
		("providers.search.api_base", &search.api_base),
		("providers.search.api_key", &search.api_key),
		("providers.search.model", &search.model),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if search.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.search.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if !search.requests_per_second.is_finite() || search.requests_per_second <= 0.0 {
		return Err(Error::Validation {
			message: "providers.search.requests_per_second must be a positive finite number."
				.to_string(),
		});
	}
	if search.burst == 0 {
		return Err(Error::Validation {
			message: "providers.search.burst must be greater than zero.".to_string(),
		});
	}
	if cfg.planner.max_queries == 0 {
		return Err(Error::Validation {
			message: "planner.max_queries must be greater than zero.".to_string(),
		});
	}
	if cfg.executor.max_concurrency == 0 {
		return Err(Error::Validation {
			message: "executor.max_concurrency must be greater than zero.".to_string(),
		});
	}
	if cfg.executor.deadline_ms == 0 {
		return Err(Error::Validation {
			message: "executor.deadline_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.memory_capacity == 0 {
		return Err(Error::Validation {
			message: "cache.memory_capacity must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.ttl_seconds <= 0 {
		return Err(Error::Validation {
			message: "cache.ttl_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.sweep_interval_seconds == 0 {
		return Err(Error::Validation {
			message: "cache.sweep_interval_seconds must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("planner.dedup_similarity", cfg.planner.dedup_similarity),
		("normalizer.title_similarity", cfg.normalizer.title_similarity),
		("normalizer.snippet_similarity", cfg.normalizer.snippet_similarity),
		("normalizer.same_domain_title_similarity", cfg.normalizer.same_domain_title_similarity),
		("normalizer.quality_threshold", cfg.normalizer.quality_threshold),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if !(0.0..=1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if cfg.normalizer.max_snippet_chars == 0 {
		return Err(Error::Validation {
			message: "normalizer.max_snippet_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.normalizer.max_evidence == 0 {
		return Err(Error::Validation {
			message: "normalizer.max_evidence must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}

	let api_base = cfg.providers.search.api_base.trim().trim_end_matches('/');

	cfg.providers.search.api_base = api_base.to_string();

	if !cfg.providers.search.path.is_empty() && !cfg.providers.search.path.starts_with('/') {
		cfg.providers.search.path = format!("/{}", cfg.providers.search.path);
	}
}
