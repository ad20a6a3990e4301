use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub planner: Planner,
	#[serde(default)]
	pub executor: Executor,
	#[serde(default)]
	pub cache: Cache,
	#[serde(default)]
	pub normalizer: Normalizer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub search: SearchProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	/// Sustained outbound request rate shared by every search call.
	pub requests_per_second: f64,
	/// Requests allowed back to back before the sustained rate applies.
	pub burst: u32,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Planner {
	pub max_queries: u32,
	/// Queries whose token sets overlap more than this are dropped.
	pub dedup_similarity: f32,
}
impl Default for Planner {
	fn default() -> Self {
		Self { max_queries: 20, dedup_similarity: 0.8 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Executor {
	/// In-flight searches allowed within one priority tier.
	pub max_concurrency: u32,
	pub deadline_ms: u64,
}
impl Default for Executor {
	fn default() -> Self {
		Self { max_concurrency: 3, deadline_ms: 60_000 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Cache {
	/// Disables the persistent tier only; the memory tier always runs.
	pub enabled: bool,
	pub memory_capacity: u64,
	pub ttl_seconds: i64,
	pub sweep_interval_seconds: u64,
	pub warmup_limit: u32,
}
impl Default for Cache {
	fn default() -> Self {
		Self {
			enabled: true,
			memory_capacity: 4_096,
			ttl_seconds: 86_400,
			sweep_interval_seconds: 3_600,
			warmup_limit: 1_000,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Normalizer {
	pub title_similarity: f32,
	pub snippet_similarity: f32,
	pub same_domain_title_similarity: f32,
	pub quality_threshold: f32,
	pub max_snippet_chars: usize,
	/// Upper bound on evidence handed downstream after ranking.
	pub max_evidence: u32,
}
impl Default for Normalizer {
	fn default() -> Self {
		Self {
			title_similarity: 0.8,
			snippet_similarity: 0.7,
			same_domain_title_similarity: 0.6,
			quality_threshold: 0.3,
			max_snippet_chars: 500,
			max_evidence: 20,
		}
	}
}
