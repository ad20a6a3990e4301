use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::source::SourceType;

/// One hit as returned by a search provider, before any normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResult {
	pub url: String,
	pub title: String,
	#[serde(default)]
	pub content: String,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub published_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
	pub id: String,
	pub url: String,
	pub title: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub snippet: String,
	#[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
	pub published_at: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339")]
	pub retrieved_at: OffsetDateTime,
	/// `None` until classified; normalization always fills it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source_type: Option<SourceType>,
}
impl Evidence {
	pub fn from_raw(raw: RawResult, retrieved_at: OffsetDateTime) -> Self {
		let id = stable_id(&raw.url, &raw.title, raw.published_at);
		let source_type = Some(SourceType::infer(&raw.url));

		Self {
			id,
			url: raw.url,
			title: raw.title,
			snippet: raw.content,
			published_at: raw.published_at,
			retrieved_at,
			source_type,
		}
	}
}

/// Deterministic 16-hex-char digest of `url|title|published_at`.
///
/// The timestamp is rendered as RFC 3339 and is empty when absent, so the same logical record
/// hashes identically across processes.
pub fn stable_id(url: &str, title: &str, published_at: Option<OffsetDateTime>) -> String {
	let published = published_at.and_then(|at| at.format(&Rfc3339).ok()).unwrap_or_default();
	let mut hasher = blake3::Hasher::new();

	hasher.update(url.as_bytes());
	hasher.update(b"|");
	hasher.update(title.as_bytes());
	hasher.update(b"|");
	hasher.update(published.as_bytes());

	let digest = hasher.finalize();

	digest.as_bytes()[..8].iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn stable_id_is_sixteen_hex_chars() {
		let id = stable_id("https://example.com/a", "Title", None);

		assert_eq!(id.len(), 16);
		assert!(id.chars().all(|ch| ch.is_ascii_hexdigit()));
	}

	#[test]
	fn from_raw_infers_source_type() {
		let raw = RawResult {
			url: "https://techcrunch.com/story".to_string(),
			title: "Story".to_string(),
			content: "Body".to_string(),
			published_at: Some(datetime!(2025-01-02 03:04:05 UTC)),
		};
		let evidence = Evidence::from_raw(raw, datetime!(2025-02-01 00:00:00 UTC));

		assert_eq!(evidence.source_type, Some(SourceType::News));
		assert_eq!(evidence.snippet, "Body");
		assert_eq!(
			evidence.id,
			stable_id(
				"https://techcrunch.com/story",
				"Story",
				Some(datetime!(2025-01-02 03:04:05 UTC))
			)
		);
	}

	#[test]
	fn raw_result_accepts_missing_optional_fields() {
		let raw: RawResult =
			serde_json::from_str(r#"{"url":"https://a.io","title":"A"}"#).expect("valid json");

		assert!(raw.content.is_empty());
		assert!(raw.published_at.is_none());
	}
}
