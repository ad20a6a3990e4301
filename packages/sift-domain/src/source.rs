use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
	News,
	Database,
	Regulatory,
	Academic,
	Government,
	Professional,
	Startup,
	Code,
	Accelerator,
	Product,
	Blog,
	Forum,
	Social,
	Video,
	Website,
	#[default]
	Unknown,
}
impl SourceType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::News => "news",
			Self::Database => "database",
			Self::Regulatory => "regulatory",
			Self::Academic => "academic",
			Self::Government => "government",
			Self::Professional => "professional",
			Self::Startup => "startup",
			Self::Code => "code",
			Self::Accelerator => "accelerator",
			Self::Product => "product",
			Self::Blog => "blog",
			Self::Forum => "forum",
			Self::Social => "social",
			Self::Video => "video",
			Self::Website => "website",
			Self::Unknown => "unknown",
		}
	}

	/// Reputation weight used by quality scoring.
	pub fn weight(self) -> f32 {
		match self {
			Self::News => 1.0,
			Self::Database | Self::Regulatory => 0.9,
			Self::Academic | Self::Government => 0.8,
			Self::Professional | Self::Startup => 0.7,
			Self::Code | Self::Accelerator => 0.6,
			Self::Product | Self::Blog => 0.5,
			Self::Forum => 0.4,
			Self::Social | Self::Video => 0.3,
			Self::Website => 0.2,
			Self::Unknown => 0.1,
		}
	}

	/// Classifies a URL by its host. Unparsable URLs are `Unknown`.
	pub fn infer(url: &str) -> Self {
		let Ok(parsed) = Url::parse(url) else { return Self::Unknown };
		let Some(host) = parsed.host_str() else { return Self::Unknown };
		let host = host.to_ascii_lowercase();
		let host = host.strip_prefix("www.").unwrap_or(&host);

		if let Some(known) = Self::for_domain(host) {
			return known;
		}

		if host.contains("gov") {
			Self::Government
		} else if host.contains("edu") {
			Self::Academic
		} else if host.contains("blog") {
			Self::Blog
		} else if host.contains("news") {
			Self::News
		} else {
			Self::Website
		}
	}

	fn for_domain(host: &str) -> Option<Self> {
		let source_type = match host {
			"techcrunch.com" | "venturebeat.com" | "arstechnica.com" | "theverge.com"
			| "wired.com" | "reuters.com" | "bloomberg.com" | "wsj.com" | "nytimes.com"
			| "forbes.com" | "fortune.com" | "businessinsider.com" => Self::News,
			"crunchbase.com" | "pitchbook.com" => Self::Database,
			"sec.gov" | "fda.gov" => Self::Regulatory,
			"reddit.com" | "news.ycombinator.com" | "stackoverflow.com" => Self::Forum,
			"github.com" => Self::Code,
			"medium.com" | "substack.com" => Self::Blog,
			"linkedin.com" => Self::Professional,
			"twitter.com" | "x.com" => Self::Social,
			"youtube.com" => Self::Video,
			"angellist.com" | "wellfound.com" => Self::Startup,
			"producthunt.com" => Self::Product,
			"ycombinator.com" | "techstars.com" => Self::Accelerator,
			_ => return None,
		};

		Some(source_type)
	}
}
impl fmt::Display for SourceType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
