use std::fmt;

use serde::{Deserialize, Serialize};

pub const HIGHEST_PRIORITY: u8 = 1;
pub const LOWEST_PRIORITY: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
	Competitors,
	Funding,
	Regulation,
	Postmortems,
	Market,
	Problem,
}
impl Intent {
	/// Generation order used by the planner.
	pub const ALL: [Self; 6] = [
		Self::Competitors,
		Self::Funding,
		Self::Regulation,
		Self::Postmortems,
		Self::Market,
		Self::Problem,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Competitors => "competitors",
			Self::Funding => "funding",
			Self::Regulation => "regulation",
			Self::Postmortems => "postmortems",
			Self::Market => "market",
			Self::Problem => "problem",
		}
	}

	pub fn priority(self) -> u8 {
		match self {
			Self::Competitors | Self::Market | Self::Problem => 1,
			Self::Funding | Self::Regulation => 2,
			Self::Postmortems => 3,
		}
	}
}
impl fmt::Display for Intent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
	pub text: String,
	pub intent: Intent,
	pub priority: u8,
}
impl SearchQuery {
	pub fn new(text: impl Into<String>, intent: Intent, priority: i64) -> Self {
		Self { text: text.into(), intent, priority: clamp_priority(priority) }
	}

	/// Tier this query is dispatched in, tolerating hand-built out-of-range values.
	pub fn tier(&self) -> u8 {
		clamp_priority(i64::from(self.priority))
	}
}

/// Out-of-range priorities fall into the lowest tier.
pub fn clamp_priority(raw: i64) -> u8 {
	match raw {
		1..=3 => raw as u8,
		_ => LOWEST_PRIORITY,
	}
}
