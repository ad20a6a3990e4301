use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idea {
	pub title: String,
	pub one_liner: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
	/// Free-form geographic hint, usually a country.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub location: Option<String>,
}
impl Idea {
	pub fn new(title: impl Into<String>, one_liner: impl Into<String>) -> Self {
		Self { title: title.into(), one_liner: one_liner.into(), category: None, location: None }
	}

	pub fn location_hint(&self) -> Option<Location> {
		let country = self.location.as_deref().map(str::trim).filter(|value| !value.is_empty())?;

		Some(Location { country: Some(country.to_string()), region: None })
	}
}

/// Approximate geographic context forwarded to the search provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub country: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub region: Option<String>,
}
impl Location {
	pub fn country(&self) -> Option<&str> {
		self.country.as_deref().filter(|value| !value.is_empty())
	}

	pub fn region(&self) -> Option<&str> {
		self.region.as_deref().filter(|value| !value.is_empty())
	}

	/// Suffix appended to a query so results are scoped geographically.
	pub fn search_suffix(&self) -> Option<String> {
		let country = self.country()?;

		match self.region() {
			Some(region) => Some(format!(" in {region}, {country}")),
			None => Some(format!(" in {country}")),
		}
	}
}
