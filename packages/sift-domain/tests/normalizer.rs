use time::{Duration, OffsetDateTime, macros::datetime};

use sift_domain::{
	Evidence, Normalizer, SourceType,
	evidence::stable_id,
	normalizer::{self, canonicalize_url},
};

const NOW: OffsetDateTime = datetime!(2025-06-01 12:00:00 UTC);

fn item(url: &str, title: &str, snippet: &str) -> Evidence {
	Evidence {
		id: String::new(),
		url: url.to_string(),
		title: title.to_string(),
		snippet: snippet.to_string(),
		published_at: None,
		retrieved_at: NOW,
		source_type: None,
	}
}

fn dated(mut evidence: Evidence, days_ago: i64) -> Evidence {
	evidence.published_at = Some(NOW - Duration::days(days_ago));

	evidence
}

#[test]
fn canonicalization_is_idempotent_and_strips_tracking() {
	let inputs = [
		"https://www.example.com/path?utm_source=news&utm_medium=x&id=7&fbclid=abc#top",
		"http://www.www.example.com/?ref=a&source=b&campaign=c&medium=d&content=e&term=f",
		"https://shop.example.com/item?_ga=1&_gl=2&mc_cid=3&mc_eid=4&WT.mc_id=5&msclkid=6&z=1&a=2",
		"https://example.com/a%20b?q=hello+world",
	];

	for input in inputs {
		let once = canonicalize_url(input).expect("Input must canonicalize.");
		let twice = canonicalize_url(&once).expect("Canonical URL must canonicalize.");

		assert_eq!(once, twice);

		for param in ["utm_", "fbclid", "ref=", "source=", "_ga", "_gl", "mc_", "WT.", "msclkid"] {
			assert!(!once.contains(param), "{once} still carries {param}");
		}
		assert!(!once.contains("www."), "{once} kept the www prefix");
		assert!(!once.contains('#'));
	}
}

#[test]
fn stable_id_is_deterministic_and_field_sensitive() {
	let published = Some(datetime!(2024-03-01 00:00:00 UTC));
	let base = stable_id("https://a.io/x", "Title", published);

	assert_eq!(base, stable_id("https://a.io/x", "Title", published));
	assert_ne!(base, stable_id("https://a.io/y", "Title", published));
	assert_ne!(base, stable_id("https://a.io/x", "Title 2", published));
	assert_ne!(base, stable_id("https://a.io/x", "Title", None));
}

#[test]
fn equivalent_urls_share_an_id() {
	let normalizer = Normalizer::default();
	let lhs = normalizer
		.normalize_item(item("https://www.techcrunch.com/a?utm_source=x", "  Big   news ", ""))
		.expect("Item must normalize.");
	let rhs = normalizer
		.normalize_item(item("https://techcrunch.com/a", "Big news", ""))
		.expect("Item must normalize.");

	assert_eq!(lhs.id, rhs.id);
	assert_eq!(lhs.url, "https://techcrunch.com/a");
	assert_eq!(lhs.title, "Big news");
}

#[test]
fn explicit_source_type_survives_normalization() {
	let normalizer = Normalizer::default();
	let mut classified = item("https://techcrunch.com/a", "Launch coverage today", "");

	classified.source_type = Some(SourceType::Unknown);

	let kept = normalizer.normalize_item(classified).expect("Item must normalize.");
	let inferred = normalizer
		.normalize_item(item("https://techcrunch.com/a", "Launch coverage today", ""))
		.expect("Item must normalize.");

	assert_eq!(kept.source_type, Some(SourceType::Unknown));
	assert_eq!(inferred.source_type, Some(SourceType::News));
}

#[test]
fn exact_dedup_keeps_latest_publication() {
	let older = dated(item("https://techcrunch.com/a", "Launch coverage today", ""), 200);
	let newer = dated(item("https://techcrunch.com/a", "Launch coverage today", ""), 10);
	let expected = newer.published_at;
	let out = Normalizer::default().normalize_at(vec![older, newer], NOW);

	assert_eq!(out.len(), 1);
	assert_eq!(out[0].published_at, expected);
}

#[test]
fn undated_duplicate_loses_to_dated() {
	let dated_item = dated(item("https://techcrunch.com/a", "Launch coverage today", ""), 400);
	let undated = item("https://techcrunch.com/a", "Launch coverage today", "");
	let expected = dated_item.published_at;
	let out = Normalizer::default().normalize_at(vec![undated, dated_item], NOW);

	assert_eq!(out.len(), 1);
	assert_eq!(out[0].published_at, expected);
}

#[test]
fn same_domain_near_duplicate_titles_merge() {
	let out = Normalizer::default().normalize_at(
		vec![
			item("https://techcrunch.com/one", "AI coding assistant raises funding", ""),
			item("https://techcrunch.com/two", "AI coding assistant raises funding round", ""),
		],
		NOW,
	);

	assert_eq!(out.len(), 1);
	assert_eq!(out[0].source_type, Some(SourceType::News));
}

#[test]
fn similar_snippets_cluster_across_domains() {
	let snippet = "Startup unveils autonomous agent that writes reviews and ships code changes";
	let out = Normalizer::default().normalize_at(
		vec![
			item("https://reddit.com/r/x", "Thread about agents", snippet),
			item("https://techcrunch.com/y", "Coverage of new product", snippet),
		],
		NOW,
	);

	assert_eq!(out.len(), 1);
	assert_eq!(out[0].url, "https://techcrunch.com/y");
}

#[test]
fn clustering_is_transitive() {
	let out = Normalizer::default().normalize_at(
		vec![
			item(
				"https://example.com/a",
				"alpha beta gamma delta epsilon zeta theta iota kappa lambda",
				"",
			),
			item(
				"https://other.org/b",
				"alpha beta gamma delta epsilon zeta theta iota kappa lambda sigma",
				"",
			),
			item(
				"https://third.net/c",
				"beta gamma delta epsilon zeta theta iota kappa lambda sigma omega",
				"",
			),
		],
		NOW,
	);

	assert_eq!(out.len(), 1);
}

#[test]
fn low_quality_items_are_filtered() {
	let weak = item("https://example.com/x", "Short", "");

	assert!(normalizer::quality_score(&weak, NOW) <= 0.3);
	assert!(Normalizer::default().normalize_at(vec![weak], NOW).is_empty());
}

#[test]
fn invalid_items_are_dropped_individually() {
	let out = Normalizer::default().normalize_at(
		vec![
			item("ftp://files.example.com/a", "A perfectly fine title", ""),
			item("", "No url at all", ""),
			item("https://techcrunch.com/ok", "   ", ""),
			item("https://techcrunch.com/kept", "Kept despite bad siblings", ""),
		],
		NOW,
	);

	assert_eq!(out.len(), 1);
	assert_eq!(out[0].url, "https://techcrunch.com/kept");
}

#[test]
fn ranking_is_descending_by_score() {
	let out = Normalizer::default().normalize_at(
		vec![
			item("https://medium.com/post", "A long enough blog title", ""),
			dated(item("https://reuters.com/story", "Regulators approve new rules", ""), 5),
			item("https://github.com/org/repo", "Repository for the agent", ""),
		],
		NOW,
	);
	let urls: Vec<&str> = out.iter().map(|evidence| evidence.url.as_str()).collect();

	assert_eq!(
		urls,
		vec!["https://reuters.com/story", "https://github.com/org/repo", "https://medium.com/post"]
	);

	let scores: Vec<f32> =
		out.iter().map(|evidence| normalizer::quality_score(evidence, NOW)).collect();

	assert!(scores.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[test]
fn long_snippets_are_capped() {
	let snippet = "word ".repeat(200);
	let out = Normalizer::default()
		.normalize_at(vec![item("https://techcrunch.com/a", "Title long enough", &snippet)], NOW);

	assert_eq!(out[0].snippet.chars().count(), 503);
	assert!(out[0].snippet.ends_with("..."));
}

#[test]
fn empty_input_yields_empty_output() {
	assert!(Normalizer::default().normalize_at(Vec::new(), NOW).is_empty());
}
