use std::collections::{HashMap, HashSet};

use time::OffsetDateTime;
use unicode_normalization::UnicodeNormalization;
use url::{Url, form_urlencoded};

use crate::{
	evidence::{self, Evidence},
	source::SourceType,
	text,
};

const TRACKING_PARAMS: [&str; 15] = [
	"gclid", "fbclid", "msclkid", "ref", "referrer", "source", "_ga", "_gl", "mc_cid", "mc_eid",
	"WT.mc_id", "campaign", "medium", "content", "term",
];
const ELLIPSIS: &str = "...";
// Absorbs float accumulation so a score that sums to the threshold is treated as equal to it.
const SCORE_EPSILON: f32 = 1e-6;

/// Turns raw evidence into a ranked, deduplicated list.
///
/// Stateless across calls; wall-clock time only feeds the recency bonus.
#[derive(Debug, Clone)]
pub struct Normalizer {
	title_similarity: f32,
	snippet_similarity: f32,
	same_domain_title_similarity: f32,
	quality_threshold: f32,
	max_snippet_chars: usize,
}
impl Normalizer {
	pub fn new(cfg: &sift_config::Normalizer) -> Self {
		Self {
			title_similarity: cfg.title_similarity,
			snippet_similarity: cfg.snippet_similarity,
			same_domain_title_similarity: cfg.same_domain_title_similarity,
			quality_threshold: cfg.quality_threshold,
			max_snippet_chars: cfg.max_snippet_chars,
		}
	}

	pub fn normalize(&self, evidence: Vec<Evidence>) -> Vec<Evidence> {
		self.normalize_at(evidence, OffsetDateTime::now_utc())
	}

	pub fn normalize_at(&self, evidence: Vec<Evidence>, now: OffsetDateTime) -> Vec<Evidence> {
		let cleaned = evidence.into_iter().filter_map(|item| self.normalize_item(item)).collect();
		let unique = exact_dedup(cleaned);
		let scored = unique
			.into_iter()
			.map(|item| Scored::new(item, now))
			.collect::<Vec<_>>();
		let mut ranked = self
			.cluster(scored)
			.into_iter()
			.filter(|item| item.score > self.quality_threshold + SCORE_EPSILON)
			.collect::<Vec<_>>();

		ranked.sort_by(|lhs, rhs| rhs.score.total_cmp(&lhs.score));

		ranked.into_iter().map(|item| item.evidence).collect()
	}

	/// Canonical, cleaned copy of one item, or `None` when it cannot be cited.
	pub fn normalize_item(&self, item: Evidence) -> Option<Evidence> {
		if item.url.trim().is_empty() || item.title.trim().is_empty() {
			return None;
		}

		let url = canonicalize_url(&item.url)?;
		let title = clean_text(&item.title);
		let snippet = cap_chars(&clean_text(&item.snippet), self.max_snippet_chars);
		let id = evidence::stable_id(&url, &title, item.published_at);
		let source_type = item.source_type.or_else(|| Some(SourceType::infer(&url)));

		Some(Evidence {
			id,
			url,
			title,
			snippet,
			published_at: item.published_at,
			retrieved_at: item.retrieved_at,
			source_type,
		})
	}

	fn similar(&self, lhs: &Scored, rhs: &Scored) -> bool {
		let title_sim = text::jaccard(&lhs.title_tokens, &rhs.title_tokens);

		if title_sim > self.title_similarity {
			return true;
		}
		if !lhs.evidence.snippet.is_empty()
			&& !rhs.evidence.snippet.is_empty()
			&& text::jaccard(&lhs.snippet_tokens, &rhs.snippet_tokens) > self.snippet_similarity
		{
			return true;
		}

		lhs.host.is_some() && lhs.host == rhs.host && title_sim > self.same_domain_title_similarity
	}

	/// Single pass; an item joins the first cluster holding any member it resembles.
	fn cluster(&self, items: Vec<Scored>) -> Vec<Scored> {
		let mut clusters: Vec<Vec<Scored>> = Vec::new();

		for item in items {
			match clusters
				.iter_mut()
				.find(|cluster| cluster.iter().any(|member| self.similar(member, &item)))
			{
				Some(cluster) => cluster.push(item),
				None => clusters.push(vec![item]),
			}
		}

		clusters.into_iter().filter_map(representative).collect()
	}
}
impl Default for Normalizer {
	fn default() -> Self {
		Self::new(&sift_config::Normalizer::default())
	}
}

struct Scored {
	evidence: Evidence,
	score: f32,
	host: Option<String>,
	title_tokens: HashSet<String>,
	snippet_tokens: HashSet<String>,
}
impl Scored {
	fn new(evidence: Evidence, now: OffsetDateTime) -> Self {
		let score = quality_score(&evidence, now);
		let host =
			Url::parse(&evidence.url).ok().and_then(|url| url.host_str().map(str::to_string));
		let title_tokens = text::token_set(text::content_tokens(&evidence.title));
		let snippet_tokens = text::token_set(text::content_tokens(&evidence.snippet));

		Self { evidence, score, host, title_tokens, snippet_tokens }
	}
}

/// Highest score wins; ties keep the earliest member.
fn representative(cluster: Vec<Scored>) -> Option<Scored> {
	cluster.into_iter().reduce(|best, item| if item.score > best.score { item } else { best })
}

/// Collapses identical (url, title) pairs, keeping the most recently published.
fn exact_dedup(items: Vec<Evidence>) -> Vec<Evidence> {
	let mut index: HashMap<(String, String), usize> = HashMap::new();
	let mut unique: Vec<Evidence> = Vec::new();

	for item in items {
		let key = (item.url.clone(), item.title.clone());

		match index.get(&key) {
			Some(&slot) => {
				let newer = match (item.published_at, unique[slot].published_at) {
					(Some(candidate), Some(existing)) => candidate > existing,
					(Some(_), None) => true,
					_ => false,
				};

				if newer {
					unique[slot] = item;
				}
			},
			None => {
				index.insert(key, unique.len());
				unique.push(item);
			},
		}
	}

	unique
}

/// Strips tracking parameters, fragments and `www.` so equivalent links compare equal.
///
/// Returns `None` for unparsable or non-http(s) URLs. Idempotent.
pub fn canonicalize_url(raw: &str) -> Option<String> {
	let mut url = Url::parse(raw.trim()).ok()?;

	if !matches!(url.scheme(), "http" | "https") {
		return None;
	}

	let mut host = url.host_str()?.to_string();

	while let Some(stripped) = host.strip_prefix("www.")
		&& !stripped.is_empty()
	{
		host = stripped.to_string();
	}

	if Some(host.as_str()) != url.host_str() {
		url.set_host(Some(&host)).ok()?;
	}

	let query = url.query().map(canonical_query).unwrap_or_default();

	url.set_query((!query.is_empty()).then_some(query.as_str()));

	url.set_fragment(None);

	Some(url.into())
}

// Kept segments stay byte-for-byte as received; only their order changes.
fn canonical_query(query: &str) -> String {
	let mut segments = query
		.split('&')
		.filter(|segment| !segment.is_empty())
		.map(|segment| (query_key(segment), segment))
		.filter(|(key, _)| !is_tracking_param(key))
		.collect::<Vec<_>>();

	segments.sort_by(|lhs, rhs| lhs.0.cmp(&rhs.0));

	segments.into_iter().map(|(_, segment)| segment).collect::<Vec<_>>().join("&")
}

fn query_key(segment: &str) -> String {
	let raw = segment.split_once('=').map_or(segment, |(key, _)| key);

	form_urlencoded::parse(raw.as_bytes())
		.next()
		.map(|(key, _)| key.into_owned())
		.unwrap_or_else(|| raw.to_string())
}

fn is_tracking_param(key: &str) -> bool {
	key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

/// NFKC-normalizes and collapses every whitespace run into a single space.
pub fn clean_text(raw: &str) -> String {
	let normalized: String = raw.nfkc().collect();

	normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to `max_chars` characters, marking the cut with an ellipsis.
pub fn cap_chars(text: &str, max_chars: usize) -> String {
	if text.chars().count() <= max_chars {
		return text.to_string();
	}

	let mut capped: String = text.chars().take(max_chars).collect();

	capped.push_str(ELLIPSIS);

	capped
}

/// Source reputation plus recency and content-richness bonuses.
pub fn quality_score(evidence: &Evidence, now: OffsetDateTime) -> f32 {
	let mut score = evidence.source_type.unwrap_or_default().weight();

	if let Some(published_at) = evidence.published_at {
		let days = (now - published_at).as_seconds_f64() / 86_400.0;

		score += if days <= 30.0 {
			0.5
		} else if days <= 365.0 {
			0.3
		} else if days <= 365.0 * 3.0 {
			0.1
		} else {
			0.0
		};
	}
	if evidence.title.chars().count() > 10 {
		score += 0.2;
	}
	if evidence.snippet.chars().count() > 50 {
		score += 0.2;
	}
	if evidence.url.chars().count() < 100 {
		score += 0.1;
	}

	score
}
