use std::collections::HashSet;

use crate::{
	idea::Idea,
	query::{Intent, SearchQuery},
	text,
};

const COMPETITOR_TEMPLATES: [&str; 4] =
	["{} competitors", "{} alternative", "{} similar companies", "companies like {}"];
const FUNDING_TEMPLATES: [&str; 4] =
	["{} startup funding", "{} series A", "{} investment", "{} venture capital"];
const REGULATION_TEMPLATES: [&str; 4] =
	["{} regulation", "{} compliance", "{} legal requirements", "{} government rules"];
const POSTMORTEM_TEMPLATES: [&str; 4] =
	["{} startup failed", "{} company shut down", "{} startup postmortem", "why {} failed"];
const MARKET_TEMPLATES: [&str; 4] =
	["{} market size", "{} industry trends", "{} market research", "{} TAM"];
const PROBLEM_TEMPLATES: [&str; 4] =
	["{} problems", "{} pain points", "users complain {}", "{} frustrations"];

/// Expands an idea into a bounded, near-duplicate-free list of search queries.
#[derive(Debug, Clone)]
pub struct Planner {
	max_queries: usize,
	dedup_similarity: f32,
}
impl Planner {
	pub fn new(cfg: &sift_config::Planner) -> Self {
		Self { max_queries: cfg.max_queries as usize, dedup_similarity: cfg.dedup_similarity }
	}

	/// Never fails; an idea without usable terms falls back to its raw text.
	pub fn plan(&self, idea: &Idea) -> Vec<SearchQuery> {
		let terms = key_terms(&idea.title, &idea.one_liner);
		let groups = if terms.is_empty() {
			fallback_groups(idea)
		} else {
			Intent::ALL.iter().map(|intent| intent_queries(*intent, &terms, idea)).collect()
		};
		let mut accepted: Vec<SearchQuery> = Vec::new();
		let mut accepted_tokens: Vec<HashSet<String>> = Vec::new();

		for query in interleave(groups) {
			if accepted.len() >= self.max_queries {
				break;
			}

			let tokens = text::token_set(text::raw_tokens(&query.text));

			if tokens.is_empty() {
				continue;
			}
			if accepted_tokens
				.iter()
				.any(|existing| text::jaccard(existing, &tokens) > self.dedup_similarity)
			{
				continue;
			}

			accepted_tokens.push(tokens);
			accepted.push(query);
		}

		accepted
	}
}
impl Default for Planner {
	fn default() -> Self {
		Self::new(&sift_config::Planner::default())
	}
}

/// Words of the title and one-liner that are long or capitalized, lowercased, first seen first.
pub fn key_terms(title: &str, one_liner: &str) -> Vec<String> {
	let mut terms = Vec::new();
	let mut seen = HashSet::new();

	for word in title.split_whitespace().chain(one_liner.split_whitespace()) {
		let capitalized = word
			.chars()
			.find(|ch| ch.is_alphanumeric())
			.is_some_and(char::is_uppercase);
		let term: String =
			word.chars().filter(|ch| ch.is_alphanumeric()).flat_map(char::to_lowercase).collect();

		if !text::is_idea_token(&term) {
			continue;
		}
		if term.chars().count() < 5 && !capitalized {
			continue;
		}
		if seen.insert(term.clone()) {
			terms.push(term);
		}
	}

	terms
}

fn templates(intent: Intent) -> &'static [&'static str; 4] {
	match intent {
		Intent::Competitors => &COMPETITOR_TEMPLATES,
		Intent::Funding => &FUNDING_TEMPLATES,
		Intent::Regulation => &REGULATION_TEMPLATES,
		Intent::Postmortems => &POSTMORTEM_TEMPLATES,
		Intent::Market => &MARKET_TEMPLATES,
		Intent::Problem => &PROBLEM_TEMPLATES,
	}
}

fn terms_used(intent: Intent) -> usize {
	match intent {
		Intent::Competitors => 3,
		_ => 2,
	}
}

fn render(template: &str, term: &str) -> String {
	template.replacen("{}", term, 1)
}

fn intent_queries(intent: Intent, terms: &[String], idea: &Idea) -> Vec<SearchQuery> {
	let mut queries = Vec::new();

	for term in terms.iter().take(terms_used(intent)) {
		for template in templates(intent) {
			let priority = intent.priority().into();

			queries.push(SearchQuery::new(render(template, term), intent, priority));
		}
	}

	let title = idea.title.trim();

	if intent == Intent::Competitors && !title.is_empty() {
		queries.push(SearchQuery::new(format!("\"{title}\" competitors"), intent, 2));
	}

	queries
}

fn fallback_groups(idea: &Idea) -> Vec<Vec<SearchQuery>> {
	let title = idea.title.trim();
	let subject = if title.is_empty() { idea.one_liner.trim() } else { title }.to_lowercase();

	if subject.is_empty() {
		return Vec::new();
	}

	Intent::ALL
		.iter()
		.map(|intent| {
			let template = templates(*intent)[0];

			vec![SearchQuery::new(render(template, &subject), *intent, intent.priority().into())]
		})
		.collect()
}

/// Round-robin across intent groups so truncation keeps every intent represented.
fn interleave(groups: Vec<Vec<SearchQuery>>) -> Vec<SearchQuery> {
	let total = groups.iter().map(Vec::len).sum();
	let mut iters: Vec<_> = groups.into_iter().map(Vec::into_iter).collect();
	let mut out = Vec::with_capacity(total);

	while out.len() < total {
		for iter in &mut iters {
			if let Some(query) = iter.next() {
				out.push(query);
			}
		}
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn key_terms_keep_capitalized_short_words_and_long_words() {
		assert_eq!(
			key_terms("Loom", "Agentic coding assistant for the team"),
			vec!["loom", "agentic", "coding", "assistant"]
		);
	}

	#[test]
	fn key_terms_skip_stopwords_and_duplicates() {
		assert_eq!(key_terms("Would Shipping", "shipping, Would it?"), vec!["shipping"]);
	}

	#[test]
	fn interleave_alternates_groups() {
		let a = vec![
			SearchQuery::new("a1", Intent::Competitors, 1),
			SearchQuery::new("a2", Intent::Competitors, 1),
		];
		let b = vec![SearchQuery::new("b1", Intent::Funding, 2)];
		let texts: Vec<_> = interleave(vec![a, b]).into_iter().map(|query| query.text).collect();

		assert_eq!(texts, vec!["a1", "b1", "a2"]);
	}
}
