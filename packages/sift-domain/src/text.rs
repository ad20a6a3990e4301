use std::collections::HashSet;

/// Filler words that never carry topical signal.
pub const STOPWORDS: [&str; 14] =
	["the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by"];

/// Auxiliary verbs additionally ignored when reading an idea description.
pub const AUXILIARY_STOPWORDS: [&str; 16] = [
	"is", "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will",
	"would", "could", "should",
];

/// Lowercased ASCII alphanumeric runs, in order, duplicates kept.
pub fn raw_tokens(text: &str) -> Vec<String> {
	let mut normalized = String::with_capacity(text.len());

	for ch in text.chars() {
		if ch.is_ascii_alphanumeric() {
			normalized.push(ch.to_ascii_lowercase());
		} else {
			normalized.push(' ');
		}
	}

	normalized.split_whitespace().map(str::to_string).collect()
}

/// Tokens longer than two characters that are not stopwords.
pub fn content_tokens(text: &str) -> Vec<String> {
	raw_tokens(text).into_iter().filter(|token| is_content_token(token)).collect()
}

pub fn is_content_token(token: &str) -> bool {
	token.len() > 2 && !STOPWORDS.contains(&token)
}

/// Stricter filter used on idea descriptions.
pub fn is_idea_token(token: &str) -> bool {
	is_content_token(token) && !AUXILIARY_STOPWORDS.contains(&token)
}

pub fn token_set<I, S>(tokens: I) -> HashSet<String>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	tokens.into_iter().map(Into::into).collect()
}

pub fn jaccard(lhs: &HashSet<String>, rhs: &HashSet<String>) -> f32 {
	let intersection = lhs.intersection(rhs).count();
	let union = lhs.len() + rhs.len() - intersection;

	if union == 0 {
		return 0.0;
	}

	intersection as f32 / union as f32
}
