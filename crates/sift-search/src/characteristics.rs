//! Query characteristics used to steer fusion weights.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "after", "all", "an", "and", "any", "are", "as", "at", "be", "because",
        "been", "before", "between", "both", "but", "by", "can", "could", "did", "do", "does",
        "for", "from", "had", "has", "have", "how", "i", "if", "in", "into", "is", "it", "its",
        "me", "more", "most", "my", "not", "of", "on", "or", "other", "our", "over", "should",
        "so", "some", "than", "that", "the", "their", "them", "then", "there", "these", "they",
        "this", "those", "through", "to", "under", "was", "we", "were", "what", "when", "where",
        "which", "while", "who", "why", "will", "with", "would", "you", "your",
    ]
    .into_iter()
    .collect()
});

const QUESTION_WORDS: &[&str] = &["how", "why", "what", "when", "where", "which", "who"];

/// Tokens at which length stops adding to semantic complexity.
const LONG_QUERY_TOKENS: f32 = 12.0;

/// Features of a query that predict which retrieval path will do better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryCharacteristics {
    /// Whitespace-separated tokens containing at least one alphanumeric char
    pub token_count: usize,
    /// Quoted phrase, identifier-like token, or a short query with no stopwords
    pub has_exact_terms: bool,
    /// How much the query reads like natural language, in [0, 1]
    pub semantic_complexity: f32,
}

impl QueryCharacteristics {
    /// Analyzes a query string.
    ///
    /// `semantic_complexity` mixes length (60%), stopword density (30%) and a
    /// question marker (10%); quoted phrases subtract 0.2.
    pub fn analyze(query: &str) -> Self {
        let tokens: Vec<String> = query
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        let token_count = tokens.len();
        if token_count == 0 {
            return Self {
                token_count: 0,
                has_exact_terms: false,
                semantic_complexity: 0.0,
            };
        }

        let lower: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        let stopword_count = lower
            .iter()
            .filter(|t| STOPWORDS.contains(t.as_str()))
            .count();

        let has_quotes = query.matches('"').count() >= 2;
        let has_identifier = tokens.iter().any(|t| is_identifier_like(t));
        let short_keywords = token_count <= 3 && stopword_count == 0;
        let has_exact_terms = has_quotes || has_identifier || short_keywords;

        let length_factor = (token_count as f32 / LONG_QUERY_TOKENS).min(1.0);
        let stopword_ratio = stopword_count as f32 / token_count as f32;
        let is_question =
            query.trim_end().ends_with('?') || QUESTION_WORDS.contains(&lower[0].as_str());

        let mut semantic_complexity = 0.6 * length_factor
            + 0.3 * (2.0 * stopword_ratio).min(1.0)
            + if is_question { 0.1 } else { 0.0 };
        if has_quotes {
            semantic_complexity -= 0.2;
        }

        Self {
            token_count,
            has_exact_terms,
            semantic_complexity: semantic_complexity.clamp(0.0, 1.0),
        }
    }
}

/// Codes, versions and symbols: `HTTP2`, `snake_case`, `v1.2`, `getUser`, `API`.
fn is_identifier_like(token: &str) -> bool {
    let has_alpha = token.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = token.chars().any(|c| c.is_ascii_digit());
    if has_alpha && has_digit {
        return true;
    }
    if token.contains('_') || token.contains("::") {
        return true;
    }
    if token.len() > 2 && token.contains(['.', '/']) {
        return true;
    }
    let camel = token
        .chars()
        .zip(token.chars().skip(1))
        .any(|(a, b)| a.is_lowercase() && b.is_uppercase());
    let acronym = token.len() >= 2 && token.chars().all(|c| c.is_ascii_uppercase());
    camel || acronym
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_keyword_is_exact() {
        let qc = QueryCharacteristics::analyze("cat");
        assert_eq!(qc.token_count, 1);
        assert!(qc.has_exact_terms);
        assert!(qc.semantic_complexity < 0.2);
    }

    #[test]
    fn test_empty_query() {
        let qc = QueryCharacteristics::analyze("   ");
        assert_eq!(qc.token_count, 0);
        assert!(!qc.has_exact_terms);
        assert_eq!(qc.semantic_complexity, 0.0);
    }

    #[test]
    fn test_punctuation_only_tokens_ignored() {
        assert_eq!(QueryCharacteristics::analyze("rust - async").token_count, 2);
    }

    #[test]
    fn test_quoted_phrase_is_exact() {
        let qc = QueryCharacteristics::analyze(r#"error "connection reset by peer" in the proxy"#);
        assert!(qc.has_exact_terms);
    }

    #[test]
    fn test_identifier_tokens_are_exact() {
        for q in [
            "configure HTTP2 keepalive for the gateway",
            "what does max_connections do",
            "getUserById returns null sometimes",
            "upgrade to v1.2 of the client",
        ] {
            assert!(QueryCharacteristics::analyze(q).has_exact_terms, "{q}");
        }
    }

    #[test]
    fn test_short_query_with_stopwords_not_exact() {
        let qc = QueryCharacteristics::analyze("what is rust");
        assert!(!qc.has_exact_terms);
    }

    #[test]
    fn test_long_abstract_query_is_complex() {
        let query = "how do the underlying principles of distributed consensus relate to the way \
                     teams make decisions in large organizations over time";
        let qc = QueryCharacteristics::analyze(query);
        assert_eq!(qc.token_count, 20);
        assert!(!qc.has_exact_terms);
        assert!(qc.semantic_complexity > 0.7, "{}", qc.semantic_complexity);
    }

    #[test]
    fn test_quotes_reduce_complexity() {
        let plain = QueryCharacteristics::analyze("why does the build fail on the release branch");
        let quoted =
            QueryCharacteristics::analyze(r#"why does the "build fail" on the release branch"#);
        assert!(quoted.semantic_complexity < plain.semantic_complexity);
    }

    #[test]
    fn test_complexity_bounded() {
        let long = "the ".repeat(100) + "?";
        let qc = QueryCharacteristics::analyze(&long);
        assert!((0.0..=1.0).contains(&qc.semantic_complexity));
    }
}
