//! Local keyword-overlap heuristic used when no judge credential is configured.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::{FactVerifier, JudgeError};

/// Words that carry no signal about a fact's content.
const STOP_WORDS: &[&str] = &[
    "the", "is", "are", "was", "were", "been", "being", "have", "has", "had", "does", "did",
    "will", "would", "could", "should", "may", "might", "must", "shall", "can", "need", "dare",
    "ought", "that", "this", "these", "those", "with", "from", "into", "during", "before",
    "after", "above", "below", "between", "under", "again", "further", "then", "once", "here",
    "there", "when", "where", "why", "how", "all", "each", "every", "both", "few", "more",
    "most", "other", "some", "such", "only", "same", "than", "very", "just", "also", "and",
    "but", "for", "nor", "yet", "not",
];

/// Tokens of this many characters or fewer are never key terms.
const MIN_TERM_CHARS: usize = 3;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").expect("valid regex"));

/// Distinct key terms of `fact`, in order of first appearance.
pub fn key_terms(fact: &str) -> Vec<String> {
    let lowered = fact.to_lowercase();
    let mut terms: Vec<String> = Vec::new();
    for word in WORD_RE.find_iter(&lowered).map(|m| m.as_str()) {
        if word.chars().count() <= MIN_TERM_CHARS || STOP_WORDS.contains(&word) {
            continue;
        }
        if !terms.iter().any(|t| t == word) {
            terms.push(word.to_string());
        }
    }
    terms
}

/// Whether at least half of the fact's key terms occur in `response`.
///
/// Terms are matched as substrings of the lowercased response. A fact with
/// no key terms is never supported.
pub fn keyword_supported(fact: &str, response: &str) -> bool {
    let terms = key_terms(fact);
    if terms.is_empty() {
        return false;
    }
    let haystack = response.to_lowercase();
    let matches = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
    matches * 2 >= terms.len()
}

/// [`FactVerifier`] backed by [`keyword_supported`].
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordVerifier;

#[async_trait]
impl FactVerifier for KeywordVerifier {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn judge(&self, fact: &str, response: &str) -> Result<bool, JudgeError> {
        Ok(keyword_supported(fact, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LRU_FACT: &str = "the cache evicts least-recently-used entries";

    #[test]
    fn test_key_terms_drop_stop_words_and_short_tokens() {
        assert_eq!(
            key_terms(LRU_FACT),
            vec!["cache", "evicts", "least", "recently", "used", "entries"]
        );
        assert_eq!(key_terms("The API is not for all"), Vec::<String>::new());
    }

    #[test]
    fn test_key_terms_are_deduplicated() {
        assert_eq!(key_terms("Parser parser PARSER tokens"), vec!["parser", "tokens"]);
    }

    #[test]
    fn test_lru_response_below_half_is_unsupported() {
        // Only "used" of six key terms appears in the response.
        assert!(!keyword_supported(LRU_FACT, "the LRU eviction policy is used"));
    }

    #[test]
    fn test_half_of_key_terms_is_enough() {
        // cache, least, recently: exactly three of six.
        assert!(keyword_supported(
            LRU_FACT,
            "The CACHE drops the least recently touched item"
        ));
        assert!(!keyword_supported(LRU_FACT, "the cache drops items"));
    }

    #[test]
    fn test_terms_match_as_substrings() {
        assert!(keyword_supported("tokenizer handles unicode", "Tokenizers: UNICODE-aware"));
    }

    #[test]
    fn test_fact_without_key_terms_is_unsupported() {
        assert!(!keyword_supported("it is so", "it is so"));
    }

    #[tokio::test]
    async fn test_keyword_verifier_never_errors() {
        let verdict = KeywordVerifier
            .judge("router dispatches requests", "The router dispatches incoming requests")
            .await
            .unwrap();
        assert!(verdict);
    }
}
