//! Deterministic intent fallback: pure text processing used when both
//! providers are unreachable or return unusable output. Never touches the
//! network and never fails.

use crate::intent::{Intent, IntentResult};
use crate::locale::Locale;

const GREETINGS: &[&str] = &["hello", "hi", "halo", "hey", "selamat"];
const HELP_TRIGGERS: &[&str] = &["help", "bantuan"];

/// Bilingual synonym expansion so a single keyword still hits tagged catalog
/// entries in either language.
fn expansions(word: &str) -> Option<&'static [&'static str]> {
    let expanded: &[&str] = match word {
        "sweet" | "manis" => &["sweet", "manis", "dessert", "chocolate", "coklat"],
        "cheap" | "murah" => &["cheap", "murah"],
        "drink" | "minuman" => &["drink", "minuman", "cold", "coffee", "kopi"],
        "healthy" | "sehat" => &["healthy", "vegetable", "sayur", "gado"],
        "spicy" | "pedas" => &["spicy", "pedas", "balado", "rendang"],
        "chicken" | "ayam" => &["chicken", "ayam"],
        "beef" | "daging" => &["beef", "daging", "sapi", "rendang"],
        "rice" | "nasi" => &["nasi", "rice"],
        "snack" => &["snack", "pisang", "klepon", "martabak"],
        "coffee" | "kopi" => &["coffee", "kopi"],
        _ => return None,
    };
    Some(expanded)
}

/// Classify `text` without a provider: greeting, help, or keyword search.
pub fn fallback(text: &str, locale: Locale) -> IntentResult {
    let words = tokenize(text);

    // Whole-word greeting match only; "shayang" must not match "ya" or "hi".
    if words.iter().any(|word| GREETINGS.contains(&word.as_str())) {
        return IntentResult::text_only(Intent::Greeting, locale.greeting_reply());
    }

    let lowered = text.to_lowercase();
    if HELP_TRIGGERS.iter().any(|trigger| lowered.contains(trigger)) {
        return IntentResult::text_only(Intent::Help, locale.help_reply());
    }

    let keywords = expand_keywords(&words);
    let mut result = IntentResult::text_only(Intent::Search, locale.searching_reply());
    result.keywords = keywords;
    result
}

/// Lowercase words with punctuation stripped.
fn tokenize(text: &str) -> Vec<String> {
    let mut sanitized = String::with_capacity(text.len());
    for character in text.to_lowercase().chars() {
        if character.is_alphanumeric() || character == '_' {
            sanitized.push(character);
        } else {
            sanitized.push(' ');
        }
    }
    sanitized.split_whitespace().map(|word| word.to_string()).collect()
}

/// Tokens longer than two characters, expanded through the synonym table,
/// deduplicated in first-seen order.
fn expand_keywords(words: &[String]) -> Vec<String> {
    let mut expanded = Vec::new();
    for word in words.iter().filter(|word| word.chars().count() > 2) {
        match expansions(word) {
            Some(synonyms) => {
                for synonym in synonyms {
                    push_unique(&mut expanded, synonym);
                }
            }
            None => push_unique(&mut expanded, word),
        }
    }
    expanded
}

fn push_unique(keywords: &mut Vec<String>, candidate: &str) {
    if !keywords.iter().any(|existing| existing == candidate) {
        keywords.push(candidate.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::fallback;
    use crate::intent::Intent;
    use crate::locale::Locale;

    #[test]
    fn greeting_requires_whole_word_match() {
        let result = fallback("hi there", Locale::English);
        assert_eq!(result.intent, Intent::Greeting);

        // "shayang" contains "hi" and "ya" as substrings but is not a greeting.
        let result = fallback("shayang", Locale::English);
        assert_eq!(result.intent, Intent::Search);
    }

    #[test]
    fn greeting_survives_punctuation() {
        let result = fallback("Halo!!!", Locale::Indonesian);
        assert_eq!(result.intent, Intent::Greeting);
        assert!(!result.response_text.is_empty());
    }

    #[test]
    fn help_trigger_matches_in_both_languages() {
        assert_eq!(fallback("I need help please", Locale::English).intent, Intent::Help);
        assert_eq!(fallback("butuh bantuan dong", Locale::Indonesian).intent, Intent::Help);
    }

    #[test]
    fn keywords_are_expanded_through_the_synonym_table() {
        let result = fallback("kopi murah", Locale::English);
        assert_eq!(result.intent, Intent::Search);
        for expected in ["coffee", "kopi", "cheap", "murah"] {
            assert!(
                result.keywords.iter().any(|k| k == expected),
                "expected keyword `{expected}` in {:?}",
                result.keywords
            );
        }
    }

    #[test]
    fn short_tokens_are_dropped_and_unknown_words_pass_through() {
        let result = fallback("mau es durian", Locale::English);
        assert!(!result.keywords.iter().any(|k| k == "es"));
        assert!(result.keywords.iter().any(|k| k == "durian"));
    }

    #[test]
    fn expansion_deduplicates_overlapping_synonyms() {
        // "spicy" and "pedas" expand to the same set; each keyword once.
        let result = fallback("spicy pedas", Locale::English);
        let rendang_count = result.keywords.iter().filter(|k| *k == "rendang").count();
        assert_eq!(rendang_count, 1);
    }

    #[test]
    fn fallback_is_deterministic() {
        let first = fallback("something sweet and cheap", Locale::English);
        let second = fallback("something sweet and cheap", Locale::English);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_input_yields_a_valid_search_result() {
        let result = fallback("", Locale::English);
        assert_eq!(result.intent, Intent::Search);
        assert!(result.keywords.is_empty());
        assert!(result.satisfies_invariant());
    }
}
