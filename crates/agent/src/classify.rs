//! Explicit-command detection for buyer messages while a seller conversation
//! is open. The rule-based matcher runs first; anything it passes on goes to
//! the model-backed path (the resolver's reply_to_seller decision).

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use crate::router::ActiveSellerContext;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyDecision {
    /// An explicit command named a message to relay.
    Relay { message: String },
    /// The buyer explicitly declined to answer the seller.
    Decline,
    /// No command matched; defer to the model-backed classification.
    Pass,
}

#[async_trait]
pub trait SellerReplyClassifier: Send + Sync {
    async fn classify(&self, text: &str, context: &ActiveSellerContext) -> ReplyDecision;
}

/// Case-insensitive substring match in either direction, so "padang jaya",
/// "Padang", and "jaya" all address the seller "Padang Jaya".
pub fn seller_matches(candidate: &str, active_seller: &str) -> bool {
    let candidate = candidate.trim().to_lowercase();
    let active = active_seller.trim().to_lowercase();
    if candidate.is_empty() || active.is_empty() {
        return false;
    }
    candidate.contains(&active) || active.contains(&candidate)
}

/// "reply to <addressee> …" / "balas ke …" / "bilang ke …": forms that name
/// who the message is for. Tried before the bare forms so the addressee is
/// not swallowed into the message.
fn addressed_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:reply\s+to|balas\s+ke|bilang\s+ke|bilang\s+sama)\s+(?P<rest>.+)$")
            .expect("addressed pattern compiles")
    })
}

/// "tell them …" / bare "bilang …": the message is everything after the verb.
fn tell_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:tell\s+(?:them|him|her|the\s+seller)|bilang)\s*[,:]?\s+(?P<msg>.+)$")
            .expect("tell pattern compiles")
    })
}

fn decline_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(?:(?:don'?t|do\s+not|no\s+need\s+to)\s+(?:reply|respond|answer)|skip(?:\s+it)?|(?:gak|ga|nggak|tidak)\s+usah\s+(?:di)?bal[ae]s|jangan\s+(?:di)?bal[ae]s)\s*[.!]*\s*$",
        )
        .expect("decline pattern compiles")
    })
}

#[derive(Default)]
pub struct RuleBasedClassifier;

impl RuleBasedClassifier {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn classify_sync(&self, text: &str, context: &ActiveSellerContext) -> ReplyDecision {
        if decline_pattern().is_match(text) {
            return ReplyDecision::Decline;
        }

        if let Some(captures) = addressed_pattern().captures(text) {
            let rest = captures["rest"].trim();
            if let Some(message) = split_addressed_message(rest, &context.seller_name) {
                return ReplyDecision::Relay { message };
            }
            // An addressee was named but it is not this seller; the command
            // is not addressed to this context.
            return ReplyDecision::Pass;
        }

        if let Some(captures) = tell_pattern().captures(text) {
            let message = captures["msg"].trim().to_string();
            if !message.is_empty() {
                return ReplyDecision::Relay { message };
            }
        }

        ReplyDecision::Pass
    }
}

/// `rest` is "<addressee> <message>" with an optional `:`/`,` separator. A
/// generic addressee ("penjual", "dia") always means the active seller; a
/// named one must fuzzily match it.
fn split_addressed_message(rest: &str, active_seller: &str) -> Option<String> {
    let mut words = rest.split_whitespace();
    if let Some(first) = words.next() {
        let lowered = first.trim_matches([':', ',']).to_lowercase();
        if matches!(lowered.as_str(), "penjual" | "penjualnya" | "dia") {
            let message = rest[first.len()..].trim_start_matches([':', ',']).trim();
            if !message.is_empty() {
                return Some(message.to_string());
            }
            return None;
        }
    }

    if let Some((name, message)) = rest.split_once([':', ',']) {
        let message = message.trim();
        if seller_matches(name, active_seller) && !message.is_empty() {
            return Some(message.to_string());
        }
        return None;
    }

    // No separator: try the first one to three words as the seller name.
    let words: Vec<&str> = rest.split_whitespace().collect();
    for name_len in (1..=3.min(words.len().saturating_sub(1))).rev() {
        let name = words[..name_len].join(" ");
        if seller_matches(&name, active_seller) {
            let message = words[name_len..].join(" ");
            if !message.is_empty() {
                return Some(message);
            }
        }
    }
    None
}

#[async_trait]
impl SellerReplyClassifier for RuleBasedClassifier {
    async fn classify(&self, text: &str, context: &ActiveSellerContext) -> ReplyDecision {
        self.classify_sync(text, context)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use lapak_core::domain::order::OrderId;

    use super::{seller_matches, ReplyDecision, RuleBasedClassifier};
    use crate::router::ActiveSellerContext;

    fn context() -> ActiveSellerContext {
        ActiveSellerContext {
            order_id: OrderId("order-1".to_string()),
            seller_name: "Padang Jaya".to_string(),
            product_name: "Nasi Rendang".to_string(),
            last_message: "mau pedes gak?".to_string(),
            timestamp: Utc::now(),
        }
    }

    fn classify(text: &str) -> ReplyDecision {
        RuleBasedClassifier::new().classify_sync(text, &context())
    }

    #[test]
    fn tell_them_extracts_the_message() {
        assert_eq!(
            classify("tell them I want it spicy"),
            ReplyDecision::Relay { message: "I want it spicy".to_string() }
        );
        assert_eq!(
            classify("bilang mau yang pedas"),
            ReplyDecision::Relay { message: "mau yang pedas".to_string() }
        );
    }

    #[test]
    fn generic_addressee_means_the_active_seller() {
        assert_eq!(
            classify("bilang ke penjual mau yang pedas"),
            ReplyDecision::Relay { message: "mau yang pedas".to_string() }
        );
        assert_eq!(
            classify("bilang sama dia, besok aja"),
            ReplyDecision::Relay { message: "besok aja".to_string() }
        );
    }

    #[test]
    fn reply_to_matching_seller_is_relayed() {
        assert_eq!(
            classify("reply to Padang Jaya: mau pedes"),
            ReplyDecision::Relay { message: "mau pedes".to_string() }
        );
        assert_eq!(
            classify("balas ke padang, mau pedes"),
            ReplyDecision::Relay { message: "mau pedes".to_string() }
        );
        assert_eq!(
            classify("reply to jaya mau pedes"),
            ReplyDecision::Relay { message: "mau pedes".to_string() }
        );
    }

    #[test]
    fn reply_addressed_to_a_different_seller_is_ignored() {
        assert_eq!(classify("reply to Warteg Bu Tini: mau pedes"), ReplyDecision::Pass);
    }

    #[test]
    fn explicit_declines_are_detected_in_both_languages() {
        assert_eq!(classify("don't reply"), ReplyDecision::Decline);
        assert_eq!(classify("no need to respond."), ReplyDecision::Decline);
        assert_eq!(classify("skip it"), ReplyDecision::Decline);
        assert_eq!(classify("gak usah dibales"), ReplyDecision::Decline);
        assert_eq!(classify("jangan dibalas"), ReplyDecision::Decline);
    }

    #[test]
    fn short_content_answers_are_not_commands() {
        // These look like answers to the seller, which is the model's call.
        assert_eq!(classify("mau"), ReplyDecision::Pass);
        assert_eq!(classify("gak usah kerupuk"), ReplyDecision::Pass);
        assert_eq!(classify("ada es teler?"), ReplyDecision::Pass);
    }

    #[test]
    fn seller_matching_is_fuzzy_both_directions() {
        assert!(seller_matches("padang jaya", "Padang Jaya"));
        assert!(seller_matches("jaya", "Padang Jaya"));
        assert!(seller_matches("Padang Jaya Group", "padang jaya"));
        assert!(!seller_matches("Bu Tini", "Padang Jaya"));
        assert!(!seller_matches("", "Padang Jaya"));
    }
}
