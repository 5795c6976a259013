//! The canonical output of intent resolution.
//!
//! Provider replies arrive as loosely-shaped JSON ([`RawIntentResult`]) and
//! are validated against the result invariant before being normalized into
//! the typed [`IntentResult`] the rest of the pipeline consumes. Invalid raw
//! results are discarded by the resolver, which retries once and then falls
//! back to the deterministic heuristic path.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Search,
    Greeting,
    Help,
    Chat,
    NotFound,
    Followup,
    ReplyToSeller,
}

impl Intent {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "search" => Some(Self::Search),
            "greeting" => Some(Self::Greeting),
            "help" => Some(Self::Help),
            "chat" => Some(Self::Chat),
            "not_found" => Some(Self::NotFound),
            "followup" => Some(Self::Followup),
            "reply_to_seller" => Some(Self::ReplyToSeller),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Greeting => "greeting",
            Self::Help => "help",
            Self::Chat => "chat",
            Self::NotFound => "not_found",
            Self::Followup => "followup",
            Self::ReplyToSeller => "reply_to_seller",
        }
    }
}

/// Provider reply as deserialized, before validation. Every field is
/// optional; the model is prompted for camelCase keys but the legacy
/// `response`/`keywords` shape is accepted too.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawIntentResult {
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default, alias = "selectedProducts")]
    pub selected_products: Option<Vec<String>>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default, alias = "userWant")]
    pub user_want: Option<String>,
    #[serde(default, alias = "responseText", alias = "response")]
    pub response_text: Option<String>,
    #[serde(default, alias = "productComment")]
    pub product_comment: Option<String>,
    #[serde(default, alias = "notFoundItem")]
    pub not_found_item: Option<String>,
    #[serde(default, alias = "messageForSeller")]
    pub message_for_seller: Option<String>,
}

impl RawIntentResult {
    /// The result invariant: the intent must be a known value, and there must
    /// be response text unless this is a seller reply carrying a non-empty
    /// relay message.
    pub fn validate(&self) -> Option<Intent> {
        let intent = Intent::parse(self.intent.as_deref()?)?;
        let has_response = self.response_text.is_some();
        let has_seller_message = intent == Intent::ReplyToSeller
            && self.message_for_seller.as_deref().is_some_and(|m| !m.trim().is_empty());
        (has_response || has_seller_message).then_some(intent)
    }

    /// Normalize into the canonical result. Callers must have validated
    /// first; `intent` is the value [`Self::validate`] returned.
    pub fn normalize(self, intent: Intent) -> IntentResult {
        IntentResult {
            intent,
            selected_products: self.selected_products.unwrap_or_default(),
            keywords: self.keywords.unwrap_or_default(),
            user_want: self.user_want.filter(|w| !w.trim().is_empty()),
            response_text: self.response_text.unwrap_or_default(),
            product_comment: self.product_comment.filter(|c| !c.trim().is_empty()),
            not_found_item: self.not_found_item.filter(|n| !n.trim().is_empty()),
            message_for_seller: self.message_for_seller.filter(|m| !m.trim().is_empty()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IntentResult {
    pub intent: Intent,
    /// Catalog item names, echoed verbatim by the model. Filtered against
    /// the real catalog downstream; unknown names are silently dropped.
    pub selected_products: Vec<String>,
    /// Legacy token list for the keyword-search path; populated by the
    /// heuristic fallback.
    pub keywords: Vec<String>,
    pub user_want: Option<String>,
    pub response_text: String,
    pub product_comment: Option<String>,
    pub not_found_item: Option<String>,
    pub message_for_seller: Option<String>,
}

impl IntentResult {
    /// A bare reply with nothing but text, used for canned responses.
    pub fn text_only(intent: Intent, response_text: impl Into<String>) -> Self {
        Self {
            intent,
            selected_products: Vec::new(),
            keywords: Vec::new(),
            user_want: None,
            response_text: response_text.into(),
            product_comment: None,
            not_found_item: None,
            message_for_seller: None,
        }
    }

    pub fn satisfies_invariant(&self) -> bool {
        !self.response_text.is_empty()
            || (self.intent == Intent::ReplyToSeller
                && self.message_for_seller.as_deref().is_some_and(|m| !m.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::{Intent, RawIntentResult};

    fn raw(json: &str) -> RawIntentResult {
        serde_json::from_str(json).expect("raw result should deserialize")
    }

    #[test]
    fn known_intent_with_response_is_valid() {
        let result = raw(r#"{"intent":"greeting","responseText":"Halo!"}"#);
        assert_eq!(result.validate(), Some(Intent::Greeting));
    }

    #[test]
    fn unknown_intent_is_invalid() {
        let result = raw(r#"{"intent":"purchase","responseText":"ok"}"#);
        assert_eq!(result.validate(), None);
    }

    #[test]
    fn missing_response_is_invalid_for_normal_intents() {
        let result = raw(r#"{"intent":"search","selectedProducts":["Nasi Rendang"]}"#);
        assert_eq!(result.validate(), None);
    }

    #[test]
    fn seller_reply_without_response_text_is_valid_when_message_present() {
        let result = raw(r#"{"intent":"reply_to_seller","messageForSeller":"Mau pedas, bang"}"#);
        assert_eq!(result.validate(), Some(Intent::ReplyToSeller));
    }

    #[test]
    fn seller_reply_with_blank_message_and_no_response_is_invalid() {
        let result = raw(r#"{"intent":"reply_to_seller","messageForSeller":"  "}"#);
        assert_eq!(result.validate(), None);
    }

    #[test]
    fn legacy_response_key_is_accepted() {
        let result = raw(r#"{"intent":"chat","response":"Sure thing"}"#);
        assert_eq!(result.validate(), Some(Intent::Chat));
        let normalized = result.normalize(Intent::Chat);
        assert_eq!(normalized.response_text, "Sure thing");
    }

    #[test]
    fn normalization_fills_missing_collections_and_drops_blank_options() {
        let result = raw(r#"{"intent":"search","responseText":"Here you go","userWant":" "}"#);
        let intent = result.validate().expect("valid");
        let normalized = result.normalize(intent);
        assert!(normalized.selected_products.is_empty());
        assert!(normalized.keywords.is_empty());
        assert_eq!(normalized.user_want, None);
        assert!(normalized.satisfies_invariant());
    }
}
