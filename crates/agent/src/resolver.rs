//! Intent resolution: build the prompt, call the gateway, parse and
//! validate, retry once on the secondary only, and bottom out in the
//! deterministic fallback. Never fails; every input produces a result
//! satisfying the intent invariant.

use std::sync::Arc;

use tracing::{debug, warn};

use lapak_core::domain::product::Product;
use lapak_core::fallback::fallback;
use lapak_core::intent::{IntentResult, RawIntentResult};
use lapak_core::locale::Locale;
use lapak_core::memory::{ConversationMemory, ConversationRole, ShopperMemory};

use crate::gateway::{ProviderGateway, ProviderRoute};
use crate::llm::{ChatMessage, ChatRequest, ResponseFormatHint};
use crate::parse::extract_json;
use crate::prompt::PromptBuilder;
use crate::router::ActiveSellerContext;

#[derive(Clone, Copy, Debug)]
pub struct ResolverTuning {
    pub temperature: f32,
    pub max_tokens: u32,
    pub catalog_prompt_limit: usize,
}

impl Default for ResolverTuning {
    fn default() -> Self {
        Self { temperature: 0.3, max_tokens: 512, catalog_prompt_limit: 50 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionSource {
    Provider,
    Fallback,
}

#[derive(Clone, Debug)]
pub struct Resolution {
    pub result: IntentResult,
    pub source: ResolutionSource,
}

pub struct IntentResolver {
    gateway: Arc<ProviderGateway>,
    tuning: ResolverTuning,
}

impl IntentResolver {
    pub fn new(gateway: Arc<ProviderGateway>, tuning: ResolverTuning) -> Self {
        Self { gateway, tuning }
    }

    pub async fn resolve(
        &self,
        user_text: &str,
        locale: Locale,
        catalog: &[Product],
        history: &ConversationMemory,
        shopper_memory: Option<&ShopperMemory>,
        seller_context: Option<&ActiveSellerContext>,
    ) -> Resolution {
        let prompts = PromptBuilder::new(locale, self.tuning.catalog_prompt_limit);
        let system = prompts.system_prompt(catalog, shopper_memory, seller_context);

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system));
        for turn in history.turns() {
            messages.push(match turn.role {
                ConversationRole::User => ChatMessage::user(turn.text.clone()),
                ConversationRole::Assistant => ChatMessage::assistant(turn.text.clone()),
            });
        }
        messages.push(ChatMessage::user(user_text.to_string()));

        let request = ChatRequest {
            messages,
            temperature: self.tuning.temperature,
            max_tokens: self.tuning.max_tokens,
            response_format_hint: Some(ResponseFormatHint::JsonObject),
        };

        if let Some(result) = self.attempt(&request, ProviderRoute::PrimaryThenSecondary).await {
            return Resolution { result, source: ResolutionSource::Provider };
        }

        // One retry, forced onto the secondary provider only.
        if let Some(result) = self.attempt(&request, ProviderRoute::SecondaryOnly).await {
            return Resolution { result, source: ResolutionSource::Provider };
        }

        warn!(
            event_name = "resolver.fallback_engaged",
            locale = locale.code(),
            "providers unusable, using heuristic fallback"
        );
        Resolution { result: fallback(user_text, locale), source: ResolutionSource::Fallback }
    }

    /// One gateway round: send, parse, validate. `None` covers transport
    /// failure, unparseable replies, and invariant violations alike.
    async fn attempt(&self, request: &ChatRequest, route: ProviderRoute) -> Option<IntentResult> {
        let reply = match self.gateway.send(request, route).await {
            Ok(reply) => reply,
            Err(error) => {
                debug!(
                    event_name = "resolver.gateway_failed",
                    route = ?route,
                    error = %error,
                    "gateway round failed"
                );
                return None;
            }
        };

        let value = extract_json(&reply)?;
        let raw: RawIntentResult = serde_json::from_value(value).ok()?;
        let intent = match raw.validate() {
            Some(intent) => intent,
            None => {
                debug!(
                    event_name = "resolver.invalid_result",
                    route = ?route,
                    "provider reply failed the result invariant"
                );
                return None;
            }
        };
        Some(raw.normalize(intent))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lapak_core::catalog::sample_products;
    use lapak_core::fallback::fallback;
    use lapak_core::intent::Intent;
    use lapak_core::locale::Locale;
    use lapak_core::memory::ConversationMemory;

    use super::{IntentResolver, ResolutionSource, ResolverTuning};
    use crate::gateway::ProviderGateway;
    use crate::llm::LlmError;
    use crate::testing::ScriptedProvider;

    fn resolver(primary: ScriptedProvider, secondary: ScriptedProvider) -> IntentResolver {
        let gateway =
            Arc::new(ProviderGateway::new(Arc::new(primary), Arc::new(secondary)));
        IntentResolver::new(gateway, ResolverTuning::default())
    }

    async fn resolve(resolver: &IntentResolver, text: &str) -> super::Resolution {
        let catalog = sample_products();
        let history = ConversationMemory::default();
        resolver.resolve(text, Locale::English, &catalog, &history, None, None).await
    }

    #[tokio::test]
    async fn well_formed_primary_reply_resolves_to_a_provider_result() {
        let resolver = resolver(
            ScriptedProvider::named("primary").reply(
                r#"{"intent":"search","selectedProducts":["Nasi Rendang"],"responseText":"Cocok buat kamu!"}"#,
            ),
            ScriptedProvider::named("secondary").reply("unused"),
        );

        let resolution = resolve(&resolver, "I want nasi padang").await;
        assert_eq!(resolution.source, ResolutionSource::Provider);
        assert_eq!(resolution.result.intent, Intent::Search);
        assert_eq!(resolution.result.selected_products, vec!["Nasi Rendang".to_string()]);
    }

    #[tokio::test]
    async fn prose_wrapped_reply_still_parses() {
        let resolver = resolver(
            ScriptedProvider::named("primary").reply(
                "Sure! Here is the classification:\n```json\n{\"intent\":\"greeting\",\"responseText\":\"Halo!\"}\n```",
            ),
            ScriptedProvider::named("secondary").reply("unused"),
        );

        let resolution = resolve(&resolver, "halo").await;
        assert_eq!(resolution.source, ResolutionSource::Provider);
        assert_eq!(resolution.result.intent, Intent::Greeting);
    }

    #[tokio::test]
    async fn invalid_shape_retries_once_on_the_secondary_only() {
        let primary = ScriptedProvider::named("primary").reply("this is not json at all");
        let secondary = ScriptedProvider::named("secondary")
            .reply(r#"{"intent":"chat","responseText":"Saya di sini!"}"#);

        let gateway = Arc::new(ProviderGateway::new(Arc::new(primary), Arc::new(secondary)));
        let resolver = IntentResolver::new(gateway, ResolverTuning::default());

        let resolution = resolve(&resolver, "kamu siapa?").await;
        assert_eq!(resolution.source, ResolutionSource::Provider);
        assert_eq!(resolution.result.intent, Intent::Chat);
        assert_eq!(resolution.result.response_text, "Saya di sini!");
    }

    #[tokio::test]
    async fn both_providers_down_yields_exactly_the_heuristic_result() {
        let down = LlmError::Status { status: 500, body: "unavailable".to_string() };
        let resolver = resolver(
            ScriptedProvider::named("primary").fail(down.clone()),
            ScriptedProvider::named("secondary").fail(down),
        );

        let resolution = resolve(&resolver, "kopi murah").await;
        assert_eq!(resolution.source, ResolutionSource::Fallback);
        assert_eq!(resolution.result, fallback("kopi murah", Locale::English));
        for expected in ["coffee", "kopi", "cheap", "murah"] {
            assert!(resolution.result.keywords.iter().any(|k| k == expected));
        }
    }

    #[tokio::test]
    async fn resolve_never_fails_even_on_empty_input() {
        let resolver = resolver(
            ScriptedProvider::named("primary").fail(LlmError::EmptyContent),
            ScriptedProvider::named("secondary").fail(LlmError::EmptyContent),
        );

        let resolution = resolve(&resolver, "").await;
        assert!(resolution.result.satisfies_invariant());
    }

    #[tokio::test]
    async fn history_and_user_text_are_sent_in_order() {
        let primary = Arc::new(ScriptedProvider::named("primary").reply(
            r#"{"intent":"followup","responseText":"Yang tadi maksudnya Nasi Rendang."}"#,
        ));
        let secondary = Arc::new(ScriptedProvider::named("secondary").reply("unused"));
        let gateway = Arc::new(ProviderGateway::new(primary.clone(), secondary));
        let resolver = IntentResolver::new(gateway, ResolverTuning::default());

        let mut history = ConversationMemory::default();
        history.record_exchange("I want nasi padang", "How about Nasi Rendang?");

        let catalog = sample_products();
        let resolution = resolver
            .resolve("the first one", Locale::English, &catalog, &history, None, None)
            .await;
        assert_eq!(resolution.result.intent, Intent::Followup);

        let request = primary.last_request().expect("request captured");
        // system + 2 history turns + current text
        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[3].content, "the first one");
        assert_eq!(request.messages[1].content, "I want nasi padang");
    }

    #[tokio::test]
    async fn schema_invalid_reply_falls_back_after_the_retry() {
        // Valid JSON, but the invariant fails twice (missing responseText).
        let resolver = resolver(
            ScriptedProvider::named("primary").reply(r#"{"intent":"search"}"#),
            ScriptedProvider::named("secondary").reply(r#"{"intent":"bogus","responseText":"x"}"#),
        );

        let resolution = resolve(&resolver, "sate ayam").await;
        assert_eq!(resolution.source, ResolutionSource::Fallback);
        assert!(resolution.result.keywords.iter().any(|k| k == "sate"));
    }
}
