//! The Lapak conversation pipeline.
//!
//! A buyer message flows through the session controller, then the router
//! (explicit seller-reply commands), then the resolver (prompt, provider
//! gateway with primary-to-secondary failover, tolerant JSON parsing, one
//! secondary-only retry), bottoming out in the heuristic fallback. The typed
//! result is mapped onto catalog products, a plain reply, or a relay to the
//! seller through the message store.
//!
//! # Key types
//!
//! - [`session::SessionController`] - owns all per-session state and gates
//!   overlapping submissions
//! - [`resolver::IntentResolver`] - infallible intent resolution
//! - [`gateway::ProviderGateway`] - single-shot provider failover
//! - [`router::SellerReplyRouter`] - seller message debounce, summaries, and
//!   reply relay
//!
//! The LLM is strictly a classifier and copywriter. It never places orders,
//! invents catalog entries, or decides prices; those are deterministic
//! decisions made against the catalog and the document store.

pub mod classify;
pub mod gateway;
pub mod llm;
pub mod parse;
pub mod prompt;
pub mod provider;
pub mod resolver;
pub mod router;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::{ReplyDecision, RuleBasedClassifier, SellerReplyClassifier};
pub use gateway::{GatewayError, ProviderGateway, ProviderRoute};
pub use llm::{ChatMessage, ChatProvider, ChatRequest, ChatRole, LlmError, ResponseFormatHint};
pub use parse::extract_json;
pub use provider::HttpChatProvider;
pub use resolver::{IntentResolver, Resolution, ResolutionSource, ResolverTuning};
pub use router::{ActiveSellerContext, BuyerNotice, RelayState, SellerReplyRouter};
pub use session::{SessionController, SessionReply, SessionStores};
