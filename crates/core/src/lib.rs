//! Core domain for the Lapak storefront assistant: catalog and order
//! records, the intent-result model with its validity invariant, bounded
//! conversation memory, the deterministic heuristic fallback, keyword
//! search, bilingual canned strings, configuration, and the error taxonomy.
//!
//! Everything here is synchronous and side-effect free; provider calls,
//! persistence, and session orchestration live in `lapak-agent` and
//! `lapak-store`.

pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod fallback;
pub mod intent;
pub mod locale;
pub mod memory;
pub mod search;

pub use catalog::sample_products;
pub use domain::feedback::Feedback;
pub use domain::message::{ChatMessage, Sender};
pub use domain::order::{Order, OrderId, OrderStatus};
pub use domain::product::{Product, ProductId, SellerId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use fallback::fallback;
pub use intent::{Intent, IntentResult, RawIntentResult};
pub use locale::Locale;
pub use memory::{ConversationMemory, ConversationRole, ConversationTurn, ShopperMemory};
pub use search::search_products;
