//! The session controller: one object owning all per-buyer session state
//! (catalog snapshot, conversation memory, locale, active seller context via
//! the router), gating overlapping submissions and stamping resolutions so
//! stale completions are discarded instead of racing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use lapak_core::catalog::sample_products;
use lapak_core::config::AppConfig;
use lapak_core::domain::feedback::Feedback;
use lapak_core::domain::message::Sender;
use lapak_core::domain::new_buyer_session_id;
use lapak_core::domain::order::{Order, OrderId, OrderStatus};
use lapak_core::domain::product::{Product, ProductId};
use lapak_core::intent::{Intent, IntentResult};
use lapak_core::locale::Locale;
use lapak_core::memory::{ConversationMemory, ShopperMemory};
use lapak_core::search::search_products;

use lapak_store::{
    CatalogRepository, FeedbackRepository, MessageRepository, OrderRepository,
    ShopperMemoryRepository,
};

use crate::classify::{ReplyDecision, RuleBasedClassifier, SellerReplyClassifier};
use crate::gateway::ProviderGateway;
use crate::resolver::{IntentResolver, Resolution, ResolutionSource, ResolverTuning};
use crate::router::{BuyerNotice, SellerReplyRouter};

pub struct SessionStores {
    pub catalog: Arc<dyn CatalogRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub shopper_memory: Arc<dyn ShopperMemoryRepository>,
    pub feedback: Arc<dyn FeedbackRepository>,
}

/// What the UI renders for one handled buyer message.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionReply {
    /// A resolution is already in flight; the submission was rejected.
    Busy,
    /// Nothing to do (blank input or a stale completion).
    Ignored,
    Text(String),
    Products { response_text: String, items: Vec<Product>, comment: Option<String> },
    RelaySent { seller_name: String, notice: String },
    Failure(String),
}

/// Display cap on product results; the resolver itself never truncates.
const MAX_DISPLAYED_PRODUCTS: usize = 5;

pub struct SessionController {
    stores: SessionStores,
    resolver: IntentResolver,
    router: SellerReplyRouter,
    classifier: Arc<dyn SellerReplyClassifier>,
    buyer_session: String,
    locale: Mutex<Locale>,
    memory: Mutex<ConversationMemory>,
    products: Mutex<Vec<Product>>,
    processing: AtomicBool,
    sequence: AtomicU64,
}

impl SessionController {
    pub fn new(
        config: &AppConfig,
        gateway: Arc<ProviderGateway>,
        stores: SessionStores,
    ) -> (Self, mpsc::UnboundedReceiver<BuyerNotice>) {
        let tuning = ResolverTuning {
            temperature: config.chat.temperature,
            max_tokens: config.chat.max_tokens,
            catalog_prompt_limit: config.chat.catalog_prompt_limit,
        };
        let resolver = IntentResolver::new(Arc::clone(&gateway), tuning);
        let (router, notices) = SellerReplyRouter::new(
            gateway,
            Arc::clone(&stores.messages),
            config.relay.clone(),
            config.chat.locale,
        );

        let controller = Self {
            stores,
            resolver,
            router,
            classifier: Arc::new(RuleBasedClassifier::new()),
            buyer_session: new_buyer_session_id(),
            locale: Mutex::new(config.chat.locale),
            memory: Mutex::new(ConversationMemory::new(config.chat.history_cap)),
            products: Mutex::new(Vec::new()),
            processing: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
        };
        (controller, notices)
    }

    pub fn buyer_session(&self) -> &str {
        &self.buyer_session
    }

    pub fn locale(&self) -> Locale {
        *self.locale.lock().expect("locale lock")
    }

    /// Switching display language is a fresh session boundary: the
    /// conversation memory is cleared.
    pub fn set_locale(&self, locale: Locale) {
        *self.locale.lock().expect("locale lock") = locale;
        self.memory.lock().expect("memory lock").clear();
        self.router.set_locale(locale);
    }

    /// Load the catalog from the store, falling back to the built-in sample
    /// list when the store is empty or unreachable.
    pub async fn refresh_catalog(&self) -> usize {
        let products = match self.stores.catalog.list_products().await {
            Ok(products) if !products.is_empty() => products,
            Ok(_) => sample_products(),
            Err(error) => {
                warn!(
                    event_name = "session.catalog_fallback",
                    error = %error,
                    "catalog unavailable, using sample products"
                );
                sample_products()
            }
        };
        let count = products.len();
        *self.products.lock().expect("products lock") = products;
        count
    }

    pub fn catalog_snapshot(&self) -> Vec<Product> {
        self.products.lock().expect("products lock").clone()
    }

    /// Handle one buyer message end to end. Never fails; every outcome is a
    /// renderable reply. Overlapping submissions are rejected, not queued.
    pub async fn handle_message(&self, text: &str) -> SessionReply {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return SessionReply::Ignored;
        }

        if self
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return SessionReply::Busy;
        }

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let reply = self.process(trimmed, sequence).await;
        self.processing.store(false, Ordering::SeqCst);
        reply
    }

    async fn process(&self, text: &str, sequence: u64) -> SessionReply {
        let locale = self.locale();

        // While a seller conversation is open, explicit commands win before
        // any provider call.
        let seller_context = self.router.active_context();
        if let Some(context) = &seller_context {
            match self.classifier.classify(text, context).await {
                ReplyDecision::Relay { message } => {
                    return self.relay(&message, false, locale).await;
                }
                ReplyDecision::Decline => {
                    self.router.decline();
                    return SessionReply::Text(locale.reply_declined_notice().to_string());
                }
                ReplyDecision::Pass => {}
            }
        }

        let catalog = self.catalog_snapshot();
        let history = self.memory.lock().expect("memory lock").clone();
        let shopper_memory =
            self.stores.shopper_memory.load(&self.buyer_session).await.ok().flatten();

        let resolution = self
            .resolver
            .resolve(
                text,
                locale,
                &catalog,
                &history,
                shopper_memory.as_ref(),
                seller_context.as_ref(),
            )
            .await;

        // A later submission supersedes this one; do not commit its effects.
        if self.sequence.load(Ordering::SeqCst) != sequence {
            info!(
                event_name = "session.stale_resolution_discarded",
                sequence,
                "discarding completion of a superseded resolution"
            );
            return SessionReply::Ignored;
        }

        self.commit_memory(text, &resolution).await;

        let result = resolution.result;
        match result.intent {
            Intent::ReplyToSeller => match (&result.message_for_seller, &seller_context) {
                (Some(message), Some(_)) => self.relay(message, true, locale).await,
                _ => {
                    // No live seller conversation (or no message); fall back
                    // to plain text so the buyer still gets an answer.
                    let text = if result.response_text.is_empty() {
                        locale.generic_failure_reply().to_string()
                    } else {
                        result.response_text
                    };
                    SessionReply::Text(text)
                }
            },
            Intent::Search | Intent::NotFound | Intent::Followup => {
                self.catalog_reply(result, text, &catalog, locale)
            }
            Intent::Greeting | Intent::Help | Intent::Chat => {
                SessionReply::Text(result.response_text)
            }
        }
    }

    /// Append the exchange and persist shopper memory on the provider path;
    /// clear the memory when the provider chain broke and the fallback
    /// answered (the turn is not recorded).
    async fn commit_memory(&self, user_text: &str, resolution: &Resolution) {
        match resolution.source {
            ResolutionSource::Provider => {
                let assistant_text = if resolution.result.response_text.is_empty() {
                    resolution.result.message_for_seller.clone().unwrap_or_default()
                } else {
                    resolution.result.response_text.clone()
                };
                self.memory
                    .lock()
                    .expect("memory lock")
                    .record_exchange(user_text, &assistant_text);

                let record = ShopperMemory {
                    user_want: resolution.result.user_want.clone(),
                    intent: resolution.result.intent.as_str().to_string(),
                    summary: ShopperMemory::summarize(user_text),
                    at: Utc::now(),
                };
                if let Err(error) =
                    self.stores.shopper_memory.save(&self.buyer_session, record).await
                {
                    warn!(
                        event_name = "session.shopper_memory_write_failed",
                        error = %error,
                        "shopper memory not persisted"
                    );
                }
            }
            ResolutionSource::Fallback => {
                self.memory.lock().expect("memory lock").clear();
            }
        }
    }

    fn catalog_reply(
        &self,
        result: IntentResult,
        user_text: &str,
        catalog: &[Product],
        locale: Locale,
    ) -> SessionReply {
        let mut items: Vec<Product> = result
            .selected_products
            .iter()
            .filter_map(|name| catalog.iter().find(|product| product.name_matches(name)).cloned())
            .collect();

        // The legacy keyword path: fallback results (and legacy-shaped
        // provider replies) carry tokens instead of exact names.
        if items.is_empty() && result.selected_products.is_empty() {
            let query = if result.keywords.is_empty() {
                user_text.to_string()
            } else {
                result.keywords.join(" ")
            };
            items = search_products(catalog, &query);
        }

        items.truncate(MAX_DISPLAYED_PRODUCTS);

        if items.is_empty() && result.intent != Intent::NotFound {
            let text = if result.response_text.is_empty() {
                locale.nothing_found_reply().to_string()
            } else {
                result.response_text
            };
            return SessionReply::Text(text);
        }

        SessionReply::Products {
            response_text: result.response_text,
            items,
            comment: result.product_comment,
        }
    }

    async fn relay(&self, message: &str, already_polished: bool, locale: Locale) -> SessionReply {
        match self.router.relay_reply(message, already_polished).await {
            Ok(context) => SessionReply::RelaySent {
                notice: locale.reply_sent_notice(&context.seller_name),
                seller_name: context.seller_name,
            },
            Err(error) => {
                warn!(
                    event_name = "session.relay_failed",
                    error = %error,
                    "buyer reply could not be delivered"
                );
                SessionReply::Failure(locale.send_failure_reply().to_string())
            }
        }
    }

    /// Place an order for a catalog item; the seller sees it through the
    /// shared store. Persistence failure is surfaced, never retried.
    pub async fn select_product(&self, product_id: &ProductId) -> SessionReply {
        let locale = self.locale();
        let product = self
            .catalog_snapshot()
            .into_iter()
            .find(|product| &product.id == product_id && product.available);
        let Some(product) = product else {
            return SessionReply::Failure(locale.order_failure_reply().to_string());
        };

        let order = Order {
            id: OrderId(String::new()),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            seller: product.seller.clone(),
            price: product.price,
            category: product.category.clone(),
            status: OrderStatus::Pending,
            buyer_session: self.buyer_session.clone(),
            created_at: Utc::now(),
        };

        match self.stores.orders.add(order).await {
            Ok(order_id) => {
                info!(
                    event_name = "session.order_placed",
                    order_id = %order_id.0,
                    product = %product.name,
                    "order saved for seller"
                );
                self.watch_order_thread(order_id, product.seller.clone(), product.name.clone())
                    .await;
                SessionReply::Text(locale.order_placed_notice(
                    &product.name,
                    &product.seller,
                    product.price,
                ))
            }
            Err(error) => {
                warn!(
                    event_name = "session.order_write_failed",
                    error = %error,
                    "order could not be placed"
                );
                SessionReply::Failure(locale.order_failure_reply().to_string())
            }
        }
    }

    pub async fn submit_feedback(&self, text: &str) -> SessionReply {
        let locale = self.locale();
        let feedback = Feedback {
            buyer_session: self.buyer_session.clone(),
            text: text.trim().to_string(),
            at: Utc::now(),
        };
        match self.stores.feedback.add(feedback).await {
            Ok(()) => SessionReply::Text("🙏".to_string()),
            Err(_) => SessionReply::Failure(locale.send_failure_reply().to_string()),
        }
    }

    /// Attach the order's thread snapshot listener and feed new
    /// seller-sent messages into the router. The store keeps at most one
    /// live listener per order; re-subscribing replaces the previous one.
    async fn watch_order_thread(
        &self,
        order_id: OrderId,
        seller_name: String,
        product_name: String,
    ) {
        let mut snapshots = match self.stores.messages.subscribe(&order_id).await {
            Ok(snapshots) => snapshots,
            Err(error) => {
                warn!(
                    event_name = "session.thread_subscribe_failed",
                    order_id = %order_id.0,
                    error = %error,
                    "order thread cannot be watched"
                );
                return;
            }
        };

        let router = self.router.clone();
        tokio::spawn(async move {
            let mut seen = snapshots.borrow().len();
            while snapshots.changed().await.is_ok() {
                let fresh: Vec<String> = {
                    let thread = snapshots.borrow();
                    if thread.len() < seen {
                        // Thread was cleared (terminal order).
                        seen = thread.len();
                        continue;
                    }
                    let fresh = thread[seen..]
                        .iter()
                        .filter(|message| message.sender == Sender::Seller)
                        .map(|message| message.text.clone())
                        .collect();
                    seen = thread.len();
                    fresh
                };
                for text in fresh {
                    router
                        .handle_seller_message(&order_id, &seller_name, &product_name, &text)
                        .await;
                }
            }
        });
    }

    /// Incoming seller chat for one of this buyer's orders.
    pub async fn on_seller_message(
        &self,
        order_id: &OrderId,
        seller_name: &str,
        product_name: &str,
        text: &str,
    ) {
        self.router.handle_seller_message(order_id, seller_name, product_name, text).await;
    }

    /// Order status changes arrive from the store's snapshot listeners.
    pub fn on_order_status(&self, order_id: &OrderId, status: OrderStatus) {
        self.router.on_order_status(order_id, status);
    }

    pub fn active_seller_context(&self) -> Option<crate::router::ActiveSellerContext> {
        self.router.active_context()
    }

    pub fn memory_len(&self) -> usize {
        self.memory.lock().expect("memory lock").len()
    }
}
