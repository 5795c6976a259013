//! Seller-reply routing: buffers incoming seller messages per order,
//! summarizes each batch to the buyer after a debounce window, tracks the
//! active seller context, and relays buyer replies back through the message
//! store with a paraphrase pass.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use lapak_core::config::RelayConfig;
use lapak_core::domain::message::Sender;
use lapak_core::domain::order::{OrderId, OrderStatus};
use lapak_core::errors::ApplicationError;
use lapak_core::locale::Locale;

use lapak_store::MessageRepository;

use crate::gateway::{ProviderGateway, ProviderRoute};
use crate::llm::{ChatMessage, ChatRequest};
use crate::prompt::PromptBuilder;

/// Transient state marking that the buyer is mid-conversation with one
/// seller about one order. At most one instance is live per session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveSellerContext {
    pub order_id: OrderId,
    pub seller_name: String,
    pub product_name: String,
    pub last_message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayState {
    NoActiveContext,
    AwaitingSummaryDispatch,
    ActiveContext,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayEvent {
    SellerMessageBuffered,
    SummaryDispatched,
    ReplyRelayed,
    BuyerDeclined,
    OrderClosed,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RelayTransitionError {
    #[error("invalid relay transition from {state:?} on {event:?}")]
    InvalidTransition { state: RelayState, event: RelayEvent },
}

pub fn transition(state: RelayState, event: RelayEvent) -> Result<RelayState, RelayTransitionError> {
    use RelayEvent::{BuyerDeclined, OrderClosed, ReplyRelayed, SellerMessageBuffered, SummaryDispatched};
    use RelayState::{ActiveContext, AwaitingSummaryDispatch, NoActiveContext};

    let next = match (state, event) {
        // A fresh batch starts buffering; an active context stays readable
        // until the new summary replaces it.
        (NoActiveContext | AwaitingSummaryDispatch | ActiveContext, SellerMessageBuffered) => {
            AwaitingSummaryDispatch
        }
        (AwaitingSummaryDispatch, SummaryDispatched) => ActiveContext,
        (ActiveContext, ReplyRelayed | BuyerDeclined) => NoActiveContext,
        (_, OrderClosed) => NoActiveContext,
        (state, event) => return Err(RelayTransitionError::InvalidTransition { state, event }),
    };
    Ok(next)
}

/// One buyer-facing notification produced by a summarization pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuyerNotice {
    pub order_id: OrderId,
    pub text: String,
}

struct PendingBatch {
    seller_name: String,
    product_name: String,
    messages: Vec<String>,
    first_buffered_at: Instant,
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

struct RouterInner {
    state: RelayState,
    context: Option<ActiveSellerContext>,
    buffers: HashMap<String, PendingBatch>,
    locale: Locale,
    generation: u64,
}

struct RouterShared {
    inner: Mutex<RouterInner>,
    gateway: Arc<ProviderGateway>,
    messages: Arc<dyn MessageRepository>,
    relay: RelayConfig,
    notices: mpsc::UnboundedSender<BuyerNotice>,
}

#[derive(Clone)]
pub struct SellerReplyRouter {
    shared: Arc<RouterShared>,
}

impl SellerReplyRouter {
    pub fn new(
        gateway: Arc<ProviderGateway>,
        messages: Arc<dyn MessageRepository>,
        relay: RelayConfig,
        locale: Locale,
    ) -> (Self, mpsc::UnboundedReceiver<BuyerNotice>) {
        let (notices, notice_receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(RouterShared {
            inner: Mutex::new(RouterInner {
                state: RelayState::NoActiveContext,
                context: None,
                buffers: HashMap::new(),
                locale,
                generation: 0,
            }),
            gateway,
            messages,
            relay,
            notices,
        });
        (Self { shared }, notice_receiver)
    }

    pub fn state(&self) -> RelayState {
        self.shared.inner.lock().expect("router lock").state
    }

    pub fn active_context(&self) -> Option<ActiveSellerContext> {
        self.shared.inner.lock().expect("router lock").context.clone()
    }

    pub fn set_locale(&self, locale: Locale) {
        self.shared.inner.lock().expect("router lock").locale = locale;
    }

    /// Buffer an incoming seller message and (re)start the debounce timer.
    /// The timer is cancel-and-restart, never stacked; the batch force-
    /// flushes at the configured delay and size bounds.
    pub async fn handle_seller_message(
        &self,
        order_id: &OrderId,
        seller_name: &str,
        product_name: &str,
        text: &str,
    ) {
        let flush_now = {
            let mut inner = self.shared.inner.lock().expect("router lock");
            if let Ok(next) = transition(inner.state, RelayEvent::SellerMessageBuffered) {
                inner.state = next;
            }

            inner.generation += 1;
            let generation = inner.generation;
            let relay = &self.shared.relay;
            let batch =
                inner.buffers.entry(order_id.0.clone()).or_insert_with(|| PendingBatch {
                    seller_name: seller_name.to_string(),
                    product_name: product_name.to_string(),
                    messages: Vec::new(),
                    first_buffered_at: Instant::now(),
                    timer: None,
                    generation,
                });
            batch.messages.push(text.to_string());
            batch.generation = generation;
            if let Some(timer) = batch.timer.take() {
                timer.abort();
            }

            let elapsed = batch.first_buffered_at.elapsed();
            let max_delay = Duration::from_secs(relay.max_batch_delay_secs);
            let remaining = max_delay.saturating_sub(elapsed);
            let delay = Duration::from_secs(relay.debounce_secs).min(remaining);

            if batch.messages.len() >= relay.buffer_cap || remaining.is_zero() {
                true
            } else {
                let shared = Arc::clone(&self.shared);
                let order_key = order_id.0.clone();
                batch.timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    flush_batch(&shared, &order_key, Some(generation)).await;
                }));
                false
            }
        };

        if flush_now {
            flush_batch(&self.shared, &order_id.0, None).await;
        }
    }

    /// Relay a buyer reply to the active seller. Unless the text is already
    /// polished (a resolver-produced seller message), it passes through the
    /// paraphrase step first; paraphrase failure falls back to the raw text.
    /// Persistence failure keeps the context open.
    pub async fn relay_reply(
        &self,
        raw_text: &str,
        already_polished: bool,
    ) -> Result<ActiveSellerContext, ApplicationError> {
        let (context, locale) = {
            let inner = self.shared.inner.lock().expect("router lock");
            let context = inner.context.clone().ok_or_else(|| {
                ApplicationError::Domain(lapak_core::errors::DomainError::InvariantViolation(
                    "no active seller context to reply to".to_string(),
                ))
            })?;
            (context, inner.locale)
        };

        let final_text = if already_polished {
            raw_text.to_string()
        } else {
            paraphrase(&self.shared, raw_text, &context, locale).await
        };

        self.shared
            .messages
            .append(&context.order_id, Sender::Buyer, &final_text)
            .await
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;

        {
            let mut inner = self.shared.inner.lock().expect("router lock");
            if let Ok(next) = transition(inner.state, RelayEvent::ReplyRelayed) {
                inner.state = next;
            }
            inner.context = None;
        }
        info!(
            event_name = "router.reply_relayed",
            order_id = %context.order_id.0,
            seller = %context.seller_name,
            "buyer reply relayed to seller"
        );
        Ok(context)
    }

    /// The buyer explicitly declined to answer; drop the context.
    pub fn decline(&self) {
        let mut inner = self.shared.inner.lock().expect("router lock");
        if inner.context.is_some() {
            if let Ok(next) = transition(inner.state, RelayEvent::BuyerDeclined) {
                inner.state = next;
            }
            inner.context = None;
        }
    }

    /// Terminal order statuses tear down the order's buffer and, when it is
    /// the active conversation, the context.
    pub fn on_order_status(&self, order_id: &OrderId, status: OrderStatus) {
        if !status.is_terminal() {
            return;
        }
        let mut inner = self.shared.inner.lock().expect("router lock");
        if let Some(batch) = inner.buffers.remove(&order_id.0) {
            if let Some(timer) = batch.timer {
                timer.abort();
            }
        }
        if inner.context.as_ref().is_some_and(|context| &context.order_id == order_id) {
            if let Ok(next) = transition(inner.state, RelayEvent::OrderClosed) {
                inner.state = next;
            }
            inner.context = None;
        } else if inner.buffers.is_empty() && inner.context.is_none() {
            inner.state = RelayState::NoActiveContext;
        }
    }
}

/// Summarize and dispatch one order's buffered batch. `expected_generation`
/// is set by timer-driven flushes so an aborted-but-already-running timer
/// cannot flush a batch that has since been extended.
async fn flush_batch(shared: &Arc<RouterShared>, order_key: &str, expected_generation: Option<u64>) {
    let (batch, locale) = {
        let mut inner = shared.inner.lock().expect("router lock");
        let current = match inner.buffers.get(order_key) {
            Some(batch) => batch,
            None => return,
        };
        if expected_generation.is_some_and(|generation| generation != current.generation) {
            return;
        }
        let batch = inner.buffers.remove(order_key).expect("batch present");
        (batch, inner.locale)
    };

    if batch.messages.is_empty() {
        return;
    }

    let order_id = OrderId(order_key.to_string());
    let text = if batch.messages.len() == 1 {
        locale.seller_message_notice(&batch.seller_name, &batch.messages[0])
    } else {
        summarize_batch(shared, &batch, locale).await
    };

    {
        let mut inner = shared.inner.lock().expect("router lock");
        if let Ok(next) = transition(inner.state, RelayEvent::SummaryDispatched) {
            inner.state = next;
        }
        inner.context = Some(ActiveSellerContext {
            order_id: order_id.clone(),
            seller_name: batch.seller_name.clone(),
            product_name: batch.product_name.clone(),
            last_message: batch.messages.last().cloned().unwrap_or_default(),
            timestamp: Utc::now(),
        });
    }

    info!(
        event_name = "router.summary_dispatched",
        order_id = %order_id.0,
        seller = %batch.seller_name,
        batched = batch.messages.len(),
        "seller batch summarized to buyer"
    );
    let _ = shared.notices.send(BuyerNotice { order_id, text });
}

async fn summarize_batch(shared: &Arc<RouterShared>, batch: &PendingBatch, locale: Locale) -> String {
    let prompts = PromptBuilder::new(locale, 0);
    let request = ChatRequest {
        messages: vec![ChatMessage::user(
            prompts.batch_summary_prompt(&batch.seller_name, &batch.messages),
        )],
        temperature: 0.3,
        max_tokens: 128,
        response_format_hint: None,
    };

    match shared.gateway.send(&request, ProviderRoute::PrimaryThenSecondary).await {
        Ok(summary) if !summary.trim().is_empty() => {
            locale.seller_message_notice(&batch.seller_name, summary.trim())
        }
        Ok(_) | Err(_) => {
            warn!(
                event_name = "router.summary_degraded",
                seller = %batch.seller_name,
                batched = batch.messages.len(),
                "batch summary unavailable, sending count-based notice"
            );
            locale.seller_sent_many_notice(&batch.seller_name, batch.messages.len())
        }
    }
}

async fn paraphrase(
    shared: &Arc<RouterShared>,
    raw_text: &str,
    context: &ActiveSellerContext,
    locale: Locale,
) -> String {
    let prompts = PromptBuilder::new(locale, 0);
    let request = ChatRequest {
        messages: vec![
            ChatMessage::system(prompts.paraphrase_prompt(&context.seller_name)),
            ChatMessage::user(raw_text.to_string()),
        ],
        temperature: 0.3,
        max_tokens: 128,
        response_format_hint: None,
    };

    match shared.gateway.send(&request, ProviderRoute::PrimaryThenSecondary).await {
        Ok(polished) if !polished.trim().is_empty() => polished.trim().to_string(),
        Ok(_) | Err(_) => {
            // The send must still happen; fall back to the buyer's own words.
            warn!(
                event_name = "router.paraphrase_degraded",
                seller = %context.seller_name,
                "paraphrase unavailable, relaying raw text"
            );
            raw_text.to_string()
        }
    }
}
