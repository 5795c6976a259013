use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use lapak_core::domain::feedback::Feedback;
use lapak_core::domain::message::{ChatMessage, Sender};
use lapak_core::domain::order::{Order, OrderId, OrderStatus};
use lapak_core::domain::product::Product;
use lapak_core::memory::ShopperMemory;

use super::{
    CatalogRepository, FeedbackRepository, MessageRepository, OrderRepository, RepositoryError,
    ShopperMemoryRepository, ThreadSnapshots,
};

#[derive(Default)]
pub struct InMemoryCatalogRepository {
    products: RwLock<Vec<Product>>,
}

impl InMemoryCatalogRepository {
    pub fn with_products(products: Vec<Product>) -> Self {
        Self { products: RwLock::new(products) }
    }
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.clone())
    }

    async fn save_product(&self, product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        match products.iter_mut().find(|existing| existing.id == product.id) {
            Some(existing) => *existing = product,
            None => products.push(product),
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn add(&self, mut order: Order) -> Result<OrderId, RepositoryError> {
        if order.id.0.is_empty() {
            order.id = OrderId(format!("order-{}", Uuid::new_v4().simple()));
        }
        // Server-assigned timestamp.
        order.created_at = Utc::now();
        let id = order.id.clone();
        let mut orders = self.orders.write().await;
        orders.insert(id.0.clone(), order);
        Ok(id)
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id.0).cloned())
    }

    async fn list_for_session(&self, buyer_session: &str) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut matched: Vec<Order> =
            orders.values().filter(|order| order.buyer_session == buyer_session).cloned().collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&id.0)
            .ok_or_else(|| RepositoryError::WriteRejected(format!("unknown order {}", id.0)))?;
        order.status = status;
        Ok(())
    }
}

struct Thread {
    messages: Vec<ChatMessage>,
    publisher: watch::Sender<Vec<ChatMessage>>,
}

impl Thread {
    fn new() -> Self {
        let (publisher, _) = watch::channel(Vec::new());
        Self { messages: Vec::new(), publisher }
    }
}

#[derive(Default)]
pub struct InMemoryMessageRepository {
    threads: RwLock<HashMap<String, Thread>>,
}

#[async_trait::async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn append(
        &self,
        order_id: &OrderId,
        sender: Sender,
        text: &str,
    ) -> Result<(), RepositoryError> {
        if text.trim().is_empty() {
            return Err(RepositoryError::WriteRejected("empty message text".to_string()));
        }

        let mut threads = self.threads.write().await;
        let thread = threads.entry(order_id.0.clone()).or_insert_with(Thread::new);
        thread.messages.push(ChatMessage {
            text: text.to_string(),
            sender,
            sent_at: Utc::now(),
        });
        let _ = thread.publisher.send(thread.messages.clone());
        Ok(())
    }

    async fn thread(&self, order_id: &OrderId) -> Result<Vec<ChatMessage>, RepositoryError> {
        let threads = self.threads.read().await;
        Ok(threads.get(&order_id.0).map(|thread| thread.messages.clone()).unwrap_or_default())
    }

    async fn subscribe(&self, order_id: &OrderId) -> Result<ThreadSnapshots, RepositoryError> {
        let mut threads = self.threads.write().await;
        let thread = threads.entry(order_id.0.clone()).or_insert_with(Thread::new);
        // A fresh channel per subscription: the previous receiver observes a
        // closed sender and the replacement becomes the single live listener.
        let (publisher, receiver) = watch::channel(thread.messages.clone());
        thread.publisher = publisher;
        Ok(receiver)
    }

    async fn clear_thread(&self, order_id: &OrderId) -> Result<(), RepositoryError> {
        let mut threads = self.threads.write().await;
        if let Some(thread) = threads.get_mut(&order_id.0) {
            thread.messages.clear();
            let _ = thread.publisher.send(Vec::new());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryShopperMemoryRepository {
    records: RwLock<HashMap<String, ShopperMemory>>,
}

#[async_trait::async_trait]
impl ShopperMemoryRepository for InMemoryShopperMemoryRepository {
    async fn load(&self, buyer_session: &str) -> Result<Option<ShopperMemory>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.get(buyer_session).cloned())
    }

    async fn save(
        &self,
        buyer_session: &str,
        memory: ShopperMemory,
    ) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.insert(buyer_session.to_string(), memory);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryFeedbackRepository {
    entries: RwLock<Vec<Feedback>>,
}

impl InMemoryFeedbackRepository {
    pub async fn entries(&self) -> Vec<Feedback> {
        self.entries.read().await.clone()
    }
}

#[async_trait::async_trait]
impl FeedbackRepository for InMemoryFeedbackRepository {
    async fn add(&self, feedback: Feedback) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        entries.push(feedback);
        Ok(())
    }
}
