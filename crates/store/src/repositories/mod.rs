use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

use lapak_core::domain::feedback::Feedback;
use lapak_core::domain::message::{ChatMessage, Sender};
use lapak_core::domain::order::{Order, OrderId, OrderStatus};
use lapak_core::domain::product::Product;
use lapak_core::memory::ShopperMemory;

pub mod memory;

pub use memory::{
    InMemoryCatalogRepository, InMemoryFeedbackRepository, InMemoryMessageRepository,
    InMemoryOrderRepository, InMemoryShopperMemoryRepository,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("store rejected the write: {0}")]
    WriteRejected(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Live view of one order's message thread. The receiver is re-delivered the
/// full thread on every mutation, mirroring a document-store snapshot
/// listener; dropping it detaches the subscription.
pub type ThreadSnapshots = watch::Receiver<Vec<ChatMessage>>;

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;
    async fn save_product(&self, product: Product) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn add(&self, order: Order) -> Result<OrderId, RepositoryError>;
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;
    async fn list_for_session(&self, buyer_session: &str) -> Result<Vec<Order>, RepositoryError>;
    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Append to the order's thread. The store stamps the timestamp.
    async fn append(
        &self,
        order_id: &OrderId,
        sender: Sender,
        text: &str,
    ) -> Result<(), RepositoryError>;

    async fn thread(&self, order_id: &OrderId) -> Result<Vec<ChatMessage>, RepositoryError>;

    /// Attach a snapshot listener for the order's thread. At most one
    /// listener per order is live at a time: subscribing again replaces the
    /// previous receiver.
    async fn subscribe(&self, order_id: &OrderId) -> Result<ThreadSnapshots, RepositoryError>;

    /// Tear down a thread, as happens when its order reaches a terminal
    /// status.
    async fn clear_thread(&self, order_id: &OrderId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ShopperMemoryRepository: Send + Sync {
    async fn load(&self, buyer_session: &str) -> Result<Option<ShopperMemory>, RepositoryError>;
    async fn save(&self, buyer_session: &str, memory: ShopperMemory)
        -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn add(&self, feedback: Feedback) -> Result<(), RepositoryError>;
}
