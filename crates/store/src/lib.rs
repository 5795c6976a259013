//! Document-store collaborator contracts for Lapak.
//!
//! The production system keeps orders, per-order message threads, shopper
//! memory, and feedback in an external document database with live snapshot
//! listeners. This crate expresses that surface as repository traits and
//! ships in-memory implementations for tests and the CLI harness; a real
//! backend implements the same traits elsewhere.

pub mod repositories;

pub use repositories::{
    CatalogRepository, FeedbackRepository, InMemoryCatalogRepository, InMemoryFeedbackRepository,
    InMemoryMessageRepository, InMemoryOrderRepository, InMemoryShopperMemoryRepository,
    MessageRepository, OrderRepository, RepositoryError, ShopperMemoryRepository, ThreadSnapshots,
};
