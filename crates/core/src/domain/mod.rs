pub mod feedback;
pub mod message;
pub mod order;
pub mod product;

use uuid::Uuid;

/// Opaque per-device buyer identity, generated once per session and attached
/// to orders, feedback, and the persisted shopper memory.
pub fn new_buyer_session_id() -> String {
    format!("buyer-{}", Uuid::new_v4().simple())
}
