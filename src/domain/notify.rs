use async_trait::async_trait;

/// Push-message transport. Delivery problems are reported through the
/// returned flag and logged by the implementation, never raised.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> bool;
}
