use crate::domain::notify::Notifier;
use async_trait::async_trait;
use tracing::info;

/// Logs messages instead of sending them. Used for dry runs and when no
/// Telegram credentials are configured.
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, text: &str) -> bool {
        info!("Notification (not sent):\n{}", text);
        true
    }
}
