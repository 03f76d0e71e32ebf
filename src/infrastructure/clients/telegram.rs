use crate::domain::notify::Notifier;
use crate::error::{Result, WatchError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

const API_BASE: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramClient {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramClient {
    pub fn new(client: Client, token: String, chat_id: String) -> Self {
        Self {
            client,
            api_base: API_BASE.to_string(),
            token,
            chat_id,
        }
    }

    async fn send_message(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let params = [
            ("chat_id", self.chat_id.as_str()),
            ("text", text),
            ("parse_mode", "Markdown"),
        ];

        let response: SendMessageResponse = self
            .client
            .post(&url)
            .form(&params)
            .timeout(SEND_TIMEOUT)
            .send()
            .await?
            .json()
            .await?;

        if response.ok {
            Ok(())
        } else {
            Err(WatchError::Other(format!(
                "Telegram rejected the message: {}",
                response.description.unwrap_or_default()
            )))
        }
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn send(&self, text: &str) -> bool {
        match self.send_message(text).await {
            Ok(()) => {
                info!("Telegram message sent to chat {}", self.chat_id);
                true
            }
            Err(e) => {
                // reqwest errors carry the URL, which embeds the token.
                let e = match e {
                    WatchError::Network(e) => e.without_url().to_string(),
                    other => other.to_string(),
                };
                error!("Telegram send failed: {}", e);
                false
            }
        }
    }
}
