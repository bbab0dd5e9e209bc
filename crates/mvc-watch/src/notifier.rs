use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub(crate) const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Telegram rejected message: {0}")]
    Rejected(String),
}

/// Delivers an already escaped message.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct TelegramReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str) -> Result<Self, NotifyError> {
        Self::with_api_url(TELEGRAM_API_URL, bot_token, chat_id)
    }

    pub fn with_api_url(api_url: &str, bot_token: &str, chat_id: &str) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.bot_token);
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "MarkdownV2",
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                // The bot token is part of the URL.
                let e = e.without_url();
                log::error!("HTTP error: {e:?}");
                e
            })?;

        let status = response.status();
        let reply: Option<TelegramReply> = response.json().await.ok();

        match reply {
            Some(TelegramReply { ok: true, .. }) if status.is_success() => {
                log::info!("Message delivered to chat {}", self.chat_id);
                Ok(())
            }
            Some(TelegramReply { description, .. }) => Err(NotifyError::Rejected(
                description.unwrap_or_else(|| status.to_string()),
            )),
            None => Err(NotifyError::Rejected(status.to_string())),
        }
    }
}

/// Prints messages instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        println!("{}", text);
        Ok(())
    }
}
