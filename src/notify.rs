use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const PAUSE_BETWEEN_CHATS: Duration = Duration::from_secs(1);

/// Outcome reporting channel. Delivery failures never propagate to the
/// pipeline.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn notify_all(&self, message: &str);
}

pub fn success_message(name: &str, amount_eth: f64) -> String {
    format!("✅ Wallet: #{name}\n\n#Successfully topped up {amount_eth} ETH")
}

pub fn failure_message(name: &str, reason: &str) -> String {
    format!("⛔️ Wallet: #{name}\n\n#Failed to topup, reason: {reason}")
}

/// A chat target is either `chatId` or `chatId/threadId`.
fn split_chat_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('/') {
        Some((chat, thread)) => (chat, Some(thread)),
        None => (target, None),
    }
}

pub struct TelegramNotifier {
    send_message_endpoint: String,
    chat_ids: Vec<String>,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_ids: Vec<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build notifier HTTP client")?;
        Ok(Self {
            send_message_endpoint: format!("https://api.telegram.org/bot{bot_token}/sendMessage"),
            chat_ids,
            http,
        })
    }

    async fn send_to(&self, target: &str, message: &str) -> Result<()> {
        let (chat_id, thread_id) = split_chat_target(target);

        let mut body = json!({
            "chat_id": chat_id,
            "text": message,
            "parse_mode": "HTML",
            "disable_notification": false,
            "disable_web_page_preview": true,
        });
        if let Some(thread) = thread_id {
            body["message_thread_id"] = json!(thread);
        }

        let response = self
            .http
            .post(&self.send_message_endpoint)
            .json(&body)
            .send()
            .await
            .context("telegram request failed")?;
        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("Failed to post TG message, reason: {detail}"));
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .context("malformed telegram response")?;
        if !parsed.ok {
            return Err(anyhow!(
                "Failed to send notification to chat {target}, reason: {}",
                parsed.description.unwrap_or_default()
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSender for TelegramNotifier {
    async fn notify_all(&self, message: &str) {
        for chat in &self.chat_ids {
            // one unreachable chat must not block the others
            if let Err(e) = self.send_to(chat, message).await {
                debug!("notification to {chat} dropped: {e:#}");
            }
            tokio::time::sleep(PAUSE_BETWEEN_CHATS).await;
        }
    }
}
