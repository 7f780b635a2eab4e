//! Slack failure notifications
//!
//! Operational alerts (feed loss, store failures) are posted to a Slack
//! channel. Without a configured token the notifier is a no-op, so every
//! call site can alert unconditionally.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::{error, info};

use crate::config::SlackConfig;

const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
}

#[derive(Clone)]
pub struct SlackNotifier {
    client: reqwest::Client,
    config: Option<SlackConfig>,
}

impl SlackNotifier {
    pub fn new(config: Option<SlackConfig>) -> Self {
        if config.is_none() {
            info!("no slack token configured, notifications disabled");
        }
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Post a critical message. Errors are logged and swallowed so a Slack
    /// outage never takes the collector down with it.
    pub async fn notify_critical(&self, message: &str) {
        let Some(config) = &self.config else {
            return;
        };
        if let Err(err) = self.post(config, message).await {
            error!("slack notification failed: {:#}", err);
        }
    }

    async fn post(&self, config: &SlackConfig, message: &str) -> Result<()> {
        let text = format!("[{}] {}", config.from_name, message);
        let response = self
            .client
            .post(POST_MESSAGE_URL)
            .bearer_auth(&config.bot_token)
            .query(&[("channel", config.channel.as_str()), ("text", &text)])
            .send()
            .await
            .context("posting slack message")?;

        let body: PostMessageResponse = response
            .json()
            .await
            .context("reading slack response")?;
        if !body.ok {
            return Err(anyhow!(
                "slack api error: {}",
                body.error.unwrap_or_else(|| "unknown".to_string())
            ));
        }
        Ok(())
    }
}
