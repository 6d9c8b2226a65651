use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SlackConfig;

/// Notification service for batch alerts
pub struct NotificationService {
    client: Client,
    slack: Option<SlackNotifier>,
    on_failure: bool,
    on_report_change: bool,
}

impl NotificationService {
    pub fn new(slack_config: &SlackConfig) -> Self {
        let slack = if slack_config.enabled {
            slack_config
                .webhook_url
                .as_ref()
                .map(|url| SlackNotifier::new(url.clone(), slack_config.channel.clone()))
        } else {
            None
        };

        Self {
            client: Client::new(),
            slack,
            on_failure: slack_config.on_failure,
            on_report_change: slack_config.on_report_change,
        }
    }

    /// Service that never sends anything
    pub fn disabled() -> Self {
        Self::new(&SlackConfig::default())
    }

    pub fn is_enabled(&self) -> bool {
        self.slack.is_some()
    }

    /// Send notification for a producer that failed
    pub async fn notify_failure(&self, producer: &str, error: &anyhow::Error) -> Result<()> {
        if !self.on_failure {
            return Ok(());
        }
        if let Some(ref slack) = self.slack {
            slack.notify_failure(&self.client, producer, error).await?;
        }
        Ok(())
    }

    /// Send notification for reports whose content changed
    pub async fn notify_changed(&self, producer: &str, reports: &[String]) -> Result<()> {
        if !self.on_report_change || reports.is_empty() {
            return Ok(());
        }
        if let Some(ref slack) = self.slack {
            slack.notify_changed(&self.client, producer, reports).await?;
        }
        Ok(())
    }
}

/// Slack webhook notifier
struct SlackNotifier {
    webhook_url: String,
    channel: Option<String>,
}

#[derive(Serialize)]
struct SlackMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    blocks: Option<Vec<SlackBlock>>,
}

#[derive(Serialize)]
struct SlackBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<SlackText>,
}

#[derive(Serialize)]
struct SlackText {
    #[serde(rename = "type")]
    text_type: String,
    text: String,
}

impl SlackBlock {
    fn section(text: String) -> Self {
        Self {
            block_type: "section".to_string(),
            text: Some(SlackText {
                text_type: "mrkdwn".to_string(),
                text,
            }),
        }
    }
}

impl SlackNotifier {
    fn new(webhook_url: String, channel: Option<String>) -> Self {
        Self {
            webhook_url,
            channel,
        }
    }

    async fn send(&self, client: &Client, message: SlackMessage) -> Result<()> {
        debug!("Sending Slack notification");

        let response = client
            .post(&self.webhook_url)
            .json(&message)
            .send()
            .await
            .context("Failed to send Slack notification")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Slack notification failed");
            anyhow::bail!("Slack webhook returned error: {} - {}", status, body);
        }

        info!("Slack notification sent");
        Ok(())
    }

    async fn notify_failure(
        &self,
        client: &Client,
        producer: &str,
        error: &anyhow::Error,
    ) -> Result<()> {
        let text = format!("🚨 Report producer `{}` failed", producer);

        let message = SlackMessage {
            channel: self.channel.clone(),
            text: text.clone(),
            blocks: Some(vec![
                SlackBlock::section(text),
                SlackBlock::section(format!("```{:#}```", error)),
            ]),
        };

        self.send(client, message).await
    }

    async fn notify_changed(
        &self,
        client: &Client,
        producer: &str,
        reports: &[String],
    ) -> Result<()> {
        let text = format!(
            "📊 `{}` updated {} report(s)",
            producer,
            reports.len()
        );
        let list: Vec<String> = reports.iter().map(|r| format!("• `{}`", r)).collect();

        let message = SlackMessage {
            channel: self.channel.clone(),
            text: text.clone(),
            blocks: Some(vec![
                SlackBlock::section(text),
                SlackBlock::section(list.join("\n")),
            ]),
        };

        self.send(client, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn enabled_config(url: String) -> SlackConfig {
        SlackConfig {
            enabled: true,
            webhook_url: Some(url),
            channel: Some("#insolvenzen".to_string()),
            on_failure: true,
            on_report_change: true,
        }
    }

    #[test]
    fn test_notification_service_disabled() {
        let config = SlackConfig {
            enabled: false,
            webhook_url: Some("https://hooks.slack.com/test".to_string()),
            ..Default::default()
        };

        let service = NotificationService::new(&config);
        assert!(!service.is_enabled());
    }

    #[test]
    fn test_notification_service_enabled() {
        let service =
            NotificationService::new(&enabled_config("https://hooks.slack.com/test".to_string()));
        assert!(service.is_enabled());
    }

    #[tokio::test]
    async fn test_notify_failure_posts_to_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "channel": "#insolvenzen",
                "text": "🚨 Report producer `regular` failed"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let service = NotificationService::new(&enabled_config(format!("{}/hook", server.uri())));
        service
            .notify_failure("regular", &anyhow::anyhow!("district 'Atlantis' is unknown"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_webhook_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let service = NotificationService::new(&enabled_config(server.uri()));
        let result = service
            .notify_changed("private", &["private_current.csv".to_string()])
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_flags_suppress_notifications() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut config = enabled_config(server.uri());
        config.on_failure = false;
        config.on_report_change = false;
        let service = NotificationService::new(&config);

        service
            .notify_failure("private", &anyhow::anyhow!("boom"))
            .await
            .unwrap();
        service
            .notify_changed("private", &["private_current.csv".to_string()])
            .await
            .unwrap();
    }
}
