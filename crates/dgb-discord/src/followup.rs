use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use dgb_core::{domain::FollowupMessage, errors::Error, ports::FollowupPort, Result};

#[derive(Debug, Serialize)]
struct WebhookEmbed<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'a str,
    color: u32,
}

#[derive(Debug, Serialize)]
struct WebhookParams<'a> {
    content: &'a str,
    embeds: [WebhookEmbed<'a>; 1],
}

/// Delivers follow-up messages through the interaction webhook.
#[derive(Clone, Debug)]
pub struct DiscordFollowup {
    api_base: String,
    bot_token: String,
    http: reqwest::Client,
}

impl DiscordFollowup {
    pub fn new(api_base: impl Into<String>, bot_token: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            http,
        }
    }

    pub fn from_config(cfg: &dgb_core::config::Config) -> Self {
        Self::new(
            cfg.discord_api_base.clone(),
            cfg.discord_bot_token.clone(),
            cfg.http_timeout,
        )
    }
}

#[async_trait]
impl FollowupPort for DiscordFollowup {
    async fn send_followup(&self, msg: &FollowupMessage) -> Result<()> {
        let url = format!(
            "{}/webhooks/{}/{}",
            self.api_base, msg.application_id, msg.token
        );
        let body = WebhookParams {
            content: &msg.content,
            embeds: [WebhookEmbed {
                title: &msg.embed.title,
                description: &msg.embed.description,
                color: msg.embed.color,
            }],
        };

        let resp = self
            .http
            .post(url)
            .header("Authorization", format!("Bot {}", self.bot_token))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Delivery(format!("followup request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Delivery(format!(
                "followup failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dgb_core::domain::Embed;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> FollowupMessage {
        FollowupMessage {
            application_id: "app-1".to_string(),
            token: "tok-1".to_string(),
            embed: Embed {
                title: "prompt".to_string(),
                description: "hello".to_string(),
                color: 0xff0000,
            },
            content: "hi there".to_string(),
        }
    }

    #[tokio::test]
    async fn posts_embed_and_content_to_interaction_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhooks/app-1/tok-1"))
            .and(header("authorization", "Bot bot-token"))
            .and(body_json(json!({
                "content": "hi there",
                "embeds": [{"title": "prompt", "description": "hello", "color": 16711680}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "m1"})))
            .expect(1)
            .mount(&server)
            .await;

        let followup = DiscordFollowup::new(server.uri(), "bot-token", Duration::from_secs(5));
        followup.send_followup(&message()).await.unwrap();
    }

    #[tokio::test]
    async fn empty_description_is_omitted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhooks/app-1/tok-1"))
            .and(body_json(json!({
                "content": "invalid request",
                "embeds": [{"title": "prompt", "color": 16711680}]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut msg = message();
        msg.embed.description.clear();
        msg.content = "invalid request".to_string();

        let followup = DiscordFollowup::new(server.uri(), "bot-token", Duration::from_secs(5));
        followup.send_followup(&msg).await.unwrap();
    }

    #[tokio::test]
    async fn non_success_is_delivery_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Unknown Webhook"))
            .mount(&server)
            .await;

        let followup = DiscordFollowup::new(server.uri(), "bot-token", Duration::from_secs(5));
        let err = followup.send_followup(&message()).await.unwrap_err();
        assert!(matches!(err, Error::Delivery(_)));
        assert!(err.to_string().contains("Unknown Webhook"));
    }
}
