//! Slash-command definition and registration.

use std::time::Duration;

use serde::Serialize;

use dgb_core::{errors::Error, Result};

/// `CHAT_INPUT` application command type.
const CHAT_INPUT: u8 = 1;
/// `STRING` option type.
const STRING_OPTION: u8 = 3;

pub const REGISTER_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandOptionDef {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApplicationCommand {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub description: String,
    pub options: Vec<CommandOptionDef>,
}

/// The `/chat prompt:<text>` command served by the gateway.
pub fn chat_command() -> ApplicationCommand {
    ApplicationCommand {
        name: "chat".to_string(),
        kind: CHAT_INPUT,
        description: "chat-gpt".to_string(),
        options: vec![CommandOptionDef {
            name: "prompt".to_string(),
            description: "prompt".to_string(),
            kind: STRING_OPTION,
        }],
    }
}

/// Register `cmd` for one guild. Returns the platform's response body.
pub async fn register_guild_command(
    api_base: &str,
    app_id: &str,
    guild_id: &str,
    bot_token: &str,
    cmd: &ApplicationCommand,
) -> Result<String> {
    let http = reqwest::Client::builder()
        .timeout(REGISTER_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    let url = format!(
        "{}/applications/{app_id}/guilds/{guild_id}/commands",
        api_base.trim_end_matches('/')
    );
    let resp = http
        .post(url)
        .header("Authorization", format!("Bot {bot_token}"))
        .json(cmd)
        .send()
        .await
        .map_err(|e| Error::Collaborator(format!("register request error: {e}")))?;

    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(Error::Collaborator(format!(
            "register failed: {status} {}",
            body.chars().take(200).collect::<String>()
        )));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn chat_command_shape() {
        let v = serde_json::to_value(chat_command()).unwrap();
        assert_eq!(
            v,
            json!({
                "name": "chat",
                "type": 1,
                "description": "chat-gpt",
                "options": [{"name": "prompt", "description": "prompt", "type": 3}]
            })
        );
    }

    #[tokio::test]
    async fn registers_guild_command() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/applications/app-1/guilds/g-1/commands"))
            .and(header("authorization", "Bot bot-token"))
            .and(body_json(serde_json::to_value(chat_command()).unwrap()))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "cmd-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let body = register_guild_command(
            &server.uri(),
            "app-1",
            "g-1",
            "bot-token",
            &chat_command(),
        )
        .await
        .unwrap();
        assert!(body.contains("cmd-1"));
    }

    #[tokio::test]
    async fn surfaces_registration_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("401: Unauthorized"))
            .mount(&server)
            .await;

        let err = register_guild_command(&server.uri(), "a", "g", "bad", &chat_command())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
