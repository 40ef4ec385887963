//! Interaction payload decoding.

use serde::Deserialize;

use dgb_core::{
    domain::{CommandOption, InteractionEvent, InteractionKind, OptionValue},
    errors::Error,
    Result,
};

// Application command option types that carry a scalar value we interpret.
const OPTION_STRING: u8 = 3;
const OPTION_INTEGER: u8 = 4;
const OPTION_BOOLEAN: u8 = 5;
const OPTION_NUMBER: u8 = 10;

#[derive(Debug, Deserialize)]
struct RawInteraction {
    #[serde(default)]
    id: String,
    #[serde(default)]
    application_id: String,
    #[serde(rename = "type")]
    kind: Option<u8>,
    #[serde(default)]
    token: String,
    member: Option<RawMember>,
    user: Option<RawUser>,
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawMember {
    user: Option<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    #[serde(default)]
    id: String,
    #[serde(default)]
    username: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawCommandData {
    #[serde(default)]
    name: String,
    #[serde(default)]
    options: Vec<RawOption>,
}

#[derive(Debug, Deserialize)]
struct RawOption {
    name: String,
    #[serde(rename = "type")]
    kind: u8,
    value: Option<serde_json::Value>,
    #[serde(default)]
    options: Vec<serde_json::Value>,
}

/// Decode a verified request body into an [`InteractionEvent`].
pub fn decode(body: &[u8]) -> Result<InteractionEvent> {
    let raw: RawInteraction = serde_json::from_slice(body)
        .map_err(|e| Error::MalformedPayload(format!("invalid interaction json: {e}")))?;

    let code = raw
        .kind
        .ok_or_else(|| Error::MalformedPayload("missing interaction type".to_string()))?;
    let kind = InteractionKind::from_code(code).ok_or_else(|| {
        Error::MalformedPayload(format!("unsupported interaction type {code}"))
    })?;

    // Guild invocations carry the user under `member`, DMs directly under `user`.
    let invoker = raw.member.and_then(|m| m.user).or(raw.user);
    let (invoker_user_id, invoker_username) = invoker
        .map(|u| (u.id, u.username))
        .unwrap_or_default();

    let (command_name, command_options) = match (kind, raw.data) {
        (InteractionKind::ApplicationCommand, Some(data)) => {
            let data: RawCommandData = serde_json::from_value(data).map_err(|e| {
                Error::MalformedPayload(format!("invalid application command data: {e}"))
            })?;
            let options = data
                .options
                .into_iter()
                .map(decode_option)
                .collect::<Result<Vec<_>>>()?;
            (data.name, options)
        }
        _ => (String::new(), Vec::new()),
    };

    if let [only] = command_options.as_slice() {
        if only.value.as_str().is_none() {
            return Err(Error::MalformedPayload(format!(
                "command option `{}` is {}, expected string",
                only.name,
                only.value.type_name()
            )));
        }
    }

    Ok(InteractionEvent {
        id: raw.id,
        application_id: raw.application_id,
        token: raw.token,
        kind,
        invoker_user_id,
        invoker_username,
        command_name,
        command_options,
    })
}

fn decode_option(raw: RawOption) -> Result<CommandOption> {
    let mismatch = |expected: &str| {
        Error::MalformedPayload(format!(
            "command option `{}` declared as {expected} but value does not match",
            raw.name
        ))
    };

    let value = match (raw.kind, &raw.value) {
        (OPTION_STRING, Some(v)) => OptionValue::String(
            v.as_str().ok_or_else(|| mismatch("string"))?.to_string(),
        ),
        (OPTION_INTEGER, Some(v)) => OptionValue::Integer(v.as_i64().ok_or_else(|| mismatch("integer"))?),
        (OPTION_BOOLEAN, Some(v)) => OptionValue::Boolean(v.as_bool().ok_or_else(|| mismatch("boolean"))?),
        (OPTION_NUMBER, Some(v)) => OptionValue::Number(v.as_f64().ok_or_else(|| mismatch("number"))?),
        (_, Some(v)) => OptionValue::Other(v.clone()),
        (_, None) => OptionValue::Other(serde_json::Value::Array(raw.options.clone())),
    };

    Ok(CommandOption {
        name: raw.name,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn command_body(options: serde_json::Value) -> Vec<u8> {
        json!({
            "id": "1100",
            "application_id": "app-1",
            "type": 2,
            "token": "tok-1",
            "member": {"user": {"id": "u1", "username": "alice"}},
            "data": {"id": "cmd-1", "name": "chat", "type": 1, "options": options}
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn decodes_ping() {
        let ev = decode(br#"{"id":"1","application_id":"a","type":1,"token":"t"}"#).unwrap();
        assert_eq!(ev.kind, InteractionKind::Ping);
        assert_eq!(ev.invoker_user_id, "");
        assert!(ev.command_options.is_empty());
    }

    #[test]
    fn decodes_application_command() {
        let ev = decode(&command_body(json!([
            {"name": "prompt", "type": 3, "value": "hello"}
        ])))
        .unwrap();

        assert_eq!(ev.kind, InteractionKind::ApplicationCommand);
        assert_eq!(ev.id, "1100");
        assert_eq!(ev.application_id, "app-1");
        assert_eq!(ev.token, "tok-1");
        assert_eq!(ev.invoker_user_id, "u1");
        assert_eq!(ev.invoker_username, "alice");
        assert_eq!(ev.command_name, "chat");
        assert_eq!(ev.command_input(), "hello");
    }

    #[test]
    fn dm_invoker_comes_from_user() {
        let body = json!({
            "id": "1", "application_id": "a", "type": 2, "token": "t",
            "user": {"id": "u2", "username": "bob"},
            "data": {"name": "chat", "options": [{"name": "prompt", "type": 3, "value": "hi"}]}
        });
        let ev = decode(body.to_string().as_bytes()).unwrap();
        assert_eq!(ev.invoker_user_id, "u2");
        assert_eq!(ev.invoker_username, "bob");
    }

    #[test]
    fn missing_invoker_and_options_are_empty_not_errors() {
        let body = json!({
            "id": "1", "application_id": "a", "type": 2, "token": "t",
            "data": {"name": "chat"}
        });
        let ev = decode(body.to_string().as_bytes()).unwrap();
        assert_eq!(ev.invoker_user_id, "");
        assert_eq!(ev.command_input(), "");
    }

    #[test]
    fn wrong_arity_yields_empty_input() {
        let ev = decode(&command_body(json!([
            {"name": "prompt", "type": 3, "value": "a"},
            {"name": "other", "type": 3, "value": "b"}
        ])))
        .unwrap();
        assert_eq!(ev.command_input(), "");
    }

    #[test]
    fn non_string_single_option_is_malformed() {
        let err = decode(&command_body(json!([
            {"name": "count", "type": 4, "value": 3}
        ])))
        .unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));
        assert!(err.to_string().contains("integer"));
    }

    #[test]
    fn declared_type_mismatch_is_malformed() {
        let err = decode(&command_body(json!([
            {"name": "prompt", "type": 3, "value": 42}
        ])))
        .unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));
    }

    #[test]
    fn rejects_bad_json_and_unknown_types() {
        assert!(matches!(decode(b"not json"), Err(Error::MalformedPayload(_))));
        assert!(matches!(
            decode(br#"{"id":"1"}"#),
            Err(Error::MalformedPayload(_))
        ));
        // Autocomplete and modal submit are not handled.
        assert!(matches!(
            decode(br#"{"id":"1","type":4}"#),
            Err(Error::MalformedPayload(_))
        ));
        assert!(matches!(
            decode(br#"{"id":"1","type":5}"#),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[test]
    fn component_data_is_not_interpreted() {
        let body = json!({
            "id": "1", "application_id": "a", "type": 3, "token": "t",
            "member": {"user": {"id": "u1", "username": "alice"}},
            "data": {"custom_id": "btn", "component_type": 2}
        });
        let ev = decode(body.to_string().as_bytes()).unwrap();
        assert_eq!(ev.kind, InteractionKind::MessageComponent);
        assert!(ev.command_options.is_empty());
    }
}
