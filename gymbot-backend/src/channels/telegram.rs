//! Telegram Bot API channel — long-polling transport.
//!
//! Drives the Bot API directly over HTTP (getMe, getUpdates,
//! sendMessage) with offset tracking and exponential backoff on
//! failures. Each parsed command is dispatched on its own task so one
//! user's slow pipeline never stalls another's.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use super::dispatcher::CommandDispatcher;
use super::types::{CommandKind, NormalizedCommand};

const API_BASE: &str = "https://api.telegram.org";
/// Long-poll timeout (seconds), sent as the `timeout` parameter to getUpdates.
const LONG_POLL_TIMEOUT_SECS: u64 = 30;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);
/// Telegram rejects messages longer than this many characters.
const MAX_MESSAGE_LEN: usize = 4096;

pub struct TelegramChannel {
    token: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(token: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(LONG_POLL_TIMEOUT_SECS + 10))
            .build()
            .expect("Failed to build HTTP client");
        Self { token, client }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.token, method)
    }

    /// Validate the token and report the bot identity.
    pub async fn validate_token(&self) -> Result<String, String> {
        let result = self.api_call("getMe", &json!({})).await?;
        Ok(result["username"].as_str().unwrap_or("unknown").to_string())
    }

    async fn api_call(&self, method: &str, params: &Value) -> Result<Value, String> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(params)
            .send()
            .await
            .map_err(|e| format!("Failed to call Telegram API {}: {}", method, e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(parse_telegram_error(status, &body));
        }

        let body: Value = serde_json::from_str(&body)
            .map_err(|e| format!("Failed to parse Telegram response: {}", e))?;
        if body.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            let description = body
                .get("description")
                .and_then(|d| d.as_str())
                .unwrap_or("unknown error");
            return Err(format!("Telegram API error: {}", description));
        }

        Ok(body.get("result").cloned().unwrap_or(json!(null)))
    }

    async fn send_reply(&self, chat_id: i64, text: &str) {
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            let params = json!({ "chat_id": chat_id, "text": chunk });
            if let Err(e) = self.api_call("sendMessage", &params).await {
                log::warn!("[TELEGRAM] sendMessage failed: {}", e);
            }
        }
    }

    /// Poll getUpdates until the process exits or another instance
    /// takes over the token (409).
    pub async fn run(self: Arc<Self>, dispatcher: Arc<CommandDispatcher>) {
        match self.validate_token().await {
            Ok(name) => log::info!("[TELEGRAM] Connected as @{}", name),
            Err(e) => log::warn!("[TELEGRAM] getMe failed: {}", e),
        }

        let mut offset: Option<i64> = None;
        let mut backoff = INITIAL_BACKOFF;

        loop {
            let mut params = json!({
                "timeout": LONG_POLL_TIMEOUT_SECS,
                "allowed_updates": ["message"],
            });
            if let Some(next) = offset {
                params["offset"] = json!(next);
            }

            let response = self
                .client
                .post(self.api_url("getUpdates"))
                .json(&params)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    log::warn!(
                        "[TELEGRAM] getUpdates network error: {}, retrying in {:?}",
                        e,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = next_backoff(backoff);
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 {
                let body: Value = response.json().await.unwrap_or_default();
                let retry_after = body["parameters"]["retry_after"].as_u64().unwrap_or(5);
                log::warn!("[TELEGRAM] Rate limited, retrying after {}s", retry_after);
                tokio::time::sleep(Duration::from_secs(retry_after)).await;
                continue;
            }
            if status.as_u16() == 409 {
                log::error!("[TELEGRAM] 409 Conflict — another bot instance is polling. Stopping.");
                break;
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                log::warn!(
                    "[TELEGRAM] getUpdates failed ({}): {}, retrying in {:?}",
                    status,
                    body,
                    backoff
                );
                tokio::time::sleep(backoff).await;
                backoff = next_backoff(backoff);
                continue;
            }

            let body: Value = match response.json().await {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("[TELEGRAM] getUpdates parse error: {}", e);
                    tokio::time::sleep(backoff).await;
                    backoff = next_backoff(backoff);
                    continue;
                }
            };

            backoff = INITIAL_BACKOFF;

            if body["ok"].as_bool() != Some(true) {
                log::warn!("[TELEGRAM] getUpdates returned ok=false");
                continue;
            }

            let updates = match body["result"].as_array() {
                Some(list) => list.clone(),
                None => continue,
            };

            for update in &updates {
                if let Some(update_id) = update["update_id"].as_i64() {
                    offset = Some(update_id + 1);
                }

                let Some(command) = parse_update(update) else {
                    continue;
                };

                let channel = self.clone();
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    let chat_id = command.chat_id;
                    let reply = dispatcher.dispatch(command).await;
                    channel.send_reply(chat_id, &reply).await;
                });
            }
        }

        log::info!("[TELEGRAM] Polling loop stopped");
    }
}

/// Parse a Telegram update into a command, or `None` for anything the
/// bot does not handle (non-command text, non-message updates).
fn parse_update(update: &Value) -> Option<NormalizedCommand> {
    let message = update.get("message")?;
    let user_id = message["from"]["id"].as_i64()?.to_string();
    let chat_id = message["chat"]["id"].as_i64()?;
    let text = message["text"].as_str()?;

    let is_command = message["entities"]
        .as_array()
        .map(|entities| {
            entities.iter().any(|e| {
                e["type"].as_str() == Some("bot_command") && e["offset"].as_i64() == Some(0)
            })
        })
        .unwrap_or(false);
    if !is_command {
        return None;
    }

    let (name, argument) = match text.split_once(' ') {
        Some((head, rest)) => (head, rest.trim()),
        None => (text, ""),
    };
    // Strip the leading slash and any @botname suffix (/note@mybot)
    let name = name.trim_start_matches('/');
    let name = name.split('@').next().unwrap_or(name);

    let kind = match name {
        "start" => CommandKind::Start,
        "help" => CommandKind::Help,
        "note" => CommandKind::Note(argument.to_string()),
        "query" => CommandKind::Query(argument.to_string()),
        "suggest" => CommandKind::Suggest(argument.to_string()),
        other => CommandKind::Unknown(other.to_string()),
    };

    Some(NormalizedCommand {
        user_id,
        chat_id,
        kind,
    })
}

fn parse_telegram_error(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(error_json) = serde_json::from_str::<Value>(body) {
        let code = error_json
            .get("error_code")
            .and_then(|c| c.as_u64())
            .unwrap_or(0);
        let description = error_json
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or("Unknown error");
        format!("Telegram API error: {} (code {})", description, code)
    } else {
        format!("Telegram API error ({}): {}", status, body)
    }
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

/// Split a reply into chunks Telegram will accept.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for ch in text.chars() {
        if current_len == max_len {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current.push(ch);
        current_len += 1;
    }
    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }

    chunks
}
