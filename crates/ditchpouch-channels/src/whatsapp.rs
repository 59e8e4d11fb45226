//! WhatsApp Business Cloud API channel.
//!
//! Outbound: text, interactive list and reply-button messages to the one
//! configured recipient. Inbound arrives via webhook; this module parses the
//! payload, checks `X-Hub-Signature-256` and answers the subscribe handshake.

use async_trait::async_trait;
use ditchpouch_core::config::WhatsAppConfig;
use ditchpouch_core::error::{DitchPouchError, Result};
use ditchpouch_core::traits::Channel;
use ditchpouch_core::types::{Choice, Outbound};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const GRAPH_API: &str = "https://graph.facebook.com";
const MAX_LIST_ROWS: usize = 10;
const MAX_ROW_TITLE: usize = 24;
const MAX_BUTTONS: usize = 3;
const MAX_BUTTON_TITLE: usize = 20;
const MAX_INTERACTIVE_BODY: usize = 1024;

/// A message received through the webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub from: String,
    pub message_id: String,
    pub content: InboundContent,
}

/// The parts of an inbound message the decoder cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundContent {
    Text(String),
    ListReply { id: String, title: String },
    ButtonReply { id: String, title: String },
}

/// WhatsApp Business channel implementation.
pub struct WhatsAppChannel {
    config: WhatsAppConfig,
    client: reqwest::Client,
}

impl WhatsAppChannel {
    pub fn new(config: WhatsAppConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{GRAPH_API}/{}/{}/messages",
            self.config.api_version, self.config.phone_number_id
        )
    }

    async fn post(&self, body: &serde_json::Value) -> Result<String> {
        let response = self
            .client
            .post(self.messages_url())
            .header("Authorization", format!("Bearer {}", self.config.access_token))
            .json(body)
            .timeout(std::time::Duration::from_secs(15))
            .send()
            .await
            .map_err(|e| DitchPouchError::Channel(format!("WhatsApp API request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DitchPouchError::Channel(format!(
                "WhatsApp API error {status}: {error_text}"
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DitchPouchError::Channel(format!("Invalid WhatsApp response: {e}")))?;

        Ok(result["messages"][0]["id"]
            .as_str()
            .unwrap_or("unknown")
            .to_string())
    }
}

#[async_trait]
impl Channel for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn send(&self, message: &Outbound) -> Result<()> {
        let body = render(&self.config.recipient, message);
        let msg_id = self.post(&body).await?;
        tracing::debug!("WhatsApp message sent: {} → {}", msg_id, self.config.recipient);
        Ok(())
    }
}

/// Cloud API request body for an outbound message.
pub fn render(to: &str, message: &Outbound) -> serde_json::Value {
    let mut body = serde_json::json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to,
    });

    match message {
        Outbound::PlainText { body: text } => {
            body["type"] = "text".into();
            body["text"] = serde_json::json!({ "preview_url": false, "body": text });
        }
        Outbound::ChoiceList { prompt, options } => {
            if options.len() > MAX_LIST_ROWS {
                tracing::warn!("WhatsApp list capped at {MAX_LIST_ROWS} rows ({} given)", options.len());
            }
            let rows: Vec<serde_json::Value> = options
                .iter()
                .take(MAX_LIST_ROWS)
                .map(|o| serde_json::json!({ "id": o.id, "title": truncate(&o.label, MAX_ROW_TITLE) }))
                .collect();
            body["type"] = "interactive".into();
            body["interactive"] = serde_json::json!({
                "type": "list",
                "body": { "text": truncate(prompt, MAX_INTERACTIVE_BODY) },
                "action": {
                    "button": "Choose",
                    "sections": [{ "title": "Strength", "rows": rows }]
                }
            });
        }
        Outbound::ButtonPrompt { prompt, buttons } => {
            body["type"] = "interactive".into();
            body["interactive"] = serde_json::json!({
                "type": "button",
                "body": { "text": truncate(prompt, MAX_INTERACTIVE_BODY) },
                "action": { "buttons": reply_buttons(buttons) }
            });
        }
    }
    body
}

fn reply_buttons(buttons: &[Choice]) -> Vec<serde_json::Value> {
    buttons
        .iter()
        .take(MAX_BUTTONS)
        .map(|b| {
            serde_json::json!({
                "type": "reply",
                "reply": { "id": b.id, "title": truncate(&b.label, MAX_BUTTON_TITLE) }
            })
        })
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Extract the messages we understand from a webhook payload.
/// Statuses, media and other message types are skipped.
pub fn parse_webhook(payload: &serde_json::Value) -> Vec<InboundMessage> {
    let mut messages = Vec::new();
    let Some(entries) = payload["entry"].as_array() else {
        return messages;
    };

    for entry in entries {
        let Some(changes) = entry["changes"].as_array() else {
            continue;
        };
        for change in changes {
            let Some(items) = change["value"]["messages"].as_array() else {
                continue;
            };
            for msg in items {
                let Some(content) = parse_content(msg) else {
                    tracing::debug!("[whatsapp] Skipping message type {:?}", msg["type"].as_str());
                    continue;
                };
                messages.push(InboundMessage {
                    from: msg["from"].as_str().unwrap_or("").to_string(),
                    message_id: msg["id"].as_str().unwrap_or("").to_string(),
                    content,
                });
            }
        }
    }
    messages
}

fn parse_content(msg: &serde_json::Value) -> Option<InboundContent> {
    let field = |v: &serde_json::Value| v.as_str().unwrap_or("").to_string();
    match msg["type"].as_str()? {
        "text" => {
            let text = field(&msg["text"]["body"]);
            (!text.is_empty()).then_some(InboundContent::Text(text))
        }
        "interactive" => {
            let interactive = &msg["interactive"];
            match interactive["type"].as_str()? {
                "list_reply" => Some(InboundContent::ListReply {
                    id: field(&interactive["list_reply"]["id"]),
                    title: field(&interactive["list_reply"]["title"]),
                }),
                "button_reply" => Some(InboundContent::ButtonReply {
                    id: field(&interactive["button_reply"]["id"]),
                    title: field(&interactive["button_reply"]["title"]),
                }),
                _ => None,
            }
        }
        // Quick-reply buttons on template messages
        "button" => Some(InboundContent::ButtonReply {
            id: field(&msg["button"]["payload"]),
            title: field(&msg["button"]["text"]),
        }),
        _ => None,
    }
}

/// Check `X-Hub-Signature-256: sha256=<hex>` against the raw request body.
pub fn verify_signature(app_secret: &str, body: &[u8], header: &str) -> Result<()> {
    let hex_sig = header
        .strip_prefix("sha256=")
        .ok_or_else(|| DitchPouchError::Verification("signature header must start with sha256=".into()))?;
    let expected = hex::decode(hex_sig)
        .map_err(|e| DitchPouchError::Verification(format!("signature is not hex: {e}")))?;

    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .map_err(|e| DitchPouchError::Verification(format!("bad app secret: {e}")))?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| DitchPouchError::Verification("signature mismatch".into()))
}

/// Meta's subscribe handshake: the challenge to echo back, or `None`.
/// An unconfigured verify token never matches.
pub fn verify_subscription<'a>(
    mode: &str,
    token: &str,
    challenge: &'a str,
    expected_token: &str,
) -> Option<&'a str> {
    (mode == "subscribe" && !expected_token.is_empty() && token == expected_token).then_some(challenge)
}
