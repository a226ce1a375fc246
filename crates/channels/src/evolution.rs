//! Evolution API channel. Inbound messages arrive on a webhook we serve;
//! outbound replies go through the Evolution REST API sendText endpoint.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use vendabot_core::{Config, Error, InboundMessage, Result};

use crate::whatsapp::sender_allowed;

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(default)]
    event: String,
    #[serde(default)]
    data: Option<MessageData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageData {
    #[serde(default)]
    key: MessageKey,
    #[serde(default)]
    message: Option<MessageBody>,
    #[serde(default)]
    message_timestamp: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct MessageKey {
    #[serde(default)]
    remote_jid: Option<String>,
    #[serde(default)]
    from_me: bool,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct MessageBody {
    #[serde(default)]
    conversation: Option<String>,
}

/// Turn a webhook event into an inbound message if it is a text message
/// from an allowed sender. Events from ourselves are dropped.
fn extract_inbound(event: &WebhookEvent, allow_from: &[String]) -> Option<InboundMessage> {
    if event.event != "messages.upsert" {
        return None;
    }
    let data = event.data.as_ref()?;
    if data.key.from_me {
        return None;
    }
    let sender = data.key.remote_jid.as_deref()?;
    let text = data.message.as_ref()?.conversation.as_deref()?;
    if text.is_empty() {
        return None;
    }
    if !sender_allowed(allow_from, sender) {
        debug!(sender = %sender, "Sender not in allowlist, ignoring");
        return None;
    }

    Some(InboundMessage {
        channel: "evolution".to_string(),
        sender_id: sender.to_string(),
        chat_id: sender.to_string(),
        content: text.to_string(),
        metadata: json!({ "message_id": data.key.id }),
        timestamp_ms: data
            .message_timestamp
            .map(|ts| if ts < 1_000_000_000_000 { ts * 1000 } else { ts })
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
    })
}

struct WebhookState {
    config: Config,
    inbound_tx: mpsc::Sender<InboundMessage>,
}

async fn handle_webhook(
    State(state): State<Arc<WebhookState>>,
    Json(payload): Json<Value>,
) -> Json<Value> {
    let event: WebhookEvent = match serde_json::from_value(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Unparseable webhook payload");
            return Json(json!({"status": "ignored"}));
        }
    };

    if event
        .data
        .as_ref()
        .map(|d| d.key.from_me)
        .unwrap_or(false)
    {
        return Json(json!({"status": "ignored_from_me"}));
    }

    if let Some(inbound) = extract_inbound(&event, &state.config.channels.evolution.allow_from) {
        if let Err(e) = state.inbound_tx.send(inbound).await {
            error!(error = %e, "Failed to queue webhook message");
        }
    }

    Json(json!({"status": "received"}))
}

pub struct EvolutionChannel {
    config: Config,
    inbound_tx: mpsc::Sender<InboundMessage>,
}

impl EvolutionChannel {
    pub fn new(config: Config, inbound_tx: mpsc::Sender<InboundMessage>) -> Self {
        Self { config, inbound_tx }
    }

    /// Serve the webhook until shutdown is signalled.
    pub async fn run_loop(self, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        if !self.config.channels.evolution.enabled {
            info!("Evolution channel disabled");
            return;
        }

        let evolution = &self.config.channels.evolution;
        let addr = format!("{}:{}", evolution.host, evolution.port);

        let state = Arc::new(WebhookState {
            config: self.config.clone(),
            inbound_tx: self.inbound_tx.clone(),
        });
        let app = Router::new()
            .route("/webhook", post(handle_webhook))
            .layer(tower_http::trace::TraceLayer::new_for_http())
            .with_state(state);

        let listener = match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(addr = %addr, error = %e, "Failed to bind Evolution webhook");
                return;
            }
        };
        info!(addr = %addr, "Evolution webhook listening");

        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        });
        if let Err(e) = server.await {
            error!(error = %e, "Evolution webhook server error");
        }
        info!("Evolution channel shut down");
    }
}

/// Send a text message through the Evolution API.
pub async fn send_message(config: &Config, chat_id: &str, text: &str) -> Result<()> {
    crate::rate_limit::evolution_limiter().acquire().await;

    let evolution = &config.channels.evolution;
    let url = format!(
        "{}/message/sendText/{}",
        evolution.api_url.trim_end_matches('/'),
        evolution.instance
    );
    let payload = json!({
        "number": chat_id,
        "options": {
            "delay": 1200,
            "presence": "composing"
        },
        "textMessage": {
            "text": text
        }
    });

    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .header("apikey", &evolution.api_key)
        .json(&payload)
        .send()
        .await
        .map_err(|e| Error::Channel(format!("Evolution API request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Channel(format!(
            "Evolution API error {}: {}",
            status, body
        )));
    }
    debug!(chat_id = %chat_id, "Evolution message sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upsert_event(from_me: bool, text: Option<&str>) -> WebhookEvent {
        let raw = json!({
            "event": "messages.upsert",
            "data": {
                "key": {
                    "remoteJid": "5521980306189@s.whatsapp.net",
                    "fromMe": from_me,
                    "id": "MSG1"
                },
                "message": { "conversation": text },
                "messageTimestamp": 1719342000
            }
        });
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_extract_inbound_text_message() {
        let event = upsert_event(false, Some("qual o produto mais vendido?"));
        let inbound = extract_inbound(&event, &[]).unwrap();
        assert_eq!(inbound.channel, "evolution");
        assert_eq!(inbound.chat_id, "5521980306189@s.whatsapp.net");
        assert_eq!(inbound.content, "qual o produto mais vendido?");
        // Seconds-resolution timestamps are normalized to milliseconds.
        assert_eq!(inbound.timestamp_ms, 1_719_342_000_000);
    }

    #[test]
    fn test_extract_inbound_skips_own_messages() {
        let event = upsert_event(true, Some("resposta do bot"));
        assert!(extract_inbound(&event, &[]).is_none());
    }

    #[test]
    fn test_extract_inbound_requires_text() {
        let event = upsert_event(false, None);
        assert!(extract_inbound(&event, &[]).is_none());
    }

    #[test]
    fn test_extract_inbound_respects_allowlist() {
        let event = upsert_event(false, Some("oi"));
        let allow = vec!["5511999999999".to_string()];
        assert!(extract_inbound(&event, &allow).is_none());
        let allow = vec!["5521980306189".to_string()];
        assert!(extract_inbound(&event, &allow).is_some());
    }

    #[test]
    fn test_ignores_other_events() {
        let raw = json!({ "event": "connection.update", "data": null });
        let event: WebhookEvent = serde_json::from_value(raw).unwrap();
        assert!(extract_inbound(&event, &[]).is_none());
    }
}
