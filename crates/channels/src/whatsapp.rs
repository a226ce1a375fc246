//! WhatsApp channel backed by a wppconnect WebSocket bridge.
//!
//! The bridge drives WhatsApp Web in a headless browser and relays events as
//! JSON frames. Login works by scanning a QR code: the bridge forwards the
//! base64 payload and we persist it to a fixed file so `channels login` can
//! render it.

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage, WebSocketStream};
use tracing::{debug, error, info, warn};
use vendabot_core::{Config, Error, InboundMessage, Paths, Result};

type WsSink = futures::stream::SplitSink<
    WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    WsMessage,
>;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    #[serde(rename = "type")]
    msg_type: &'a str,
    to: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BridgeMessage {
    #[serde(rename = "type")]
    msg_type: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    sender: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    is_group: Option<bool>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    qr: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// True when `sender` matches the allowlist, either as a full JID
/// (e.g. "5521980306189@c.us") or as a bare phone number. An empty
/// allowlist admits everyone.
pub(crate) fn sender_allowed(allow_from: &[String], sender: &str) -> bool {
    if allow_from.is_empty() {
        return true;
    }
    let phone = sender.split('@').next().unwrap_or(sender);
    allow_from.iter().any(|allowed| allowed == sender || allowed == phone)
}

/// Write the raw QR payload to `path`, exactly as the bridge delivered it.
fn persist_qr(path: &Path, payload: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, payload)?;
    Ok(())
}

pub struct WhatsAppChannel {
    config: Config,
    paths: Paths,
    inbound_tx: mpsc::Sender<InboundMessage>,
    seen_messages: Arc<Mutex<HashSet<String>>>,
    /// Shared send-half of the active bridge WebSocket connection.
    shared_sink: Arc<Mutex<Option<WsSink>>>,
}

impl WhatsAppChannel {
    pub fn new(config: Config, paths: Paths, inbound_tx: mpsc::Sender<InboundMessage>) -> Self {
        Self {
            config,
            paths,
            inbound_tx,
            seen_messages: Arc::new(Mutex::new(HashSet::new())),
            shared_sink: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn run_loop(self: Arc<Self>, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        if !self.config.channels.whatsapp.enabled {
            info!("WhatsApp channel disabled");
            return;
        }

        let bridge_url = &self.config.channels.whatsapp.bridge_url;
        if bridge_url.is_empty() {
            warn!("WhatsApp bridge URL not configured");
            return;
        }

        info!(bridge_url = %bridge_url, "WhatsApp channel starting");

        loop {
            tokio::select! {
                result = self.connect_and_run() => {
                    match result {
                        Ok(_) => {
                            info!("WhatsApp connection closed normally");
                        }
                        Err(e) => {
                            error!(error = %e, "WhatsApp connection error, reconnecting in 5s");
                        }
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(tokio::time::Duration::from_secs(5)) => {}
                        _ = shutdown.recv() => {
                            info!("WhatsApp channel shutting down");
                            break;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("WhatsApp channel shutting down");
                    break;
                }
            }
        }
    }

    async fn connect_and_run(&self) -> Result<()> {
        let bridge_url = &self.config.channels.whatsapp.bridge_url;
        let url = url::Url::parse(bridge_url)
            .map_err(|e| Error::Channel(format!("Invalid bridge URL: {}", e)))?;

        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| Error::Channel(format!("WebSocket connection failed: {}", e)))?;

        info!("Connected to WhatsApp bridge");

        let (write, mut read) = ws_stream.split();
        // Store the write half so send() can reuse this connection.
        *self.shared_sink.lock().await = Some(write);

        loop {
            match read.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    if let Err(e) = self.handle_message(&text).await {
                        error!(error = %e, "Failed to handle WhatsApp message");
                    }
                }
                Some(Ok(WsMessage::Close(_))) => {
                    info!("WhatsApp bridge closed connection");
                    break;
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    let mut guard = self.shared_sink.lock().await;
                    if let Some(ref mut write) = *guard {
                        if let Err(e) = write.send(WsMessage::Pong(data)).await {
                            error!(error = %e, "Failed to send pong");
                        }
                    }
                }
                Some(Err(e)) => {
                    error!(error = %e, "WebSocket error");
                    break;
                }
                None => break,
                _ => {}
            }
        }

        // Clear the shared sink on disconnect.
        *self.shared_sink.lock().await = None;
        Ok(())
    }

    async fn handle_message(&self, text: &str) -> Result<()> {
        let msg: BridgeMessage = serde_json::from_str(text)
            .map_err(|e| Error::Channel(format!("Failed to parse bridge message: {}", e)))?;

        match msg.msg_type.as_str() {
            "message" => {
                let sender = msg.sender.as_deref().unwrap_or("");
                if sender.is_empty() {
                    return Ok(());
                }

                if !sender_allowed(&self.config.channels.whatsapp.allow_from, sender) {
                    debug!(sender = %sender, "Sender not in allowlist, ignoring");
                    return Ok(());
                }

                let content = msg.content.as_deref().unwrap_or("");
                if content.is_empty() {
                    return Ok(());
                }

                // Dedup by message id; the bridge resends on reconnect.
                let dedup_key = if let Some(id) = msg.id.as_deref() {
                    format!("id:{}", id)
                } else {
                    let ts = msg
                        .timestamp
                        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
                    format!("fallback:{}:{}:{}", sender, ts, content)
                };
                {
                    let mut seen = self.seen_messages.lock().await;
                    if seen.contains(&dedup_key) {
                        debug!(key = %dedup_key, "Duplicate WhatsApp message, skipping");
                        return Ok(());
                    }
                    seen.insert(dedup_key);
                    if seen.len() > 1000 {
                        let to_remove: Vec<_> = seen.iter().take(100).cloned().collect();
                        for k in to_remove {
                            seen.remove(&k);
                        }
                    }
                }

                let inbound = InboundMessage {
                    channel: "whatsapp".to_string(),
                    sender_id: sender.to_string(),
                    chat_id: sender.to_string(),
                    content: content.to_string(),
                    metadata: serde_json::json!({
                        "message_id": msg.id,
                        "is_group": msg.is_group.unwrap_or(false),
                    }),
                    timestamp_ms: msg
                        .timestamp
                        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
                };

                self.inbound_tx
                    .send(inbound)
                    .await
                    .map_err(|e| Error::Channel(e.to_string()))?;
            }
            "status" => {
                if let Some(status) = &msg.status {
                    if status == "CONNECTED" {
                        info!("WhatsApp session connected");
                    } else {
                        info!(status = %status, "WhatsApp bridge status");
                    }
                }
            }
            "qr" => {
                if let Some(qr) = &msg.qr {
                    let qr_path = self.paths.qr_code_file();
                    match persist_qr(&qr_path, qr) {
                        Ok(_) => info!(path = %qr_path.display(), "WhatsApp QR code saved, scan it with your phone"),
                        Err(e) => error!(error = %e, "Failed to save WhatsApp QR code"),
                    }
                }
            }
            "error" => {
                if let Some(error) = &msg.error {
                    error!(error = %error, "WhatsApp bridge error");
                }
            }
            _ => {
                debug!(msg_type = %msg.msg_type, "Unknown message type from bridge");
            }
        }

        Ok(())
    }

    /// Send a message, reusing the persistent bridge connection when available.
    pub async fn send(&self, chat_id: &str, text: &str) -> Result<()> {
        send_message_inner(&self.config, chat_id, text, Some(&self.shared_sink)).await
    }
}

/// Send a message via the WhatsApp bridge over a short-lived connection.
/// Prefer `WhatsAppChannel::send` when a persistent channel is running.
pub async fn send_message(config: &Config, chat_id: &str, text: &str) -> Result<()> {
    send_message_inner(config, chat_id, text, None).await
}

async fn send_message_inner(
    config: &Config,
    chat_id: &str,
    text: &str,
    sink: Option<&Mutex<Option<WsSink>>>,
) -> Result<()> {
    let json = {
        let msg = SendMessage {
            msg_type: "send",
            to: chat_id,
            text,
        };
        serde_json::to_string(&msg)
            .map_err(|e| Error::Channel(format!("Failed to serialize message: {}", e)))?
    };

    // Try to reuse the persistent connection first.
    if let Some(sink_lock) = sink {
        let mut guard = sink_lock.lock().await;
        if let Some(ref mut write) = *guard {
            match write.send(WsMessage::Text(json.clone())).await {
                Ok(_) => return Ok(()),
                Err(e) => {
                    warn!(error = %e, "WhatsApp shared sink broken, falling back to new connection");
                    *guard = None;
                }
            }
        }
    }

    crate::rate_limit::whatsapp_limiter().acquire().await;
    let bridge_url = &config.channels.whatsapp.bridge_url;
    let url = url::Url::parse(bridge_url)
        .map_err(|e| Error::Channel(format!("Invalid bridge URL: {}", e)))?;

    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| Error::Channel(format!("WhatsApp bridge connect failed: {}", e)))?;

    let (mut write, _) = ws_stream.split();
    write
        .send(WsMessage::Text(json))
        .await
        .map_err(|e| Error::Channel(format!("Failed to send WhatsApp message: {}", e)))?;
    write
        .close()
        .await
        .map_err(|e| Error::Channel(format!("Failed to close WhatsApp connection: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bridge_message() {
        let raw = r#"{"type":"message","id":"ABC123","sender":"5521980306189@c.us","content":"qual foi o produto mais vendido?","timestamp":1719342000000}"#;
        let msg: BridgeMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.msg_type, "message");
        assert_eq!(msg.sender.as_deref(), Some("5521980306189@c.us"));
        assert_eq!(msg.id.as_deref(), Some("ABC123"));
    }

    #[test]
    fn test_parse_qr_frame() {
        let raw = r#"{"type":"qr","qr":"data:image/png;base64,iVBORw0KGgo="}"#;
        let msg: BridgeMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.msg_type, "qr");
        assert!(msg.qr.unwrap().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_sender_allowlist() {
        let allow = vec!["5521980306189@c.us".to_string()];
        assert!(sender_allowed(&allow, "5521980306189@c.us"));
        assert!(!sender_allowed(&allow, "5511999999999@c.us"));

        // Bare phone numbers also match the JID.
        let allow = vec!["5521980306189".to_string()];
        assert!(sender_allowed(&allow, "5521980306189@c.us"));

        // Empty allowlist admits everyone.
        assert!(sender_allowed(&[], "anyone@c.us"));
    }

    #[test]
    fn test_persist_qr_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qrcode_wpp.txt");
        let payload = "data:image/png;base64,iVBORw0KGgo=";
        persist_qr(&path, payload).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), payload);
    }

    #[tokio::test]
    async fn test_duplicate_message_id_delivered_once() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_base(dir.path().to_path_buf());
        let (tx, mut rx) = mpsc::channel(4);
        let channel = WhatsAppChannel::new(Config::default(), paths, tx);

        let frame = r#"{"type":"message","id":"DUP1","sender":"5521980306189@c.us","content":"oi","timestamp":1719342000000}"#;
        channel.handle_message(frame).await.unwrap();
        channel.handle_message(frame).await.unwrap();

        let inbound = rx.try_recv().unwrap();
        assert_eq!(inbound.content, "oi");
        assert!(rx.try_recv().is_err());
    }
}
