use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub channel: String,
    pub sender_id: String,
    pub chat_id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub timestamp_ms: i64,
}

impl InboundMessage {
    pub fn session_key(&self) -> String {
        format!("{}:{}", self.channel, self.chat_id)
    }

    pub fn cli(content: &str) -> Self {
        Self {
            channel: "cli".to_string(),
            sender_id: "user".to_string(),
            chat_id: "default".to_string(),
            content: content.to_string(),
            metadata: serde_json::Value::Null,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub channel: String,
    pub chat_id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl OutboundMessage {
    pub fn new(channel: &str, chat_id: &str, content: &str) -> Self {
        Self {
            channel: channel.to_string(),
            chat_id: chat_id.to_string(),
            content: content.to_string(),
            metadata: serde_json::Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key() {
        let msg = InboundMessage {
            channel: "whatsapp".to_string(),
            sender_id: "5521980306189@c.us".to_string(),
            chat_id: "5521980306189@c.us".to_string(),
            content: "qual celular vendeu mais?".to_string(),
            metadata: serde_json::Value::Null,
            timestamp_ms: 0,
        };
        assert_eq!(msg.session_key(), "whatsapp:5521980306189@c.us");
    }

    #[test]
    fn test_cli_message_defaults() {
        let msg = InboundMessage::cli("hello");
        assert_eq!(msg.channel, "cli");
        assert_eq!(msg.chat_id, "default");
        assert_eq!(msg.content, "hello");
    }
}
