use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use vendabot_core::{Config, OutboundMessage, Result};

use crate::whatsapp::WhatsAppChannel;

pub struct ChannelManager {
    config: Config,
    /// Running WhatsApp channel, when one exists. Lets outbound messages
    /// reuse its persistent bridge connection.
    whatsapp: Option<Arc<WhatsAppChannel>>,
}

impl ChannelManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            whatsapp: None,
        }
    }

    pub fn with_whatsapp(mut self, channel: Arc<WhatsAppChannel>) -> Self {
        self.whatsapp = Some(channel);
        self
    }

    pub async fn start_outbound_dispatcher(&self, mut outbound_rx: mpsc::Receiver<OutboundMessage>) {
        info!("Outbound dispatcher started");

        while let Some(msg) = outbound_rx.recv().await {
            if let Err(e) = self.dispatch_outbound_msg(&msg).await {
                error!(error = %e, channel = %msg.channel, "Failed to dispatch outbound message");
            }
        }

        info!("Outbound dispatcher stopped");
    }

    pub async fn dispatch_outbound_msg(&self, msg: &OutboundMessage) -> Result<()> {
        match msg.channel.as_str() {
            "whatsapp" => {
                if let Some(channel) = &self.whatsapp {
                    channel.send(&msg.chat_id, &msg.content).await?;
                } else {
                    crate::whatsapp::send_message(&self.config, &msg.chat_id, &msg.content).await?;
                }
            }
            "evolution" => {
                crate::evolution::send_message(&self.config, &msg.chat_id, &msg.content).await?;
            }
            "cli" => {
                // Handled directly by the CLI, not through channel dispatch.
            }
            _ => {
                tracing::warn!(channel = %msg.channel, "Unknown channel for outbound message");
            }
        }
        Ok(())
    }

    pub fn get_status(&self) -> Vec<(String, bool, String)> {
        let mut status = Vec::new();

        let whatsapp = &self.config.channels.whatsapp;
        status.push((
            "whatsapp".to_string(),
            whatsapp.enabled,
            format!("bridge: {}", whatsapp.bridge_url),
        ));

        let evolution = &self.config.channels.evolution;
        let configured = !evolution.api_key.is_empty();
        status.push((
            "evolution".to_string(),
            evolution.enabled && configured,
            if configured {
                format!("webhook on {}:{}", evolution.host, evolution.port)
            } else {
                "apikey not set".to_string()
            },
        ));

        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reports_both_channels() {
        let mut config = Config::default();
        config.channels.whatsapp.enabled = true;
        let manager = ChannelManager::new(config);
        let status = manager.get_status();
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].0, "whatsapp");
        assert!(status[0].1);
        assert_eq!(status[1].0, "evolution");
        assert!(!status[1].1);
    }

    #[tokio::test]
    async fn test_dispatch_ignores_cli_channel() {
        let manager = ChannelManager::new(Config::default());
        let msg = OutboundMessage::new("cli", "local", "ok");
        assert!(manager.dispatch_outbound_msg(&msg).await.is_ok());
    }
}
