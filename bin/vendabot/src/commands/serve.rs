use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use vendabot_agent::{AgentRuntime, MessageBus};
use vendabot_channels::evolution::EvolutionChannel;
use vendabot_channels::{ChannelManager, WhatsAppChannel};
use vendabot_core::{Config, Paths};
use vendabot_providers::{create_provider, Provider};

/// Long-running mode: channels feed the agent through the message bus and
/// replies are dispatched back out.
pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new();
    paths.ensure_dirs()?;
    let config = Config::load_or_default(&paths)?;

    if !config.channels.whatsapp.enabled && !config.channels.evolution.enabled {
        anyhow::bail!("No channel enabled. Enable channels.whatsapp or channels.evolution in the config.");
    }

    let provider: Arc<dyn Provider> = Arc::from(create_provider(&config)?);

    let bus = MessageBus::new(100);
    let ((inbound_tx, inbound_rx), (outbound_tx, outbound_rx)) = bus.split();
    let (shutdown_tx, _) = broadcast::channel::<()>(4);

    // Channels.
    let whatsapp = Arc::new(WhatsAppChannel::new(
        config.clone(),
        paths.clone(),
        inbound_tx.clone(),
    ));
    if config.channels.whatsapp.enabled {
        tokio::spawn(whatsapp.clone().run_loop(shutdown_tx.subscribe()));
    }
    if config.channels.evolution.enabled {
        let evolution = EvolutionChannel::new(config.clone(), inbound_tx.clone());
        tokio::spawn(evolution.run_loop(shutdown_tx.subscribe()));
    }

    // Outbound dispatcher.
    let manager = ChannelManager::new(config.clone()).with_whatsapp(whatsapp);
    tokio::spawn(async move {
        manager.start_outbound_dispatcher(outbound_rx).await;
    });

    // Agent runtime.
    let runtime =
        AgentRuntime::new(config, paths, provider)?.with_outbound(outbound_tx);
    let runtime_handle = tokio::spawn(runtime.run_loop(inbound_rx, shutdown_tx.subscribe()));

    info!("vendabot serving. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    let _ = shutdown_tx.send(());

    // Give the runtime a moment to finish the in-flight message.
    let _ = tokio::time::timeout(std::time::Duration::from_secs(10), runtime_handle).await;

    Ok(())
}
