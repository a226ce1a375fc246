use vendabot_core::{Config, Paths};
use vendabot_tools::SalesDb;

pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new();

    println!("vendabot status");
    println!("===============");
    println!();

    let config_path = paths.config_file();
    let config_exists = config_path.exists();
    println!(
        "Config:    {} {}",
        config_path.display(),
        if config_exists { "✓" } else { "✗ (not found)" }
    );

    if !config_exists {
        println!();
        println!("Run `vendabot onboard` to initialize.");
        return Ok(());
    }

    let config = Config::load(&config_path)?;

    println!("Model:     {}", config.agents.defaults.model);
    println!(
        "Responder: {}",
        match config.agents.defaults.responder.mode {
            vendabot_core::ResponderMode::Builtin => "builtin agent".to_string(),
            vendabot_core::ResponderMode::Command => format!(
                "command ({} {})",
                config.agents.defaults.responder.command,
                config.agents.defaults.responder.args.join(" ")
            ),
        }
    );
    println!();

    println!("Providers:");
    for name in ["groq", "openai", "openrouter", "deepseek"] {
        let status = if let Some(provider) = config.providers.get(name) {
            if !provider.api_key.is_empty() {
                "✓ configured"
            } else {
                "✗ no key"
            }
        } else {
            "✗ not found"
        };
        println!("  {:<12} {}", name, status);
    }

    if let Some((name, _)) = config.get_api_key() {
        println!();
        println!("Active provider: {}", name);
    } else {
        println!();
        println!("⚠ No provider configured with API key");
    }

    println!();
    println!("Channels:");
    println!(
        "  whatsapp:  {}",
        if config.channels.whatsapp.enabled {
            format!("✓ enabled ({})", config.channels.whatsapp.bridge_url)
        } else {
            "disabled".to_string()
        }
    );
    println!(
        "  evolution: {}",
        if config.channels.evolution.enabled && !config.channels.evolution.api_key.is_empty() {
            format!(
                "✓ enabled (webhook on {}:{})",
                config.channels.evolution.host, config.channels.evolution.port
            )
        } else if config.channels.evolution.enabled {
            "enabled, but apikey not set".to_string()
        } else {
            "disabled".to_string()
        }
    );

    println!();
    let db_path = config
        .tools
        .sales
        .db_path
        .as_ref()
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| paths.sales_db());
    if db_path.exists() {
        let db = SalesDb::open(&db_path)?;
        let summary = db.summary()?;
        let rows = summary
            .as_array()
            .and_then(|a| a.first())
            .and_then(|r| r.get("rows"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        println!("Sales DB:  {} ({} rows)", db_path.display(), rows);
    } else {
        println!("Sales DB:  ✗ not found (run `vendabot sales init`)");
    }

    Ok(())
}
