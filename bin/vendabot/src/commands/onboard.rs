use std::io::{self, Write};
use vendabot_core::Paths;
use vendabot_tools::SalesDb;

const EXAMPLE_CONFIG: &str = r#"{
  "providers": {
    "groq": {
      "apiKey": "",
      "apiBase": "https://api.groq.com/openai/v1"
    },
    "openai": {
      "apiKey": "",
      "apiBase": "https://api.openai.com/v1"
    },
    "openrouter": {
      "apiKey": "",
      "apiBase": "https://openrouter.ai/api/v1"
    },
    "deepseek": {
      "apiKey": "",
      "apiBase": "https://api.deepseek.com/v1"
    }
  },
  "agents": {
    "defaults": {
      "model": "llama-3.1-8b-instant",
      "maxTokens": 4096,
      "temperature": 0.7,
      "maxToolIterations": 10,
      "llmMaxRetries": 3,
      "llmRetryDelayMs": 2000,
      "responder": {
        "mode": "builtin",
        "command": "python",
        "args": [],
        "timeoutSecs": 120
      }
    }
  },
  "channels": {
    "whatsapp": {
      "enabled": false,
      "bridgeUrl": "ws://localhost:3001",
      "allowFrom": []
    },
    "evolution": {
      "enabled": false,
      "host": "0.0.0.0",
      "port": 8080,
      "apiUrl": "http://localhost:8080",
      "apiKey": "",
      "instance": "default",
      "allowFrom": []
    }
  },
  "tools": {
    "sales": {
      "dbPath": null
    }
  }
}
"#;

pub async fn run(force: bool) -> anyhow::Result<()> {
    let paths = Paths::new();

    if paths.config_file().exists() && !force {
        print!("Config already exists. Overwrite? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    paths.ensure_dirs()?;

    if let Some(parent) = paths.config_file().parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(paths.config_file(), EXAMPLE_CONFIG)?;
    println!("✓ Created config: {}", paths.config_file().display());
    println!("✓ Created workspace: {}", paths.workspace().display());

    SalesDb::open(&paths.sales_db())?;
    println!("✓ Created sales database: {}", paths.sales_db().display());
    println!();
    println!("Next steps:");
    println!("  1. Set GROQ_API_KEY (or add an API key to the config file)");
    println!("  2. Run `vendabot sales import <csv>` to load sales data");
    println!("  3. Run `vendabot status` to verify configuration");
    println!("  4. Run `vendabot agent` to chat, or `vendabot serve` to go live");

    Ok(())
}
