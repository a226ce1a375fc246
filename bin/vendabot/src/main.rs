mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "vendabot")]
#[command(about = "WhatsApp sales assistant for a smartphone store", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize vendabot configuration and workspace
    Onboard {
        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration status
    Status,

    /// Talk to the agent from the terminal
    Agent {
        /// Message to send (interactive mode if not provided)
        #[arg(short, long)]
        message: Option<String>,

        /// Session ID
        #[arg(short, long, default_value = "cli:default")]
        session: String,
    },

    /// Run the bot (channels + agent, long-running)
    Serve,

    /// Manage channels
    Channels {
        #[command(subcommand)]
        command: ChannelsCommands,
    },

    /// Manage the sales database
    Sales {
        #[command(subcommand)]
        command: SalesCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ChannelsCommands {
    /// Show channels status
    Status,
    /// Login to a channel (e.g. WhatsApp QR)
    Login {
        /// Channel name
        channel: String,
    },
}

#[derive(Subcommand)]
enum SalesCommands {
    /// Create the sales database and schema
    Init,
    /// Import sales rows from a CSV file
    Import {
        /// CSV file with headers model,manufacturer,month,year,units_sold,revenue
        file: String,
    },
    /// Show sales database statistics
    Summary,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Get a config value by dot-separated key (e.g. agents.defaults.model)
    Get {
        /// Config key path
        key: String,
    },
    /// Set a config value by dot-separated key
    Set {
        /// Config key path
        key: String,
        /// Value to set (auto-detects JSON types)
        value: String,
    },
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // API keys commonly live in a .env next to the binary.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Onboard { force } => {
            commands::onboard::run(force).await?;
        }
        Commands::Status => {
            commands::status::run().await?;
        }
        Commands::Agent { message, session } => {
            commands::agent::run(message, session).await?;
        }
        Commands::Serve => {
            commands::serve::run().await?;
        }
        Commands::Channels { command } => match command {
            ChannelsCommands::Status => {
                commands::channels::status().await?;
            }
            ChannelsCommands::Login { channel } => {
                commands::channels::login(&channel).await?;
            }
        },
        Commands::Sales { command } => match command {
            SalesCommands::Init => {
                commands::sales_cmd::init().await?;
            }
            SalesCommands::Import { file } => {
                commands::sales_cmd::import(&file).await?;
            }
            SalesCommands::Summary => {
                commands::sales_cmd::summary().await?;
            }
        },
        Commands::Config { command } => match command {
            ConfigCommands::Get { key } => {
                commands::config_cmd::get(&key).await?;
            }
            ConfigCommands::Set { key, value } => {
                commands::config_cmd::set(&key, &value).await?;
            }
            ConfigCommands::Path => {
                commands::config_cmd::path().await?;
            }
        },
    }

    Ok(())
}
