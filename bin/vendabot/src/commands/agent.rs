use std::io::{self, Write};
use std::sync::Arc;
use vendabot_agent::AgentRuntime;
use vendabot_core::{Config, InboundMessage, Paths};
use vendabot_providers::{create_provider, Provider};

fn session_message(session: &str, content: &str) -> InboundMessage {
    let (channel, chat_id) = session.split_once(':').unwrap_or(("cli", session));
    let mut msg = InboundMessage::cli(content);
    msg.channel = channel.to_string();
    msg.chat_id = chat_id.to_string();
    msg
}

pub async fn run(message: Option<String>, session: String) -> anyhow::Result<()> {
    let paths = Paths::new();
    paths.ensure_dirs()?;
    let config = Config::load_or_default(&paths)?;

    let provider: Arc<dyn Provider> = Arc::from(create_provider(&config)?);
    let mut runtime = AgentRuntime::new(config, paths, provider)?;

    if let Some(message) = message {
        let reply = runtime
            .process_message(session_message(&session, &message))
            .await?;
        println!("{}", reply);
        return Ok(());
    }

    // Interactive mode.
    println!("vendabot agent (session: {}). Type 'exit' to quit.", session);
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        match runtime.process_message(session_message(&session, input)).await {
            Ok(reply) => println!("{}", reply),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    Ok(())
}
