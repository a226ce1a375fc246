//! External command responder. The message body is handed to a configured
//! interpreter as its last argument; whatever the process prints on stdout
//! becomes the reply.

use std::time::Duration;
use tokio::process::Command;
use tracing::{error, info, warn};
use vendabot_core::config::ResponderConfig;

/// Canned reply when the responder process fails for any reason.
pub const APOLOGY: &str = "Desculpe, ocorreu um erro ao processar sua solicitação.";

pub struct CommandResponder {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandResponder {
    pub fn from_config(config: &ResponderConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs as u64),
        }
    }

    /// Run the responder process with `text` appended to the fixed args.
    /// Exit status 0 yields stdout verbatim; any failure (non-zero exit,
    /// spawn error, timeout) yields the apology string.
    pub async fn respond(&self, text: &str) -> String {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args).arg(text).kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!(command = %self.command, error = %e, "Responder process failed to start");
                return APOLOGY.to_string();
            }
            Err(_) => {
                warn!(command = %self.command, timeout_secs = self.timeout.as_secs(), "Responder process timed out");
                return APOLOGY.to_string();
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            // The responder may log progress on stderr; surface it at debug level.
            tracing::debug!(stderr = %stderr.trim_end(), "Responder stderr");
        }

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout).to_string();
            info!(reply_len = stdout.len(), "Responder process succeeded");
            stdout
        } else {
            error!(
                command = %self.command,
                code = output.status.code().unwrap_or(-1),
                "Responder process exited with error"
            );
            APOLOGY.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vendabot_core::config::ResponderConfig;
    use vendabot_core::config::ResponderMode;

    fn shell_responder(script: &str, timeout_secs: u32) -> CommandResponder {
        // With sh -c, the argument after the script becomes $0, so a
        // placeholder keeps the appended message body addressable as $1.
        CommandResponder::from_config(&ResponderConfig {
            mode: ResponderMode::Command,
            command: "/bin/sh".to_string(),
            args: vec!["-c".to_string(), script.to_string(), "sh".to_string()],
            timeout_secs,
        })
    }

    #[tokio::test]
    async fn test_exit_zero_returns_stdout_verbatim() {
        let responder = shell_responder("printf 'resposta: %s\\n' \"$1\"", 10);
        let reply = responder.respond("qual o mais vendido?").await;
        assert_eq!(reply, "resposta: qual o mais vendido?\n");
    }

    #[tokio::test]
    async fn test_nonzero_exit_returns_apology() {
        let responder = shell_responder("echo partial output; exit 3", 10);
        let reply = responder.respond("oi").await;
        assert_eq!(reply, APOLOGY);
    }

    #[tokio::test]
    async fn test_missing_command_returns_apology() {
        let responder = CommandResponder::from_config(&ResponderConfig {
            mode: ResponderMode::Command,
            command: "/nonexistent/interpreter".to_string(),
            args: vec![],
            timeout_secs: 10,
        });
        assert_eq!(responder.respond("oi").await, APOLOGY);
    }

    #[tokio::test]
    async fn test_timeout_returns_apology() {
        let responder = shell_responder("sleep 5", 1);
        assert_eq!(responder.respond("oi").await, APOLOGY);
    }
}
