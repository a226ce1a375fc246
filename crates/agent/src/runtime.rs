use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use vendabot_core::types::{ChatMessage, LLMResponse, ToolCallRequest};
use vendabot_core::{Config, InboundMessage, OutboundMessage, Paths, ResponderMode, Result};
use vendabot_providers::Provider;
use vendabot_storage::SessionStore;
use vendabot_tools::{SalesDb, ToolContext, ToolRegistry};

use crate::prompt::build_system_prompt;
use crate::responder::{CommandResponder, APOLOGY};

pub struct AgentRuntime {
    config: Config,
    provider: Arc<dyn Provider>,
    tool_registry: ToolRegistry,
    session_store: SessionStore,
    sales: Arc<SalesDb>,
    /// Set when replies come from an external command instead of the
    /// in-process agent.
    responder: Option<CommandResponder>,
    outbound_tx: Option<mpsc::Sender<OutboundMessage>>,
}

impl AgentRuntime {
    pub fn new(config: Config, paths: Paths, provider: Arc<dyn Provider>) -> Result<Self> {
        let db_path = config
            .tools
            .sales
            .db_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| paths.sales_db());
        let sales = Arc::new(SalesDb::open(&db_path)?);

        let responder = match config.agents.defaults.responder.mode {
            ResponderMode::Command => Some(CommandResponder::from_config(
                &config.agents.defaults.responder,
            )),
            ResponderMode::Builtin => None,
        };

        Ok(Self {
            session_store: SessionStore::new(paths),
            tool_registry: ToolRegistry::with_defaults(),
            config,
            provider,
            sales,
            responder,
            outbound_tx: None,
        })
    }

    pub fn with_outbound(mut self, tx: mpsc::Sender<OutboundMessage>) -> Self {
        self.outbound_tx = Some(tx);
        self
    }

    /// Consume inbound messages until the channel closes or shutdown fires.
    /// Messages are processed one at a time; conversations are sequential.
    pub async fn run_loop(
        mut self,
        mut inbound_rx: mpsc::Receiver<InboundMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        info!("Agent runtime started");
        loop {
            tokio::select! {
                maybe_msg = inbound_rx.recv() => {
                    match maybe_msg {
                        Some(msg) => {
                            if let Err(e) = self.process_message(msg).await {
                                error!(error = %e, "Failed to process message");
                            }
                        }
                        None => break,
                    }
                }
                _ = shutdown.recv() => {
                    info!("Agent runtime shutting down");
                    break;
                }
            }
        }
    }

    pub async fn process_message(&mut self, msg: InboundMessage) -> Result<String> {
        let session_key = msg.session_key();
        let msg_id = format!("msg_{}", uuid::Uuid::new_v4());
        info!(msg_id = %msg_id, session_key = %session_key, channel = %msg.channel, "Processing message");

        let mut history = self.session_store.load(&session_key)?;

        let final_response = if let Some(responder) = &self.responder {
            let reply = responder.respond(&msg.content).await;
            history.push(ChatMessage::user(&msg.content));
            history.push(ChatMessage::assistant(&reply));
            reply
        } else {
            self.run_agent_loop(&msg, &mut history).await?
        };

        self.session_store.save(&session_key, &history)?;
        debug!(msg_id = %msg_id, chars = final_response.len(), "Response ready");

        if let Some(tx) = &self.outbound_tx {
            let outbound = OutboundMessage::new(&msg.channel, &msg.chat_id, &final_response);
            if let Err(e) = tx.send(outbound).await {
                error!(error = %e, "Failed to queue outbound message");
            }
        }

        Ok(final_response)
    }

    async fn run_agent_loop(
        &self,
        msg: &InboundMessage,
        history: &mut Vec<ChatMessage>,
    ) -> Result<String> {
        let mut messages = vec![ChatMessage::system(&build_system_prompt())];
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(&msg.content));
        history.push(ChatMessage::user(&msg.content));

        let tools = self.tool_registry.get_tool_schemas();
        let max_iterations = self.config.agents.defaults.max_tool_iterations;
        let mut final_response = String::new();

        for iteration in 0..max_iterations {
            debug!(iteration, "LLM call iteration");

            let response = match self.chat_with_retry(&messages, &tools, iteration).await {
                Some(r) => r,
                None => {
                    final_response = APOLOGY.to_string();
                    history.push(ChatMessage::assistant(&final_response));
                    break;
                }
            };

            info!(
                content_len = response.content.as_ref().map(|c| c.len()).unwrap_or(0),
                tool_calls_count = response.tool_calls.len(),
                finish_reason = %response.finish_reason,
                "LLM response received"
            );

            if !response.tool_calls.is_empty() {
                let mut assistant_msg =
                    ChatMessage::assistant(response.content.as_deref().unwrap_or(""));
                assistant_msg.tool_calls = Some(response.tool_calls.clone());
                messages.push(assistant_msg.clone());
                history.push(assistant_msg);

                for tool_call in &response.tool_calls {
                    let result = self.execute_tool_call(tool_call, msg).await;
                    let mut tool_msg = ChatMessage::tool_result(&tool_call.id, &result);
                    tool_msg.name = Some(tool_call.name.clone());
                    messages.push(tool_msg.clone());
                    history.push(tool_msg);
                }

                if iteration == max_iterations - 1 {
                    warn!("Reached max tool iterations");
                    final_response = response.content.unwrap_or_else(|| {
                        "Desculpe, não consegui concluir a consulta dentro do limite de etapas."
                            .to_string()
                    });
                    history.push(ChatMessage::assistant(&final_response));
                }
            } else {
                final_response = response.content.unwrap_or_default();
                history.push(ChatMessage::assistant(&final_response));
                break;
            }
        }

        Ok(final_response)
    }

    /// Call the LLM, retrying transient failures with exponential backoff.
    async fn chat_with_retry(
        &self,
        messages: &[ChatMessage],
        tools: &[Value],
        iteration: u32,
    ) -> Option<LLMResponse> {
        let max_retries = self.config.agents.defaults.llm_max_retries;
        let base_delay_ms = self.config.agents.defaults.llm_retry_delay_ms;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let delay_ms = base_delay_ms * (1u64 << (attempt - 1).min(4));
                warn!(attempt, max_retries, delay_ms, iteration, "Retrying LLM call");
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            }
            match self.provider.chat(messages, tools).await {
                Ok(r) => {
                    if attempt > 0 {
                        info!(attempt, iteration, "LLM call succeeded after retry");
                    }
                    return Some(r);
                }
                Err(e) => {
                    warn!(error = %e, attempt, max_retries, iteration, "LLM call failed");
                }
            }
        }
        None
    }

    /// Run a tool call and serialize the outcome for the model. Failures
    /// come back as an error row instead of breaking the loop, so the LLM
    /// can explain the problem to the user.
    async fn execute_tool_call(&self, call: &ToolCallRequest, msg: &InboundMessage) -> String {
        info!(tool = %call.name, args = %call.arguments, "Executing tool call");
        let ctx = ToolContext {
            session_key: msg.session_key(),
            channel: msg.channel.clone(),
            chat_id: msg.chat_id.clone(),
            sales: self.sales.clone(),
        };
        match self
            .tool_registry
            .execute(&call.name, ctx, call.arguments.clone())
            .await
        {
            Ok(value) => value.to_string(),
            Err(e) => {
                error!(tool = %call.name, error = %e, "Tool execution failed");
                serde_json::json!([{ "error": e.to_string() }]).to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use vendabot_core::config::ResponderMode;
    use vendabot_core::Error;

    struct StubProvider {
        responses: Mutex<VecDeque<Result<LLMResponse>>>,
    }

    impl StubProvider {
        fn new(responses: Vec<Result<LLMResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl Provider for StubProvider {
        async fn chat(&self, _messages: &[ChatMessage], _tools: &[Value]) -> Result<LLMResponse> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Provider("no more scripted responses".to_string())))
        }
    }

    fn test_runtime(
        dir: &tempfile::TempDir,
        mut config: Config,
        provider: StubProvider,
    ) -> AgentRuntime {
        let paths = Paths::with_base(dir.path().to_path_buf());
        paths.ensure_dirs().unwrap();
        config.agents.defaults.llm_retry_delay_ms = 1;
        AgentRuntime::new(config, paths, Arc::new(provider)).unwrap()
    }

    fn tool_call_response(name: &str, args: Value) -> LLMResponse {
        LLMResponse {
            content: None,
            tool_calls: vec![ToolCallRequest {
                id: "call_1".to_string(),
                name: name.to_string(),
                arguments: args,
            }],
            finish_reason: "tool_calls".to_string(),
            usage: Value::Null,
        }
    }

    fn text_response(text: &str) -> LLMResponse {
        LLMResponse {
            content: Some(text.to_string()),
            tool_calls: vec![],
            finish_reason: "stop".to_string(),
            usage: Value::Null,
        }
    }

    #[tokio::test]
    async fn test_builtin_tool_loop() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StubProvider::new(vec![
            Ok(tool_call_response(
                "get_monthly_revenue",
                json!({"month": 6, "year": 2024}),
            )),
            Ok(text_response("A receita de junho de 2024 foi R$ 1.100.000,00.")),
        ]);
        let mut runtime = test_runtime(&dir, Config::default(), provider);
        runtime
            .sales
            .insert_sale("Galaxy S24", "Samsung", 6, 2024, 150, 1_100_000.0)
            .unwrap();

        let reply = runtime
            .process_message(InboundMessage::cli("qual a receita de junho?"))
            .await
            .unwrap();
        assert_eq!(reply, "A receita de junho de 2024 foi R$ 1.100.000,00.");

        // Session persisted: user, assistant with tool calls, tool result, assistant.
        let history = runtime.session_store.load("cli:default").unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[1].role, "assistant");
        assert!(history[1].tool_calls.is_some());
        assert_eq!(history[2].role, "tool");
        assert!(history[2].text().contains("revenue_total"));
    }

    #[tokio::test]
    async fn test_provider_failure_yields_apology() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.agents.defaults.llm_max_retries = 1;
        let provider = StubProvider::new(vec![
            Err(Error::Provider("rate limited".to_string())),
            Err(Error::Provider("rate limited".to_string())),
        ]);
        let mut runtime = test_runtime(&dir, config, provider);

        let reply = runtime
            .process_message(InboundMessage::cli("oi"))
            .await
            .unwrap();
        assert_eq!(reply, APOLOGY);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.agents.defaults.llm_max_retries = 2;
        let provider = StubProvider::new(vec![
            Err(Error::Provider("timeout".to_string())),
            Ok(text_response("Olá! Como posso ajudar?")),
        ]);
        let mut runtime = test_runtime(&dir, config, provider);

        let reply = runtime
            .process_message(InboundMessage::cli("oi"))
            .await
            .unwrap();
        assert_eq!(reply, "Olá! Como posso ajudar?");
    }

    #[tokio::test]
    async fn test_command_mode_sends_outbound() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.agents.defaults.responder.mode = ResponderMode::Command;
        config.agents.defaults.responder.command = "/bin/sh".to_string();
        config.agents.defaults.responder.args =
            vec!["-c".to_string(), "printf ok".to_string(), "sh".to_string()];

        let (tx, mut rx) = mpsc::channel(4);
        let provider = StubProvider::new(vec![]);
        let mut runtime = test_runtime(&dir, config, provider).with_outbound(tx);

        let mut msg = InboundMessage::cli("pergunta");
        msg.channel = "whatsapp".to_string();
        msg.chat_id = "5521980306189@c.us".to_string();

        let reply = runtime.process_message(msg).await.unwrap();
        assert_eq!(reply, "ok");

        let outbound = rx.recv().await.unwrap();
        assert_eq!(outbound.channel, "whatsapp");
        assert_eq!(outbound.chat_id, "5521980306189@c.us");
        assert_eq!(outbound.content, "ok");
    }

    #[tokio::test]
    async fn test_unknown_tool_surfaces_error_row() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StubProvider::new(vec![
            Ok(tool_call_response("get_weather", json!({}))),
            Ok(text_response("Não tenho essa informação.")),
        ]);
        let mut runtime = test_runtime(&dir, Config::default(), provider);

        let reply = runtime
            .process_message(InboundMessage::cli("como está o tempo?"))
            .await
            .unwrap();
        assert_eq!(reply, "Não tenho essa informação.");

        let history = runtime.session_store.load("cli:default").unwrap();
        assert!(history[2].text().contains("error"));
    }
}
