//! Conversational agent — tool selection loop with session memory.
//!
//! Each turn renders the system prompt, the session's recent transcript and
//! the user's message, then loops: the model either names a tool to run or
//! gives a final answer. Tool output normally re-enters the loop as an
//! observation; tools marked `return_direct` short-circuit and their output
//! is the reply. The loop is bounded by `max_steps` tool invocations.

pub mod decision;
pub mod prompt;

use tracing::{debug, warn};

use crate::error::AppError;
use crate::llm::{ChatMessage, LlmProvider, Role};
use crate::memory::SessionMemory;
use crate::tools::ToolSet;

use decision::{Decision, parse_decision};

pub use prompt::PromptBuilder;

pub struct ChatAgent {
    llm: LlmProvider,
    tools: ToolSet,
    memory: SessionMemory,
    system_prompt: String,
    history_window: usize,
    max_steps: usize,
}

impl ChatAgent {
    pub fn new(
        llm: LlmProvider,
        tools: ToolSet,
        memory: SessionMemory,
        system_prompt: String,
        history_window: usize,
        max_steps: usize,
    ) -> Self {
        Self {
            llm,
            tools,
            memory,
            system_prompt,
            history_window,
            max_steps: max_steps.max(1),
        }
    }

    /// Handle one user turn for `session_id` and return the reply.
    ///
    /// Both the user message and the final reply are appended to the
    /// session transcript, so the next turn sees them as history.
    pub async fn chat(&self, session_id: &str, input: &str) -> Result<String, AppError> {
        let mut messages = Vec::with_capacity(self.history_window + 2);
        if !self.system_prompt.is_empty() {
            messages.push(ChatMessage::system(self.system_prompt.clone()));
        }
        for entry in self.memory.history(session_id, self.history_window)? {
            messages.push(ChatMessage {
                role: Role::parse(&entry.role),
                content: entry.content,
            });
        }
        messages.push(ChatMessage::user(input));

        self.memory.append(session_id, "user", input)?;

        let answer = self.run_loop(&mut messages).await?;

        self.memory.append(session_id, "assistant", &answer)?;
        Ok(answer)
    }

    async fn run_loop(&self, messages: &mut Vec<ChatMessage>) -> Result<String, AppError> {
        let mut last_observation: Option<String> = None;

        for step in 0..self.max_steps {
            let reply = self.llm.complete(messages).await?;

            match parse_decision(&reply) {
                Decision::Final(text) => {
                    debug!(step, "agent finished");
                    return Ok(text);
                }
                Decision::Action { tool, input } => {
                    let observation = match self.tools.get(&tool) {
                        None => {
                            warn!(%tool, "model asked for unknown tool");
                            format!(
                                "Unknown tool '{}'. The only valid tools are: {}.",
                                tool,
                                self.tools.names().join(", ")
                            )
                        }
                        Some(t) => {
                            debug!(step, tool = t.name(), %input, "running tool");
                            match t.run(&input).await {
                                Ok(output) if t.return_direct() => {
                                    debug!(tool = t.name(), "tool output returned directly");
                                    return Ok(output);
                                }
                                Ok(output) => output,
                                Err(e) => {
                                    // Feed failures back as observations so the
                                    // model can recover or fall back.
                                    warn!(tool = t.name(), error = %e, "tool failed");
                                    format!("The tool failed: {e}")
                                }
                            }
                        }
                    };

                    messages.push(ChatMessage::assistant(reply));
                    messages.push(ChatMessage::user(format!(
                        "Observation: {observation}\n\n\
                         Use another tool if needed, or reply with your Final Answer."
                    )));
                    last_observation = Some(observation);
                }
            }
        }

        warn!(max_steps = self.max_steps, "agent stopped at step limit");
        Ok(match last_observation {
            Some(obs) => format!(
                "I could not finish reasoning about that, but here is what I found:\n{obs}"
            ),
            None => "I could not finish reasoning about that request. Please try rephrasing it."
                .to_string(),
        })
    }
}
