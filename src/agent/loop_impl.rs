use std::error::Error;
use std::fmt::{Display, Formatter};

use serde_json::Value;

use crate::agent::dispatch::{FunctionCallSpec, dispatch_calls, tool_declarations};
use crate::agent::prompt::AGENT_SYSTEM_PROMPT;
use crate::llm::provider::{
    AssistantCandidate, AssistantInput, AssistantMessage, AssistantPart, AssistantRole, LlmError,
    LlmProvider,
};
use crate::probe::Probe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentConfig {
    /// Model calls allowed per turn before giving up on the tool loop.
    pub max_steps: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_steps: 10 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    ToolRequest { name: String, args_json: Value },
    ToolResult { name: String, response_json: Value },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    Provider(LlmError),
    Blocked { reason: String },
    EmptyResponse,
    StepLimit { max_steps: usize },
}

impl Display for TurnError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provider(err) => write!(f, "{err}"),
            Self::Blocked { reason } => write!(f, "response blocked by the model ({reason})"),
            Self::EmptyResponse => write!(f, "model returned an empty response"),
            Self::StepLimit { max_steps } => write!(
                f,
                "model kept calling tools after {max_steps} steps without answering"
            ),
        }
    }
}

impl Error for TurnError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Provider(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LlmError> for TurnError {
    fn from(err: LlmError) -> Self {
        Self::Provider(err)
    }
}

/// One conversation with the model. Tool calls requested by the model are
/// executed and answered inside [`ChatSession::send_message_with_events`], so callers only
/// ever see the final text reply.
pub struct ChatSession<P, R> {
    provider: P,
    probe: R,
    config: AgentConfig,
    history: Vec<AssistantMessage>,
}

impl<P: LlmProvider, R: Probe> ChatSession<P, R> {
    pub fn new(provider: P, probe: R, config: AgentConfig) -> Self {
        Self {
            provider,
            probe,
            config,
            history: Vec::new(),
        }
    }

    #[cfg(test)]
    fn history(&self) -> &[AssistantMessage] {
        &self.history
    }

    #[cfg(test)]
    async fn send_message(&mut self, text: &str) -> Result<String, TurnError> {
        self.send_message_with_events(text, &mut |_| {}).await
    }

    /// Sends one operator turn. The history only grows when the turn
    /// completes; any error leaves it untouched.
    pub async fn send_message_with_events<F: FnMut(AgentEvent)>(
        &mut self,
        text: &str,
        on_event: &mut F,
    ) -> Result<String, TurnError> {
        let mut messages = self.history.clone();
        messages.push(AssistantMessage {
            role: AssistantRole::User,
            parts: vec![AssistantPart::text(text)],
        });
        let tools = tool_declarations();

        for _ in 0..self.config.max_steps {
            let output = self
                .provider
                .generate(AssistantInput {
                    system_instruction: Some(AGENT_SYSTEM_PROMPT.to_string()),
                    messages: messages.clone(),
                    tools: tools.clone(),
                })
                .await?;

            let Some(candidate) = select_candidate(&output.candidates) else {
                let reason = output
                    .block_reason
                    .or_else(|| {
                        output
                            .candidates
                            .iter()
                            .find_map(|candidate| candidate.finish_reason.clone())
                    })
                    .unwrap_or_else(|| "no usable candidate".to_string());
                return Err(TurnError::Blocked { reason });
            };

            let calls = extract_function_calls(&candidate.message.parts);
            messages.push(candidate.message.clone());

            if calls.is_empty() {
                let reply = extract_text(&candidate.message.parts);
                if reply.is_empty() {
                    return Err(TurnError::EmptyResponse);
                }
                self.history = messages;
                return Ok(reply);
            }

            for call in &calls {
                on_event(AgentEvent::ToolRequest {
                    name: call.name.clone(),
                    args_json: call.args_json.clone(),
                });
            }

            let responses = dispatch_calls(&self.probe, &calls).await;
            for response in &responses {
                if let AssistantPart::FunctionResponse {
                    name,
                    response_json,
                    ..
                } = response
                {
                    on_event(AgentEvent::ToolResult {
                        name: name.clone(),
                        response_json: response_json.clone(),
                    });
                }
            }
            messages.push(AssistantMessage {
                role: AssistantRole::User,
                parts: responses,
            });
        }

        Err(TurnError::StepLimit {
            max_steps: self.config.max_steps,
        })
    }
}

fn select_candidate(candidates: &[AssistantCandidate]) -> Option<&AssistantCandidate> {
    candidates
        .iter()
        .find(|candidate| {
            is_usable_candidate(candidate)
                && !has_function_calls(&candidate.message.parts)
                && !extract_text(&candidate.message.parts).is_empty()
        })
        .or_else(|| {
            candidates.iter().find(|candidate| {
                is_usable_candidate(candidate) && has_function_calls(&candidate.message.parts)
            })
        })
        .or_else(|| candidates.iter().find(|candidate| is_usable_candidate(candidate)))
}

fn is_usable_candidate(candidate: &AssistantCandidate) -> bool {
    let blocked = matches!(
        candidate.finish_reason.as_deref(),
        Some("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII")
    );
    !blocked && !candidate.message.parts.is_empty()
}

fn has_function_calls(parts: &[AssistantPart]) -> bool {
    parts
        .iter()
        .any(|part| matches!(part, AssistantPart::FunctionCall { .. }))
}

fn extract_function_calls(parts: &[AssistantPart]) -> Vec<FunctionCallSpec> {
    parts
        .iter()
        .filter_map(|part| match part {
            AssistantPart::FunctionCall {
                id,
                name,
                args_json,
                ..
            } => Some(FunctionCallSpec {
                id: id.clone(),
                name: name.clone(),
                args_json: args_json.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn extract_text(parts: &[AssistantPart]) -> String {
    parts
        .iter()
        .filter_map(|part| match part {
            AssistantPart::Text { text, .. } => Some(text.trim()).filter(|t| !t.is_empty()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}
