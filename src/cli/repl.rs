use crate::agent::{AgentEvent, ChatSession};
use crate::llm::provider::LlmProvider;
use crate::probe::Probe;
use crate::trace::SessionTrace;
use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;

pub const BANNER: &str = "=============================================\n   NETOPS SENTINEL - ENTERPRISE AGENT v1.0   \n=============================================";
pub const READY_LINE: &str = "Agent: Ready. Which host or IP should I check?";
pub const FAREWELL_LINE: &str = "Agent: Session ended. Goodbye!";
pub const PROMPT: &str = "Admin: ";

const EXIT_WORDS: [&str; 3] = ["exit", "quit", "stop"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction<'a> {
    Exit,
    Skip,
    Send(&'a str),
}

pub fn classify_input(line: &str) -> InputAction<'_> {
    let trimmed = line.trim();
    if EXIT_WORDS
        .iter()
        .any(|word| trimmed.eq_ignore_ascii_case(word))
    {
        InputAction::Exit
    } else if trimmed.is_empty() {
        InputAction::Skip
    } else {
        InputAction::Send(line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    Closed,
}

pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;
}

/// Operator input through rustyline; plain line reads when stdin is piped.
pub struct TerminalInput {
    editor: DefaultEditor,
}

impl TerminalInput {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineSource for TerminalInput {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(ReadOutcome::Line(line))
            }
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(ReadOutcome::Closed),
            Err(err) => Err(err.into()),
        }
    }
}

pub async fn run_repl<P, R, L, W>(
    session: &mut ChatSession<P, R>,
    input: &mut L,
    out: &mut W,
    trace: &SessionTrace,
) -> Result<()>
where
    P: LlmProvider,
    R: Probe,
    L: LineSource,
    W: Write,
{
    writeln!(out, "{BANNER}")?;
    writeln!(out, "{READY_LINE}")?;

    loop {
        writeln!(out)?;
        out.flush()?;

        let line = match input.read_line(PROMPT)? {
            ReadOutcome::Line(line) => line,
            ReadOutcome::Closed => break,
        };

        let text = match classify_input(&line) {
            InputAction::Exit => break,
            InputAction::Skip => continue,
            InputAction::Send(text) => text,
        };

        trace.log_admin_input(text);
        let result = session
            .send_message_with_events(text, &mut |event| log_event(trace, &event))
            .await;
        match result {
            Ok(reply) => {
                trace.log_agent_reply(&reply);
                writeln!(out, "Agent: {reply}")?;
            }
            Err(err) => {
                trace.log_agent_error(&err.to_string());
                writeln!(out, "Error during session: {err}")?;
            }
        }
    }

    writeln!(out, "{FAREWELL_LINE}")?;
    out.flush()?;
    Ok(())
}

fn log_event(trace: &SessionTrace, event: &AgentEvent) {
    match event {
        AgentEvent::ToolRequest { name, args_json } => {
            trace.log_tool_call(name, &args_json.to_string());
        }
        AgentEvent::ToolResult {
            name,
            response_json,
        } => {
            let text = response_json
                .get("result")
                .and_then(|value| value.as_str())
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| response_json.to_string());
            trace.log_tool_result(name, &text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        FAREWELL_LINE, InputAction, LineSource, ReadOutcome, classify_input, run_repl,
    };
    use crate::agent::{AgentConfig, ChatSession};
    use crate::llm::provider::{
        AssistantCandidate, AssistantInput, AssistantMessage, AssistantOutput, AssistantPart,
        AssistantRole, LlmError, LlmProvider,
    };
    use crate::probe::{Probe, ProbeOutcome, ProbeReport};
    use crate::trace::SessionTrace;
    use anyhow::Result;
    use std::collections::VecDeque;
    use std::fs;
    use std::sync::{Arc, Mutex};

    struct ScriptedInput {
        lines: VecDeque<String>,
    }

    impl ScriptedInput {
        fn new(lines: &[&str]) -> Self {
            Self {
                lines: lines.iter().map(|line| line.to_string()).collect(),
            }
        }
    }

    impl LineSource for ScriptedInput {
        fn read_line(&mut self, _prompt: &str) -> Result<ReadOutcome> {
            Ok(self
                .lines
                .pop_front()
                .map_or(ReadOutcome::Closed, ReadOutcome::Line))
        }
    }

    struct EchoProvider {
        fail_on: Option<String>,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl LlmProvider for EchoProvider {
        async fn generate(&self, input: AssistantInput) -> Result<AssistantOutput, LlmError> {
            let last = input
                .messages
                .last()
                .and_then(|message| message.parts.first())
                .and_then(|part| match part {
                    AssistantPart::Text { text, .. } => Some(text.clone()),
                    _ => None,
                })
                .unwrap_or_default();
            self.seen.lock().expect("lock").push(last.clone());

            if self.fail_on.as_deref() == Some(last.as_str()) {
                return Err(LlmError::Transport("connection reset".to_string()));
            }
            Ok(AssistantOutput {
                candidates: vec![AssistantCandidate {
                    message: AssistantMessage {
                        role: AssistantRole::Model,
                        parts: vec![AssistantPart::text(format!("echo: {last}"))],
                    },
                    finish_reason: Some("STOP".to_string()),
                }],
                block_reason: None,
            })
        }
    }

    struct NoProbe;

    impl Probe for NoProbe {
        async fn probe(&self, host: &str) -> ProbeReport {
            ProbeReport {
                host: host.to_string(),
                outcome: ProbeOutcome::ExecutionError {
                    details: "not available in tests".to_string(),
                },
            }
        }
    }

    async fn drive(lines: &[&str], fail_on: Option<&str>) -> (String, Vec<String>, String) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let provider = EchoProvider {
            fail_on: fail_on.map(ToOwned::to_owned),
            seen: Arc::clone(&seen),
        };
        let mut session = ChatSession::new(provider, NoProbe, AgentConfig::default());
        let dir = tempfile::tempdir().expect("tempdir");
        let trace = SessionTrace::create_in_dir("repl", dir.path()).expect("trace");
        let mut input = ScriptedInput::new(lines);
        let mut out = Vec::new();

        run_repl(&mut session, &mut input, &mut out, &trace)
            .await
            .expect("repl runs");

        let trace_text = fs::read_to_string(trace.file_path()).expect("read trace");
        let seen = seen.lock().expect("lock").clone();
        (String::from_utf8(out).expect("utf8"), seen, trace_text)
    }

    #[test]
    fn exit_words_match_case_insensitively() {
        for word in ["exit", "QUIT", " Stop ", "eXiT\n"] {
            assert_eq!(classify_input(word), InputAction::Exit, "{word:?}");
        }
        assert_eq!(classify_input("   "), InputAction::Skip);
        assert_eq!(
            classify_input("  Check 8.8.8.8 "),
            InputAction::Send("  Check 8.8.8.8 ")
        );
        assert_eq!(classify_input("stop pinging"), InputAction::Send("stop pinging"));
    }

    #[tokio::test]
    async fn exit_word_ends_loop_without_service_call() {
        let (out, seen, _) = drive(&["Quit", "Check 8.8.8.8"], None).await;

        assert!(seen.is_empty());
        assert!(out.contains("NETOPS SENTINEL - ENTERPRISE AGENT v1.0"));
        assert!(out.trim_end().ends_with(FAREWELL_LINE));
    }

    #[tokio::test]
    async fn each_line_sends_exactly_one_turn() {
        let (out, seen, trace) = drive(&["Check 8.8.8.8", "", "ping 10.0.0.1", "exit"], None).await;

        assert_eq!(seen, vec!["Check 8.8.8.8", "ping 10.0.0.1"]);
        assert!(out.contains("Agent: echo: Check 8.8.8.8"));
        assert!(out.contains("Agent: echo: ping 10.0.0.1"));
        assert!(trace.contains("[admin.in   ] Check 8.8.8.8"));
        assert!(trace.contains("[agent.out  ] echo: ping 10.0.0.1"));
    }

    #[tokio::test]
    async fn failed_turn_is_reported_and_loop_continues() {
        let (out, seen, trace) = drive(&["bad turn", "good turn", "stop"], Some("bad turn")).await;

        assert_eq!(seen, vec!["bad turn", "good turn"]);
        assert!(out.contains("Error during session: provider transport error: connection reset"));
        assert!(out.contains("Agent: echo: good turn"));
        assert!(trace.contains("[agent.err  ] provider transport error: connection reset"));
        assert!(out.trim_end().ends_with(FAREWELL_LINE));
    }

    #[tokio::test]
    async fn operator_text_is_sent_as_typed() {
        let (out, seen, _) = drive(&["  Check 8.8.8.8  ", " STOP "], None).await;

        assert_eq!(seen, vec!["  Check 8.8.8.8  "]);
        assert!(out.contains("Agent: echo:   Check 8.8.8.8  "));
        assert!(out.trim_end().ends_with(FAREWELL_LINE));
    }

    #[tokio::test]
    async fn closed_input_ends_session_cleanly() {
        let (out, seen, _) = drive(&["hello"], None).await;

        assert_eq!(seen, vec!["hello"]);
        assert!(out.trim_end().ends_with(FAREWELL_LINE));
    }
}
