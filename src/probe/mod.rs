//! Host reachability checks backed by the operating system's `ping`.
//!
//! The probe never fails from the caller's point of view: a host that does
//! not answer is [`ProbeOutcome::Unreachable`], and a `ping` that could not be
//! run at all (missing binary, timeout) is [`ProbeOutcome::ExecutionError`].

use std::io::{self, Write};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::config::ProbeConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub host: String,
    pub count: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable { stdout: String },
    Unreachable { stderr: String },
    ExecutionError { details: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub host: String,
    pub outcome: ProbeOutcome,
}

impl ProbeReport {
    /// Text handed back to the model as the `ping_host` return value.
    pub fn render(&self) -> String {
        let host = &self.host;
        match &self.outcome {
            ProbeOutcome::Reachable { stdout } => {
                format!("SUCCESS: Host {host} is reachable.\nRaw Output:\n{stdout}")
            }
            ProbeOutcome::Unreachable { stderr } => {
                format!("FAILURE: Host {host} is NOT reachable.\nError Output:\n{stderr}")
            }
            ProbeOutcome::ExecutionError { details } => {
                format!("CRITICAL ERROR: Failed to execute tool. Details: {details}")
            }
        }
    }
}

pub trait Probe {
    fn probe(&self, host: &str) -> impl std::future::Future<Output = ProbeReport> + Send;
}

#[derive(Debug, Clone)]
pub struct PingProbe {
    config: ProbeConfig,
}

impl PingProbe {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    fn request_for(&self, host: &str) -> ProbeRequest {
        ProbeRequest {
            host: host.to_string(),
            count: self.config.count,
            timeout: Duration::from_secs(self.config.timeout_secs),
        }
    }

    async fn run(&self, request: &ProbeRequest) -> ProbeOutcome {
        let flag = count_flag(std::env::consts::OS);
        let count = request.count.to_string();

        let mut command = Command::new(&self.config.program);
        command
            .args([flag, count.as_str(), request.host.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(request.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return ProbeOutcome::ExecutionError {
                    details: format!("failed to run '{}': {err}", self.config.program),
                };
            }
            Err(_) => {
                return ProbeOutcome::ExecutionError {
                    details: format!(
                        "command '{} {flag} {count} {}' timed out after {} seconds",
                        self.config.program,
                        request.host,
                        request.timeout.as_secs()
                    ),
                };
            }
        };

        if output.status.success() {
            ProbeOutcome::Reachable {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            }
        } else {
            ProbeOutcome::Unreachable {
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }
        }
    }
}

impl Probe for PingProbe {
    async fn probe(&self, host: &str) -> ProbeReport {
        announce(host);
        let request = self.request_for(host);
        let outcome = self.run(&request).await;
        ProbeReport {
            host: request.host,
            outcome,
        }
    }
}

/// Packet-count option for `ping` on the given `std::env::consts::OS`.
pub fn count_flag(os: &str) -> &'static str {
    if os.eq_ignore_ascii_case("windows") {
        "-n"
    } else {
        "-c"
    }
}

fn announce(host: &str) {
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "\n[SYSTEM TOOL] Executing Ping on: {host}...");
    let _ = stdout.flush();
}
