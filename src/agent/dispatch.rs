use serde_json::{Value, json};

use crate::llm::provider::{AssistantPart, FunctionDeclaration};
use crate::probe::Probe;

pub const PING_HOST: &str = "ping_host";

#[derive(Debug, Clone)]
pub struct FunctionCallSpec {
    pub id: Option<String>,
    pub name: String,
    pub args_json: Value,
}

pub fn tool_declarations() -> Vec<FunctionDeclaration> {
    vec![FunctionDeclaration {
        name: PING_HOST.to_string(),
        description: "Pings a specific network host (IP or Domain) to check reachability."
            .to_string(),
        parameters_json_schema: json!({
            "type": "object",
            "properties": {
                "host_address": {
                    "type": "string",
                    "description": "The IP address or domain name to ping (e.g., '8.8.8.8', 'google.com')."
                }
            },
            "required": ["host_address"]
        }),
    }]
}

/// Runs each requested call in order and returns one function response per
/// call. Calls never fail; problems are reported inside the payload.
pub async fn dispatch_calls<P: Probe>(probe: &P, calls: &[FunctionCallSpec]) -> Vec<AssistantPart> {
    let mut responses = Vec::with_capacity(calls.len());
    for call in calls {
        let response_json = dispatch_one(probe, call).await;
        responses.push(AssistantPart::FunctionResponse {
            id: call.id.clone(),
            name: call.name.clone(),
            response_json,
        });
    }
    responses
}

async fn dispatch_one<P: Probe>(probe: &P, call: &FunctionCallSpec) -> Value {
    match call.name.as_str() {
        PING_HOST => dispatch_ping_host(probe, call).await,
        other => json!({ "error": format!("unknown function: {other}") }),
    }
}

async fn dispatch_ping_host<P: Probe>(probe: &P, call: &FunctionCallSpec) -> Value {
    let Some(host) = call.args_json.get("host_address").and_then(Value::as_str) else {
        return json!({
            "error": "ping_host requires a string 'host_address' argument",
            "args": call.args_json,
        });
    };

    let report = probe.probe(host).await;
    json!({ "result": report.render() })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::{FunctionCallSpec, PING_HOST, dispatch_calls, tool_declarations};
    use crate::llm::provider::AssistantPart;
    use crate::probe::{Probe, ProbeOutcome, ProbeReport};

    #[derive(Default)]
    struct RecordingProbe {
        hosts: Mutex<Vec<String>>,
    }

    impl Probe for RecordingProbe {
        async fn probe(&self, host: &str) -> ProbeReport {
            self.hosts.lock().expect("lock").push(host.to_string());
            ProbeReport {
                host: host.to_string(),
                outcome: ProbeOutcome::Unreachable {
                    stderr: "100% packet loss".to_string(),
                },
            }
        }
    }

    fn call(name: &str, args: serde_json::Value) -> FunctionCallSpec {
        FunctionCallSpec {
            id: Some("c1".to_string()),
            name: name.to_string(),
            args_json: args,
        }
    }

    fn response_json(part: &AssistantPart) -> &serde_json::Value {
        let AssistantPart::FunctionResponse { response_json, .. } = part else {
            panic!("expected function response part, got {part:?}");
        };
        response_json
    }

    #[test]
    fn declares_single_ping_host_tool() {
        let tools = tool_declarations();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, PING_HOST);
        assert_eq!(
            tools[0].parameters_json_schema["required"],
            json!(["host_address"])
        );
    }

    #[tokio::test]
    async fn ping_host_returns_rendered_report() {
        let probe = RecordingProbe::default();
        let responses =
            dispatch_calls(&probe, &[call(PING_HOST, json!({"host_address": "10.0.0.1"}))]).await;

        assert_eq!(responses.len(), 1);
        let AssistantPart::FunctionResponse { id, name, .. } = &responses[0] else {
            panic!("expected function response");
        };
        assert_eq!(id.as_deref(), Some("c1"));
        assert_eq!(name, PING_HOST);
        assert_eq!(
            response_json(&responses[0])["result"],
            json!("FAILURE: Host 10.0.0.1 is NOT reachable.\nError Output:\n100% packet loss")
        );
        assert_eq!(*probe.hosts.lock().expect("lock"), vec!["10.0.0.1"]);
    }

    #[tokio::test]
    async fn missing_host_argument_skips_probe() {
        let probe = RecordingProbe::default();
        let responses = dispatch_calls(&probe, &[call(PING_HOST, json!({"host": 42}))]).await;

        let payload = response_json(&responses[0]);
        assert!(payload["error"].as_str().expect("error").contains("host_address"));
        assert_eq!(payload["args"], json!({"host": 42}));
        assert!(probe.hosts.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn unknown_function_is_reported_to_model() {
        let probe = RecordingProbe::default();
        let responses = dispatch_calls(&probe, &[call("traceroute", json!({}))]).await;

        assert_eq!(
            response_json(&responses[0])["error"],
            json!("unknown function: traceroute")
        );
        assert!(probe.hosts.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn calls_are_dispatched_in_order() {
        let probe = RecordingProbe::default();
        dispatch_calls(
            &probe,
            &[
                call(PING_HOST, json!({"host_address": "a.example"})),
                call(PING_HOST, json!({"host_address": "b.example"})),
            ],
        )
        .await;

        assert_eq!(
            *probe.hosts.lock().expect("lock"),
            vec!["a.example", "b.example"]
        );
    }
}
