use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::provider::{
    AssistantCandidate, AssistantInput, AssistantMessage, AssistantOutput, AssistantPart,
    AssistantRole, FunctionDeclaration, LlmError, LlmProvider, LlmResult,
};
use crate::http::client::HttpClient;

const ERROR_BODY_MAX_CHARS: usize = 400;

/// `generateContent` binding for the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    http: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(
        http: HttpClient,
        api_key: Option<String>,
        model: String,
        base_url: String,
    ) -> LlmResult<Self> {
        let api_key = api_key
            .filter(|v| !v.trim().is_empty())
            .ok_or(LlmError::MissingApiKey)?;

        Ok(Self {
            http,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn build_request(input: &AssistantInput) -> GeminiGenerateRequest {
        let tools = if input.tools.is_empty() {
            Vec::new()
        } else {
            vec![GeminiTool {
                function_declarations: input.tools.iter().map(to_wire_declaration).collect(),
            }]
        };
        let tool_config = (!tools.is_empty()).then(|| GeminiToolConfig {
            function_calling_config: GeminiFunctionCallingConfig {
                mode: "AUTO".to_string(),
            },
        });

        GeminiGenerateRequest {
            contents: input.messages.iter().map(to_wire_content).collect(),
            system_instruction: input.system_instruction.as_ref().map(|text| {
                GeminiSystemInstruction {
                    parts: vec![GeminiPart {
                        text: Some(text.clone()),
                        ..GeminiPart::default()
                    }],
                }
            }),
            tools,
            tool_config,
        }
    }

    fn parse_response(resp: GeminiGenerateResponse) -> AssistantOutput {
        AssistantOutput {
            candidates: resp
                .candidates
                .into_iter()
                .map(|candidate| AssistantCandidate {
                    message: AssistantMessage {
                        role: AssistantRole::Model,
                        parts: candidate
                            .content
                            .map(|content| content.parts)
                            .unwrap_or_default()
                            .into_iter()
                            .filter_map(from_wire_part)
                            .collect(),
                    },
                    finish_reason: candidate.finish_reason,
                })
                .collect(),
            block_reason: resp.prompt_feedback.and_then(|fb| fb.block_reason),
        }
    }
}

impl LlmProvider for GeminiProvider {
    async fn generate(&self, input: AssistantInput) -> LlmResult<AssistantOutput> {
        let payload = Self::build_request(&input);
        let resp = self
            .http
            .post_json(
                &self.endpoint(),
                &[("key", self.api_key.as_str())],
                &payload,
            )
            .await
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        if !(200..300).contains(&resp.status) {
            let body = resp.body.chars().take(ERROR_BODY_MAX_CHARS).collect::<String>();
            return Err(LlmError::HttpStatus {
                status: resp.status,
                body,
            });
        }

        let parsed = serde_json::from_str::<GeminiGenerateResponse>(&resp.body)
            .map_err(|err| LlmError::Parse(err.to_string()))?;
        let output = Self::parse_response(parsed);
        if output.candidates.is_empty() && output.block_reason.is_none() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(output)
    }
}

fn to_wire_declaration(decl: &FunctionDeclaration) -> GeminiFunctionDeclaration {
    GeminiFunctionDeclaration {
        name: decl.name.clone(),
        description: decl.description.clone(),
        parameters: decl.parameters_json_schema.clone(),
    }
}

fn to_wire_content(message: &AssistantMessage) -> GeminiContent {
    GeminiContent {
        role: Some(message.role.as_str().to_string()),
        parts: message.parts.iter().map(to_wire_part).collect(),
    }
}

fn to_wire_part(part: &AssistantPart) -> GeminiPart {
    match part {
        AssistantPart::Text {
            text,
            thought_signature,
        } => GeminiPart {
            text: Some(text.clone()),
            thought_signature: thought_signature.clone(),
            ..GeminiPart::default()
        },
        AssistantPart::FunctionCall {
            id,
            name,
            args_json,
            thought_signature,
        } => GeminiPart {
            function_call: Some(GeminiFunctionCall {
                id: id.clone(),
                name: name.clone(),
                args: args_json.clone(),
            }),
            thought_signature: thought_signature.clone(),
            ..GeminiPart::default()
        },
        AssistantPart::FunctionResponse {
            id,
            name,
            response_json,
        } => GeminiPart {
            function_response: Some(GeminiFunctionResponse {
                id: id.clone(),
                name: name.clone(),
                response: response_json.clone(),
            }),
            ..GeminiPart::default()
        },
    }
}

fn from_wire_part(part: GeminiPart) -> Option<AssistantPart> {
    // Thought summaries are commentary, not answer text.
    if part.thought == Some(true) {
        return None;
    }

    if let Some(call) = part.function_call {
        return Some(AssistantPart::FunctionCall {
            id: call.id,
            name: call.name,
            args_json: call.args,
            thought_signature: part.thought_signature,
        });
    }

    if let Some(resp) = part.function_response {
        return Some(AssistantPart::FunctionResponse {
            id: resp.id,
            name: resp.name,
            response_json: resp.response,
        });
    }

    part.text.map(|text| AssistantPart::Text {
        text,
        thought_signature: part.thought_signature,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerateRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<GeminiToolConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiToolConfig {
    function_calling_config: GeminiFunctionCallingConfig,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionCallingConfig {
    mode: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerateResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}
