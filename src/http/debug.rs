use reqwest::Url;
use reqwest::header::HeaderValue;
use serde_json::Value;

pub const REDACTION: &str = "***REDACTED***";

const SENSITIVE_KEYS: [&str; 7] = [
    "key",
    "api_key",
    "apikey",
    "token",
    "authorization",
    "x-api-key",
    "x-goog-api-key",
];

const MAX_LOGGED_BODY_CHARS: usize = 4_000;

/// Settings for the `--verbose` request/response dump on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpDebugConfig {
    pub enabled: bool,
    pub max_body_chars: usize,
}

impl HttpDebugConfig {
    pub fn from_verbose(verbose: bool) -> Self {
        Self {
            enabled: verbose,
            max_body_chars: MAX_LOGGED_BODY_CHARS,
        }
    }

    pub fn disabled() -> Self {
        Self::from_verbose(false)
    }
}

pub fn redact_url(url: &Url) -> String {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if is_sensitive_key(&k) {
                REDACTION.to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();

    let mut redacted = url.clone();
    redacted.set_query(None);
    if !pairs.is_empty() {
        redacted.query_pairs_mut().extend_pairs(pairs);
    }
    redacted.to_string()
}

pub fn redact_header_value(name: &str, value: &HeaderValue) -> String {
    if is_sensitive_key(name) {
        return REDACTION.to_string();
    }
    value
        .to_str()
        .map(ToOwned::to_owned)
        .unwrap_or_else(|_| "<non-utf8>".to_string())
}

pub fn redact_json_body(raw: &str) -> String {
    let Ok(mut json) = serde_json::from_str::<Value>(raw) else {
        return raw.to_string();
    };
    redact_json_value(&mut json);
    serde_json::to_string(&json).unwrap_or_else(|_| raw.to_string())
}

pub fn truncate_for_log(input: &str, max_chars: usize) -> String {
    let count = input.chars().count();
    if count <= max_chars {
        return input.to_string();
    }

    let head = input.chars().take(max_chars).collect::<String>();
    format!("{head}... <truncated {} chars>", count - max_chars)
}

fn redact_json_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, item) in map {
                if is_sensitive_key(key) {
                    *item = Value::String(REDACTION.to_string());
                } else {
                    redact_json_value(item);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_json_value),
        _ => {}
    }
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(key))
}
