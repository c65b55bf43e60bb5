use super::debug::{
    HttpDebugConfig, redact_header_value, redact_json_body, redact_url, truncate_for_log,
};
use crate::trace::SessionTrace;
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
#[cfg(test)]
use std::sync::{Arc, Mutex};

/// Thin wrapper over `reqwest::Client` that mirrors every exchange into the
/// session trace and, with `--verbose`, onto stderr.
#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    debug: HttpDebugConfig,
    sink: LogSink,
    trace: Option<SessionTrace>,
}

#[derive(Clone)]
enum LogSink {
    Stderr,
    #[cfg(test)]
    Buffer(Arc<Mutex<Vec<String>>>),
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("debug", &self.debug)
            .field("trace", &self.trace.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponseData {
    pub status: u16,
    pub body: String,
}

impl HttpClient {
    pub fn new(inner: Client, debug: HttpDebugConfig) -> Self {
        Self {
            inner,
            debug,
            sink: LogSink::Stderr,
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: SessionTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        payload: &T,
    ) -> Result<HttpResponseData, reqwest::Error> {
        let body_json = serde_json::to_string(payload)
            .unwrap_or_else(|err| format!("{{\"_serialization_error\":\"{err}\"}}"));

        let request = self.inner.post(url).query(query).json(payload).build()?;
        let shown_url = redact_url(request.url());
        if let Some(trace) = &self.trace {
            trace.log_http_request(request.method().as_str(), &shown_url, &body_json);
        }
        if self.debug.enabled {
            self.log_line(format!("[http-debug] > {} {shown_url}", request.method()));
            self.log_headers('>', request.headers());
            self.log_body('>', &body_json);
        }

        let (status, headers, body) = match self.exchange(request).await {
            Ok(parts) => parts,
            Err(err) => {
                // The request URL carries the API key as a query parameter.
                let err = err.without_url();
                if let Some(trace) = &self.trace {
                    trace.log_http_error(&err.to_string());
                }
                return Err(err);
            }
        };

        if let Some(trace) = &self.trace {
            trace.log_http_response(status, &body);
        }
        if self.debug.enabled {
            self.log_line(format!("[http-debug] < HTTP {status}"));
            self.log_headers('<', &headers);
            self.log_body('<', &body);
        }

        Ok(HttpResponseData { status, body })
    }

    async fn exchange(
        &self,
        request: reqwest::Request,
    ) -> Result<(u16, HeaderMap, String), reqwest::Error> {
        let response = self.inner.execute(request).await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;
        Ok((status, headers, body))
    }

    fn log_headers(&self, direction: char, headers: &HeaderMap) {
        for (name, value) in headers {
            self.log_line(format!(
                "[http-debug] {direction} {}: {}",
                name.as_str(),
                redact_header_value(name.as_str(), value)
            ));
        }
    }

    fn log_body(&self, direction: char, body: &str) {
        let body = truncate_for_log(&redact_json_body(body), self.debug.max_body_chars);
        if body.is_empty() {
            self.log_line(format!("[http-debug] {direction} <empty body>"));
            return;
        }
        for line in body.lines() {
            self.log_line(format!("[http-debug] {direction} {line}"));
        }
    }

    fn log_line(&self, line: String) {
        match &self.sink {
            LogSink::Stderr => {
                let mut stderr = io::stderr().lock();
                let _ = writeln!(stderr, "{line}");
            }
            #[cfg(test)]
            LogSink::Buffer(buffer) => {
                if let Ok(mut lines) = buffer.lock() {
                    lines.push(line);
                }
            }
        }
    }

    #[cfg(test)]
    pub fn with_buffer_sink(
        inner: Client,
        debug: HttpDebugConfig,
    ) -> (Self, Arc<Mutex<Vec<String>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let client = Self {
            inner,
            debug,
            sink: LogSink::Buffer(Arc::clone(&buffer)),
            trace: None,
        };
        (client, buffer)
    }
}
