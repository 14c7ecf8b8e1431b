use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use fsr_core::ObservedResponse;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

/// One wire request as the executor hands it to the transport.
#[derive(Clone, Debug)]
pub struct WireRequest {
    pub method: HttpMethod,
    pub url: String,
    pub content_type: String,
    pub accept: String,
    pub body: Option<Value>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("request to {url} timed out")]
    Timeout { url: String },
}

/// The seam between the engine and the target API. Blocking by contract:
/// a run suspends only while waiting on a response.
pub trait Transport {
    fn send(&self, request: &WireRequest) -> Result<ObservedResponse, TransportError>;
}

/// Production transport over a blocking reqwest client with a bounded
/// request timeout. Unbounded blocking on an external server is an
/// operational risk, so expiry surfaces as a transport failure.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request { url: String::new(), message: e.to_string() })?;
        Ok(Self { client })
    }

    pub fn with_default_timeout() -> Result<Self, TransportError> {
        Self::new(Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS))
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &WireRequest) -> Result<ObservedResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
        };
        builder = builder
            .header(reqwest::header::CONTENT_TYPE, &request.content_type)
            .header(reqwest::header::ACCEPT, &request.accept);
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body).map_err(|e| TransportError::Request {
                url: request.url.clone(),
                message: e.to_string(),
            })?);
        }

        tracing::debug!("{} {}", request.method.as_str(), request.url);
        let response = builder.send().map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout { url: request.url.clone() }
            } else {
                TransportError::Request { url: request.url.clone(), message: e.to_string() }
            }
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let text = response.text().map_err(|e| TransportError::Request {
            url: request.url.clone(),
            message: e.to_string(),
        })?;
        // Non-JSON bodies are kept out of the observed response rather than
        // failing the call; the caller decides whether JSON was required.
        let body = serde_json::from_str(&text).ok();

        Ok(ObservedResponse { status, content_type, location, body })
    }
}

/// Scripted transport for tests: hands out queued responses in order and
/// records every request it saw. Not durable, not concurrent — one run.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<ObservedResponse, TransportError>>>,
    requests: std::sync::Mutex<Vec<WireRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: ObservedResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_error(&self, error: TransportError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<WireRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &WireRequest) -> Result<ObservedResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(TransportError::Request {
                url: request.url.clone(),
                message: "scripted transport exhausted".into(),
            })
        })
    }
}
