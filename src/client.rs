use anyhow::{Context, Result};
use serde_json::Value;

/// What came back from the value-extraction service.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorResponse {
    pub status: u16,
    pub body: Value,
}

impl ExtractorResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The service's own `message`, if it sent one.
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(|m| m.as_str())
    }
}

/// Sends a corrected request to whatever reads live values.
pub trait ValueExtractor {
    fn extract(&self, body: &Value) -> Result<ExtractorResponse>;
}

/// Blocking JSON POST with an `api-key` header.
#[derive(Debug, Clone)]
pub struct HttpExtractor {
    endpoint: String,
    api_key: String,
}

impl HttpExtractor {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ValueExtractor for HttpExtractor {
    fn extract(&self, body: &Value) -> Result<ExtractorResponse> {
        tracing::debug!(endpoint = %self.endpoint, "posting corrected request");
        let resp = match ureq::post(&self.endpoint)
            .set("Content-Type", "application/json")
            .set("api-key", &self.api_key)
            .send_json(body)
        {
            Ok(r) => r,
            // Non-2xx still carries a JSON body worth relaying.
            Err(ureq::Error::Status(_, r)) => r,
            Err(e) => return Err(e).with_context(|| format!("POST {} failed", self.endpoint)),
        };

        let status = resp.status();
        let body: Value = resp
            .into_json()
            .with_context(|| format!("{} returned a non-JSON body (status {status})", self.endpoint))?;
        Ok(ExtractorResponse { status, body })
    }
}
