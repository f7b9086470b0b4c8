//! HTTP client for the wake backend.
//!
//! One client is shared by every session's adapter; requests are
//! multiplexed by the `session_id` field of the envelope.

use crate::protocol::{WakeMethod, WakeRequest, WakeResponse};
use reqwest::Client;
use sake_core::error::{Result, SakeError};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Backend error messages that signal a lost chain connection.
///
/// Receiving one of these flips the owning session's `connected` flag as a
/// side effect of the failing call, whichever operation triggered it.
const CONNECTION_LOST_MESSAGES: [&str; 2] = [
    "Chain instance not connected",
    "Connection to remote host was lost.",
];

/// Client that talks to the wake backend over HTTP.
#[derive(Clone)]
pub struct WakeClient {
    http: Client,
    base_url: String,
}

impl WakeClient {
    /// Creates a client against `base_url` with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends one request and returns the response payload.
    ///
    /// Methods without a payload resolve to `Value::Null`; callers that
    /// expect data validate with [`expect_data`].
    pub async fn request(&self, session_id: &str, method: WakeMethod) -> Result<Value> {
        let method_name = method.name();
        let envelope = WakeRequest {
            session_id: session_id.to_string(),
            method,
        };

        tracing::debug!(target: "sake::network", session = session_id, method = method_name, "request");

        let response = self
            .http
            .post(&self.base_url)
            .json(&envelope)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SakeError::adapter(format!(
                "backend returned HTTP {status} for {method_name}"
            )));
        }

        let payload: WakeResponse = response
            .json()
            .await
            .map_err(|err| SakeError::validation(format!("malformed backend response: {err}")))?;

        if payload.success {
            Ok(payload.data.unwrap_or(Value::Null))
        } else {
            let message = payload
                .error
                .unwrap_or_else(|| format!("{method_name} failed with no error message"));
            Err(classify_backend_error(message))
        }
    }
}

/// Extracts the payload of a method that must return data.
pub fn expect_data(value: Value, method: &str) -> Result<Value> {
    if value.is_null() {
        Err(SakeError::validation(format!(
            "no result returned for {method}"
        )))
    } else {
        Ok(value)
    }
}

/// Maps a backend-reported error message onto the error taxonomy.
pub fn classify_backend_error(message: String) -> SakeError {
    if CONNECTION_LOST_MESSAGES.contains(&message.as_str()) {
        SakeError::ConnectionLost
    } else {
        SakeError::adapter(message)
    }
}

fn classify_transport_error(err: reqwest::Error) -> SakeError {
    // The backend process going away surfaces as a connect or timeout
    // failure, which classifies the same as a reported connection loss.
    if err.is_connect() || err.is_timeout() {
        SakeError::ConnectionLost
    } else {
        SakeError::adapter(format!("backend transport error: {err}"))
    }
}
