use std::io::{BufReader, Read};
use std::time::{Duration, Instant};

use dqa_core::config::OrchestratorConfig;
use dqa_core::error::AppError;
use serde::de::DeserializeOwned;
use tracing::debug;

pub(crate) mod poll;
pub mod sse;
pub mod wire;

const ASSISTANTS_BETA: &str = "assistants=v2";

/// Blocking HTTP client for the OpenAI Assistants v2 API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    agent: ureq::Agent,
    uploads: reqwest::blocking::Client,
    poll_interval: Duration,
    run_timeout: Option<Duration>,
}

impl OpenAiClient {
    pub fn new(config: &OrchestratorConfig) -> Result<Self, AppError> {
        config.validate()?;

        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(config.request_timeout)
            .timeout_write(config.request_timeout)
            .build();

        let uploads = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                AppError::new("CONFIG_HTTP_CLIENT_FAILED", "Failed to build upload HTTP client")
                    .with_details(e.to_string())
            })?;

        Ok(Self {
            base_url: config.normalized_base_url().to_string(),
            api_key: config.api_key.clone(),
            agent,
            uploads,
            poll_interval: config.poll_interval,
            run_timeout: config.run_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.run_timeout.map(|t| Instant::now() + t)
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        self.agent
            .request(method, &self.url(path))
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("OpenAI-Beta", ASSISTANTS_BETA)
    }

    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        op: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, AppError> {
        debug!(op, path, "GET");
        let mut req = self.request("GET", path);
        for (k, v) in query {
            req = req.query(k, v);
        }
        let resp = req.call().map_err(|e| map_ureq_error(op, e))?;
        decode_json(op, resp)
    }

    pub(crate) fn post_json<T: DeserializeOwned>(
        &self,
        op: &str,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, AppError> {
        debug!(op, path, "POST");
        let resp = self
            .request("POST", path)
            .send_json(body)
            .map_err(|e| map_ureq_error(op, e))?;
        decode_json(op, resp)
    }

    pub(crate) fn delete(&self, op: &str, path: &str) -> Result<(), AppError> {
        debug!(op, path, "DELETE");
        self.request("DELETE", path)
            .call()
            .map_err(|e| map_ureq_error(op, e))?;
        Ok(())
    }

    /// POST with `stream: true` and hand back the raw server-sent event body.
    pub(crate) fn post_event_stream(
        &self,
        op: &str,
        path: &str,
        body: serde_json::Value,
    ) -> Result<BufReader<Box<dyn Read + Send + Sync + 'static>>, AppError> {
        debug!(op, path, "POST (stream)");
        let resp = self
            .request("POST", path)
            .set("Accept", "text/event-stream")
            .send_json(body)
            .map_err(|e| map_ureq_error(op, e))?;
        Ok(BufReader::new(resp.into_reader()))
    }

    /// Multipart upload; the only call that does not go through `ureq`.
    pub(crate) fn post_multipart<T: DeserializeOwned>(
        &self,
        op: &str,
        path: &str,
        form: reqwest::blocking::multipart::Form,
    ) -> Result<T, AppError> {
        debug!(op, path, "POST (multipart)");
        let resp = self
            .uploads
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| {
                AppError::new("VENDOR_UNREACHABLE", "Failed to reach assistant service")
                    .with_details(format!("op={op}; err={e}"))
                    .with_retryable(true)
            })?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(status_error(op, status, &body));
        }
        resp.json::<T>().map_err(|e| {
            AppError::new("VENDOR_DECODE_FAILED", "Failed to decode assistant service response")
                .with_details(format!("op={op}; err={e}"))
        })
    }
}

fn decode_json<T: DeserializeOwned>(op: &str, resp: ureq::Response) -> Result<T, AppError> {
    resp.into_json::<T>().map_err(|e| {
        AppError::new("VENDOR_DECODE_FAILED", "Failed to decode assistant service response")
            .with_details(format!("op={op}; err={e}"))
    })
}

fn map_ureq_error(op: &str, e: ureq::Error) -> AppError {
    match e {
        ureq::Error::Status(status, resp) => {
            let body = resp.into_string().unwrap_or_default();
            status_error(op, status, &body)
        }
        ureq::Error::Transport(t) => {
            AppError::new("VENDOR_UNREACHABLE", "Failed to reach assistant service")
                .with_details(format!("op={op}; err={t}"))
                .with_retryable(true)
        }
    }
}

pub(crate) fn status_error(op: &str, status: u16, body: &str) -> AppError {
    let message = wire::vendor_error_message(body)
        .unwrap_or_else(|| format!("Assistant service request failed ({op})"));
    AppError::new("VENDOR_HTTP_ERROR", message)
        .with_details(format!("op={op}; status={status}"))
        .with_retryable(status == 429 || status >= 500)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> OrchestratorConfig {
        let mut cfg = OrchestratorConfig::new("sk-test");
        cfg.base_url = base_url.to_string();
        cfg
    }

    #[test]
    fn trims_trailing_slash_and_joins_paths() {
        let client = OpenAiClient::new(&config("http://127.0.0.1:8080/v1/")).expect("client");
        assert_eq!(client.base_url(), "http://127.0.0.1:8080/v1");
        assert_eq!(client.url("/files/abc"), "http://127.0.0.1:8080/v1/files/abc");
        assert_eq!(client.url("threads"), "http://127.0.0.1:8080/v1/threads");
    }

    #[test]
    fn rejects_invalid_configuration() {
        assert!(OpenAiClient::new(&config("ftp://example.com")).is_err());
        assert!(OpenAiClient::new(&OrchestratorConfig::new("  ")).is_err());
    }

    #[test]
    fn status_errors_surface_vendor_message_and_retryability() {
        let body = r#"{"error":{"message":"Rate limit reached","type":"requests"}}"#;
        let err = status_error("create_assistant", 429, body);
        assert_eq!(err.code, "VENDOR_HTTP_ERROR");
        assert_eq!(err.message, "Rate limit reached");
        assert!(err.retryable);

        let err = status_error("create_thread", 400, "not json");
        assert_eq!(err.message, "Assistant service request failed (create_thread)");
        assert!(!err.retryable);
    }
}
