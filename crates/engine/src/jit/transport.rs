//! JIT transports.
//!
//! The client only needs "send this request, give me the body back".
//! [`HttpJitTransport`] does it over HTTP with `ureq` (sync) wrapped in
//! `tokio::task::spawn_blocking`.

use async_trait::async_trait;
use time::Duration;

use super::protocol::JitRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub cause: String,
    /// Server-suggested delay before the next attempt.
    pub retry_after: Option<Duration>,
}

impl TransportError {
    pub fn new(cause: impl Into<String>) -> Self {
        TransportError {
            cause: cause.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cause)
    }
}

impl std::error::Error for TransportError {}

#[async_trait]
pub trait JitTransport: Send + Sync {
    /// Sends the request and returns the raw response body.
    async fn send(&self, request: &JitRequest) -> Result<String, TransportError>;
}

/// Parses a `Retry-After` header given in whole seconds.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .map(|secs| Duration::seconds(secs as i64))
}

#[cfg(feature = "http")]
pub use http::HttpJitTransport;

#[cfg(feature = "http")]
mod http {
    use super::*;
    use crate::campaign::CampaignFormat;

    /// Environment fallback for the bearer token.
    pub const AUTH_TOKEN_ENV: &str = "HERALD_JIT_AUTH_TOKEN";

    /// POSTs JIT requests as JSON to one endpoint per campaign format.
    ///
    /// - `auth_token` from the caller or the `HERALD_JIT_AUTH_TOKEN` env var
    /// - non-2xx statuses are transport failures carrying `Retry-After`
    pub struct HttpJitTransport {
        legacy_url: String,
        current_url: String,
        auth_token: Option<String>,
        timeout: Option<std::time::Duration>,
    }

    impl HttpJitTransport {
        pub fn new(
            legacy_url: impl Into<String>,
            current_url: impl Into<String>,
            auth_token: Option<String>,
        ) -> Self {
            let auth_token = auth_token.or_else(|| std::env::var(AUTH_TOKEN_ENV).ok());
            HttpJitTransport {
                legacy_url: legacy_url.into(),
                current_url: current_url.into(),
                auth_token,
                timeout: None,
            }
        }

        pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
            self.timeout = Some(timeout);
            self
        }

        pub fn url_for(&self, format: CampaignFormat) -> &str {
            match format {
                CampaignFormat::Legacy => &self.legacy_url,
                CampaignFormat::Current => &self.current_url,
            }
        }
    }

    #[async_trait]
    impl JitTransport for HttpJitTransport {
        async fn send(&self, request: &JitRequest) -> Result<String, TransportError> {
            let url = self.url_for(request.format).to_string();
            let body = request.to_json();
            let auth_token = self.auth_token.clone();
            let timeout = self.timeout;

            tracing::debug!(%url, campaigns = request.campaigns.len(), "sending JIT request");

            tokio::task::spawn_blocking(move || {
                let agent: ureq::Agent = ureq::Agent::config_builder()
                    .http_status_as_error(false)
                    .timeout_global(timeout)
                    .build()
                    .into();
                let mut req = agent.post(&url);
                if let Some(ref token) = auth_token {
                    req = req.header("Authorization", &format!("Bearer {}", token));
                }

                let response = req
                    .send_json(&body)
                    .map_err(|e| TransportError::new(e.to_string()))?;

                let status = response.status();
                if !status.is_success() {
                    let mut err = TransportError::new(format!("HTTP {}", status.as_u16()));
                    if let Some(retry) = response
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(parse_retry_after)
                    {
                        err = err.with_retry_after(retry);
                    }
                    return Err(err);
                }

                response
                    .into_body()
                    .read_to_string()
                    .map_err(|e| TransportError::new(format!("failed to read response body: {}", e)))
            })
            .await
            .map_err(|e| TransportError::new(format!("task join error: {}", e)))?
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_seconds() {
        assert_eq!(parse_retry_after("120"), Some(Duration::minutes(2)));
        assert_eq!(parse_retry_after(" 5 "), Some(Duration::seconds(5)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
        assert_eq!(parse_retry_after("-1"), None);
    }
}
