use std::time::Duration;

use fqa_core::error::AppError;

const LOCAL_PREFIX: &str = "http://127.0.0.1";

/// A model server on the loopback interface (embeddings, reranker).
#[derive(Debug, Clone)]
pub struct LocalEndpoint {
    base_url: String,
    timeout: Duration,
}

impl LocalEndpoint {
    /// Strictly limited to `http://127.0.0.1[:port]`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !is_loopback_base_url(&base_url) {
            return Err(AppError::new(
                "AI_REMOTE_NOT_ALLOWED",
                "Local model endpoint must be http://127.0.0.1[:port]",
            )
            .with_details(format!("base_url={base_url}")));
        }
        Ok(Self { base_url, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        let resp = ureq::get(&self.url("api/tags"))
            .timeout(Duration::from_millis(800))
            .call();

        match resp {
            Ok(r) if r.status() == 200 => Ok(()),
            Ok(r) => Err(
                AppError::new("AI_LOCAL_UNHEALTHY", "Local model server health check failed")
                    .with_details(format!("status={}", r.status())),
            ),
            Err(e) => Err(AppError::new(
                "AI_LOCAL_UNREACHABLE",
                "Failed to reach local model server on 127.0.0.1",
            )
            .with_details(e.to_string())
            .with_retryable(true)),
        }
    }
}

fn is_loopback_base_url(base_url: &str) -> bool {
    let Some(rest) = base_url.strip_prefix(LOCAL_PREFIX) else {
        return false;
    };
    if rest.is_empty() {
        return true;
    }
    let Some(port) = rest.strip_prefix(':') else {
        return false;
    };
    if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    matches!(port.parse::<u32>(), Ok(p) if (1..=65_535).contains(&p))
}

/// A hosted, credentialed API (chat completions).
#[derive(Clone)]
pub struct RemoteEndpoint {
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for RemoteEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteEndpoint")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RemoteEndpoint {
    /// A missing key is a precondition failure, raised before any question is processed.
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self, AppError> {
        let api_key = api_key.map(str::trim).unwrap_or("");
        if api_key.is_empty() {
            return Err(AppError::new(
                "AI_CREDENTIALS_MISSING",
                "Chat API key is not set; export FQA_CHAT_API_KEY",
            ));
        }
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("https://") || is_loopback_base_url(&base_url)) {
            return Err(AppError::new(
                "AI_ENDPOINT_INVALID",
                "Chat endpoint must use https (or http://127.0.0.1)",
            )
            .with_details(format!("base_url={base_url}")));
        }
        Ok(Self {
            base_url,
            api_key: api_key.to_string(),
            timeout,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Map a ureq failure into the capability's error code; transport errors are retryable.
pub(crate) fn map_transport_error(code: &str, what: &str, err: ureq::Error) -> AppError {
    match err {
        ureq::Error::Status(status, resp) => {
            let body = resp.into_string().unwrap_or_default();
            let body = body.chars().take(300).collect::<String>();
            AppError::new(code, format!("{what} request failed"))
                .with_details(format!("status={status}; body={body}"))
                .with_retryable(status == 429 || status >= 500)
        }
        other => AppError::new(code, format!("Failed to call {what} endpoint"))
            .with_details(other.to_string())
            .with_retryable(true),
    }
}
