use crate::errors::AppError;
use reqwest::Client;
use std::time::Duration;
use tracing::{error, instrument, warn};

/// HTTP client with a fixed request timeout and bounded retry on timeout.
///
/// Only timeouts are retried, immediately and up to `max_retries` times;
/// every other failure is classified once and returned as-is, so a 404 or
/// 401 never burns additional upstream calls.
pub struct HttpClient {
    client: Client,
    max_retries: u32,
}

impl HttpClient {
    pub fn new(timeout_secs: u64, max_retries: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            max_retries,
        }
    }

    #[instrument(skip(self, params), fields(url = %url))]
    pub async fn get_json<T>(&self, url: &str, params: &[(&str, &str)]) -> Result<T, AppError>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut attempt = 0;
        loop {
            match self.execute(url, params).await {
                Ok(response) => return Ok(response),
                Err(err @ AppError::Timeout(_)) => {
                    if attempt >= self.max_retries {
                        error!(
                            url = %url,
                            attempts = attempt + 1,
                            "Request timed out, retries exhausted"
                        );
                        return Err(err);
                    }
                    attempt += 1;
                    warn!(
                        url = %url,
                        attempt,
                        max_retries = self.max_retries,
                        "Request timed out, retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn execute<T>(&self, url: &str, params: &[(&str, &str)]) -> Result<T, AppError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::internal(format!("Undecodable upstream response: {}", e)))
    }
}

fn classify_transport(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::timeout("Upstream request timed out")
    } else if err.is_connect() {
        AppError::unreachable("Unable to connect to upstream service")
    } else {
        AppError::internal(format!("Upstream request failed: {}", err))
    }
}

fn classify_status(status: u16) -> AppError {
    match status {
        404 => AppError::not_found("Resource not found upstream"),
        401 => AppError::invalid_credentials("Upstream rejected the API key"),
        429 => AppError::rate_limited("Upstream rate limit exceeded"),
        _ => AppError::provider(status, format!("Upstream returned HTTP {}", status)),
    }
}
