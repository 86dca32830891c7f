use std::time::Duration;

use reqwest::StatusCode;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ShutdownResponse {
    Acknowledged,
    NotRunning { detail: String },
}

/// Asks the service to stop over the loopback control channel.
///
/// Every failure mode (refused, timed out, non-200) collapses into
/// `NotRunning`; nothing is retried.
pub(crate) async fn send_shutdown_request(
    client: &reqwest::Client,
    url: &Url,
    timeout: Duration,
) -> ShutdownResponse {
    let request = client.get(url.clone()).timeout(timeout).send();
    match tokio::time::timeout(timeout, request).await {
        Ok(Ok(response)) if response.status() == StatusCode::OK => ShutdownResponse::Acknowledged,
        Ok(Ok(response)) => ShutdownResponse::NotRunning {
            detail: format!("unexpected status {}", response.status()),
        },
        Ok(Err(error)) => ShutdownResponse::NotRunning {
            detail: error.to_string(),
        },
        Err(_) => ShutdownResponse::NotRunning {
            detail: format!("timed out after {}ms", timeout.as_millis()),
        },
    }
}
