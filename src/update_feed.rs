use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub(crate) enum UpdateFeedError {
    #[error("invalid update feed url {url}: {source}")]
    FeedUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("update feed request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("update feed answered with status {0}")]
    Status(StatusCode),
    #[error("update feed payload is invalid: {0}")]
    Payload(String),
}

#[derive(Debug, Deserialize)]
struct FeedPayload {
    url: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    pub_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReleaseInfo {
    pub(crate) download_url: String,
    pub(crate) name: Option<String>,
    pub(crate) notes: Option<String>,
    pub(crate) pub_date: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UpdateCheck {
    UpToDate,
    Available(ReleaseInfo),
}

pub(crate) fn feed_url(base: &str, platform: &str, version: &str) -> Result<Url, UpdateFeedError> {
    let raw = format!("{}/{platform}/{version}", base.trim_end_matches('/'));
    Url::parse(&raw).map_err(|source| UpdateFeedError::FeedUrl { url: raw, source })
}

fn parse_release_version(name: &str) -> Option<semver::Version> {
    let trimmed = name.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    semver::Version::parse(trimmed).ok()
}

fn interpret_payload(payload: FeedPayload, current_version: &str) -> Result<UpdateCheck, UpdateFeedError> {
    if payload.url.trim().is_empty() {
        return Err(UpdateFeedError::Payload("missing download url".to_string()));
    }

    let current = semver::Version::parse(current_version).ok();
    let offered = payload.name.as_deref().and_then(parse_release_version);
    if let (Some(current), Some(offered)) = (current, offered) {
        if offered <= current {
            tracing::debug!(%offered, %current, "update feed offers no newer release");
            return Ok(UpdateCheck::UpToDate);
        }
    }

    let pub_date = payload
        .pub_date
        .as_deref()
        .and_then(|raw| match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(date) => Some(date),
            Err(error) => {
                tracing::debug!(raw, "ignoring unparseable release date: {error}");
                None
            }
        });

    Ok(UpdateCheck::Available(ReleaseInfo {
        download_url: payload.url,
        name: payload.name,
        notes: payload.notes,
        pub_date,
    }))
}

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, UpdateFeedError> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("openbazaar-desktop/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Queries the feed once. 204 means no update; 200 carries the release.
pub(crate) async fn check_for_update(
    client: &reqwest::Client,
    url: &Url,
    current_version: &str,
) -> Result<UpdateCheck, UpdateFeedError> {
    let response = client.get(url.clone()).send().await?;
    match response.status() {
        StatusCode::NO_CONTENT => Ok(UpdateCheck::UpToDate),
        StatusCode::OK => {
            let body = response.bytes().await?;
            let payload: FeedPayload = serde_json::from_slice(&body)
                .map_err(|error| UpdateFeedError::Payload(error.to_string()))?;
            interpret_payload(payload, current_version)
        }
        status => Err(UpdateFeedError::Status(status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{spawn_stub_server, StubResponse};

    fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(3))
            .build()
            .expect("build client")
    }

    fn parsed(raw: &str) -> Url {
        Url::parse(raw).expect("url")
    }

    #[test]
    fn feed_url_joins_platform_and_version() {
        let url = feed_url("http://updates.openbazaar.org:5000/update/", "mac", "1.1.0").expect("url");
        assert_eq!(url.as_str(), "http://updates.openbazaar.org:5000/update/mac/1.1.0");
        assert!(matches!(
            feed_url("not a url", "mac", "1.1.0"),
            Err(UpdateFeedError::FeedUrl { .. })
        ));
    }

    #[test]
    fn release_version_accepts_v_prefix() {
        assert_eq!(
            parse_release_version(" v1.2.3 "),
            Some(semver::Version::new(1, 2, 3))
        );
        assert_eq!(parse_release_version("Spring release"), None);
    }

    #[tokio::test]
    async fn no_content_means_up_to_date() {
        let server = spawn_stub_server(|_| StubResponse::new("204 No Content", ""));
        let outcome = check_for_update(&client(), &parsed(&server.url("/update/mac/1.1.0")), "1.1.0")
            .await
            .expect("check");
        assert_eq!(outcome, UpdateCheck::UpToDate);
    }

    #[tokio::test]
    async fn newer_release_is_available() {
        let server = spawn_stub_server(|request_line| {
            assert!(request_line.starts_with("GET /update/linux_x64/1.1.0 "));
            StubResponse::new(
                "200 OK",
                r#"{"url":"http://dl.example/ob-1.2.0.zip","name":"v1.2.0","notes":"fixes","pub_date":"2016-03-01T12:00:00Z"}"#,
            )
        });
        let outcome = check_for_update(
            &client(),
            &parsed(&server.url("/update/linux_x64/1.1.0")),
            "1.1.0",
        )
        .await
        .expect("check");

        let UpdateCheck::Available(release) = outcome else {
            panic!("expected an available release");
        };
        assert_eq!(release.download_url, "http://dl.example/ob-1.2.0.zip");
        assert_eq!(release.name.as_deref(), Some("v1.2.0"));
        assert_eq!(release.notes.as_deref(), Some("fixes"));
        assert_eq!(
            release.pub_date.map(|date| date.to_rfc3339()),
            Some("2016-03-01T12:00:00+00:00".to_string())
        );
    }

    #[tokio::test]
    async fn same_or_older_release_is_not_an_update() {
        let server = spawn_stub_server(|_| {
            StubResponse::new("200 OK", r#"{"url":"http://dl.example/old.zip","name":"1.0.9"}"#)
        });
        let outcome = check_for_update(&client(), &parsed(&server.url("/update/mac/1.1.0")), "1.1.0")
            .await
            .expect("check");
        assert_eq!(outcome, UpdateCheck::UpToDate);
    }

    #[tokio::test]
    async fn unversioned_release_name_is_still_offered() {
        let server = spawn_stub_server(|_| {
            StubResponse::new("200 OK", r#"{"url":"http://dl.example/new.zip","name":"Spring"}"#)
        });
        let outcome = check_for_update(&client(), &parsed(&server.url("/update/mac/1.1.0")), "1.1.0")
            .await
            .expect("check");
        assert!(matches!(outcome, UpdateCheck::Available(_)));
    }

    #[tokio::test]
    async fn server_error_and_bad_payload_are_errors() {
        let failing = spawn_stub_server(|_| StubResponse::new("500 Internal Server Error", ""));
        let error = check_for_update(&client(), &parsed(&failing.url("/update/mac/1.1.0")), "1.1.0")
            .await
            .expect_err("status error");
        assert!(matches!(error, UpdateFeedError::Status(StatusCode::INTERNAL_SERVER_ERROR)));

        let garbled = spawn_stub_server(|_| StubResponse::new("200 OK", "not json"));
        let error = check_for_update(&client(), &parsed(&garbled.url("/update/mac/1.1.0")), "1.1.0")
            .await
            .expect_err("payload error");
        assert!(matches!(error, UpdateFeedError::Payload(_)));
    }
}
