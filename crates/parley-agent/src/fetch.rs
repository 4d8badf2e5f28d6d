//! Recording download from the telephony provider.
//!
//! The webhook hands us an opaque recording reference (a resource URL).
//! The last path segment is the recording SID; resolving it through the
//! provider's REST API yields the canonical resource URI, whose `.mp3`
//! sibling is the raw media. Both requests are authenticated with the
//! account's basic-auth credentials and run inside the bounded retry loop,
//! because the media is not always available the instant the webhook fires.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{RetryPolicy, TelephonyConfig};
use crate::error::FetchError;
use crate::retry::with_retry;
use crate::traits::RecordingSource;

/// Subset of the provider's recording metadata document.
#[derive(Debug, Deserialize)]
struct RecordingMetadata {
    uri: String,
}

/// Downloads recorded caller audio with bounded retry.
#[derive(Debug, Clone)]
pub struct RecordingFetcher {
    client: reqwest::Client,
    config: TelephonyConfig,
    retry: RetryPolicy,
}

impl RecordingFetcher {
    pub fn new(config: TelephonyConfig, retry: RetryPolicy) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            retry,
        })
    }

    /// Extracts the recording SID from the opaque reference.
    fn recording_sid(reference: &str) -> Result<&str, FetchError> {
        let last = reference
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("");
        let sid = last.trim_end_matches(".json").trim_end_matches(".mp3");
        if sid.is_empty() {
            return Err(FetchError::InvalidReference(reference.to_string()));
        }
        Ok(sid)
    }

    async fn attempt_download(&self, sid: &str) -> Result<Vec<u8>, FetchError> {
        let api_base = self.config.api_base.trim_end_matches('/');
        let metadata_url = format!(
            "{api_base}/2010-04-01/Accounts/{}/Recordings/{sid}.json",
            self.config.account_sid
        );

        let response = self
            .client
            .get(&metadata_url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let metadata: RecordingMetadata = response.json().await?;

        // The metadata URI points at the JSON representation; its .mp3
        // sibling is the raw media.
        let media_url = format!("{api_base}{}", metadata.uri.replace(".json", ".mp3"));
        let response = self
            .client
            .get(&media_url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl RecordingSource for RecordingFetcher {
    async fn fetch(&self, recording_url: &str) -> Result<Vec<u8>, FetchError> {
        let sid = Self::recording_sid(recording_url)?.to_string();
        tracing::debug!(sid = %sid, "resolving recording reference");

        let attempts = self.retry.attempts.max(1);
        with_retry(&self.retry, |_| self.attempt_download(&sid))
            .await
            .map_err(|e| FetchError::Exhausted {
                attempts,
                last: e.to_string(),
            })
    }
}
