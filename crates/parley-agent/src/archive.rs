//! Audio archive over Azure Blob Storage.
//!
//! Uploads synthesized reply audio and returns a read-only URL that expires
//! after the configured TTL. Both the upload and the returned URL are
//! authorized with service SAS tokens signed locally from the storage
//! account key (HMAC-SHA256 over the canonical string-to-sign), so no
//! vendor SDK is involved. Archived objects are written once and never
//! overwritten — names are deterministic per turn.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use sha2::Sha256;

use crate::config::ArchiveConfig;
use crate::error::ArchiveError;
use crate::traits::AudioArchive;

/// Storage service version the SAS tokens are signed against.
const SERVICE_VERSION: &str = "2022-11-02";

/// Allowance for clock skew between this host and the storage service.
const START_SKEW_MINUTES: i64 = 5;

/// Blob archive for synthesized reply audio.
#[derive(Debug, Clone)]
pub struct BlobArchive {
    client: reqwest::Client,
    config: ArchiveConfig,
}

impl BlobArchive {
    pub fn new(config: ArchiveConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        match &self.config.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.blob.core.windows.net", self.config.account),
        }
    }

    fn sas_token(
        &self,
        key: &[u8],
        name: &str,
        permissions: &str,
        start: DateTime<Utc>,
        expiry: DateTime<Utc>,
    ) -> Result<String, ArchiveError> {
        let start = format_sas_time(start);
        let expiry = format_sas_time(expiry);
        let canonical = format!(
            "/blob/{}/{}/{}",
            self.config.account, self.config.container, name
        );
        let string_to_sign = sas_string_to_sign(permissions, &start, &expiry, &canonical);

        let mut mac = Hmac::<Sha256>::new_from_slice(key)
            .map_err(|e| ArchiveError::InvalidKey(e.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        Ok(format!(
            "sv={SERVICE_VERSION}&st={}&se={}&sr=b&sp={permissions}&sig={}",
            query_escape(&start),
            query_escape(&expiry),
            query_escape(&signature)
        ))
    }
}

#[async_trait]
impl AudioArchive for BlobArchive {
    async fn store(&self, audio: Vec<u8>, name: &str) -> Result<String, ArchiveError> {
        let key = BASE64
            .decode(&self.config.access_key)
            .map_err(|e| ArchiveError::InvalidKey(e.to_string()))?;

        let now = Utc::now();
        let start = now - Duration::minutes(START_SKEW_MINUTES);
        let expiry = now + Duration::seconds(self.config.sas_ttl_secs);

        let endpoint = self.endpoint();
        let path = encode_blob_path(name);
        let blob_url = format!("{endpoint}/{}/{path}", self.config.container);

        let write_sas = self.sas_token(&key, name, "cw", start, expiry)?;
        let response = self
            .client
            .put(format!("{blob_url}?{write_sas}"))
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-version", SERVICE_VERSION)
            .header(CONTENT_TYPE, "audio/mpeg")
            .body(audio)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ArchiveError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let read_sas = self.sas_token(&key, name, "r", start, expiry)?;
        Ok(format!("{blob_url}?{read_sas}"))
    }
}

/// Service SAS string-to-sign for blob resources, service version
/// 2020-12-06 and later: sixteen newline-separated fields, unused fields
/// empty.
fn sas_string_to_sign(permissions: &str, start: &str, expiry: &str, canonical: &str) -> String {
    format!(
        "{permissions}\n{start}\n{expiry}\n{canonical}\n\n\n\n{SERVICE_VERSION}\nb\n\n\n\n\n\n\n"
    )
}

fn format_sas_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Percent-encodes a value for use in a SAS query string.
fn query_escape(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Percent-encodes a blob name for use in a URL path, keeping `/` segment
/// separators and path-legal characters intact.
fn encode_blob_path(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' => encoded.push(byte as char),
            b'-' | b'.' | b'_' | b'~' | b'/' | b'+' | b':' | b'@' | b'(' | b')' => {
                encoded.push(byte as char)
            }
            other => {
                encoded.push('%');
                encoded.push_str(&format!("{other:02X}"));
            }
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_to_sign_has_sixteen_fields() {
        let sts = sas_string_to_sign(
            "r",
            "2025-01-01T00:00:00Z",
            "2025-01-01T01:00:00Z",
            "/blob/acct/temp-container/+15550001/audio-x.mp3",
        );
        let fields: Vec<&str> = sts.split('\n').collect();
        assert_eq!(fields.len(), 16);
        assert_eq!(fields[0], "r");
        assert_eq!(fields[3], "/blob/acct/temp-container/+15550001/audio-x.mp3");
        assert_eq!(fields[7], SERVICE_VERSION);
        assert_eq!(fields[8], "b", "signed resource is a blob");
        assert!(fields[15].is_empty(), "content-type override unused");
    }

    #[test]
    fn blob_path_keeps_separators_and_encodes_spaces() {
        let encoded = encode_blob_path("+15550001/audio-2025-01-01 00:00:00.000000+00:00.mp3");
        assert_eq!(
            encoded,
            "+15550001/audio-2025-01-01%2000:00:00.000000+00:00.mp3"
        );
    }

    #[test]
    fn query_escape_encodes_signature_characters() {
        assert_eq!(query_escape("ab+c/d="), "ab%2Bc%2Fd%3D");
        assert_eq!(query_escape("2025-01-01T00:00:00Z"), "2025-01-01T00%3A00%3A00Z");
    }

    #[test]
    fn endpoint_defaults_to_account_host() {
        let archive = BlobArchive::new(ArchiveConfig {
            account: "acct".to_string(),
            access_key: BASE64.encode(b"key"),
            container: "temp-container".to_string(),
            endpoint: None,
            sas_ttl_secs: 3_600,
            timeout_secs: 30,
        })
        .unwrap();
        assert_eq!(archive.endpoint(), "https://acct.blob.core.windows.net");

        let archive = BlobArchive::new(ArchiveConfig {
            account: "acct".to_string(),
            access_key: BASE64.encode(b"key"),
            container: "temp-container".to_string(),
            endpoint: Some("http://127.0.0.1:10000/acct/".to_string()),
            sas_ttl_secs: 3_600,
            timeout_secs: 30,
        })
        .unwrap();
        assert_eq!(archive.endpoint(), "http://127.0.0.1:10000/acct");
    }

    #[test]
    fn sas_token_is_deterministic_for_fixed_inputs() {
        let archive = BlobArchive::new(ArchiveConfig {
            account: "acct".to_string(),
            access_key: BASE64.encode(b"fixed-key"),
            container: "temp-container".to_string(),
            endpoint: None,
            sas_ttl_secs: 3_600,
            timeout_secs: 30,
        })
        .unwrap();

        let start = DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let expiry = start + Duration::hours(1);

        let a = archive
            .sas_token(b"fixed-key", "caller/audio-x.mp3", "r", start, expiry)
            .unwrap();
        let b = archive
            .sas_token(b"fixed-key", "caller/audio-x.mp3", "r", start, expiry)
            .unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with(&format!("sv={SERVICE_VERSION}&")));
        assert!(a.contains("&sp=r&"));
    }
}
