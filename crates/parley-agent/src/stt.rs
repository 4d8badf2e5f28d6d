//! Speech-to-text over the Azure OpenAI Whisper deployment.

use async_trait::async_trait;
use reqwest::multipart;

use crate::config::TranscriptionConfig;
use crate::error::TranscriptionError;
use crate::traits::Transcriber;

/// Transcribes recorded caller audio in a fixed source language.
#[derive(Debug, Clone)]
pub struct SttService {
    client: reqwest::Client,
    config: TranscriptionConfig,
}

impl SttService {
    pub fn new(config: TranscriptionConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn transcription_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/audio/transcriptions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment,
            self.config.api_version
        )
    }
}

#[async_trait]
impl Transcriber for SttService {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, TranscriptionError> {
        let part = multipart::Part::bytes(audio)
            .file_name("audio.mp3")
            .mime_str("audio/mpeg")?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("response_format", "text")
            .text("language", self.config.language.clone());

        let response = self
            .client
            .post(self.transcription_url())
            .header("api-key", &self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TranscriptionError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        // response_format=text yields the bare transcript.
        Ok(response.text().await?.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcription_url_includes_deployment_and_api_version() {
        let service = SttService::new(TranscriptionConfig {
            endpoint: "https://example.openai.azure.com/".to_string(),
            api_key: "k".to_string(),
            deployment: "whisper-1".to_string(),
            api_version: "2024-06-01".to_string(),
            language: "es".to_string(),
            timeout_secs: 60,
        })
        .unwrap();

        assert_eq!(
            service.transcription_url(),
            "https://example.openai.azure.com/openai/deployments/whisper-1/audio/transcriptions?api-version=2024-06-01"
        );
    }
}
