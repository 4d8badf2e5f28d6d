//! Text-to-speech over Azure Cognitive Speech.
//!
//! Synthesis is two-phase: exchange the subscription key for a short-lived
//! bearer token at the region's STS endpoint, then POST SSML wrapping the
//! reply text to the synthesis endpoint. A non-success status in either
//! phase fails the stage.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use crate::config::SpeechConfig;
use crate::error::SynthesisError;
use crate::traits::SpeechSynthesizer;

/// Renders reply text to audio in a fixed voice and language.
#[derive(Debug, Clone)]
pub struct TtsService {
    client: reqwest::Client,
    config: SpeechConfig,
}

impl TtsService {
    pub fn new(config: SpeechConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn token_url(&self) -> String {
        format!(
            "https://{}.api.cognitive.microsoft.com/sts/v1.0/issueToken",
            self.config.region
        )
    }

    fn synthesis_url(&self) -> String {
        format!(
            "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
            self.config.region
        )
    }

    async fn issue_token(&self) -> Result<String, SynthesisError> {
        let response = self
            .client
            .post(self.token_url())
            .header("Ocp-Apim-Subscription-Key", &self.config.subscription_key)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SynthesisError::Token {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl SpeechSynthesizer for TtsService {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let token = self.issue_token().await?;
        let body = build_ssml(&self.config.language, &self.config.voice, text);

        let response = self
            .client
            .post(self.synthesis_url())
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", &self.config.output_format)
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SynthesisError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Builds the SSML synthesis request body. Reply text is XML-escaped.
fn build_ssml(language: &str, voice: &str, text: &str) -> String {
    format!(
        "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xml:lang='{language}'>\
         <voice name='{voice}'>{}</voice>\
         </speak>",
        escape_xml(text)
    )
}

/// Escapes the five XML-significant characters.
fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssml_wraps_text_in_configured_voice() {
        let body = build_ssml("es-MX", "es-MX-DaliaNeural", "Hola, ¿cómo puedo ayudarte?");
        assert!(body.starts_with("<speak version='1.0'"));
        assert!(body.contains("xml:lang='es-MX'"));
        assert!(body.contains("<voice name='es-MX-DaliaNeural'>Hola, ¿cómo puedo ayudarte?</voice>"));
    }

    #[test]
    fn reply_text_is_xml_escaped() {
        let body = build_ssml("es-MX", "es-MX-DaliaNeural", "2 < 3 & 'ok'");
        assert!(body.contains("2 &lt; 3 &amp; &apos;ok&apos;"));
    }

    #[test]
    fn urls_are_region_scoped() {
        let service = TtsService::new(SpeechConfig {
            region: "eastus".to_string(),
            subscription_key: "k".to_string(),
            voice: "es-MX-DaliaNeural".to_string(),
            language: "es-MX".to_string(),
            output_format: "audio-16khz-128kbitrate-mono-mp3".to_string(),
            timeout_secs: 30,
        })
        .unwrap();

        assert_eq!(
            service.token_url(),
            "https://eastus.api.cognitive.microsoft.com/sts/v1.0/issueToken"
        );
        assert_eq!(
            service.synthesis_url(),
            "https://eastus.tts.speech.microsoft.com/cognitiveservices/v1"
        );
    }
}
