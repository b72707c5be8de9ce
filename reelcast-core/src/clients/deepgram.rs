use std::path::Path;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::clients::{ClientError, SpeechSynthesizer, Transcriber};
use crate::media::captions::CaptionSegment;

const SPEAK_URL: &str = "https://api.deepgram.com/v1/speak?model=aura-2-thalia-en&encoding=linear16&container=wav";

const LISTEN_URL: &str =
    "https://api.deepgram.com/v1/listen?model=nova-3&smart_format=true&utterances=true&punctuate=true";

/// Deepgram client covering both directions: text-to-speech for the
/// narration and prerecorded transcription for the captions.
#[derive(Debug, Clone)]
pub struct DeepgramClient {
    client: reqwest::Client,
    api_key: String,
}

impl DeepgramClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.api_key)
    }
}

#[async_trait]
impl SpeechSynthesizer for DeepgramClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ClientError> {
        let response = self
            .client
            .post(SPEAK_URL)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&json!({ "text": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Transcriber for DeepgramClient {
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<CaptionSegment>, ClientError> {
        let audio = tokio::fs::read(audio_path).await?;

        let response = self
            .client
            .post(LISTEN_URL)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .body(audio)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let value: Value = response.json().await?;
        parse_utterances(&value)
    }
}

/// Convert Deepgram's utterance list into caption segments.
///
/// Utterances missing a timestamp or transcript are skipped; the engine's
/// normalization pass reindexes whatever survives.
pub(crate) fn parse_utterances(value: &Value) -> Result<Vec<CaptionSegment>, ClientError> {
    let utterances = value
        .pointer("/results/utterances")
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::Malformed("response has no utterances".into()))?;

    Ok(utterances
        .iter()
        .filter_map(|utterance| {
            let start_seconds = utterance.get("start")?.as_f64()?;
            let end_seconds = utterance.get("end")?.as_f64()?;
            let text = utterance.get("transcript")?.as_str()?.to_owned();
            Some(CaptionSegment {
                index: 0, // reassigned during normalization
                start_seconds,
                end_seconds,
                text,
            })
        })
        .collect())
}
