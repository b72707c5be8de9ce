use async_trait::async_trait;
use serde_json::{Value, json};

use crate::clients::{ClientError, ScriptGenerator};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Generates the voiceover script through the OpenAI chat-completions API.
#[derive(Debug, Clone)]
pub struct OpenAiScriptGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiScriptGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl ScriptGenerator for OpenAiScriptGenerator {
    async fn generate(&self, title: &str, description: &str) -> Result<String, ClientError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": build_prompt(title, description) }
            ]
        });

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
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
        parse_script(&value)
    }
}

/// Prompt for a 15–30 second vertical-video voiceover.
pub(crate) fn build_prompt(title: &str, description: &str) -> String {
    format!(
        "Generate a concise, engaging voiceover script for a vertical Shorts video:\n\
         \n\
         Title: {title}\n\
         Description: {description}\n\
         \n\
         Follow these rules exactly:\n\
         1. Respond ONLY with the voiceover text. Do NOT include any commentary, explanations, or formatting markup.\n\
         2. Use clear, simple language suitable for a broad audience.\n\
         3. Avoid special characters or emojis.\n\
         4. Do not include profanity, slurs, or any NSFW content.\n\
         5. Do NOT start with a greeting.\n\
         6. Structure the script as:\n\
         - Hook: 1-2 sentences to grab attention immediately.\n\
         - Story: unfold the narrative or key points.\n\
         - Payoff: 1-2 sentences delivering a satisfying conclusion.\n\
         - Start with something like \"Did you know\", or a catchy line.\n\
         \n\
         Make sure that the text is not too long and not too short. The video is from 15 to 30 seconds."
    )
}

pub(crate) fn parse_script(value: &Value) -> Result<String, ClientError> {
    let script = value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ClientError::Malformed("completion has no message content".into()))?;
    Ok(script.to_owned())
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn prompt_embeds_title_and_description() {
        let prompt = build_prompt("Cat opens doors", "It started with the pantry.");
        assert!(prompt.contains("Title: Cat opens doors"));
        assert!(prompt.contains("Description: It started with the pantry."));
        assert!(prompt.contains("Do NOT start with a greeting"));
        assert!(prompt.contains("15 to 30 seconds"));
    }

    #[test]
    fn parses_first_choice_content() {
        let value = json!({
            "choices": [ { "message": { "role": "assistant", "content": "  Did you know cats can open doors?  " } } ]
        });
        assert_eq!(
            parse_script(&value).unwrap(),
            "Did you know cats can open doors?"
        );
    }

    #[test]
    fn empty_or_missing_content_is_malformed() {
        assert!(matches!(
            parse_script(&json!({"choices": []})),
            Err(ClientError::Malformed(_))
        ));
        assert!(matches!(
            parse_script(&json!({
                "choices": [ { "message": { "content": "   " } } ]
            })),
            Err(ClientError::Malformed(_))
        ));
    }
}
