//! Client for the Upstage information-extraction API.
//!
//! The service receives the PDF as a base64 data URL and answers with a JSON
//! document shaped by `schema::resume_schema`. Field interpretation lives in
//! `resumes::builder`.
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod payload;
pub mod schema;

use payload::ExtractedResume;

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Extraction returned empty content")]
    EmptyContent,

    #[error("Gave up after {retries} attempts")]
    Exhausted { retries: u32 },
}

/// A successful extraction: the typed payload and the JSON it was decoded from.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub data: ExtractedResume,
    pub raw: Value,
}

impl Extraction {
    pub fn from_json(raw: Value) -> Result<Self, ExtractionError> {
        let data = serde_json::from_value(raw.clone())?;
        Ok(Self { data, raw })
    }
}

/// Document-extraction backend. Carried in `AppState` as `Arc<dyn ResumeExtractor>`.
#[async_trait]
pub trait ResumeExtractor: Send + Sync {
    async fn extract(&self, filename: &str, pdf: &[u8]) -> Result<Extraction, ExtractionError>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Upstage information-extraction client (OpenAI-compatible chat completions).
#[derive(Clone)]
pub struct UpstageExtractor {
    client: Client,
    api_key: String,
    base_url: String,
}

impl UpstageExtractor {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self, ExtractionError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Request body for one PDF.
fn request_body(pdf: &[u8]) -> Value {
    let data_url = format!("data:application/pdf;base64,{}", STANDARD.encode(pdf));
    json!({
        "model": schema::EXTRACTION_MODEL,
        "messages": [{
            "role": "user",
            "content": [{
                "type": "image_url",
                "image_url": { "url": data_url }
            }]
        }],
        "response_format": schema::response_format()
    })
}

/// Pulls the JSON document out of a chat-completions response.
fn parse_completion(completion: ChatCompletion) -> Result<Extraction, ExtractionError> {
    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(ExtractionError::EmptyContent)?;
    let raw: Value = serde_json::from_str(content.trim())?;
    Extraction::from_json(raw)
}

#[async_trait]
impl ResumeExtractor for UpstageExtractor {
    /// Retries on 429 and 5xx with exponential backoff; other failures return immediately.
    async fn extract(&self, filename: &str, pdf: &[u8]) -> Result<Extraction, ExtractionError> {
        info!("Extracting resume fields from {filename} ({} bytes)", pdf.len());
        let body = request_body(pdf);
        let mut last_error: Option<ExtractionError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Extraction attempt {} for {filename} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(self.endpoint())
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(ExtractionError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Extraction API returned {status}: {body}");
                last_error = Some(ExtractionError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(ExtractionError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let completion: ChatCompletion = response.json().await?;
            let extraction = parse_completion(completion)?;
            debug!("Extraction succeeded for {filename}");
            return Ok(extraction);
        }

        Err(last_error.unwrap_or(ExtractionError::Exhausted {
            retries: MAX_RETRIES,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(content: Option<&str>) -> ChatCompletion {
        ChatCompletion {
            choices: vec![Choice {
                message: ChoiceMessage {
                    content: content.map(String::from),
                },
            }],
        }
    }

    #[test]
    fn test_request_body_embeds_pdf_as_data_url() {
        let body = request_body(b"%PDF-1.7");
        assert_eq!(body["model"], "information-extract");
        let url = body["messages"][0]["content"][0]["image_url"]["url"]
            .as_str()
            .unwrap();
        assert_eq!(url, "data:application/pdf;base64,JVBERi0xLjc=");
        assert_eq!(body["response_format"]["type"], "json_schema");
    }

    #[test]
    fn test_parse_completion_decodes_payload() {
        let extraction = parse_completion(completion(Some(
            r#"{"name": "Jane", "birth_year": 1990, "education": []}"#,
        )))
        .unwrap();
        assert_eq!(extraction.data.name, "Jane");
        assert_eq!(extraction.raw["birth_year"], 1990);
    }

    #[test]
    fn test_parse_completion_rejects_empty_content() {
        assert!(matches!(
            parse_completion(completion(None)),
            Err(ExtractionError::EmptyContent)
        ));
        assert!(matches!(
            parse_completion(completion(Some("  "))),
            Err(ExtractionError::EmptyContent)
        ));
        assert!(matches!(
            parse_completion(ChatCompletion { choices: vec![] }),
            Err(ExtractionError::EmptyContent)
        ));
    }

    #[test]
    fn test_parse_completion_rejects_invalid_json() {
        assert!(matches!(
            parse_completion(completion(Some("not json"))),
            Err(ExtractionError::Parse(_))
        ));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let extractor = UpstageExtractor::new(
            "key".to_string(),
            "https://api.upstage.ai/v1/information-extraction/".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            extractor.endpoint(),
            "https://api.upstage.ai/v1/information-extraction/chat/completions"
        );
    }
}
