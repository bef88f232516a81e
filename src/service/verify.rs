use std::collections::HashMap;
use std::env;

use derive_more::{Display, Error};
use log::warn;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1";
const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

#[derive(Debug, Display, Error)]
pub enum VerifierError {
    #[display(fmt = "missing VERIFIER_API_KEY environment variable")]
    MissingApiKey,

    #[display(fmt = "invalid image data uri")]
    InvalidImage,

    #[display(fmt = "request failed: {}", _0)]
    RequestFailed(#[error(not(source))] String),

    #[display(fmt = "response parsing failed: {}", _0)]
    ResponseParseFailed(#[error(not(source))] String),

    #[display(fmt = "rate limited")]
    RateLimited,

    #[display(fmt = "unauthorized: invalid api key")]
    Unauthorized,

    #[display(fmt = "api error (status {}): {}", status, message)]
    ApiError { status: u16, message: String },
}

/// Verdict on an uploaded ID document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdCardVerdict {
    pub is_id_card: bool,
    pub has_face: bool,
    pub date_of_birth: Option<String>,
    pub reason: String,
}

/// Verdict on an uploaded payment-proof image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptVerdict {
    pub is_receipt: bool,
    pub amount_matches: bool,
    pub reason: String,
}

impl ReceiptVerdict {
    pub fn passed(&self) -> bool {
        self.is_receipt && self.amount_matches
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightsInput {
    pub total_tickets_sold: u32,
    pub total_revenue: f64,
    pub category_distribution: HashMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInsights {
    pub summary: String,
    pub recommendations: String,
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: String,
    data: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: String,
}

/// Client for the hosted model that pre-screens uploaded documents.
/// Request/response calls only: no streaming, no retries.
#[derive(Clone)]
pub struct VerifierClient {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl VerifierClient {
    pub fn from_env() -> Result<Self, VerifierError> {
        let api_key = env::var("VERIFIER_API_KEY").map_err(|_| VerifierError::MissingApiKey)?;
        let api_url = env::var("VERIFIER_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let model = env::var("VERIFIER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self::new(api_key, api_url, model))
    }

    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            api_url,
            model,
        }
    }

    pub async fn verify_id_card(&self, photo_data_uri: &str) -> Result<IdCardVerdict, VerifierError> {
        let prompt = "You are a document verifier for a ticket booking service. Decide whether \
                      the attached image is a government-issued identification document (driver's \
                      license, passport, national ID), whether a person's face is clearly visible \
                      on it, and extract the date of birth if it is legible. Reply with a single \
                      JSON object and nothing else, using exactly these keys: \
                      {\"isIdCard\": bool, \"hasFace\": bool, \"dateOfBirth\": \"YYYY-MM-DD\" or null, \
                      \"reason\": string}. The reason must briefly explain the decision, especially \
                      on failure."
            .to_string();
        self.structured(prompt, Some(photo_data_uri)).await
    }

    pub async fn verify_payment_receipt(
        &self,
        photo_data_uri: &str,
        expected_amount: f64,
    ) -> Result<ReceiptVerdict, VerifierError> {
        let prompt = format!(
            "You are a financial document verifier for a ticket booking service. Decide whether \
             the attached image is a screenshot or photo of a payment transaction (banking app, \
             mobile wallet), and whether the transaction amount matches the expected amount of \
             {expected_amount}. If no amount is visible, treat the amount as matching. Reply with \
             a single JSON object and nothing else, using exactly these keys: \
             {{\"isReceipt\": bool, \"amountMatches\": bool, \"reason\": string}}. The reason must \
             briefly explain the decision, especially on failure."
        );
        self.structured(prompt, Some(photo_data_uri)).await
    }

    pub async fn event_insights(&self, input: &InsightsInput) -> Result<EventInsights, VerifierError> {
        let distribution = input
            .category_distribution
            .iter()
            .map(|(name, count)| format!("{name}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        let prompt = format!(
            "You analyze ticket-sales data for event organizers. Total tickets sold: {}. Total \
             revenue: {}. Tickets per category: {}. Reply with a single JSON object and nothing \
             else, using exactly these keys: {{\"summary\": string, \"recommendations\": string}}. \
             The summary is a concise read on performance; the recommendations name at least two \
             specific, actionable changes to pricing, distribution or organization.",
            input.total_tickets_sold, input.total_revenue, distribution
        );
        self.structured(prompt, None).await
    }

    async fn structured<T: DeserializeOwned>(
        &self,
        prompt: String,
        photo_data_uri: Option<&str>,
    ) -> Result<T, VerifierError> {
        let mut content = vec![ContentBlock::Text { text: prompt }];
        if let Some(uri) = photo_data_uri {
            let (media_type, data) = parse_data_uri(uri)?;
            content.push(ContentBlock::Image {
                source: ImageSource {
                    kind: "base64",
                    media_type,
                    data,
                },
            });
        }
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content,
            }],
        };

        let response = self
            .client
            .post(format!("{}/messages", self.api_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| VerifierError::RequestFailed(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let body = response
                    .json::<MessagesResponse>()
                    .await
                    .map_err(|e| VerifierError::ResponseParseFailed(e.to_string()))?;
                let text = body
                    .content
                    .iter()
                    .map(|b| b.text.as_str())
                    .collect::<String>();
                parse_verdict(&text)
            }
            StatusCode::TOO_MANY_REQUESTS => Err(VerifierError::RateLimited),
            StatusCode::UNAUTHORIZED => Err(VerifierError::Unauthorized),
            status => {
                let message = response.text().await.unwrap_or_default();
                warn!("verifier api error {}: {}", status, message);
                Err(VerifierError::ApiError {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

/// Splits `data:<mediatype>;base64,<data>` into media type and payload.
fn parse_data_uri(uri: &str) -> Result<(String, String), VerifierError> {
    let rest = uri.strip_prefix("data:").ok_or(VerifierError::InvalidImage)?;
    let (header, data) = rest.split_once(',').ok_or(VerifierError::InvalidImage)?;
    let media_type = header
        .strip_suffix(";base64")
        .ok_or(VerifierError::InvalidImage)?;
    if media_type.is_empty() || data.is_empty() {
        return Err(VerifierError::InvalidImage);
    }
    Ok((media_type.to_string(), data.to_string()))
}

/// The model is asked for bare JSON but may still wrap it in a code fence
/// or prose; take the outermost object before deserializing.
fn parse_verdict<T: DeserializeOwned>(text: &str) -> Result<T, VerifierError> {
    let start = text
        .find('{')
        .ok_or_else(|| VerifierError::ResponseParseFailed("no json object in reply".to_string()))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| VerifierError::ResponseParseFailed("no json object in reply".to_string()))?;
    serde_json::from_str(&text[start..=end])
        .map_err(|e| VerifierError::ResponseParseFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_parses() {
        let (media, data) = parse_data_uri("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(media, "image/png");
        assert_eq!(data, "aGVsbG8=");
    }

    #[test]
    fn malformed_data_uri_is_rejected() {
        assert!(parse_data_uri("image/png;base64,aGVsbG8=").is_err());
        assert!(parse_data_uri("data:image/png,aGVsbG8=").is_err());
        assert!(parse_data_uri("data:;base64,").is_err());
    }

    #[test]
    fn verdict_parses_from_fenced_reply() {
        let text = "Here is my assessment:\n```json\n{\"isReceipt\": true, \
                    \"amountMatches\": false, \"reason\": \"amount is 50, expected 100\"}\n```";
        let verdict: ReceiptVerdict = parse_verdict(text).unwrap();
        assert!(verdict.is_receipt);
        assert!(!verdict.amount_matches);
        assert!(!verdict.passed());
    }

    #[test]
    fn id_verdict_uses_camel_case_keys() {
        let verdict: IdCardVerdict = parse_verdict(
            "{\"isIdCard\": true, \"hasFace\": true, \"dateOfBirth\": null, \"reason\": \"ok\"}",
        )
        .unwrap();
        assert!(verdict.is_id_card && verdict.has_face);
        assert_eq!(verdict.date_of_birth, None);
    }

    #[test]
    fn reply_without_json_fails() {
        assert!(parse_verdict::<ReceiptVerdict>("I cannot tell.").is_err());
    }
}
