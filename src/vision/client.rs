use anyhow::Context;
use axum::async_trait;
use base64ct::{Base64, Encoding};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::VisionConfig;

use super::parse::parse_food_items;
use super::types::{RecognizedFoodItem, VisionError};

/// Instruction sent with every photo. The model must answer with the JSON
/// contract and nothing else so parsing stays mechanical.
const PROMPT: &str = "Analyze the food in this photo. Respond with ONLY a JSON object of the form \
{\"foodItems\": [{\"name\": string, \"weight_grams\": number, \"calories_per_100g\": number, \
\"protein_per_100g\": number, \"fats_per_100g\": number, \"carbs_per_100g\": number, \
\"confidence\": number between 0 and 1}]}. Estimate weights visually. If no food is visible \
or the photo is too poor to judge, respond with {\"foodItems\": []}.";

const MAX_TOKENS: u32 = 1024;

#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Recognize the food items on the photo at `photo_url`. Never touches
    /// photo records; the caller owns the status transition.
    async fn analyze(&self, photo_url: &str) -> Result<Vec<RecognizedFoodItem>, VisionError>;
}

pub struct AnthropicVision {
    http: reqwest::Client,
    fetch: reqwest::Client,
    api_url: String,
    model: String,
}

impl AnthropicVision {
    pub fn new(config: &VisionConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let mut api_key =
            HeaderValue::from_str(&config.api_key).context("vision api key header")?;
        api_key.set_sensitive(true);
        headers.insert("x-api-key", api_key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(&config.api_version).context("vision api version header")?,
        );

        let timeout = std::time::Duration::from_secs(config.timeout_secs);
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("vision http client")?;
        // Separate client for photo bytes so provider headers never leak
        // to the storage host.
        let fetch = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("photo fetch client")?;

        Ok(Self {
            http,
            fetch,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
        })
    }

    async fn fetch_photo(&self, photo_url: &str) -> Result<(Vec<u8>, &'static str), VisionError> {
        let bytes = if photo_url.starts_with("http://") || photo_url.starts_with("https://") {
            let response = self
                .fetch
                .get(photo_url)
                .send()
                .await
                .map_err(|e| VisionError::Transient(format!("photo fetch: {}", e)))?;
            if !response.status().is_success() {
                return Err(VisionError::Transient(format!(
                    "photo fetch returned {}",
                    response.status()
                )));
            }
            response
                .bytes()
                .await
                .map_err(|e| VisionError::Transient(format!("photo fetch: {}", e)))?
                .to_vec()
        } else {
            tokio::fs::read(photo_url)
                .await
                .map_err(|e| VisionError::Transient(format!("photo read: {}", e)))?
        };
        Ok((bytes, media_type_for(photo_url)))
    }
}

#[async_trait]
impl VisionClient for AnthropicVision {
    #[instrument(skip(self))]
    async fn analyze(&self, photo_url: &str) -> Result<Vec<RecognizedFoodItem>, VisionError> {
        let (bytes, media_type) = self.fetch_photo(photo_url).await?;
        let data = Base64::encode_string(&bytes);

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            source_type: "base64",
                            media_type,
                            data,
                        },
                    },
                    ContentBlock::Text { text: PROMPT },
                ],
            }],
        };

        let response = self
            .http
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| VisionError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let envelope: MessagesResponse = response
            .json()
            .await
            .map_err(|e| VisionError::InvalidModelResponse(e.to_string()))?;
        let text = envelope
            .content
            .iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .ok_or_else(|| {
                VisionError::InvalidModelResponse("no text block in model response".into())
            })?;

        parse_food_items(text).map_err(|e| {
            debug!(raw = %text, "model response failed to parse");
            e
        })
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentBlock<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    source_type: &'a str,
    media_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn classify_status(status: StatusCode, body: &str) -> VisionError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => VisionError::RateLimited,
        StatusCode::UNAUTHORIZED => VisionError::Auth,
        StatusCode::BAD_REQUEST => VisionError::BadRequest(provider_message(body)),
        _ => VisionError::Transient(format!(
            "provider returned {}: {}",
            status,
            provider_message(body)
        )),
    }
}

fn provider_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}

fn media_type_for(url: &str) -> &'static str {
    let path = url.split('?').next().unwrap_or(url);
    match path
        .rsplit('.')
        .next()
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VisionConfig;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server_uri: &str) -> VisionConfig {
        VisionConfig {
            api_url: format!("{}/v1/messages", server_uri),
            api_key: "test-key".into(),
            api_version: "2023-06-01".into(),
            model: "test-model".into(),
            timeout_secs: 5,
        }
    }

    async fn mock_photo(server: &MockServer) -> String {
        Mock::given(method("GET"))
            .and(path("/photo.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpegbytes".to_vec()))
            .mount(server)
            .await;
        format!("{}/photo.jpg", server.uri())
    }

    fn envelope_with_text(text: &str) -> serde_json::Value {
        json!({
            "content": [{"type": "text", "text": text}]
        })
    }

    #[tokio::test]
    async fn analyze_parses_recognized_items() {
        let server = MockServer::start().await;
        let photo_url = mock_photo(&server).await;

        let answer = r#"{"foodItems": [{"name": "apple", "weight_grams": 150,
            "calories_per_100g": 52, "protein_per_100g": 0.3, "fats_per_100g": 0.2,
            "carbs_per_100g": 14, "confidence": 0.9}]}"#;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({"model": "test-model"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope_with_text(answer)))
            .mount(&server)
            .await;

        let client = AnthropicVision::new(&test_config(&server.uri())).unwrap();
        let items = client.analyze(&photo_url).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "apple");
        assert_eq!(items[0].weight_grams, 150.0);
    }

    #[tokio::test]
    async fn fenced_empty_list_yields_no_items() {
        let server = MockServer::start().await;
        let photo_url = mock_photo(&server).await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope_with_text("```json\n{\"foodItems\": []}\n```")),
            )
            .mount(&server)
            .await;

        let client = AnthropicVision::new(&test_config(&server.uri())).unwrap();
        let items = client.analyze(&photo_url).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn rate_limit_is_retryable() {
        let server = MockServer::start().await;
        let photo_url = mock_photo(&server).await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = AnthropicVision::new(&test_config(&server.uri())).unwrap();
        let err = client.analyze(&photo_url).await.unwrap_err();
        assert!(matches!(err, VisionError::RateLimited));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn bad_credentials_are_terminal() {
        let server = MockServer::start().await;
        let photo_url = mock_photo(&server).await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = AnthropicVision::new(&test_config(&server.uri())).unwrap();
        let err = client.analyze(&photo_url).await.unwrap_err();
        assert!(matches!(err, VisionError::Auth));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn provider_rejection_keeps_its_message() {
        let server = MockServer::start().await;
        let photo_url = mock_photo(&server).await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "type": "error",
                "error": {"type": "invalid_request_error", "message": "image too large"}
            })))
            .mount(&server)
            .await;

        let client = AnthropicVision::new(&test_config(&server.uri())).unwrap();
        match client.analyze(&photo_url).await.unwrap_err() {
            VisionError::BadRequest(msg) => assert!(msg.contains("image too large")),
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_errors_are_transient() {
        let server = MockServer::start().await;
        let photo_url = mock_photo(&server).await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let client = AnthropicVision::new(&test_config(&server.uri())).unwrap();
        let err = client.analyze(&photo_url).await.unwrap_err();
        assert!(matches!(err, VisionError::Transient(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn envelope_without_text_block_is_invalid_response() {
        let server = MockServer::start().await;
        let photo_url = mock_photo(&server).await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": []})))
            .mount(&server)
            .await;

        let client = AnthropicVision::new(&test_config(&server.uri())).unwrap();
        let err = client.analyze(&photo_url).await.unwrap_err();
        assert!(matches!(err, VisionError::InvalidModelResponse(_)));
    }

    #[tokio::test]
    async fn missing_photo_is_transient() {
        let server = MockServer::start().await;
        let photo_url = format!("{}/gone.jpg", server.uri());

        let client = AnthropicVision::new(&test_config(&server.uri())).unwrap();
        let err = client.analyze(&photo_url).await.unwrap_err();
        assert!(matches!(err, VisionError::Transient(_)));
    }

    #[tokio::test]
    async fn reads_local_photo_paths() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope_with_text("{\"foodItems\": []}")),
            )
            .mount(&server)
            .await;

        let file = std::env::temp_dir().join(format!("nutrilens-{}.jpg", Uuid::new_v4()));
        tokio::fs::write(&file, b"jpegbytes").await.unwrap();

        let client = AnthropicVision::new(&test_config(&server.uri())).unwrap();
        let items = client.analyze(&file.to_string_lossy()).await.unwrap();
        assert!(items.is_empty());

        tokio::fs::remove_file(&file).await.ok();
    }

    #[test]
    fn media_type_follows_url_extension() {
        assert_eq!(media_type_for("https://s.local/b/p.png"), "image/png");
        assert_eq!(media_type_for("https://s.local/b/p.webp"), "image/webp");
        assert_eq!(media_type_for("https://s.local/b/p.jpg?sig=abc"), "image/jpeg");
        assert_eq!(media_type_for("/tmp/photo.GIF"), "image/gif");
        assert_eq!(media_type_for("no-extension"), "image/jpeg");
    }
}
