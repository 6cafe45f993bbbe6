//! Page recognition through the Gemini `generateContent` API.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use docref_core::{Error, Result, RetryPolicy, TextRecognizer};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Longest slice of an error body kept in error messages.
const ERROR_SNIPPET_CHARS: usize = 300;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Image { inline_data: InlineData },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Recognizes pages by sending the rendered image to Gemini.
pub struct GeminiRecognizer {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    endpoint: String,
    retry: RetryPolicy,
}

impl GeminiRecognizer {
    pub fn new(api_key: &str, model: &str, retry: RetryPolicy) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Service(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            retry,
        })
    }

    /// Point at another API root (proxies, tests).
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    fn generate(&self, png: &[u8], page: usize) -> Result<String> {
        let prompt = ocr_prompt(page);
        let body = request_body(png, &prompt);
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| Error::Service(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| Error::Service(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &text));
        }
        response_text(&text)
    }
}

impl TextRecognizer for GeminiRecognizer {
    fn name(&self) -> &str {
        "gemini"
    }

    fn recognize(&self, png: &[u8], page: usize) -> Result<String> {
        self.retry.run("gemini", || self.generate(png, page))
    }
}

/// Instruction sent with each page image.
pub fn ocr_prompt(page: usize) -> String {
    format!(
        "이 문서 페이지(Page {page})의 모든 텍스트를 정확하게 추출해주세요.\n\n\
         규칙:\n\
         1. 원본의 구조와 레이아웃을 최대한 유지\n\
         2. 표는 마크다운 표 형식으로 변환\n\
         3. 제목/소제목 계층 구조 유지\n\
         4. 이미지 위치는 [이미지]로 표시\n\
         5. 추출한 텍스트만 출력 (부가 설명 금지)"
    )
}

fn request_body<'a>(png: &[u8], prompt: &'a str) -> GenerateRequest<'a> {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![
                Part::Image {
                    inline_data: InlineData {
                        mime_type: "image/png",
                        data: STANDARD.encode(png),
                    },
                },
                Part::Text { text: prompt },
            ],
        }],
    }
}

/// Overload and 503 responses are retryable; everything else is not.
fn classify_failure(status: u16, body: &str) -> Error {
    let snippet: String = body.chars().take(ERROR_SNIPPET_CHARS).collect();
    let message = format!("HTTP {}: {}", status, snippet.trim());
    if status == 503 || body.to_lowercase().contains("overloaded") || body.contains("UNAVAILABLE")
    {
        Error::ServiceUnavailable(message)
    } else {
        Error::Service(message)
    }
}

/// Text parts of the first candidate.
fn response_text(body: &str) -> Result<String> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| Error::Service(format!("unexpected response: {}", e)))?;

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::Service("response has no candidates".to_string()))?;

    Ok(candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let body = request_body(b"abc", "read");
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{
                    "parts": [
                        {"inline_data": {"mime_type": "image/png", "data": "YWJj"}},
                        {"text": "read"}
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_prompt_names_page() {
        let prompt = ocr_prompt(7);
        assert!(prompt.contains("(Page 7)"));
        assert!(prompt.contains("[이미지]"));
    }

    #[test]
    fn test_transient_failures() {
        assert!(classify_failure(503, "").is_transient());
        assert!(classify_failure(500, r#"{"error":{"status":"UNAVAILABLE"}}"#).is_transient());
        assert!(classify_failure(429, "The model is overloaded.").is_transient());
        assert!(!classify_failure(400, r#"{"error":{"status":"INVALID_ARGUMENT"}}"#).is_transient());
        assert!(!classify_failure(403, "PERMISSION_DENIED").is_transient());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let body = r##"{"candidates":[{"content":{"parts":[{"text":"# 제목\n"},{"text":"본문"}]}}]}"##;
        assert_eq!(response_text(body).unwrap(), "# 제목\n본문");

        let blocked = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        assert_eq!(response_text(blocked).unwrap(), "");

        assert!(matches!(response_text("{}"), Err(Error::Service(_))));
        assert!(matches!(response_text("not json"), Err(Error::Service(_))));
    }
}
