use std::borrow::Cow;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{GOOGLE_API_KEY_ENV, GeminiConfig};
use crate::error::RxVerifyError;

const GEMINI_API: &str = "gemini";
pub(crate) const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the Google Generative Language `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
    api_key: Option<String>,
    model: Cow<'static, str>,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig, connect_timeout: Duration) -> Result<Self, RxVerifyError> {
        let client = crate::sources::build_client(connect_timeout, 0)?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(
        client: reqwest_middleware::ClientWithMiddleware,
        config: &GeminiConfig,
    ) -> Self {
        Self {
            client,
            base: config.base.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout: config.timeout,
        }
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(
        base: String,
        api_key: Option<String>,
    ) -> Result<Self, RxVerifyError> {
        let config = GeminiConfig {
            base: Cow::Owned(base),
            api_key,
            timeout: Duration::from_secs(5),
            ..GeminiConfig::default()
        };
        Self::new(&config, Duration::from_secs(2))
    }

    fn endpoint(&self, path: &str) -> String {
        crate::sources::join_endpoint(self.base.as_ref(), path)
    }

    fn require_api_key(&self) -> Result<&str, RxVerifyError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| RxVerifyError::ApiKeyRequired {
                api: GEMINI_API.to_string(),
                env_var: GOOGLE_API_KEY_ENV.to_string(),
                docs_url: "https://ai.google.dev/gemini-api/docs/api-key".to_string(),
            })
    }

    /// Sends a single-turn prompt and returns the trimmed text of the first candidate part.
    pub async fn generate_content(&self, prompt: &str) -> Result<String, RxVerifyError> {
        let api_key = self.require_api_key()?;
        let url = self.endpoint(&format!("models/{}:generateContent", self.model));
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let resp: GenerateContentResponse = crate::sources::send_json(
            GEMINI_API,
            self.client
                .post(&url)
                .header(API_KEY_HEADER, api_key)
                .timeout(self.timeout)
                .json(&body),
        )
        .await?;

        resp.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| RxVerifyError::UnexpectedResponse {
                api: GEMINI_API.to_string(),
                detail: "no candidate text".into(),
            })
    }
}
