use std::borrow::Cow;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{HF_TOKEN_ENV, HuggingFaceConfig};
use crate::error::RxVerifyError;

const HUGGINGFACE_API: &str = "huggingface";

/// Client for the Hugging Face serverless inference API.
#[derive(Clone)]
pub struct HuggingFaceClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
    token: Option<String>,
    timeout: Duration,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct GenerationParameters {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub return_full_text: bool,
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Debug, Deserialize)]
struct InferenceOutput {
    #[serde(default)]
    generated_text: Option<String>,
}

impl HuggingFaceClient {
    pub fn new(
        config: &HuggingFaceConfig,
        connect_timeout: Duration,
    ) -> Result<Self, RxVerifyError> {
        let client = crate::sources::build_client(connect_timeout, 0)?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(
        client: reqwest_middleware::ClientWithMiddleware,
        config: &HuggingFaceConfig,
    ) -> Self {
        Self {
            client,
            base: config.base.clone(),
            token: config.token.clone(),
            timeout: config.timeout,
        }
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(base: String, token: Option<String>) -> Result<Self, RxVerifyError> {
        let config = HuggingFaceConfig {
            base: Cow::Owned(base),
            token,
            timeout: Duration::from_secs(5),
            ..HuggingFaceConfig::default()
        };
        Self::new(&config, Duration::from_secs(2))
    }

    fn endpoint(&self, path: &str) -> String {
        crate::sources::join_endpoint(self.base.as_ref(), path)
    }

    fn require_token(&self) -> Result<&str, RxVerifyError> {
        self.token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| RxVerifyError::ApiKeyRequired {
                api: HUGGINGFACE_API.to_string(),
                env_var: HF_TOKEN_ENV.to_string(),
                docs_url: "https://huggingface.co/settings/tokens".to_string(),
            })
    }

    /// Runs text generation against `model` and returns the trimmed `generated_text`
    /// of the first output.
    pub async fn generate(
        &self,
        model: &str,
        inputs: &str,
        parameters: GenerationParameters,
    ) -> Result<String, RxVerifyError> {
        let token = self.require_token()?;
        let model = model.trim().trim_matches('/');
        if model.is_empty() {
            return Err(RxVerifyError::InvalidArgument(
                "Hugging Face model id is required".into(),
            ));
        }

        let url = self.endpoint(&format!("models/{model}"));
        let body = InferenceRequest { inputs, parameters };
        let outputs: Vec<InferenceOutput> = crate::sources::send_json(
            HUGGINGFACE_API,
            self.client
                .post(&url)
                .bearer_auth(token)
                .timeout(self.timeout)
                .json(&body),
        )
        .await?;

        outputs
            .into_iter()
            .next()
            .and_then(|o| o.generated_text)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| RxVerifyError::UnexpectedResponse {
                api: HUGGINGFACE_API.to_string(),
                detail: "missing generated_text".into(),
            })
    }
}
