//! Dual-provider text generation and extraction with primary → secondary failover.

use std::borrow::Cow;

use async_trait::async_trait;

use crate::error::RxVerifyError;
use crate::sources::gemini::GeminiClient;
use crate::sources::huggingface::{GenerationParameters, HuggingFaceClient};

pub mod extraction;
pub mod generation;
pub mod prompts;

pub use extraction::ExtractionGateway;
pub use generation::GenerationGateway;

/// A generative text backend: prompt in, raw completion out.
#[async_trait]
pub trait TextProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, RxVerifyError>;
}

const GENERATION_PARAMETERS: GenerationParameters = GenerationParameters {
    max_new_tokens: 250,
    temperature: 0.5,
    return_full_text: false,
};

const EXTRACTION_PARAMETERS: GenerationParameters = GenerationParameters {
    max_new_tokens: 256,
    temperature: 0.1,
    return_full_text: false,
};

/// Hugging Face inference model bound to one set of sampling parameters.
#[derive(Clone)]
pub struct HuggingFaceProvider {
    client: HuggingFaceClient,
    model: Cow<'static, str>,
    parameters: GenerationParameters,
    instruct: bool,
}

impl HuggingFaceProvider {
    /// Free-text generation: the prompt is wrapped in `[INST] ... [/INST]`.
    pub fn for_generation(client: HuggingFaceClient, model: Cow<'static, str>) -> Self {
        Self {
            client,
            model,
            parameters: GENERATION_PARAMETERS,
            instruct: true,
        }
    }

    /// Structured extraction: the prompt is sent verbatim at low temperature.
    pub fn for_extraction(client: HuggingFaceClient, model: Cow<'static, str>) -> Self {
        Self {
            client,
            model,
            parameters: EXTRACTION_PARAMETERS,
            instruct: false,
        }
    }

    fn inputs<'a>(&self, prompt: &'a str) -> Cow<'a, str> {
        if self.instruct {
            Cow::Owned(format!("[INST] {prompt} [/INST]"))
        } else {
            Cow::Borrowed(prompt)
        }
    }
}

#[async_trait]
impl TextProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn complete(&self, prompt: &str) -> Result<String, RxVerifyError> {
        let inputs = self.inputs(prompt);
        self.client
            .generate(&self.model, &inputs, self.parameters)
            .await
    }
}

#[derive(Clone)]
pub struct GeminiProvider {
    client: GeminiClient,
}

impl GeminiProvider {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, prompt: &str) -> Result<String, RxVerifyError> {
        self.client.generate_content(prompt).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::TextProvider;
    use crate::error::RxVerifyError;

    /// Replays scripted outcomes in order and records every prompt it receives.
    pub(crate) struct ScriptedProvider {
        name: &'static str,
        outcomes: Mutex<VecDeque<Result<String, RxVerifyError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        pub(crate) fn new(
            name: &'static str,
            outcomes: Vec<Result<String, RxVerifyError>>,
        ) -> Self {
            Self {
                name,
                outcomes: Mutex::new(outcomes.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn ok(name: &'static str, text: &str) -> Self {
            Self::new(name, vec![Ok(text.to_string())])
        }

        pub(crate) fn failing(name: &'static str, err: RxVerifyError) -> Self {
            Self::new(name, vec![Err(err)])
        }

        pub(crate) fn prompts(&self) -> Vec<String> {
            self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
        }

        pub(crate) fn calls(&self) -> usize {
            self.prompts().len()
        }
    }

    #[async_trait]
    impl TextProvider for ScriptedProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn complete(&self, prompt: &str) -> Result<String, RxVerifyError> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }
            self.outcomes
                .lock()
                .ok()
                .and_then(|mut o| o.pop_front())
                .unwrap_or_else(|| {
                    Err(RxVerifyError::Api {
                        api: self.name.to_string(),
                        message: "no scripted outcome left".into(),
                    })
                })
        }
    }

    pub(crate) fn status_error(api: &str, status: u16) -> RxVerifyError {
        RxVerifyError::Api {
            api: api.to_string(),
            message: format!("HTTP {status}"),
        }
    }
}
