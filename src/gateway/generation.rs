use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::RxVerifyError;
use crate::events::{Stage, StageEvent, StageObserver};
use crate::gateway::TextProvider;

pub const MISSING_SECONDARY_KEY: &str =
    "ERROR: Google API Key is missing. Please configure your environment.";
pub const SECONDARY_COMMUNICATION_ERROR: &str =
    "An error occurred while communicating with the backup AI model.";
pub const SECONDARY_UNEXPECTED_RESPONSE: &str = "Received an unexpected response from Google AI.";

/// Natural-language generation that always yields text.
#[derive(Clone)]
pub struct GenerationGateway {
    primary: Arc<dyn TextProvider>,
    secondary: Arc<dyn TextProvider>,
    observer: Arc<dyn StageObserver>,
}

impl GenerationGateway {
    pub fn new(
        primary: Arc<dyn TextProvider>,
        secondary: Arc<dyn TextProvider>,
        observer: Arc<dyn StageObserver>,
    ) -> Self {
        Self {
            primary,
            secondary,
            observer,
        }
    }

    /// Returns the primary provider's text, or the secondary's when the primary
    /// soft-fails. Secondary failures become fixed explanatory strings.
    pub async fn generate(&self, prompt: &str) -> String {
        if let Some(text) = self.try_primary(prompt).await {
            return text;
        }

        self.observer.observe(&StageEvent::FallbackTriggered {
            from: Stage::PrimaryProvider,
            to: Stage::SecondaryProvider,
            subject: self.secondary.name().to_string(),
        });
        self.secondary_or_notice(prompt).await
    }

    async fn try_primary(&self, prompt: &str) -> Option<String> {
        let stage = Stage::PrimaryProvider;
        let subject = self.primary.name().to_string();
        self.observer.observe(&StageEvent::Entered {
            stage,
            subject: subject.clone(),
        });

        let failure = match self.primary.complete(prompt).await {
            Ok(text) if !text.trim().is_empty() => {
                self.observer.observe(&StageEvent::Succeeded { stage, subject });
                return Some(text);
            }
            Ok(_) => "empty generated text".to_string(),
            Err(err) => err.to_string(),
        };

        warn!(provider = %subject, "primary generation failed: {failure}");
        self.observer.observe(&StageEvent::Failed {
            stage,
            subject,
            reason: failure,
        });
        None
    }

    async fn secondary_or_notice(&self, prompt: &str) -> String {
        let stage = Stage::SecondaryProvider;
        let subject = self.secondary.name().to_string();
        self.observer.observe(&StageEvent::Entered {
            stage,
            subject: subject.clone(),
        });

        match self.secondary.complete(prompt).await {
            Ok(text) => {
                debug!(provider = %subject, "secondary generation succeeded");
                self.observer.observe(&StageEvent::Succeeded { stage, subject });
                text
            }
            Err(err) => {
                warn!(provider = %subject, "secondary generation failed: {err}");
                let notice = secondary_notice(&err);
                self.observer.observe(&StageEvent::Failed {
                    stage,
                    subject,
                    reason: err.to_string(),
                });
                notice.to_string()
            }
        }
    }
}

fn secondary_notice(err: &RxVerifyError) -> &'static str {
    match err {
        RxVerifyError::ApiKeyRequired { .. } => MISSING_SECONDARY_KEY,
        err if err.is_malformed_response() => SECONDARY_UNEXPECTED_RESPONSE,
        _ => SECONDARY_COMMUNICATION_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;
    use crate::events::testing::RecordingObserver;
    use crate::gateway::testing::{ScriptedProvider, status_error};
    use crate::gateway::{GeminiProvider, HuggingFaceProvider};
    use crate::sources::gemini::GeminiClient;
    use crate::sources::huggingface::HuggingFaceClient;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(
        primary: Arc<ScriptedProvider>,
        secondary: Arc<ScriptedProvider>,
    ) -> (GenerationGateway, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        (
            GenerationGateway::new(primary, secondary, observer.clone()),
            observer,
        )
    }

    fn key_missing() -> RxVerifyError {
        RxVerifyError::ApiKeyRequired {
            api: "gemini".into(),
            env_var: "GOOGLE_API_KEY".into(),
            docs_url: "https://ai.google.dev/".into(),
        }
    }

    #[tokio::test]
    async fn primary_text_is_returned_without_touching_secondary() {
        let primary = Arc::new(ScriptedProvider::ok("primary", "Dose is appropriate."));
        let secondary = Arc::new(ScriptedProvider::ok("secondary", "unused"));
        let (gateway, observer) = gateway(primary.clone(), secondary.clone());

        assert_eq!(gateway.generate("prompt").await, "Dose is appropriate.");
        assert_eq!(secondary.calls(), 0);
        assert_eq!(observer.entered(), vec![Stage::PrimaryProvider]);
    }

    #[tokio::test]
    async fn primary_status_failure_falls_back_to_secondary() {
        let primary = Arc::new(ScriptedProvider::failing("primary", status_error("primary", 503)));
        let secondary = Arc::new(ScriptedProvider::ok("secondary", "Backup answer."));
        let (gateway, observer) = gateway(primary, secondary.clone());

        assert_eq!(gateway.generate("the prompt").await, "Backup answer.");
        assert_eq!(secondary.prompts(), vec!["the prompt".to_string()]);
        assert_eq!(
            observer.entered(),
            vec![Stage::PrimaryProvider, Stage::SecondaryProvider]
        );
        assert!(observer.events().iter().any(|e| matches!(
            e,
            StageEvent::FallbackTriggered {
                from: Stage::PrimaryProvider,
                to: Stage::SecondaryProvider,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn blank_primary_text_counts_as_failure() {
        let primary = Arc::new(ScriptedProvider::ok("primary", "   "));
        let secondary = Arc::new(ScriptedProvider::ok("secondary", "Backup answer."));
        let (gateway, _) = gateway(primary, secondary);

        assert_eq!(gateway.generate("p").await, "Backup answer.");
    }

    #[tokio::test]
    async fn missing_secondary_key_yields_fixed_notice() {
        let primary = Arc::new(ScriptedProvider::failing("primary", status_error("primary", 500)));
        let secondary = Arc::new(ScriptedProvider::failing("secondary", key_missing()));
        let (gateway, _) = gateway(primary, secondary);

        assert_eq!(gateway.generate("p").await, MISSING_SECONDARY_KEY);
    }

    #[tokio::test]
    async fn secondary_transport_failure_yields_communication_notice() {
        let primary = Arc::new(ScriptedProvider::failing("primary", status_error("primary", 500)));
        let secondary = Arc::new(ScriptedProvider::failing(
            "secondary",
            status_error("secondary", 429),
        ));
        let (gateway, _) = gateway(primary, secondary);

        assert_eq!(gateway.generate("p").await, SECONDARY_COMMUNICATION_ERROR);
    }

    #[tokio::test]
    async fn secondary_malformed_reply_yields_unexpected_notice() {
        let primary = Arc::new(ScriptedProvider::failing("primary", status_error("primary", 500)));
        let secondary = Arc::new(ScriptedProvider::failing(
            "secondary",
            RxVerifyError::UnexpectedResponse {
                api: "gemini".into(),
                detail: "no candidate text".into(),
            },
        ));
        let (gateway, _) = gateway(primary, secondary);

        assert_eq!(gateway.generate("p").await, SECONDARY_UNEXPECTED_RESPONSE);
    }

    #[tokio::test]
    async fn http_primary_503_is_answered_by_gemini() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/BioMistral/BioMistral-7B"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "Gemini guidance."}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let hf = HuggingFaceClient::new_for_test(server.uri(), Some("hf".into())).unwrap();
        let gemini = GeminiClient::new_for_test(server.uri(), Some("g".into())).unwrap();
        let gateway = GenerationGateway::new(
            Arc::new(HuggingFaceProvider::for_generation(
                hf,
                Cow::Borrowed("BioMistral/BioMistral-7B"),
            )),
            Arc::new(GeminiProvider::new(gemini)),
            Arc::new(RecordingObserver::default()),
        );

        assert_eq!(gateway.generate("dose?").await, "Gemini guidance.");
    }

    #[tokio::test]
    async fn both_providers_unconfigured_still_return_text() {
        let hf = HuggingFaceClient::new_for_test("http://127.0.0.1:9".into(), None).unwrap();
        let gemini = GeminiClient::new_for_test("http://127.0.0.1:9".into(), None).unwrap();
        let gateway = GenerationGateway::new(
            Arc::new(HuggingFaceProvider::for_generation(hf, Cow::Borrowed("m"))),
            Arc::new(GeminiProvider::new(gemini)),
            Arc::new(RecordingObserver::default()),
        );

        assert_eq!(gateway.generate("dose?").await, MISSING_SECONDARY_KEY);
    }
}
