use std::sync::Arc;

use tracing::{debug, warn};

use crate::entities::drug::ExtractionRecord;
use crate::error::RxVerifyError;
use crate::events::{Stage, StageEvent, StageObserver};
use crate::gateway::{TextProvider, prompts};
use crate::transform;

/// Drug/dosage extraction from free text. An empty list means nothing was extracted.
#[derive(Clone)]
pub struct ExtractionGateway {
    primary: Arc<dyn TextProvider>,
    secondary: Arc<dyn TextProvider>,
    observer: Arc<dyn StageObserver>,
}

impl ExtractionGateway {
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

    pub async fn extract(&self, text: &str) -> Vec<ExtractionRecord> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        match self
            .attempt(Stage::PrimaryProvider, self.primary.as_ref(), text)
            .await
        {
            Ok(records) => return records,
            Err(err) => warn!(provider = self.primary.name(), "primary extraction failed: {err}"),
        }

        self.observer.observe(&StageEvent::FallbackTriggered {
            from: Stage::PrimaryProvider,
            to: Stage::SecondaryProvider,
            subject: self.secondary.name().to_string(),
        });

        match self
            .attempt(Stage::SecondaryProvider, self.secondary.as_ref(), text)
            .await
        {
            Ok(records) => records,
            Err(err) => {
                warn!(provider = self.secondary.name(), "secondary extraction failed: {err}");
                Vec::new()
            }
        }
    }

    async fn attempt(
        &self,
        stage: Stage,
        provider: &dyn TextProvider,
        text: &str,
    ) -> Result<Vec<ExtractionRecord>, RxVerifyError> {
        let subject = provider.name().to_string();
        self.observer.observe(&StageEvent::Entered {
            stage,
            subject: subject.clone(),
        });

        match run_stage(stage, provider, text).await {
            Ok(records) => {
                debug!(provider = %subject, count = records.len(), "extraction parsed");
                self.observer.observe(&StageEvent::Succeeded { stage, subject });
                Ok(records)
            }
            Err(err) => {
                self.observer.observe(&StageEvent::Failed {
                    stage,
                    subject,
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

async fn run_stage(
    stage: Stage,
    provider: &dyn TextProvider,
    text: &str,
) -> Result<Vec<ExtractionRecord>, RxVerifyError> {
    if stage == Stage::PrimaryProvider {
        let raw = provider.complete(&prompts::extraction_primary(text)?).await?;
        transform::extraction::records_from_completion(&raw)
    } else {
        let raw = provider
            .complete(&prompts::extraction_secondary(text)?)
            .await?;
        transform::extraction::records_from_fenced(&raw)
    }
}
