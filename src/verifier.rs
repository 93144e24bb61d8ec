//! The library boundary. Every operation here is total: upstream failures are
//! absorbed into empty results or explanatory text.

use std::sync::Arc;

use tracing::warn;

use crate::config::Config;
use crate::entities::drug::{CanonicalDrug, DrugQuery, ExtractionRecord, InteractionRecord};
use crate::entities::interaction::InteractionAggregator;
use crate::entities::prescription::{VerificationReport, VerificationRequest};
use crate::entities::term::TermResolver;
use crate::error::RxVerifyError;
use crate::events::{StageObserver, TracingObserver};
use crate::gateway::{
    ExtractionGateway, GeminiProvider, GenerationGateway, HuggingFaceProvider, prompts,
};
use crate::sources::gemini::GeminiClient;
use crate::sources::huggingface::HuggingFaceClient;
use crate::sources::rxnav::RxNavClient;

pub const PROMPT_UNAVAILABLE: &str = "Unable to prepare the analysis request.";

#[derive(Clone)]
pub struct Verifier {
    interactions: InteractionAggregator,
    generation: GenerationGateway,
    extraction: ExtractionGateway,
}

impl Verifier {
    /// Wires every client from `config`, reporting stage transitions through `tracing`.
    pub fn from_config(config: &Config) -> Result<Self, RxVerifyError> {
        Self::with_observer(config, Arc::new(TracingObserver))
    }

    pub fn with_observer(
        config: &Config,
        observer: Arc<dyn StageObserver>,
    ) -> Result<Self, RxVerifyError> {
        let rxnav = RxNavClient::new(&config.rxnav, config.connect_timeout)?;
        let huggingface = HuggingFaceClient::new(&config.huggingface, config.connect_timeout)?;
        let gemini = Arc::new(GeminiProvider::new(GeminiClient::new(
            &config.gemini,
            config.connect_timeout,
        )?));

        let resolver = TermResolver::new(rxnav.clone(), observer.clone());
        let interactions = InteractionAggregator::new(resolver, rxnav, observer.clone());
        let generation = GenerationGateway::new(
            Arc::new(HuggingFaceProvider::for_generation(
                huggingface.clone(),
                config.huggingface.generation_model.clone(),
            )),
            gemini.clone(),
            observer.clone(),
        );
        let extraction = ExtractionGateway::new(
            Arc::new(HuggingFaceProvider::for_extraction(
                huggingface,
                config.huggingface.extraction_model.clone(),
            )),
            gemini,
            observer,
        );

        Ok(Self::from_parts(interactions, generation, extraction))
    }

    pub fn from_parts(
        interactions: InteractionAggregator,
        generation: GenerationGateway,
        extraction: ExtractionGateway,
    ) -> Self {
        Self {
            interactions,
            generation,
            extraction,
        }
    }

    pub async fn resolve(&self, name: &str) -> CanonicalDrug {
        self.interactions
            .resolver()
            .resolve(&DrugQuery::new(name))
            .await
    }

    pub async fn check_interactions<S: AsRef<str>>(&self, names: &[S]) -> Vec<InteractionRecord> {
        self.interactions.check(names).await
    }

    pub async fn dosage_guidance(&self, age: u32, drug: &str, dosage: &str) -> String {
        match prompts::dosage(age, drug, dosage) {
            Ok(prompt) => self.generation.generate(&prompt).await,
            Err(err) => {
                warn!(drug, "failed to render dosage prompt: {err}");
                PROMPT_UNAVAILABLE.to_string()
            }
        }
    }

    pub async fn suggest_alternative(&self, problem_drug: &str, interacting_drug: &str) -> String {
        match prompts::alternative(problem_drug, interacting_drug) {
            Ok(prompt) => self.generation.generate(&prompt).await,
            Err(err) => {
                warn!(problem_drug, "failed to render alternative prompt: {err}");
                PROMPT_UNAVAILABLE.to_string()
            }
        }
    }

    pub async fn extract_from_text(&self, text: &str) -> Vec<ExtractionRecord> {
        self.extraction.extract(text).await
    }

    /// Interactions for the whole list, one dosage analysis per drug with a stated
    /// dosage, and an alternative for the first interaction found.
    pub async fn verify_prescription(&self, request: &VerificationRequest) -> VerificationReport {
        let names: Vec<&str> = request.drugs.iter().map(|d| d.name.as_str()).collect();
        let interactions = self.check_interactions(&names).await;

        let mut dosage_warnings = Vec::new();
        for drug in &request.drugs {
            let Some(dosage) = drug.stated_dosage() else {
                continue;
            };
            let guidance = self.dosage_guidance(request.age, &drug.name, dosage).await;
            dosage_warnings.push(format!("Analysis for {} {}: {}", drug.name, dosage, guidance));
        }

        let mut alternative_suggestions = Vec::new();
        // First pair only; not ranked by severity.
        if let Some(first) = interactions.first() {
            let [problem, interacting] = &first.drugs_involved;
            alternative_suggestions.push(self.suggest_alternative(problem, interacting).await);
        }

        VerificationReport {
            interactions,
            dosage_warnings,
            alternative_suggestions,
        }
    }
}
