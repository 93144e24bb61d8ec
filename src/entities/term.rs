//! Free-text drug name → RxCUI resolution cascade.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::entities::drug::{CandidateConcept, CanonicalDrug, DrugQuery, TermType};
use crate::events::{Stage, StageEvent, StageObserver};
use crate::sources::rxnav::{DrugsResponse, RxNavClient};
use crate::transform;

/// Spelling-corrected retries allowed after the first attempt (three attempts total).
pub const MAX_SPELLING_CORRECTIONS: usize = 2;

#[derive(Clone)]
pub struct TermResolver {
    client: RxNavClient,
    observer: Arc<dyn StageObserver>,
}

impl TermResolver {
    pub fn new(client: RxNavClient, observer: Arc<dyn StageObserver>) -> Self {
        Self { client, observer }
    }

    /// Resolves `query` through exact ingredient lookup, fuzzy match, and spelling
    /// correction, in that order. Upstream failures only end the current stage.
    pub async fn resolve(&self, query: &DrugQuery) -> CanonicalDrug {
        let mut name = query.as_str().trim().to_string();
        if name.is_empty() {
            return CanonicalDrug::Unresolved;
        }

        for attempt in 0..=MAX_SPELLING_CORRECTIONS {
            if let Some(found) = self.exact_ingredient(&name).await {
                return found;
            }
            self.fallback(Stage::ExactIngredient, Stage::FuzzyMatch, &name);

            if let Some(found) = self.fuzzy_match(&name).await {
                return found;
            }

            if attempt == MAX_SPELLING_CORRECTIONS {
                debug!(
                    drug = %query,
                    attempts = attempt + 1,
                    "spelling correction budget exhausted"
                );
                break;
            }
            self.fallback(Stage::FuzzyMatch, Stage::SpellingSuggestion, &name);

            match self.spelling_correction(&name).await {
                Some(corrected) => name = corrected,
                None => break,
            }
        }

        warn!(drug = %query, "could not resolve drug name to an RxCUI");
        CanonicalDrug::Unresolved
    }

    async fn exact_ingredient(&self, name: &str) -> Option<CanonicalDrug> {
        let stage = Stage::ExactIngredient;
        self.emit(StageEvent::Entered {
            stage,
            subject: name.to_string(),
        });

        let resp = match self.client.drugs(name).await {
            Ok(resp) => resp,
            Err(err) => {
                self.failed(stage, name, err.to_string());
                return None;
            }
        };

        match ingredient_rxcui(&resp) {
            Some(rxcui) => {
                self.succeeded(stage, name);
                Some(CanonicalDrug::Resolved {
                    rxcui,
                    term_type: Some(TermType::Ingredient),
                    matched_name: name.to_string(),
                })
            }
            None => {
                self.failed(stage, name, "no ingredient concept".into());
                None
            }
        }
    }

    async fn fuzzy_match(&self, name: &str) -> Option<CanonicalDrug> {
        let stage = Stage::FuzzyMatch;
        self.emit(StageEvent::Entered {
            stage,
            subject: name.to_string(),
        });

        let resp = match self.client.approximate_term(name).await {
            Ok(resp) => resp,
            Err(err) => {
                self.failed(stage, name, err.to_string());
                return None;
            }
        };

        let candidates: Vec<CandidateConcept> = resp
            .approximate_group
            .and_then(|g| g.candidate)
            .unwrap_or_default()
            .iter()
            .map(transform::candidate::from_rxnav)
            .collect();

        let best = transform::candidate::select_best(&candidates);
        match best.and_then(|c| c.rxcui.clone().map(|rxcui| (rxcui, c.term_type.clone()))) {
            Some((rxcui, term_type)) => {
                debug!(
                    drug = name,
                    rxcui = %rxcui,
                    tty = term_type.as_ref().map(TermType::code).unwrap_or("-"),
                    "fuzzy match selected"
                );
                self.succeeded(stage, name);
                Some(CanonicalDrug::Resolved {
                    rxcui,
                    term_type,
                    matched_name: name.to_string(),
                })
            }
            None => {
                self.failed(
                    stage,
                    name,
                    format!("{} candidates, none usable", candidates.len()),
                );
                None
            }
        }
    }

    async fn spelling_correction(&self, name: &str) -> Option<String> {
        let stage = Stage::SpellingSuggestion;
        self.emit(StageEvent::Entered {
            stage,
            subject: name.to_string(),
        });

        let resp = match self.client.spelling_suggestions(name).await {
            Ok(resp) => resp,
            Err(err) => {
                self.failed(stage, name, err.to_string());
                return None;
            }
        };

        let suggestion = resp
            .first_suggestion()
            .map(str::trim)
            .filter(|s| !s.is_empty() && s.to_lowercase() != name.to_lowercase())
            .map(str::to_string);

        match suggestion {
            Some(corrected) => {
                debug!(drug = name, suggestion = %corrected, "retrying with spelling suggestion");
                self.succeeded(stage, name);
                Some(corrected)
            }
            None => {
                self.failed(stage, name, "no differing suggestion".into());
                None
            }
        }
    }

    fn emit(&self, event: StageEvent) {
        self.observer.observe(&event);
    }

    fn succeeded(&self, stage: Stage, name: &str) {
        self.emit(StageEvent::Succeeded {
            stage,
            subject: name.to_string(),
        });
    }

    fn failed(&self, stage: Stage, name: &str, reason: String) {
        self.emit(StageEvent::Failed {
            stage,
            subject: name.to_string(),
            reason,
        });
    }

    fn fallback(&self, from: Stage, to: Stage, name: &str) {
        self.emit(StageEvent::FallbackTriggered {
            from,
            to,
            subject: name.to_string(),
        });
    }
}

/// First RxCUI found in an `IN`-tagged concept group.
fn ingredient_rxcui(resp: &DrugsResponse) -> Option<String> {
    resp.drug_group
        .as_ref()?
        .concept_group
        .as_ref()?
        .iter()
        .filter(|g| g.tty.as_deref().map(str::trim) == Some("IN"))
        .filter_map(|g| g.concept_properties.as_ref()?.first())
        .filter_map(|c| c.rxcui.as_deref().map(str::trim))
        .find(|rxcui| !rxcui.is_empty())
        .map(str::to_string)
}
