//! Stage-transition hook for the resolution cascade and provider failover.

use std::fmt;

use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ExactIngredient,
    FuzzyMatch,
    SpellingSuggestion,
    InteractionQuery,
    PrimaryProvider,
    SecondaryProvider,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ExactIngredient => "exact-ingredient",
            Stage::FuzzyMatch => "fuzzy-match",
            Stage::SpellingSuggestion => "spelling-suggestion",
            Stage::InteractionQuery => "interaction-query",
            Stage::PrimaryProvider => "primary-provider",
            Stage::SecondaryProvider => "secondary-provider",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    Entered { stage: Stage, subject: String },
    Succeeded { stage: Stage, subject: String },
    Failed {
        stage: Stage,
        subject: String,
        reason: String,
    },
    FallbackTriggered { from: Stage, to: Stage, subject: String },
}

impl StageEvent {
    pub fn stage(&self) -> Stage {
        match self {
            StageEvent::Entered { stage, .. }
            | StageEvent::Succeeded { stage, .. }
            | StageEvent::Failed { stage, .. } => *stage,
            StageEvent::FallbackTriggered { to, .. } => *to,
        }
    }
}

/// Receives every stage transition. Implementations must not panic or block.
pub trait StageObserver: Send + Sync {
    fn observe(&self, event: &StageEvent);
}

/// Default observer: forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StageObserver for TracingObserver {
    fn observe(&self, event: &StageEvent) {
        match event {
            StageEvent::Entered { stage, subject } => {
                debug!(stage = %stage, subject = %subject, "stage entered");
            }
            StageEvent::Succeeded { stage, subject } => {
                debug!(stage = %stage, subject = %subject, "stage succeeded");
            }
            StageEvent::Failed {
                stage,
                subject,
                reason,
            } => {
                warn!(stage = %stage, subject = %subject, "stage failed: {reason}");
            }
            StageEvent::FallbackTriggered { from, to, subject } => {
                warn!(from = %from, to = %to, subject = %subject, "fallback triggered");
            }
        }
    }
}
