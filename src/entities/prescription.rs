use serde::{Deserialize, Serialize};

use crate::entities::drug::InteractionRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugInput {
    pub name: String,
    #[serde(default)]
    pub dosage: Option<String>,
}

impl DrugInput {
    /// Dosage text when one was given and is not blank.
    pub fn stated_dosage(&self) -> Option<&str> {
        self.dosage
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub age: u32,
    pub drugs: Vec<DrugInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub interactions: Vec<InteractionRecord>,
    pub dosage_warnings: Vec<String>,
    pub alternative_suggestions: Vec<String>,
}
