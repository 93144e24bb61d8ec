use std::fmt;

use serde::{Deserialize, Serialize};

/// A free-text medication name as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrugQuery(String);

impl DrugQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DrugQuery {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for DrugQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// RxNorm term type (TTY) of a concept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum TermType {
    Ingredient,
    ClinicalDrug,
    BrandName,
    BrandedDrug,
    Other(String),
}

impl TermType {
    /// Preference order used when several concepts match one name.
    pub const PRIORITY: [TermType; 4] = [
        TermType::Ingredient,
        TermType::ClinicalDrug,
        TermType::BrandName,
        TermType::BrandedDrug,
    ];

    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "IN" => TermType::Ingredient,
            "SCD" => TermType::ClinicalDrug,
            "BN" => TermType::BrandName,
            "SBD" => TermType::BrandedDrug,
            other => TermType::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            TermType::Ingredient => "IN",
            TermType::ClinicalDrug => "SCD",
            TermType::BrandName => "BN",
            TermType::BrandedDrug => "SBD",
            TermType::Other(code) => code,
        }
    }

    /// Index into [`TermType::PRIORITY`], if this type is ranked at all.
    pub fn priority(&self) -> Option<usize> {
        Self::PRIORITY.iter().position(|t| t == self)
    }
}

impl From<String> for TermType {
    fn from(value: String) -> Self {
        TermType::from_code(&value)
    }
}

impl From<TermType> for String {
    fn from(value: TermType) -> Self {
        value.code().to_string()
    }
}

impl fmt::Display for TermType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A fuzzy-search hit, alive only until one is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateConcept {
    pub rxcui: Option<String>,
    pub term_type: Option<TermType>,
    pub rank: Option<u32>,
}

/// Outcome of resolving one [`DrugQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CanonicalDrug {
    Resolved {
        rxcui: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        term_type: Option<TermType>,
        /// Name that produced the match; differs from the query after spelling correction.
        matched_name: String,
    },
    Unresolved,
}

impl CanonicalDrug {
    pub fn rxcui(&self) -> Option<&str> {
        match self {
            CanonicalDrug::Resolved { rxcui, .. } => Some(rxcui),
            CanonicalDrug::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, CanonicalDrug::Resolved { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub drugs_involved: [String; 2],
    /// Upstream severity label, passed through unvalidated.
    pub severity: String,
    pub description: String,
}

/// A drug mention pulled from free text. `dosage: None` means no dosage was
/// stated, which is distinct from an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub name: String,
    #[serde(default)]
    pub dosage: Option<String>,
}
