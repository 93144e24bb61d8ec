//! Explicit runtime configuration for upstream endpoints, credentials, and timeouts.
//!
//! A `Config` is built once (usually via [`Config::from_env`]) and handed to every
//! client and gateway at construction. Nothing in the crate reads the environment
//! after that point.

use std::borrow::Cow;
use std::time::Duration;

pub const RXNAV_BASE: &str = "https://rxnav.nlm.nih.gov/REST";
pub const HUGGINGFACE_BASE: &str = "https://api-inference.huggingface.co";
pub const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_GENERATION_MODEL: &str = "BioMistral/BioMistral-7B";
pub const DEFAULT_EXTRACTION_MODEL: &str = "ibm-granite/granite-3.3-2b-instruct";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

pub const HF_TOKEN_ENV: &str = "HF_API_TOKEN";
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";

const RXNAV_BASE_ENV: &str = "RXVERIFY_RXNAV_BASE";
const HUGGINGFACE_BASE_ENV: &str = "RXVERIFY_HF_BASE";
const GEMINI_BASE_ENV: &str = "RXVERIFY_GEMINI_BASE";
const GENERATION_MODEL_ENV: &str = "RXVERIFY_GENERATION_MODEL";
const EXTRACTION_MODEL_ENV: &str = "RXVERIFY_EXTRACTION_MODEL";
const GEMINI_MODEL_ENV: &str = "RXVERIFY_GEMINI_MODEL";

#[derive(Debug, Clone)]
pub struct Config {
    pub rxnav: RxNavConfig,
    pub huggingface: HuggingFaceConfig,
    pub gemini: GeminiConfig,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RxNavConfig {
    pub base: Cow<'static, str>,
    pub drugs_timeout: Duration,
    pub approximate_timeout: Duration,
    pub spelling_timeout: Duration,
    pub interaction_timeout: Duration,
    /// Upper bound on candidates returned by the fuzzy endpoint.
    pub approximate_max_entries: usize,
    /// Transient-failure retries per call. Zero by default: a failed or timed-out
    /// call ends its stage and the cascade moves on.
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub base: Cow<'static, str>,
    pub token: Option<String>,
    pub generation_model: Cow<'static, str>,
    pub extraction_model: Cow<'static, str>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base: Cow<'static, str>,
    pub api_key: Option<String>,
    pub model: Cow<'static, str>,
    pub timeout: Duration,
}

impl Default for RxNavConfig {
    fn default() -> Self {
        Self {
            base: Cow::Borrowed(RXNAV_BASE),
            drugs_timeout: Duration::from_secs(10),
            approximate_timeout: Duration::from_secs(10),
            spelling_timeout: Duration::from_secs(5),
            interaction_timeout: Duration::from_secs(15),
            approximate_max_entries: 4,
            max_retries: 0,
        }
    }
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            base: Cow::Borrowed(HUGGINGFACE_BASE),
            token: None,
            generation_model: Cow::Borrowed(DEFAULT_GENERATION_MODEL),
            extraction_model: Cow::Borrowed(DEFAULT_EXTRACTION_MODEL),
            timeout: Duration::from_secs(45),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base: Cow::Borrowed(GEMINI_BASE),
            api_key: None,
            model: Cow::Borrowed(DEFAULT_GEMINI_MODEL),
            timeout: Duration::from_secs(60),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rxnav: RxNavConfig::default(),
            huggingface: HuggingFaceConfig::default(),
            gemini: GeminiConfig::default(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Builds a configuration from process environment variables, falling back to
    /// production endpoints. Missing credentials are left as `None`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let with_default = |key: &str, default: &'static str| -> Cow<'static, str> {
            value(key)
                .map(Cow::Owned)
                .unwrap_or(Cow::Borrowed(default))
        };

        Self {
            rxnav: RxNavConfig {
                base: with_default(RXNAV_BASE_ENV, RXNAV_BASE),
                ..RxNavConfig::default()
            },
            huggingface: HuggingFaceConfig {
                base: with_default(HUGGINGFACE_BASE_ENV, HUGGINGFACE_BASE),
                token: value(HF_TOKEN_ENV),
                generation_model: with_default(GENERATION_MODEL_ENV, DEFAULT_GENERATION_MODEL),
                extraction_model: with_default(EXTRACTION_MODEL_ENV, DEFAULT_EXTRACTION_MODEL),
                ..HuggingFaceConfig::default()
            },
            gemini: GeminiConfig {
                base: with_default(GEMINI_BASE_ENV, GEMINI_BASE),
                api_key: value(GOOGLE_API_KEY_ENV),
                model: with_default(GEMINI_MODEL_ENV, DEFAULT_GEMINI_MODEL),
                ..GeminiConfig::default()
            },
            ..Config::default()
        }
    }
}
