#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum RxVerifyError {
    #[error("HTTP client initialization failed: {0}")]
    HttpClientInit(reqwest::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP middleware error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    #[error("API error from {api}: {message}")]
    Api { api: String, message: String },

    #[error("API JSON error from {api}: {source}")]
    ApiJson {
        api: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected response from {api}: {detail}")]
    UnexpectedResponse { api: String, detail: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(
        "API key required: {api} requires {env_var} environment variable.\n\nTo set:\n  export {env_var}=your-key\n\nMore info: {docs_url}"
    )]
    ApiKeyRequired {
        api: String,
        env_var: String,
        docs_url: String,
    },

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RxVerifyError {
    /// True when the upstream answered but the payload could not be used.
    pub fn is_malformed_response(&self) -> bool {
        matches!(
            self,
            Self::ApiJson { .. } | Self::UnexpectedResponse { .. } | Self::Json(_)
        )
    }
}
