use std::time::{Duration, Instant};

use crate::config::{Config, GOOGLE_API_KEY_ENV, HF_TOKEN_ENV};
use crate::error::RxVerifyError;

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthRow {
    pub api: String,
    pub status: String,
    pub latency: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub healthy: usize,
    pub total: usize,
    pub rows: Vec<HealthRow>,
}

impl HealthReport {
    pub fn all_healthy(&self) -> bool {
        self.healthy == self.total
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# rxverify Health Check\n\n");
        out.push_str("| API | Status | Latency |\n");
        out.push_str("|-----|--------|---------|\n");
        for row in &self.rows {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                row.api, row.status, row.latency
            ));
        }
        out.push_str(&format!(
            "\nStatus: {}/{} APIs healthy\n",
            self.healthy, self.total
        ));
        out
    }
}

async fn check_one(api: &str, request: reqwest::RequestBuilder) -> HealthRow {
    let start = Instant::now();
    let resp = request
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await;

    match resp {
        Ok(resp) => {
            let status = resp.status();
            let elapsed = start.elapsed().as_millis();
            if status.is_success() {
                HealthRow {
                    api: api.to_string(),
                    status: "ok".into(),
                    latency: format!("{elapsed}ms"),
                }
            } else {
                HealthRow {
                    api: api.to_string(),
                    status: "error".into(),
                    latency: format!("{elapsed}ms (HTTP {})", status.as_u16()),
                }
            }
        }
        Err(err) => {
            let reason = if err.is_timeout() {
                "timeout"
            } else if err.is_connect() {
                "connect"
            } else {
                "error"
            };
            HealthRow {
                api: api.to_string(),
                status: "error".into(),
                latency: reason.into(),
            }
        }
    }
}

fn skipped(api: &str, env_var: &str) -> HealthRow {
    HealthRow {
        api: api.to_string(),
        status: "skipped".into(),
        latency: format!("{env_var} not set"),
    }
}

fn health_http_client(config: &Config) -> Result<reqwest::Client, RxVerifyError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .connect_timeout(config.connect_timeout.min(Duration::from_secs(5)))
        .user_agent(concat!("rxverify/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(RxVerifyError::HttpClientInit)
}

/// Probes the terminology service and both generative providers.
///
/// Providers without a configured credential are reported as skipped and left
/// out of the healthy/total count.
///
/// # Errors
///
/// Returns an error when the HTTP client cannot be created.
pub async fn check(config: &Config) -> Result<HealthReport, RxVerifyError> {
    let client = health_http_client(config)?;

    let rxnav_url = crate::sources::join_endpoint(&config.rxnav.base, "version.json");
    let hf_url = crate::sources::join_endpoint(
        &config.huggingface.base,
        &format!("models/{}", config.huggingface.generation_model),
    );
    let gemini_url = crate::sources::join_endpoint(
        &config.gemini.base,
        &format!("models/{}", config.gemini.model),
    );

    let huggingface = async {
        match config.huggingface.token.as_deref() {
            Some(token) => {
                check_one(
                    "Hugging Face",
                    client.get(&hf_url).bearer_auth(token),
                )
                .await
            }
            None => skipped("Hugging Face", HF_TOKEN_ENV),
        }
    };
    let gemini = async {
        match config.gemini.api_key.as_deref() {
            Some(key) => {
                check_one(
                    "Gemini",
                    client
                        .get(&gemini_url)
                        .header(crate::sources::gemini::API_KEY_HEADER, key),
                )
                .await
            }
            None => skipped("Gemini", GOOGLE_API_KEY_ENV),
        }
    };

    let (rxnav, huggingface, gemini) = tokio::join!(
        check_one("RxNav", client.get(&rxnav_url)),
        huggingface,
        gemini,
    );

    let rows = vec![rxnav, huggingface, gemini];
    let healthy = rows.iter().filter(|r| r.status == "ok").count();
    let total = rows.iter().filter(|r| r.status != "skipped").count();
    Ok(HealthReport {
        healthy,
        total,
        rows,
    })
}
