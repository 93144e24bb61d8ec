use std::sync::OnceLock;

use regex::Regex;

use crate::entities::drug::ExtractionRecord;
use crate::error::RxVerifyError;

fn json_array_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Greedy: first '[' through last ']' so nested arrays stay intact.
    RE.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("valid regex"))
}

/// Returns the bracketed, array-shaped span of `raw`, if any.
pub fn find_json_array(raw: &str) -> Option<&str> {
    json_array_re().find(raw).map(|m| m.as_str())
}

/// Removes markdown code-fence markers (```` ```json ```` and ```` ``` ````).
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

pub fn parse_records(json: &str) -> Result<Vec<ExtractionRecord>, RxVerifyError> {
    let records: Vec<ExtractionRecord> = serde_json::from_str(json)?;
    Ok(records
        .into_iter()
        .map(|r| ExtractionRecord {
            name: r.name.trim().to_string(),
            dosage: r.dosage.map(|d| d.trim().to_string()),
        })
        .filter(|r| !r.name.is_empty())
        .collect())
}

/// Parses the array embedded in a chatty completion.
pub fn records_from_completion(raw: &str) -> Result<Vec<ExtractionRecord>, RxVerifyError> {
    let span = find_json_array(raw).ok_or_else(|| RxVerifyError::UnexpectedResponse {
        api: "extraction".into(),
        detail: "completion contains no JSON array".into(),
    })?;
    parse_records(span)
}

/// Parses a completion that should be nothing but the array, possibly fenced.
pub fn records_from_fenced(raw: &str) -> Result<Vec<ExtractionRecord>, RxVerifyError> {
    parse_records(&strip_code_fences(raw))
}
