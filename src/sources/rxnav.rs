use std::borrow::Cow;
use std::time::Duration;

use serde::Deserialize;

use crate::config::RxNavConfig;
use crate::error::RxVerifyError;
use crate::utils::serde::StringOrNumber;

const RXNAV_API: &str = "rxnav";

/// Client for the RxNav terminology and interaction REST API.
#[derive(Clone)]
pub struct RxNavClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
    drugs_timeout: Duration,
    approximate_timeout: Duration,
    spelling_timeout: Duration,
    interaction_timeout: Duration,
    approximate_max_entries: usize,
}

impl RxNavClient {
    pub fn new(config: &RxNavConfig, connect_timeout: Duration) -> Result<Self, RxVerifyError> {
        let client = crate::sources::build_client(connect_timeout, config.max_retries)?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(
        client: reqwest_middleware::ClientWithMiddleware,
        config: &RxNavConfig,
    ) -> Self {
        Self {
            client,
            base: config.base.clone(),
            drugs_timeout: config.drugs_timeout,
            approximate_timeout: config.approximate_timeout,
            spelling_timeout: config.spelling_timeout,
            interaction_timeout: config.interaction_timeout,
            approximate_max_entries: config.approximate_max_entries,
        }
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(base: String) -> Result<Self, RxVerifyError> {
        let config = RxNavConfig {
            base: Cow::Owned(base),
            max_retries: 0,
            ..RxNavConfig::default()
        };
        Self::new(&config, Duration::from_secs(2))
    }

    fn endpoint(&self, path: &str) -> String {
        crate::sources::join_endpoint(self.base.as_ref(), path)
    }

    /// `GET /drugs.json?name=`: concept groups keyed by term type.
    pub async fn drugs(&self, name: &str) -> Result<DrugsResponse, RxVerifyError> {
        let url = self.endpoint("drugs.json");
        crate::sources::send_json(
            RXNAV_API,
            self.client
                .get(&url)
                .query(&[("name", name)])
                .timeout(self.drugs_timeout),
        )
        .await
    }

    /// `GET /approximateTerm.json?term=&maxEntries=`: fuzzy candidates in rank order.
    pub async fn approximate_term(
        &self,
        term: &str,
    ) -> Result<ApproximateTermResponse, RxVerifyError> {
        let url = self.endpoint("approximateTerm.json");
        let max_entries = self.approximate_max_entries.clamp(1, 20).to_string();
        crate::sources::send_json(
            RXNAV_API,
            self.client
                .get(&url)
                .query(&[("term", term), ("maxEntries", max_entries.as_str())])
                .timeout(self.approximate_timeout),
        )
        .await
    }

    /// `GET /spellingsuggestions.json?name=`
    pub async fn spelling_suggestions(
        &self,
        name: &str,
    ) -> Result<SpellingSuggestionsResponse, RxVerifyError> {
        let url = self.endpoint("spellingsuggestions.json");
        crate::sources::send_json(
            RXNAV_API,
            self.client
                .get(&url)
                .query(&[("name", name)])
                .timeout(self.spelling_timeout),
        )
        .await
    }

    /// `GET /interaction/list.json?rxcuis=a+b+c`
    ///
    /// The identifier list is appended verbatim so the `+` separators survive;
    /// identifiers must be plain alphanumeric RxCUIs.
    pub async fn interaction_list(
        &self,
        rxcuis: &[String],
    ) -> Result<InteractionListResponse, RxVerifyError> {
        if rxcuis.len() < 2 {
            return Err(RxVerifyError::InvalidArgument(
                "Interaction lookup requires at least two RxCUIs".into(),
            ));
        }
        if let Some(bad) = rxcuis
            .iter()
            .find(|id| id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            return Err(RxVerifyError::InvalidArgument(format!(
                "Invalid RxCUI: {bad:?}"
            )));
        }

        let url = format!(
            "{}?rxcuis={}",
            self.endpoint("interaction/list.json"),
            rxcuis.join("+")
        );
        crate::sources::send_json(
            RXNAV_API,
            self.client.get(&url).timeout(self.interaction_timeout),
        )
        .await
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugsResponse {
    #[serde(default)]
    pub drug_group: Option<DrugGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugGroup {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub concept_group: Option<Vec<ConceptGroup>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptGroup {
    #[serde(default)]
    pub tty: Option<String>,
    #[serde(default)]
    pub concept_properties: Option<Vec<ConceptProperty>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConceptProperty {
    #[serde(default)]
    pub rxcui: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tty: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproximateTermResponse {
    #[serde(default)]
    pub approximate_group: Option<ApproximateGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApproximateGroup {
    #[serde(default)]
    pub candidate: Option<Vec<ApproximateCandidate>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApproximateCandidate {
    #[serde(default)]
    pub rxcui: Option<String>,
    #[serde(default)]
    pub tty: Option<String>,
    #[serde(default)]
    pub rank: StringOrNumber,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellingSuggestionsResponse {
    #[serde(default)]
    pub suggestion_group: Option<SuggestionGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionGroup {
    #[serde(default)]
    pub suggestion_list: Option<SuggestionList>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestionList {
    #[serde(default)]
    pub suggestion: Option<Vec<String>>,
}

impl SpellingSuggestionsResponse {
    pub fn first_suggestion(&self) -> Option<&str> {
        self.suggestion_group
            .as_ref()?
            .suggestion_list
            .as_ref()?
            .suggestion
            .as_ref()?
            .first()
            .map(String::as_str)
    }
}

/// Interaction payload. Pair entries stay as raw JSON so one malformed pair
/// cannot poison the rest of the response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionListResponse {
    #[serde(default)]
    pub full_interaction_type_group: Option<Vec<FullInteractionTypeGroup>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullInteractionTypeGroup {
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub full_interaction_type: Option<Vec<FullInteractionType>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullInteractionType {
    #[serde(default)]
    pub interaction_pair: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionPair {
    pub interaction_concept: Vec<InteractionConcept>,
    pub severity: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionConcept {
    pub min_concept_item: MinConceptItem,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinConceptItem {
    pub name: String,
    #[serde(default)]
    pub rxcui: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn drugs_sends_name_query_and_tolerates_missing_properties() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drugs.json"))
            .and(query_param("name", "lipitor 20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "drugGroup": {
                    "name": "lipitor 20",
                    "conceptGroup": [
                        {"tty": "BPCK"},
                        {"tty": "SBD", "conceptProperties": [
                            {
                                "rxcui": "617318",
                                "name": "atorvastatin 20 MG Oral Tablet [Lipitor]",
                                "tty": "SBD"
                            }
                        ]}
                    ]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RxNavClient::new_for_test(server.uri()).unwrap();
        let resp = client.drugs("lipitor 20").await.unwrap();
        let groups = resp.drug_group.unwrap().concept_group.unwrap();
        assert_eq!(groups.len(), 2);
        assert!(groups[0].concept_properties.is_none());
        assert_eq!(
            groups[1].concept_properties.as_ref().unwrap()[0].rxcui.as_deref(),
            Some("617318")
        );
    }

    #[tokio::test]
    async fn drugs_accepts_empty_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drugs.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = RxNavClient::new_for_test(server.uri()).unwrap();
        let resp = client.drugs("nothing").await.unwrap();
        assert!(resp.drug_group.is_none());
    }

    #[tokio::test]
    async fn approximate_term_sets_max_entries_and_parses_rank() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/approximateTerm.json"))
            .and(query_param("term", "asprin"))
            .and(query_param("maxEntries", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "approximateGroup": {
                    "candidate": [
                        {"rxcui": "1191", "rank": "1", "tty": "IN"},
                        {"rxcui": "215568", "rank": 2}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client = RxNavClient::new_for_test(server.uri()).unwrap();
        let resp = client.approximate_term("asprin").await.unwrap();
        let candidates = resp.approximate_group.unwrap().candidate.unwrap();
        assert_eq!(candidates[0].rank.as_u32(), Some(1));
        assert_eq!(candidates[1].rank.as_u32(), Some(2));
        assert!(candidates[1].tty.is_none());
    }

    #[tokio::test]
    async fn spelling_suggestions_exposes_first_suggestion() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spellingsuggestions.json"))
            .and(query_param("name", "ambienn"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "suggestionGroup": {
                    "name": "ambienn",
                    "suggestionList": {"suggestion": ["ambien", "ambien cr"]}
                }
            })))
            .mount(&server)
            .await;

        let client = RxNavClient::new_for_test(server.uri()).unwrap();
        let resp = client.spelling_suggestions("ambienn").await.unwrap();
        assert_eq!(resp.first_suggestion(), Some("ambien"));
    }

    #[test]
    fn first_suggestion_handles_null_list() {
        let resp: SpellingSuggestionsResponse = serde_json::from_value(serde_json::json!({
            "suggestionGroup": {"name": "zzz", "suggestionList": null}
        }))
        .unwrap();
        assert_eq!(resp.first_suggestion(), None);
    }

    #[tokio::test]
    async fn interaction_list_joins_rxcuis_with_plus() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/interaction/list.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "nlmDisclaimer": "..."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RxNavClient::new_for_test(server.uri()).unwrap();
        let resp = client
            .interaction_list(&["207106".to_string(), "152923".to_string()])
            .await
            .unwrap();
        assert!(resp.full_interaction_type_group.is_none());

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url.query(), Some("rxcuis=207106+152923"));
    }

    #[tokio::test]
    async fn interaction_list_rejects_single_id_without_network() {
        let client = RxNavClient::new_for_test("http://127.0.0.1:9".into()).unwrap();
        let err = client
            .interaction_list(&["207106".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, RxVerifyError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn interaction_list_rejects_non_alphanumeric_ids() {
        let client = RxNavClient::new_for_test("http://127.0.0.1:9".into()).unwrap();
        let err = client
            .interaction_list(&["207106".to_string(), "1&x=2".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, RxVerifyError::InvalidArgument(_)));
    }
}
