use std::sync::Arc;

use tracing::{debug, warn};

use crate::entities::drug::{DrugQuery, InteractionRecord};
use crate::entities::term::TermResolver;
use crate::events::{Stage, StageEvent, StageObserver};
use crate::sources::rxnav::RxNavClient;
use crate::transform;

/// Resolves drug names and collects their pairwise interactions.
#[derive(Clone)]
pub struct InteractionAggregator {
    resolver: TermResolver,
    client: RxNavClient,
    observer: Arc<dyn StageObserver>,
}

impl InteractionAggregator {
    pub fn new(
        resolver: TermResolver,
        client: RxNavClient,
        observer: Arc<dyn StageObserver>,
    ) -> Self {
        Self {
            resolver,
            client,
            observer,
        }
    }

    pub fn resolver(&self) -> &TermResolver {
        &self.resolver
    }

    /// RxCUIs of the names that resolve, in input order.
    pub async fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        let mut rxcuis = Vec::with_capacity(names.len());
        for name in names {
            let query = DrugQuery::new(name.as_ref());
            if let Some(rxcui) = self.resolver.resolve(&query).await.rxcui() {
                rxcuis.push(rxcui.to_string());
            }
        }
        rxcuis
    }

    /// Interactions among `names`. Returns an empty list without querying the
    /// interaction service when fewer than two names resolve.
    pub async fn check<S: AsRef<str>>(&self, names: &[S]) -> Vec<InteractionRecord> {
        let rxcuis = self.resolve_all(names).await;
        if rxcuis.len() < 2 {
            debug!(
                requested = names.len(),
                resolved = rxcuis.len(),
                "fewer than two RxCUIs; skipping interaction lookup"
            );
            return Vec::new();
        }
        self.query(&rxcuis).await
    }

    async fn query(&self, rxcuis: &[String]) -> Vec<InteractionRecord> {
        let stage = Stage::InteractionQuery;
        let subject = rxcuis.join("+");
        self.observer.observe(&StageEvent::Entered {
            stage,
            subject: subject.clone(),
        });

        match self.client.interaction_list(rxcuis).await {
            Ok(resp) => {
                let records = transform::interaction::flatten(resp);
                debug!(rxcuis = %subject, count = records.len(), "interaction lookup complete");
                self.observer.observe(&StageEvent::Succeeded { stage, subject });
                records
            }
            Err(err) => {
                warn!(rxcuis = %subject, "interaction lookup failed: {err}");
                self.observer.observe(&StageEvent::Failed {
                    stage,
                    subject,
                    reason: err.to_string(),
                });
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::testing::RecordingObserver;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn aggregator_for(server: &MockServer) -> (InteractionAggregator, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        let client = RxNavClient::new_for_test(server.uri()).unwrap();
        let resolver = TermResolver::new(client.clone(), observer.clone());
        (
            InteractionAggregator::new(resolver, client, observer.clone()),
            observer,
        )
    }

    async fn mount_ingredient(server: &MockServer, name: &str, rxcui: &str) {
        Mock::given(method("GET"))
            .and(path("/drugs.json"))
            .and(query_param("name", name))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "drugGroup": {"conceptGroup": [
                    {
                        "tty": "IN",
                        "conceptProperties": [{"rxcui": rxcui, "name": name, "tty": "IN"}]
                    }
                ]}
            })))
            .mount(server)
            .await;
    }

    /// Everything not explicitly mounted resolves to nothing.
    async fn mount_unknown_fallbacks(server: &MockServer) {
        for endpoint in ["/drugs.json", "/approximateTerm.json", "/spellingsuggestions.json"] {
            Mock::given(method("GET"))
                .and(path(endpoint))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
                .with_priority(10)
                .mount(server)
                .await;
        }
    }

    fn pair(a: &str, b: &str, description: &str) -> serde_json::Value {
        serde_json::json!({
            "interactionConcept": [
                {"minConceptItem": {"name": a}},
                {"minConceptItem": {"name": b}}
            ],
            "severity": "N/A",
            "description": description
        })
    }

    #[tokio::test]
    async fn single_resolvable_name_skips_interaction_service() {
        let server = MockServer::start().await;
        mount_ingredient(&server, "warfarin", "11289").await;
        mount_unknown_fallbacks(&server).await;
        Mock::given(method("GET"))
            .and(path("/interaction/list.json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (aggregator, observer) = aggregator_for(&server);
        let records = aggregator.check(&["warfarin", "notadrugatall"]).await;
        assert!(records.is_empty());
        assert!(!observer.entered().contains(&Stage::InteractionQuery));
    }

    #[tokio::test]
    async fn empty_name_list_skips_everything() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (aggregator, _) = aggregator_for(&server);
        let names: [&str; 0] = [];
        assert!(aggregator.check(&names).await.is_empty());
    }

    #[tokio::test]
    async fn two_pairs_are_flattened_in_order() {
        let server = MockServer::start().await;
        mount_ingredient(&server, "warfarin", "11289").await;
        mount_ingredient(&server, "aspirin", "1191").await;
        Mock::given(method("GET"))
            .and(path("/interaction/list.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "fullInteractionTypeGroup": [{
                    "sourceName": "DrugBank",
                    "fullInteractionType": [{
                        "interactionPair": [
                            pair("warfarin", "aspirin", "first"),
                            pair("aspirin", "warfarin", "second")
                        ]
                    }]
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (aggregator, _) = aggregator_for(&server);
        let records = aggregator.check(&["warfarin", "aspirin"]).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].description, "first");
        assert_eq!(records[1].description, "second");

        let requests = server.received_requests().await.unwrap();
        let interaction = requests
            .iter()
            .find(|r| r.url.path() == "/interaction/list.json")
            .unwrap();
        assert_eq!(interaction.url.query(), Some("rxcuis=11289+1191"));
    }

    #[tokio::test]
    async fn unresolved_names_are_dropped_preserving_order() {
        let server = MockServer::start().await;
        mount_ingredient(&server, "simvastatin", "36567").await;
        mount_ingredient(&server, "clarithromycin", "21212").await;
        mount_ingredient(&server, "amlodipine", "17767").await;
        mount_unknown_fallbacks(&server).await;
        Mock::given(method("GET"))
            .and(path("/interaction/list.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let (aggregator, _) = aggregator_for(&server);
        let records = aggregator
            .check(&["simvastatin", "qqqq", "clarithromycin", "amlodipine"])
            .await;
        assert!(records.is_empty());

        let requests = server.received_requests().await.unwrap();
        let interaction = requests
            .iter()
            .find(|r| r.url.path() == "/interaction/list.json")
            .unwrap();
        assert_eq!(interaction.url.query(), Some("rxcuis=36567+21212+17767"));
    }

    #[tokio::test]
    async fn interaction_service_failure_yields_empty_list() {
        let server = MockServer::start().await;
        mount_ingredient(&server, "warfarin", "11289").await;
        mount_ingredient(&server, "aspirin", "1191").await;
        Mock::given(method("GET"))
            .and(path("/interaction/list.json"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let (aggregator, observer) = aggregator_for(&server);
        assert!(aggregator.check(&["warfarin", "aspirin"]).await.is_empty());
        assert!(observer.events().iter().any(|e| matches!(
            e,
            StageEvent::Failed {
                stage: Stage::InteractionQuery,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn malformed_interaction_body_yields_empty_list() {
        let server = MockServer::start().await;
        mount_ingredient(&server, "warfarin", "11289").await;
        mount_ingredient(&server, "aspirin", "1191").await;
        Mock::given(method("GET"))
            .and(path("/interaction/list.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "fullInteractionTypeGroup": "not-a-list"
            })))
            .mount(&server)
            .await;

        let (aggregator, _) = aggregator_for(&server);
        assert!(aggregator.check(&["warfarin", "aspirin"]).await.is_empty());
    }
}
