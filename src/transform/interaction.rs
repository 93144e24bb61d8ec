use tracing::debug;

use crate::entities::drug::InteractionRecord;
use crate::sources::rxnav::{InteractionListResponse, InteractionPair};

/// Flattens group → interaction type → pair into records, in traversal order.
///
/// Pairs that do not carry two named concepts, a severity, and a description
/// are skipped individually.
pub fn flatten(resp: InteractionListResponse) -> Vec<InteractionRecord> {
    let mut out = Vec::new();
    let groups = resp.full_interaction_type_group.unwrap_or_default();

    for group in groups {
        for interaction_type in group.full_interaction_type.unwrap_or_default() {
            for raw in interaction_type.interaction_pair.unwrap_or_default() {
                match pair_to_record(raw) {
                    Some(record) => out.push(record),
                    None => debug!(
                        source = group.source_name.as_deref().unwrap_or("unknown"),
                        "skipping malformed interaction pair"
                    ),
                }
            }
        }
    }

    out
}

fn pair_to_record(raw: serde_json::Value) -> Option<InteractionRecord> {
    let pair: InteractionPair = serde_json::from_value(raw).ok()?;
    let mut names = pair
        .interaction_concept
        .into_iter()
        .map(|c| c.min_concept_item.name);
    let first = names.next()?;
    let second = names.next()?;

    Some(InteractionRecord {
        drugs_involved: [first, second],
        severity: pair.severity,
        description: pair.description,
    })
}
