use crate::entities::drug::{CandidateConcept, TermType};
use crate::sources::rxnav::ApproximateCandidate;

pub fn from_rxnav(candidate: &ApproximateCandidate) -> CandidateConcept {
    CandidateConcept {
        rxcui: candidate
            .rxcui
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string),
        term_type: candidate
            .tty
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(TermType::from_code),
        rank: candidate.rank.as_u32(),
    }
}

/// Picks the candidate whose term type ranks earliest in [`TermType::PRIORITY`].
///
/// Candidates are scanned in input order; on equal priority the earlier one wins,
/// and an ingredient match stops the scan. Without any ranked term type the first
/// candidate is returned. `None` only for empty input.
pub fn select_best(candidates: &[CandidateConcept]) -> Option<&CandidateConcept> {
    let mut best: Option<(usize, &CandidateConcept)> = None;

    for candidate in candidates {
        let Some(priority) = candidate.term_type.as_ref().and_then(TermType::priority) else {
            continue;
        };
        if best.is_none_or(|(current, _)| priority < current) {
            best = Some((priority, candidate));
            if priority == 0 {
                break;
            }
        }
    }

    best.map(|(_, c)| c).or_else(|| candidates.first())
}
