//! Resolution of overlapping link candidates from several matchers into final links.

use crate::types::{LinkCandidate, ResolvedLink};

/// Group a link's candidates by a key such as matcher kind, preserving encounter order
/// both across groups and within each group.
pub fn group_choices<P, K, F>(link: &ResolvedLink<P>, key: F) -> Vec<(K, Vec<&P>)>
where
    K: PartialEq,
    F: Fn(&P) -> K,
{
    let mut groups: Vec<(K, Vec<&P>)> = Vec::new();
    for candidate in &link.candidates {
        let group_key = key(&candidate.payload);
        match groups.iter_mut().find(|(k, _)| return *k == group_key) {
            None => groups.push((group_key, vec![&candidate.payload])),
            Some((_, members)) => members.push(&candidate.payload),
        }
    }
    return groups;
}

/// Whether `inner` starts strictly inside `outer` without sharing its start.
const fn starts_inside<P>(inner: &LinkCandidate<P>, outer: &LinkCandidate<P>) -> bool {
    return outer.start_index < inner.start_index && inner.start_index < outer.end_index();
}

/// Whether `other` starts where `candidate` does but runs strictly further.
const fn outlasted_by<P>(candidate: &LinkCandidate<P>, other: &LinkCandidate<P>) -> bool {
    return other.start_index == candidate.start_index && other.length > candidate.length;
}

/// Resolve candidates for one line of text into non-overlapping links.
///
/// A candidate is dropped when another candidate starts before it and is still
/// running at its start (earlier start wins whatever the lengths), or when another
/// candidate starts at the same offset and is longer. Survivors with identical spans
/// merge into one link. Output order, and candidate order inside each link, follow
/// the input order, so the same input always yields the same output.
pub fn resolve_links<P: Clone>(candidates: &[LinkCandidate<P>]) -> Vec<ResolvedLink<P>> {
    let survivors = candidates.iter().filter(|candidate| {
        return !candidates
            .iter()
            .any(|other| return starts_inside(candidate, other) || outlasted_by(candidate, other));
    });

    let mut links: Vec<ResolvedLink<P>> = Vec::new();
    for candidate in survivors {
        let same_span = links.iter_mut().find(|link| {
            return link.start_index == candidate.start_index && link.length == candidate.length;
        });
        match same_span {
            None => links.push(ResolvedLink {
                candidates: vec![candidate.clone()],
                length: candidate.length,
                start_index: candidate.start_index,
            }),
            Some(link) => link.candidates.push(candidate.clone()),
        }
    }
    return links;
}
