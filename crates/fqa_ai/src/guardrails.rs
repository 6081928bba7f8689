use fqa_core::domain::{Claim, EvidenceBundle};
use fqa_core::error::{Fallback, Outcome};
use fqa_core::validate::{find_unknown_refs, RefKind, UnknownRef};
use tracing::warn;

/// Remove claim references that point outside `evidence`.
///
/// Claims themselves are kept, even if left with no references. Reports `ClaimRefsDropped`
/// with the offending keys when anything was removed.
pub fn retain_known_refs(mut claims: Vec<Claim>, evidence: &EvidenceBundle) -> Outcome<Vec<Claim>> {
    let unknown = find_unknown_refs(&claims, evidence);
    if unknown.is_empty() {
        return Outcome::ok(claims);
    }

    for u in &unknown {
        let Some(claim) = claims.get_mut(u.claim_index) else {
            continue;
        };
        match u.kind {
            RefKind::Doc => claim.doc_refs.remove(&u.key),
            RefKind::Sql => claim.sql_refs.remove(&u.key),
        };
    }
    let keys = describe(&unknown);
    warn!(dropped = unknown.len(), keys = %keys, "fabricated claim references dropped");
    Outcome::degraded(claims, Fallback::ClaimRefsDropped, keys)
}

fn describe(unknown: &[UnknownRef]) -> String {
    unknown
        .iter()
        .map(|u| format!("claim[{}]:{}", u.claim_index, u.key))
        .collect::<Vec<_>>()
        .join(", ")
}
