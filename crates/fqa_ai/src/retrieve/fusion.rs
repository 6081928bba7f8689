use std::collections::HashMap;

use fqa_core::domain::RankedHit;

pub const DEFAULT_RRF_K: u32 = 60;
pub const DEFAULT_DEPTH: usize = 60;

/// Reciprocal Rank Fusion over lists already sorted by their own method's score.
///
/// Only rank positions are used: dense similarities and BM25 scores live on different
/// scales, so their magnitudes are never combined. Each list contributes
/// `1 / (rrf_k + rank)` (1-indexed) for its first `depth` entries. Equal totals keep the
/// order in which ids were first seen, scanning lists in argument order.
pub fn rrf_fuse(lists: &[&[RankedHit]], depth: usize, rrf_k: u32) -> Vec<String> {
    let base = f64::from(rrf_k.max(1));
    // id -> (total, first_seen)
    let mut totals: HashMap<&str, (f64, usize)> = HashMap::new();
    let mut seen = 0usize;

    for list in lists {
        for (index, hit) in list.iter().take(depth).enumerate() {
            let contribution = 1.0 / (base + (index + 1) as f64);
            let entry = totals.entry(hit.doc_id.as_str()).or_insert_with(|| {
                seen += 1;
                (0.0, seen)
            });
            entry.0 += contribution;
        }
    }

    let mut fused = totals.into_iter().collect::<Vec<_>>();
    fused.sort_by(|a, b| b.1 .0.total_cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    fused.into_iter().map(|(id, _)| id.to_string()).collect()
}
