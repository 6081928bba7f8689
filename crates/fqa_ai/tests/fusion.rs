use fqa_ai::retrieve::fusion::{rrf_fuse, DEFAULT_DEPTH, DEFAULT_RRF_K};
use fqa_core::domain::RankedHit;
use pretty_assertions::assert_eq;

fn ranked(ids: &[&str], top: f64) -> Vec<RankedHit> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| RankedHit::new(*id, top - i as f64 * 0.1))
        .collect()
}

#[test]
fn disjoint_lists_keep_every_id_and_interleave_by_rank() {
    let dense = ranked(&["d1", "d2", "d3"], 0.9);
    let lexical = ranked(&["l1", "l2", "l3"], 14.0);
    let fused = rrf_fuse(&[&dense, &lexical], DEFAULT_DEPTH, DEFAULT_RRF_K);

    assert_eq!(fused.len(), 6);
    // Equal totals fall back to first-seen order: dense list first.
    assert_eq!(fused, vec!["d1", "l1", "d2", "l2", "d3", "l3"]);
}

#[test]
fn top_of_any_list_outranks_ids_absent_from_every_list() {
    let dense = ranked(&["a", "b"], 0.9);
    let lexical = ranked(&["z"], 3.0);
    let fused = rrf_fuse(&[&dense, &lexical], DEFAULT_DEPTH, DEFAULT_RRF_K);
    let mut ids = fused.clone();
    ids.sort();
    assert_eq!(ids, vec!["a", "b", "z"]);
    let pos = |id: &str| fused.iter().position(|x| x == id).unwrap();
    assert!(pos("z") < pos("b"));
}

#[test]
fn raw_score_magnitudes_are_ignored() {
    let small = ranked(&["a", "b"], 0.001);
    let huge = vec![RankedHit::new("b", 1e9), RankedHit::new("a", 1e8)];
    let fused = rrf_fuse(&[&small, &huge], DEFAULT_DEPTH, DEFAULT_RRF_K);
    // Both ids sit at ranks 1 and 2 once; totals tie, first seen wins.
    assert_eq!(fused, vec!["a", "b"]);
}

#[test]
fn fusing_twice_gives_identical_order() {
    let dense = ranked(&["a", "b", "c", "d", "e"], 0.9);
    let lexical = ranked(&["e", "c", "x", "a"], 9.0);
    let first = rrf_fuse(&[&dense, &lexical], DEFAULT_DEPTH, DEFAULT_RRF_K);
    for _ in 0..10 {
        assert_eq!(rrf_fuse(&[&dense, &lexical], DEFAULT_DEPTH, DEFAULT_RRF_K), first);
    }
}

#[test]
fn no_lists_fuse_to_nothing() {
    assert!(rrf_fuse(&[], DEFAULT_DEPTH, DEFAULT_RRF_K).is_empty());
}
