use fqa_ai::embeddings::HashingEmbedder;
use fqa_ai::retrieve::IndexStore;
use fqa_core::corpus::Corpus;
use fqa_core::domain::Document;
use pretty_assertions::assert_eq;

const MODEL: &str = "local-hash-v1";

fn doc(id: &str, text: &str) -> Document {
    Document {
        id: id.to_string(),
        ticker: "NVDA".to_string(),
        form: "10-Q".to_string(),
        accession: "acc".to_string(),
        text: text.to_string(),
        tables: vec![],
    }
}

#[test]
fn missing_index_is_not_ready() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = IndexStore::open(dir.path().join("index"));
    let corpus = Corpus::from_documents(vec![doc("a", "x")]).expect("corpus");

    assert!(!store.status().expect("status").ready);
    let err = store.load(&corpus).unwrap_err();
    assert_eq!(err.code, "INDEX_NOT_READY");
    assert!(err.is_precondition());
}

#[test]
fn build_persist_load_and_detect_staleness() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = IndexStore::open(dir.path().join("index"));
    let embedder = HashingEmbedder::new(48);
    let corpus = Corpus::from_documents(vec![doc("a", "GPU demand"), doc("b", "Networking")]).expect("corpus");

    let (built, status) = store
        .build(&corpus, &embedder, MODEL, "2026-01-01T00:00:00Z".to_string(), true)
        .expect("build");
    assert!(status.ready);
    assert_eq!(status.doc_count, 2);
    assert_eq!(status.dims, Some(48));

    let loaded = store.load(&corpus).expect("load");
    assert_eq!(loaded.len(), built.len());
    assert_eq!(loaded.dims(), built.dims());
    assert_eq!(loaded.model(), MODEL);
    assert_eq!(loaded.corpus_fingerprint(), corpus.fingerprint());
    assert!(!dir.path().join("index").join("status.tmp").exists());

    let edited = Corpus::from_documents(vec![doc("a", "GPU demand"), doc("b", "Automotive")]).expect("corpus");
    assert_eq!(store.load(&edited).unwrap_err().code, "INDEX_STALE");

    let (_, status) = store
        .build(&edited, &embedder, MODEL, "2026-01-02T00:00:00Z".to_string(), true)
        .expect("rebuild");
    let last = status.last_build.expect("stats");
    assert_eq!((last.embedded, last.reused), (1, 1));
    assert!(store.load(&edited).is_ok());

    let (_, status) = store
        .build(&edited, &embedder, MODEL, "2026-01-03T00:00:00Z".to_string(), false)
        .expect("full rebuild");
    assert_eq!(status.last_build.expect("stats").embedded, 2);
}

#[test]
fn reassigning_a_ticker_makes_the_index_stale() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = IndexStore::open(dir.path().join("index"));
    let embedder = HashingEmbedder::new(32);
    let corpus = Corpus::from_documents(vec![doc("d1", "Record revenue"), doc("d2", "Gaming")]).expect("corpus");
    store
        .build(&corpus, &embedder, MODEL, "2026-01-01T00:00:00Z".to_string(), true)
        .expect("build");

    let mut moved = doc("d1", "Record revenue");
    moved.ticker = "AAPL".to_string();
    let retickered = Corpus::from_documents(vec![moved, doc("d2", "Gaming")]).expect("corpus");
    assert_eq!(store.load(&retickered).unwrap_err().code, "INDEX_STALE");

    // The passage text changed with the ticker, so only d1 is re-embedded.
    let (_, status) = store
        .build(&retickered, &embedder, MODEL, "2026-01-02T00:00:00Z".to_string(), true)
        .expect("rebuild");
    let last = status.last_build.expect("stats");
    assert_eq!((last.embedded, last.reused), (1, 1));
    assert!(store.load(&retickered).is_ok());
}
