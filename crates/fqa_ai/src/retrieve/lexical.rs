use std::collections::HashMap;

use fqa_core::corpus::Corpus;
use fqa_core::domain::{Document, RankedHit};

const K1: f64 = 1.5;
const B: f64 = 0.75;
const EPSILON: f64 = 0.25;

/// Lower-cased whitespace tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Ticker and form ride along with the body so a bare ticker token can match.
pub fn document_tokens(doc: &Document) -> Vec<String> {
    tokenize(&format!("{} {} {}", doc.ticker, doc.form, doc.text))
}

/// BM25 Okapi over a fixed tokenized corpus. Rows line up with corpus positions.
#[derive(Debug, Clone)]
pub struct LexicalIndex {
    ids: Vec<String>,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<usize>,
    avgdl: f64,
    idf: HashMap<String, f64>,
}

impl LexicalIndex {
    pub fn build(corpus: &Corpus) -> Self {
        let docs = corpus.documents();
        let mut ids = Vec::with_capacity(docs.len());
        let mut term_freqs = Vec::with_capacity(docs.len());
        let mut doc_lens = Vec::with_capacity(docs.len());
        let mut doc_freq: HashMap<String, u32> = HashMap::new();

        for doc in docs {
            let tokens = document_tokens(doc);
            doc_lens.push(tokens.len());
            let mut tf: HashMap<String, u32> = HashMap::new();
            for t in tokens {
                *tf.entry(t).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            ids.push(doc.id.clone());
            term_freqs.push(tf);
        }

        let n = docs.len() as f64;
        let total_len: usize = doc_lens.iter().sum();
        let avgdl = if docs.is_empty() {
            0.0
        } else {
            total_len as f64 / n
        };

        let mut idf = HashMap::with_capacity(doc_freq.len());
        let mut idf_sum = 0.0;
        let mut negative = Vec::new();
        for (term, df) in doc_freq {
            let df = f64::from(df);
            let value = (n - df + 0.5).ln() - (df + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term, value);
        }
        // Terms in more than half the documents would otherwise subtract score. The floor
        // itself is kept non-negative: on tiny corpora the mean idf can be below zero.
        if !idf.is_empty() {
            let floor = (EPSILON * idf_sum / idf.len() as f64).max(0.0);
            for term in negative {
                idf.insert(term, floor);
            }
        }

        Self {
            ids,
            term_freqs,
            doc_lens,
            avgdl,
            idf,
        }
    }

    /// One score per document, in corpus order. Unknown terms contribute nothing.
    pub fn score(&self, query_tokens: &[String]) -> Vec<f64> {
        let mut scores = vec![0.0; self.ids.len()];
        if self.avgdl == 0.0 {
            return scores;
        }
        for term in query_tokens {
            let Some(&idf) = self.idf.get(term) else {
                continue;
            };
            for (i, tf) in self.term_freqs.iter().enumerate() {
                let Some(&f) = tf.get(term) else {
                    continue;
                };
                let f = f64::from(f);
                let norm = 1.0 - B + B * self.doc_lens[i] as f64 / self.avgdl;
                scores[i] += idf * (f * (K1 + 1.0)) / (f + K1 * norm);
            }
        }
        scores
    }

    /// Hits sorted by score descending; equal scores keep corpus order.
    pub fn rank(&self, scores: &[f64], top_n: usize) -> Vec<RankedHit> {
        let mut order = (0..scores.len().min(self.ids.len())).collect::<Vec<_>>();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
        order
            .into_iter()
            .take(top_n)
            .map(|i| RankedHit::new(self.ids[i].clone(), scores[i]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, ticker: &str, text: &str) -> Document {
        Document {
            id: id.to_string(),
            ticker: ticker.to_string(),
            form: "10-K".to_string(),
            accession: "acc".to_string(),
            text: text.to_string(),
            tables: vec![],
        }
    }

    fn index() -> LexicalIndex {
        let corpus = Corpus::from_documents(vec![
            doc("a", "AAPL", "iPhone revenue grew strongly"),
            doc("b", "NVDA", "Data Center revenue grew"),
            doc("c", "MSFT", "Cloud margin expanded"),
        ])
        .expect("corpus");
        LexicalIndex::build(&corpus)
    }

    #[test]
    fn matching_terms_outscore_non_matching() {
        let idx = index();
        let scores = idx.score(&tokenize("data center"));
        assert!(scores[1] > 0.0);
        assert_eq!(scores[0], 0.0);
        assert_eq!(scores[2], 0.0);
    }

    #[test]
    fn ticker_token_is_searchable() {
        let idx = index();
        let hits = idx.rank(&idx.score(&tokenize("NVDA")), 1);
        assert_eq!(hits[0].doc_id, "b");
    }

    #[test]
    fn common_terms_never_score_negative() {
        let idx = index();
        // "revenue" and "10-k" appear in most documents.
        let scores = idx.score(&tokenize("revenue 10-K"));
        assert!(scores.iter().all(|s| *s >= 0.0));
    }

    #[test]
    fn two_document_corpus_never_scores_negative() {
        let corpus = Corpus::from_documents(vec![
            doc("a", "AAPL", "revenue grew"),
            doc("b", "NVDA", "revenue grew"),
        ])
        .expect("corpus");
        let idx = LexicalIndex::build(&corpus);
        let scores = idx.score(&tokenize("revenue grew"));
        assert!(scores.iter().all(|s| *s >= 0.0), "{scores:?}");
    }

    #[test]
    fn ties_keep_corpus_order() {
        let idx = index();
        let hits = idx.rank(&[0.0, 0.0, 0.0], 3);
        let ids = hits.iter().map(|h| h.doc_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
