use crate::error::{CoreError, Result};
use crate::index::{DocId, InvertedIndex};
use crate::tokenizer::tokenize;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

pub const DEFAULT_RESULT_CAP: usize = 10;
pub const DEFAULT_MAX_QUERY_BYTES: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub result_cap: usize,
    /// Longer queries are rejected with [`CoreError::QueryParse`].
    pub max_query_bytes: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self { result_cap: DEFAULT_RESULT_CAP, max_query_bytes: DEFAULT_MAX_QUERY_BYTES }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub document_id: String,
    pub score: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Candidates before truncation.
    pub total_matches: usize,
    pub elapsed_millis: u64,
    pub hits: Vec<SearchHit>,
}

/// Scores queries against a built index.
///
/// A document's score is the sum of its indexed weights over the distinct
/// query terms, i.e. the dot product of query term presence with the stored
/// TF-IDF vector. Results are ordered by descending score, then ascending
/// document id.
pub struct QueryEngine<'a> {
    index: &'a InvertedIndex,
    options: QueryOptions,
}

impl<'a> QueryEngine<'a> {
    pub fn new(index: &'a InvertedIndex) -> Self {
        Self { index, options: QueryOptions::default() }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn search(&self, query: &str) -> Result<QueryResult> {
        self.search_top(query, self.options.result_cap)
    }

    /// Like [`QueryEngine::search`] with an explicit cap for this call.
    pub fn search_top(&self, query: &str, k: usize) -> Result<QueryResult> {
        let start = Instant::now();
        if query.len() > self.options.max_query_bytes {
            return Err(CoreError::QueryParse(format!(
                "query is {} bytes, limit is {}",
                query.len(),
                self.options.max_query_bytes
            )));
        }

        // Sorted so that float accumulation order is stable between runs.
        let terms: BTreeSet<String> = tokenize(query).into_iter().collect();
        let mut scores: HashMap<DocId, f32> = HashMap::new();
        for term in &terms {
            for p in self.index.postings(term) {
                *scores.entry(p.doc_id).or_insert(0.0) += p.weight;
            }
        }

        let mut scored: Vec<SearchHit> = scores
            .into_iter()
            .filter_map(|(doc_id, score)| {
                self.index.doc(doc_id).map(|m| SearchHit { doc_id, document_id: m.document_id.clone(), score })
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.document_id.cmp(&b.document_id)));
        let total_matches = scored.len();
        scored.truncate(k);

        let elapsed_millis = start.elapsed().as_millis() as u64;
        tracing::debug!(query, terms = terms.len(), total_matches, elapsed_millis, "search");
        Ok(QueryResult { total_matches, elapsed_millis, hits: scored })
    }
}
