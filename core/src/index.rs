use crate::frequency::{CorpusStats, DfMode};
use crate::vectorize::TfIdfVector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type TermId = u32;
pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocMeta {
    /// Stable external identifier, e.g. the path relative to the data directory.
    pub document_id: String,
    pub file_name: String,
    pub content_type: String,
    /// Number of terms the tokenizer produced for the document.
    pub term_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub weight: f32, // raw tf-idf weight, may be zero or negative
}

/// Term → postings lookup together with the corpus statistics that produced
/// its weights.
///
/// Every entry of an inserted [`TfIdfVector`] becomes a posting, zero weights
/// included, so retrieval is presence based and independent of score.
#[derive(Debug, Default, Clone)]
pub struct InvertedIndex {
    pub(crate) dictionary: HashMap<String, TermId>,
    pub(crate) terms: Vec<String>,
    pub(crate) df: Vec<u32>,
    pub(crate) postings: HashMap<TermId, Vec<Posting>>, // postings sorted by doc_id
    pub(crate) docs: HashMap<DocId, DocMeta>,
    pub(crate) doc_id_map: HashMap<String, DocId>,
    pub(crate) doc_terms: HashMap<DocId, Vec<TermId>>,
    pub(crate) next_doc_id: DocId,
    pub(crate) num_docs: u32,
    pub(crate) df_mode: DfMode,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty index carrying frozen corpus statistics. Term ids are assigned
    /// in lexical order so that two builds over the same corpus agree.
    pub fn with_stats(stats: &CorpusStats, df_mode: DfMode) -> Self {
        let mut index = Self { num_docs: stats.total_documents, df_mode, ..Self::default() };
        let mut entries: Vec<(&String, &u32)> = stats.document_frequency.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (term, df) in entries {
            let tid = index.intern(term);
            index.df[tid as usize] = *df;
        }
        index
    }

    fn intern(&mut self, term: &str) -> TermId {
        if let Some(&tid) = self.dictionary.get(term) {
            return tid;
        }
        let tid = self.terms.len() as TermId;
        self.dictionary.insert(term.to_string(), tid);
        self.terms.push(term.to_string());
        self.df.push(0);
        tid
    }

    /// Add one posting per vector entry. A document already present under the
    /// same `document_id` has its previous postings replaced and keeps its
    /// internal id.
    pub fn insert(&mut self, meta: DocMeta, vector: &TfIdfVector) -> DocId {
        let doc_id = match self.doc_id_map.get(&meta.document_id).copied() {
            Some(existing) => {
                self.drop_postings(existing);
                existing
            }
            None => {
                let id = self.next_doc_id;
                self.next_doc_id += 1;
                self.doc_id_map.insert(meta.document_id.clone(), id);
                id
            }
        };

        let mut term_ids = Vec::with_capacity(vector.len());
        for (term, &weight) in vector {
            let tid = self.intern(term);
            let plist = self.postings.entry(tid).or_default();
            match plist.binary_search_by_key(&doc_id, |p| p.doc_id) {
                Ok(pos) => plist[pos].weight = weight,
                Err(pos) => plist.insert(pos, Posting { doc_id, weight }),
            }
            term_ids.push(tid);
        }
        self.doc_terms.insert(doc_id, term_ids);
        self.docs.insert(doc_id, meta);
        doc_id
    }

    /// Remove a document and all of its postings. Returns whether it existed.
    pub fn remove(&mut self, document_id: &str) -> bool {
        let Some(doc_id) = self.doc_id_map.remove(document_id) else {
            return false;
        };
        self.drop_postings(doc_id);
        self.docs.remove(&doc_id);
        true
    }

    fn drop_postings(&mut self, doc_id: DocId) {
        for tid in self.doc_terms.remove(&doc_id).unwrap_or_default() {
            if let Some(plist) = self.postings.get_mut(&tid) {
                plist.retain(|p| p.doc_id != doc_id);
                if plist.is_empty() {
                    self.postings.remove(&tid);
                }
            }
        }
    }

    /// Raw postings for a term, sorted by internal doc id. Empty when unknown.
    pub fn postings(&self, term: &str) -> &[Posting] {
        self.dictionary
            .get(term)
            .and_then(|tid| self.postings.get(tid))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// `(document_id, weight)` pairs for a term. Absent terms yield nothing.
    pub fn lookup(&self, term: &str) -> Vec<(&str, f32)> {
        self.postings(term)
            .iter()
            .filter_map(|p| self.docs.get(&p.doc_id).map(|m| (m.document_id.as_str(), p.weight)))
            .collect()
    }

    pub fn document_frequency(&self, term: &str) -> u32 {
        self.dictionary.get(term).map(|&tid| self.df[tid as usize]).unwrap_or(0)
    }

    /// Corpus size used for IDF.
    pub fn total_documents(&self) -> u32 {
        self.num_docs
    }

    pub fn df_mode(&self) -> DfMode {
        self.df_mode
    }

    /// Number of documents currently holding postings.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn doc(&self, doc_id: DocId) -> Option<&DocMeta> {
        self.docs.get(&doc_id)
    }

    pub fn doc_by_external_id(&self, document_id: &str) -> Option<(DocId, &DocMeta)> {
        let doc_id = *self.doc_id_map.get(document_id)?;
        self.docs.get(&doc_id).map(|m| (doc_id, m))
    }

    /// Rebuild a document's TF-IDF vector from its postings.
    pub fn vector(&self, doc_id: DocId) -> Option<TfIdfVector> {
        let term_ids = self.doc_terms.get(&doc_id)?;
        let mut vector = TfIdfVector::new();
        for tid in term_ids {
            let plist = self.postings.get(tid)?;
            let pos = plist.binary_search_by_key(&doc_id, |p| p.doc_id).ok()?;
            vector.insert(self.terms[*tid as usize].clone(), plist[pos].weight);
        }
        Some(vector)
    }

    /// Every `(term, document_id, weight)` triple in the index.
    pub fn iter_postings(&self) -> impl Iterator<Item = (&str, &str, f32)> {
        self.postings.iter().flat_map(move |(tid, plist)| {
            let term = self.terms[*tid as usize].as_str();
            plist.iter().filter_map(move |p| {
                self.docs.get(&p.doc_id).map(|m| (term, m.document_id.as_str(), p.weight))
            })
        })
    }
}
