use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Term → occurrence count within one document.
pub type TermFrequencies = HashMap<String, u32>;

/// How document frequency is counted while observing a corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DfMode {
    /// Standard definition: once per document containing the term.
    #[default]
    Distinct,
    /// Once per token occurrence across the corpus. Inflates document
    /// frequency for repeated terms; kept for parity with older indexes.
    PerOccurrence,
}

impl FromStr for DfMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "distinct" => Ok(DfMode::Distinct),
            "occurrence" | "per-occurrence" | "per_occurrence" => Ok(DfMode::PerOccurrence),
            other => Err(format!("unknown df mode '{other}', expected 'distinct' or 'occurrence'")),
        }
    }
}

impl fmt::Display for DfMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DfMode::Distinct => f.write_str("distinct"),
            DfMode::PerOccurrence => f.write_str("occurrence"),
        }
    }
}

/// Corpus statistics frozen at the end of the counting pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusStats {
    pub document_frequency: HashMap<String, u32>,
    pub total_documents: u32,
}

/// Build-scoped counter of document frequencies.
///
/// One accumulator lives for exactly one index build. Parallel workers each
/// own one and are combined with [`FrequencyAccumulator::merge`].
#[derive(Debug, Default)]
pub struct FrequencyAccumulator {
    mode: DfMode,
    document_frequency: HashMap<String, u32>,
    documents: u32,
}

impl FrequencyAccumulator {
    pub fn new(mode: DfMode) -> Self {
        Self { mode, ..Self::default() }
    }

    pub fn documents_observed(&self) -> u32 {
        self.documents
    }

    /// Count one document's terms, returning its term frequencies and
    /// folding them into the corpus document frequencies.
    pub fn observe(&mut self, terms: &[String]) -> TermFrequencies {
        let mut tf: TermFrequencies = HashMap::new();
        let mut seen_in_doc: HashSet<&str> = HashSet::new();
        for term in terms {
            *tf.entry(term.clone()).or_insert(0) += 1;
            let count_it = match self.mode {
                DfMode::PerOccurrence => true,
                DfMode::Distinct => seen_in_doc.insert(term.as_str()),
            };
            if count_it {
                *self.document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
        }
        self.documents += 1;
        tf
    }

    pub fn merge(&mut self, other: FrequencyAccumulator) {
        for (term, count) in other.document_frequency {
            *self.document_frequency.entry(term).or_insert(0) += count;
        }
        self.documents += other.documents;
    }

    pub fn document_frequency(&self, term: &str) -> u32 {
        self.document_frequency.get(term).copied().unwrap_or(0)
    }

    pub fn finish(self) -> CorpusStats {
        CorpusStats { document_frequency: self.document_frequency, total_documents: self.documents }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    #[test]
    fn distinct_counts_once_per_document() {
        let mut acc = FrequencyAccumulator::new(DfMode::Distinct);
        let tf = acc.observe(&tokenize("cat dog cat"));
        acc.observe(&tokenize("dog bird"));
        assert_eq!(tf["cat"], 2);
        assert_eq!(tf["dog"], 1);
        assert_eq!(acc.document_frequency("cat"), 1);
        assert_eq!(acc.document_frequency("dog"), 2);
        assert_eq!(acc.document_frequency("bird"), 1);
        assert_eq!(acc.document_frequency("fish"), 0);
        assert_eq!(acc.documents_observed(), 2);
    }

    #[test]
    fn per_occurrence_counts_every_token() {
        let mut acc = FrequencyAccumulator::new(DfMode::PerOccurrence);
        acc.observe(&tokenize("cat dog cat"));
        acc.observe(&tokenize("dog bird"));
        assert_eq!(acc.document_frequency("cat"), 2);
        assert_eq!(acc.document_frequency("dog"), 2);
    }

    #[test]
    fn merge_matches_sequential_counting() {
        let docs = ["cat dog cat", "dog bird", "bird bird fish"];
        let mut sequential = FrequencyAccumulator::new(DfMode::Distinct);
        for d in docs {
            sequential.observe(&tokenize(d));
        }

        let mut left = FrequencyAccumulator::new(DfMode::Distinct);
        left.observe(&tokenize(docs[0]));
        let mut right = FrequencyAccumulator::new(DfMode::Distinct);
        right.observe(&tokenize(docs[1]));
        right.observe(&tokenize(docs[2]));
        left.merge(right);

        assert_eq!(left.finish(), sequential.finish());
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!("distinct".parse::<DfMode>().unwrap(), DfMode::Distinct);
        assert_eq!("Occurrence".parse::<DfMode>().unwrap(), DfMode::PerOccurrence);
        assert!("weird".parse::<DfMode>().is_err());
    }
}
