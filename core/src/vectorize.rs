use crate::error::{CoreError, Result};
use crate::frequency::TermFrequencies;
use std::collections::{BTreeMap, HashMap};

/// Term → TF-IDF weight for one document. Ordered so that serialized
/// vectors are stable.
pub type TfIdfVector = BTreeMap<String, f32>;

/// `ln(total_documents / (df + 1))`, or 0 for a term never observed.
///
/// Negative when a term occurs in every document; that is kept as signal.
pub fn idf(document_frequency: u32, total_documents: u32) -> f32 {
    if document_frequency == 0 {
        return 0.0;
    }
    (f64::from(total_documents) / (f64::from(document_frequency) + 1.0)).ln() as f32
}

/// Combine raw term counts with corpus document frequencies.
///
/// The vector holds one entry per distinct term in `terms`, zero and
/// negative weights included.
pub fn vectorize(
    terms: &[String],
    term_frequency: &TermFrequencies,
    document_frequency: &HashMap<String, u32>,
    total_documents: u32,
) -> Result<TfIdfVector> {
    if total_documents == 0 {
        return Err(CoreError::DegenerateCorpus);
    }
    let mut vector = TfIdfVector::new();
    for term in terms {
        if vector.contains_key(term) {
            continue;
        }
        let tf = term_frequency.get(term).copied().unwrap_or(0) as f32;
        let df = document_frequency.get(term).copied().unwrap_or(0);
        vector.insert(term.clone(), tf * idf(df, total_documents));
    }
    Ok(vector)
}
