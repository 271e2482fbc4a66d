use crate::error::{CoreError, Result};
use crate::frequency::{DfMode, FrequencyAccumulator, TermFrequencies};
use crate::index::{DocMeta, InvertedIndex};
use crate::sink::VectorSink;
use crate::source::{DocumentHandle, DocumentSource, TextExtractor};
use crate::tokenizer::tokenize;
use crate::vectorize::vectorize;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    pub df_mode: DfMode,
    /// Threads used for extraction and counting. 0 or 1 runs inline.
    pub workers: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { df_mode: DfMode::Distinct, workers: 1 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexBuildReport {
    pub documents_indexed: usize,
    pub documents_skipped: usize,
    pub vectors_failed: usize,
    pub elapsed_millis: u64,
}

/// Output of the counting pass for one document. Raw text is already gone.
struct Counted {
    meta: DocMeta,
    terms: Vec<String>,
    tf: TermFrequencies,
}

struct CountPass {
    counted: Vec<Counted>,
    acc: FrequencyAccumulator,
    skipped: usize,
}

/// Two-pass corpus indexer.
///
/// Pass 1 extracts and tokenizes every document and counts document
/// frequencies. Pass 2 vectorizes each document against the frozen counts,
/// inserts its postings and hands the vector to the sink. The index is built
/// into a fresh value and only returned once complete.
pub struct IndexBuilder<'a> {
    extractor: &'a dyn TextExtractor,
    sink: &'a dyn VectorSink,
    options: BuildOptions,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(extractor: &'a dyn TextExtractor, sink: &'a dyn VectorSink) -> Self {
        Self { extractor, sink, options: BuildOptions::default(), cancel: None }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Abort between documents once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn check_cancelled(&self) -> Result<()> {
        match self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(CoreError::Cancelled),
            _ => Ok(()),
        }
    }

    pub fn build_from_source(
        &self,
        source: &dyn DocumentSource,
        root: &Path,
        predicate: &dyn Fn(&Path) -> bool,
    ) -> Result<(InvertedIndex, IndexBuildReport)> {
        let handles = source.list(root, predicate)?;
        tracing::info!(root = %root.display(), files = handles.len(), "discovered documents");
        self.build(&handles)
    }

    pub fn build(&self, handles: &[DocumentHandle]) -> Result<(InvertedIndex, IndexBuildReport)> {
        let start = Instant::now();
        if handles.is_empty() {
            return Err(CoreError::DegenerateCorpus);
        }

        let mut seen = HashSet::new();
        let unique: Vec<DocumentHandle> = handles
            .iter()
            .filter(|h| {
                let first = seen.insert(h.document_id.as_str());
                if !first {
                    tracing::warn!(document_id = %h.document_id, "duplicate document id, skipping");
                }
                first
            })
            .cloned()
            .collect();
        let duplicates = handles.len() - unique.len();

        let CountPass { counted, acc, mut skipped } = self.count_pass(&unique)?;
        skipped += duplicates;
        if counted.is_empty() {
            tracing::warn!(skipped, "no document could be extracted");
            return Err(CoreError::DegenerateCorpus);
        }
        let stats = acc.finish();
        tracing::info!(
            num_docs = stats.total_documents,
            num_terms = stats.document_frequency.len(),
            skipped,
            "counted documents"
        );

        let mut index = InvertedIndex::with_stats(&stats, self.options.df_mode);
        let mut vectors_failed = 0;
        for doc in counted {
            self.check_cancelled()?;
            let vector = vectorize(&doc.terms, &doc.tf, &stats.document_frequency, stats.total_documents)?;
            let document_id = doc.meta.document_id.clone();
            index.insert(doc.meta, &vector);
            if let Err(e) = self.sink.store(&document_id, &vector) {
                tracing::warn!(document_id = %document_id, error = %e, "failed to store tf-idf vector");
                vectors_failed += 1;
            }
        }

        let report = IndexBuildReport {
            documents_indexed: index.len(),
            documents_skipped: skipped,
            vectors_failed,
            elapsed_millis: start.elapsed().as_millis() as u64,
        };
        tracing::info!(
            documents_indexed = report.documents_indexed,
            documents_skipped = report.documents_skipped,
            vectors_failed = report.vectors_failed,
            elapsed_millis = report.elapsed_millis,
            "index build complete"
        );
        Ok((index, report))
    }

    fn count_pass(&self, handles: &[DocumentHandle]) -> Result<CountPass> {
        let workers = self.options.workers.max(1).min(handles.len());
        if workers == 1 {
            return self.count_chunk(handles);
        }

        let chunk_size = handles.len().div_ceil(workers);
        let partials: Vec<Result<CountPass>> = std::thread::scope(|s| {
            let joins: Vec<_> = handles.chunks(chunk_size).map(|chunk| s.spawn(move || self.count_chunk(chunk))).collect();
            joins
                .into_iter()
                .map(|j| j.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        });

        let mut merged = CountPass {
            counted: Vec::with_capacity(handles.len()),
            acc: FrequencyAccumulator::new(self.options.df_mode),
            skipped: 0,
        };
        for partial in partials {
            let partial = partial?;
            merged.counted.extend(partial.counted);
            merged.acc.merge(partial.acc);
            merged.skipped += partial.skipped;
        }
        Ok(merged)
    }

    fn count_chunk(&self, handles: &[DocumentHandle]) -> Result<CountPass> {
        let mut pass = CountPass {
            counted: Vec::with_capacity(handles.len()),
            acc: FrequencyAccumulator::new(self.options.df_mode),
            skipped: 0,
        };
        for handle in handles {
            self.check_cancelled()?;
            let extracted = match self.extractor.extract(handle) {
                Ok(extracted) => extracted,
                Err(e) => {
                    tracing::warn!(document_id = %handle.document_id, error = %e, "skipping document");
                    pass.skipped += 1;
                    continue;
                }
            };
            tracing::info!(document_id = %handle.document_id, content_type = %extracted.content_type, "indexing");
            let terms = tokenize(&extracted.text);
            let tf = pass.acc.observe(&terms);
            let meta = DocMeta {
                document_id: handle.document_id.clone(),
                file_name: handle.file_name(),
                content_type: extracted.content_type,
                term_count: terms.len() as u32,
            };
            pass.counted.push(Counted { meta, terms, tf });
        }
        Ok(pass)
    }
}
