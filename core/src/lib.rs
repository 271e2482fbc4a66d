//! TF-IDF indexing and ranking engine.
//!
//! Documents are tokenized, counted, vectorized against corpus-wide
//! document frequencies and inserted into an [`InvertedIndex`]; queries are
//! scored by summing the stored weights of their terms.

pub mod builder;
pub mod error;
pub mod frequency;
pub mod index;
pub mod persist;
pub mod query;
pub mod sink;
pub mod snapshot;
pub mod source;
pub mod tokenizer;
pub mod vectorize;

pub use builder::{BuildOptions, IndexBuildReport, IndexBuilder};
pub use error::{CoreError, Result};
pub use frequency::{CorpusStats, DfMode, FrequencyAccumulator, TermFrequencies};
pub use index::{DocId, DocMeta, InvertedIndex, Posting, TermId};
pub use query::{QueryEngine, QueryOptions, QueryResult, SearchHit};
pub use sink::{DiscardVectorSink, MemoryVectorSink, SledVectorSink, VectorSink};
pub use snapshot::IndexHandle;
pub use source::{is_indexable, DocumentHandle, DocumentSource, ExtractedText, FsDocumentSource, PlainTextExtractor, TextExtractor};
pub use vectorize::{idf, vectorize, TfIdfVector};
