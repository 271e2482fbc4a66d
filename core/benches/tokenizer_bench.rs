use criterion::{criterion_group, criterion_main, Criterion};
use tfidf_core::tokenizer::tokenize;

const TEXT: &str = "The system ingests a directory of documents, extracts their text, builds a \
searchable term index, computes per-document TF-IDF weight vectors, and answers free-text \
queries ranked by relevance. Numbers like 42 and 3.14 vanish; so does punctuation-only -- noise.";

fn bench_tokenize(c: &mut Criterion) {
    let text = TEXT.repeat(64);
    c.bench_function("tokenize_paragraphs", |b| b.iter(|| tokenize(&text)));
}

criterion_group!(benches, bench_tokenize);
criterion_main!(benches);
