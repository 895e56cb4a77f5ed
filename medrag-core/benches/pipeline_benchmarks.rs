use criterion::{black_box, criterion_group, criterion_main, Criterion};
use medrag_core::citations::verify_citations;
use medrag_core::context::format_context;
use medrag_core::corpus::{LiteratureCorpus, DEFAULT_DIMENSIONS};
use medrag_core::retrieval::RetrievalOracle;
use medrag_core::risk::RiskScreener;
use medrag_core::types::Document;

fn sample_documents(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| Document {
            pmid: format!("{}", 30_000_000 + i),
            title: format!("Randomized trial of intervention {i} in type 2 diabetes"),
            abstract_text: "Background: glycemic control remains suboptimal. Methods: we \
                            randomized adults to therapy or placebo. Results: HbA1c fell \
                            by 0.8%. Conclusions: the intervention may improve control."
                .to_string(),
            journal: "Diabetes Care".to_string(),
            specialty: ["endocrinology", "cardiology", "nephrology"][i % 3].to_string(),
            publication_date: format!("{}-05-01", 2010 + i % 15),
            similarity_score: 1.0 - i as f64 / n as f64,
        })
        .collect()
}

fn bench_risk_screener(c: &mut Criterion) {
    let screener = RiskScreener::default();

    c.bench_function("assess_query_low_risk", |b| {
        b.iter(|| screener.assess_query(black_box("What are the outcomes of SGLT2 inhibitors?")))
    });

    c.bench_function("assess_query_emergency", |b| {
        b.iter(|| screener.assess_query(black_box("I took an overdose of insulin")))
    });

    let docs = sample_documents(50);
    c.bench_function("validate_retrieval_50_docs", |b| {
        b.iter(|| screener.validate_retrieval_at(black_box(&docs), 2026))
    });
}

fn bench_citations(c: &mut Criterion) {
    let docs = sample_documents(10);
    let answer: String = docs
        .iter()
        .map(|d| format!("Finding from {} may apply [PMID: {}]. ", d.title, d.pmid))
        .chain(std::iter::once("Unverified claim [PMID: 1].".to_string()))
        .collect();

    c.bench_function("verify_citations_10_sources", |b| {
        b.iter(|| verify_citations(black_box(&answer), black_box(&docs)))
    });
}

fn bench_context(c: &mut Criterion) {
    let docs = sample_documents(5);
    c.bench_function("format_context_5_docs", |b| {
        b.iter(|| format_context(black_box(&docs)))
    });
}

fn bench_corpus_search(c: &mut Criterion) {
    let corpus = match LiteratureCorpus::new(sample_documents(500), DEFAULT_DIMENSIONS) {
        Ok(corpus) => corpus,
        Err(e) => panic!("sample corpus is valid: {e}"),
    };

    c.bench_function("corpus_search_500_docs", |b| {
        b.iter(|| corpus.search(black_box("glycemic control HbA1c therapy"), 3))
    });

    c.bench_function("corpus_search_by_specialty_500_docs", |b| {
        b.iter(|| {
            corpus.search_by_specialty(black_box("HbA1c placebo"), black_box("cardiology"), 3)
        })
    });
}

criterion_group!(
    benches,
    bench_risk_screener,
    bench_citations,
    bench_context,
    bench_corpus_search,
);
criterion_main!(benches);
