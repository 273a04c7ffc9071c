use std::collections::BTreeSet;
use std::hint::black_box;

use chatfs::filters::apply::apply_filters;
use chatfs::filters::parser::parse_filter;
use chatfs::models::ConversationSummary;
use chrono::{Duration, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

/// Generate synthetic ConversationSummary data
fn generate_summaries(num_conversations: usize) -> Vec<ConversationSummary> {
    let now = Utc::now();
    (0..num_conversations)
        .map(|i| {
            let created = now - Duration::days((i % 400) as i64);
            ConversationSummary {
                id: format!("conv-{:06}", i),
                title: format!("Conversation {} about topic {}", i, i % 17),
                tags: BTreeSet::from([format!("tag-{}", i % 5)]),
                source: Some(if i % 2 == 0 { "claude-code" } else { "manual" }.to_string()),
                model: Some(format!("model-{}", i % 3)),
                created_at: created,
                updated_at: created,
                starred_at: if i % 7 == 0 { Some(created) } else { None },
                pinned_at: None,
                archived_at: None,
                message_count: 4,
            }
        })
        .collect()
}

fn bench_filter_application(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_application");

    // Benchmark tag filter (set lookup)
    for size in [1_000, 10_000, 50_000].iter() {
        let summaries = generate_summaries(*size);
        let filter_expr = parse_filter("tag:tag-1").unwrap();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("tag_filter", size), size, |b, _| {
            b.iter(|| apply_filters(black_box(summaries.clone()), black_box(&filter_expr)));
        });
    }

    // Benchmark complex filter (source AND status AND date)
    for size in [1_000, 10_000, 50_000].iter() {
        let summaries = generate_summaries(*size);
        let filter_expr = parse_filter("source:claude is:starred since:2020-01-01").unwrap();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("complex_filter", size), size, |b, _| {
            b.iter(|| apply_filters(black_box(summaries.clone()), black_box(&filter_expr)));
        });
    }

    // Benchmark fuzzy title ranking
    for size in [1_000, 10_000, 50_000].iter() {
        let summaries = generate_summaries(*size);
        let filter_expr = parse_filter("convo topc 3").unwrap();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("fuzzy_title", size), size, |b, _| {
            b.iter(|| apply_filters(black_box(summaries.clone()), black_box(&filter_expr)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_filter_application);
criterion_main!(benches);
