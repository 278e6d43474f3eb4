use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mimic_http::backends::InMemoryScenarioStore;
use mimic_http::mapping::Mapping;
use mimic_http::mapping_matcher::{select_best_match, MatchingOptions, ThreadRandom};
use mimic_http::matchers::{JsonPathMatcher, RegexMatcher, WildcardMatcher};
use mimic_http::request::RequestMessage;
use mimic_http::request_matcher::RequestMatcherBuilder;
use mimic_http::response::StaticResponse;
use std::sync::Arc;

fn exact_mappings(count: usize) -> Vec<Arc<Mapping>> {
    (0..count)
        .map(|i| {
            let matcher = RequestMatcherBuilder::new()
                .using_methods(["GET", "POST"])
                .with_path(&format!("/api/v1/endpoint{i}"))
                .with_header("Accept", "application/json")
                .build();
            Arc::new(Mapping::new(matcher, StaticResponse::ok()).with_priority((i % 5) as i32))
        })
        .collect()
}

fn regex_mappings(count: usize) -> Vec<Arc<Mapping>> {
    (0..count)
        .map(|i| {
            let matcher = RequestMatcherBuilder::new()
                .with_path_matcher(
                    RegexMatcher::new([format!(r"^/api/v\d+/endpoint{i}$")], false).unwrap(),
                )
                .with_header_matcher(
                    "Accept",
                    WildcardMatcher::new(["application/*"], true).unwrap(),
                )
                .build();
            Arc::new(Mapping::new(matcher, StaticResponse::ok()))
        })
        .collect()
}

fn body_mappings(count: usize) -> Vec<Arc<Mapping>> {
    (0..count)
        .map(|i| {
            let matcher = RequestMatcherBuilder::new()
                .using_methods(["POST"])
                .with_path("/orders")
                .with_body(JsonPathMatcher::new([format!("$.items[?@.sku == 'sku-{i}']")]).unwrap())
                .build();
            Arc::new(Mapping::new(matcher, StaticResponse::ok()))
        })
        .collect()
}

fn bench_find_best_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_best_match");
    let scenarios = InMemoryScenarioStore::new();
    let options = MatchingOptions::default();
    let random = ThreadRandom;

    for count in [10, 100, 1000].iter() {
        let exact = exact_mappings(*count);
        let regex = regex_mappings(*count);
        let request = RequestMessage::new("GET", &format!("/api/v1/endpoint{}", count / 2))
            .with_header("Accept", "application/json");

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("exact", count), count, |b, _| {
            b.iter(|| {
                select_best_match(
                    black_box(&exact),
                    black_box(&request),
                    &scenarios,
                    &random,
                    &options,
                    Utc::now(),
                )
            })
        });
        group.bench_with_input(BenchmarkId::new("regex", count), count, |b, _| {
            b.iter(|| {
                select_best_match(
                    black_box(&regex),
                    black_box(&request),
                    &scenarios,
                    &random,
                    &options,
                    Utc::now(),
                )
            })
        });
    }

    group.finish();
}

fn bench_body_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("body_matching");
    let scenarios = InMemoryScenarioStore::new();
    let options = MatchingOptions::default();
    let random = ThreadRandom;

    for count in [10, 100].iter() {
        let mappings = body_mappings(*count);
        let body = format!(r#"{{"items":[{{"sku":"sku-{}","qty":1}}]}}"#, count - 1);
        let request = RequestMessage::new("POST", "/orders")
            .with_header("Content-Type", "application/json")
            .with_body_bytes(body);

        group.bench_with_input(BenchmarkId::new("jsonpath", count), count, |b, _| {
            b.iter(|| {
                select_best_match(
                    black_box(&mappings),
                    black_box(&request),
                    &scenarios,
                    &random,
                    &options,
                    Utc::now(),
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_find_best_match, bench_body_matching);
criterion_main!(benches);
