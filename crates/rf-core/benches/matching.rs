use criterion::{black_box, criterion_group, criterion_main, Criterion};

use rf_core::{Engine, EngineConfig, FilterList, Request, RequestType, RuleStorage};

fn build_engine(rule_count: usize) -> Engine {
    let mut text = String::new();
    for i in 0..rule_count {
        text.push_str(&format!("||host{i}.example^\n"));
        if i % 10 == 0 {
            text.push_str(&format!("/banner{i}/*$image\n"));
        }
        if i % 25 == 0 {
            text.push_str(&format!("@@||host{i}.example^$document\n"));
        }
    }
    let storage = RuleStorage::new(vec![FilterList::new(1, text)]);
    Engine::new(storage, EngineConfig::default())
}

fn bench_match_request(c: &mut Criterion) {
    let engine = build_engine(5_000);

    let hit = Request::new(
        "https://host1234.example/banner.png",
        Some("https://news.example/"),
        RequestType::Image,
    );
    let miss = Request::new(
        "https://unrelated.example/app.js",
        Some("https://news.example/"),
        RequestType::Script,
    );

    c.bench_function("match_request_hit", |b| {
        b.iter(|| engine.match_request(black_box(&hit)))
    });
    c.bench_function("match_request_miss", |b| {
        b.iter(|| engine.match_request(black_box(&miss)))
    });
}

fn bench_load_rules(c: &mut Criterion) {
    c.bench_function("load_5k_rules", |b| {
        b.iter(|| build_engine(black_box(5_000)))
    });
}

criterion_group!(benches, bench_match_request, bench_load_rules);
criterion_main!(benches);
