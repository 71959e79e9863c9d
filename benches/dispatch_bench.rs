use criterion::{black_box, criterion_group, criterion_main, Criterion};
use promptgate::config::{Config, ModelRole};
use promptgate::providers::{decode_snippet, CHAT_SNIPPET_LIMIT, TEXT_FILE_SNIPPET_LIMIT};
use promptgate::types::Provider;

fn bench_provider_parse(c: &mut Criterion) {
    c.bench_function("provider_parse_openai", |b| {
        b.iter(|| black_box("openai").parse::<Provider>())
    });

    c.bench_function("provider_parse_google", |b| {
        b.iter(|| black_box("google").parse::<Provider>())
    });

    c.bench_function("provider_parse_invalid", |b| {
        b.iter(|| black_box("deepseek").parse::<Provider>())
    });
}

fn bench_decode_snippet(c: &mut Criterion) {
    let small = "hello world ".repeat(100);
    let large = "0123456789abcdef".repeat(8192); // 128 KiB
    let binary: Vec<u8> = (0..65536u32).map(|i| (i % 251) as u8).collect();

    c.bench_function("decode_snippet_small", |b| {
        b.iter(|| decode_snippet(black_box(small.as_bytes()), CHAT_SNIPPET_LIMIT))
    });

    c.bench_function("decode_snippet_large_chat_limit", |b| {
        b.iter(|| decode_snippet(black_box(large.as_bytes()), CHAT_SNIPPET_LIMIT))
    });

    c.bench_function("decode_snippet_large_text_limit", |b| {
        b.iter(|| decode_snippet(black_box(large.as_bytes()), TEXT_FILE_SNIPPET_LIMIT))
    });

    c.bench_function("decode_snippet_binary", |b| {
        b.iter(|| decode_snippet(black_box(&binary), CHAT_SNIPPET_LIMIT))
    });
}

fn bench_model_lookup(c: &mut Criterion) {
    let config = Config::default();

    c.bench_function("model_lookup_default", |b| {
        b.iter(|| {
            config
                .model(black_box(Provider::OpenAi), ModelRole::Default)
                .len()
        })
    });

    c.bench_function("model_lookup_vision", |b| {
        b.iter(|| {
            config
                .model(black_box(Provider::Google), ModelRole::Vision)
                .len()
        })
    });
}

criterion_group!(
    benches,
    bench_provider_parse,
    bench_decode_snippet,
    bench_model_lookup
);
criterion_main!(benches);
