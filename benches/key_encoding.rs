//! Key Encoding Benchmarks
//!
//! Measures the id-to-storage-key mapping on representative document ids,
//! from plain identifiers to deep paths full of reserved characters.
//!
//! Run with: `cargo bench --bench key_encoding`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use recuerdo::encoding::{decode_key, encode_key};

/// Ids shaped like the ones seen in practice
fn sample_ids() -> Vec<(&'static str, String)> {
    let deep = format!(
        "{}annual-report.final.docx",
        "projects/archive/2024/".repeat(16)
    );
    vec![
        ("plain", "quarterly_report".to_string()),
        ("dotted", "quarterly-report.docx".to_string()),
        (
            "path_heavy",
            "projects/2024/q3/summary notes #final [v2].md".to_string(),
        ),
        ("multibyte", "informe-año-2024/señal.md".to_string()),
        ("deep_path", deep),
    ]
}

/// Benchmark id encoding
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_key");

    for (name, id) in sample_ids() {
        group.throughput(Throughput::Bytes(id.len() as u64));
        group.bench_with_input(BenchmarkId::new(name, id.len()), &id, |b, id| {
            b.iter(|| encode_key(black_box(id)))
        });
    }

    group.finish();
}

/// Benchmark key decoding
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_key");

    for (name, id) in sample_ids() {
        let key = encode_key(&id);
        group.throughput(Throughput::Bytes(key.len() as u64));
        group.bench_with_input(BenchmarkId::new(name, key.len()), &key, |b, key| {
            b.iter(|| decode_key(black_box(key)))
        });
    }

    group.finish();
}

/// Benchmark the full round trip used by every store access
fn bench_round_trip(c: &mut Criterion) {
    let id = "projects/2024/q3/summary notes #final [v2].md";

    let mut group = c.benchmark_group("round_trip");
    group.bench_function("path_heavy", |b| {
        b.iter(|| {
            let key = encode_key(black_box(id));
            decode_key(black_box(&key))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_round_trip);
criterion_main!(benches);
