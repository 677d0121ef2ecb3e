//! Benchmarks for distance metrics and the local embedding model.

use cairndb_core::distance::{cosine_distance, euclidean_distance, euclidean_distance_squared};
use cairndb_core::LocalEmbedder;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;

fn generate_random_vector(dim: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn bench_metric(c: &mut Criterion, name: &str, metric: fn(&[f32], &[f32]) -> f32) {
    let mut group = c.benchmark_group(name);

    for dim in [128, 384, 768, 1536].iter() {
        let a = generate_random_vector(*dim);
        let b = generate_random_vector(*dim);

        group.throughput(Throughput::Elements(*dim as u64));
        group.bench_with_input(BenchmarkId::from_parameter(dim), dim, |bench, _| {
            bench.iter(|| metric(black_box(&a), black_box(&b)))
        });
    }

    group.finish();
}

fn bench_cosine(c: &mut Criterion) {
    bench_metric(c, "cosine_distance", cosine_distance);
}

fn bench_euclidean(c: &mut Criterion) {
    bench_metric(c, "euclidean_distance", euclidean_distance);
}

fn bench_squared_euclidean(c: &mut Criterion) {
    bench_metric(c, "squared_euclidean_distance", euclidean_distance_squared);
}

fn bench_local_embedder(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_embedder");
    let embedder = LocalEmbedder::default();
    let text = "Business class is only permitted for international flights longer than \
                eight hours; all other trips must be booked in economy.";

    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("embed_one", |bench| {
        bench.iter(|| embedder.embed_one(black_box(text)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_cosine,
    bench_euclidean,
    bench_squared_euclidean,
    bench_local_embedder
);
criterion_main!(benches);
