//! Benchmarks for exact nearest-neighbor queries.

use cairndb_core::{
    BruteForceIndex, Catalog, CollectionOptions, DistanceMetric, EmbeddingConfig, Filter,
    Metadata, QueryRequest, Record, RecordBatch,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;

fn generate_random_vector(dim: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn bench_index_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("brute_force_search");

    for num_records in [1000, 10000, 50000].iter() {
        let dim = 384;
        let mut index = BruteForceIndex::new(DistanceMetric::Cosine, dim);

        for i in 0..*num_records {
            let metadata = Metadata::new().with_field("bucket", (i % 10) as i64);
            let record = Record::new(format!("rec_{i}"), generate_random_vector(dim))
                .with_metadata(metadata);
            index.insert(record).unwrap();
        }

        let query = generate_random_vector(dim);
        let filter = Filter::field("bucket").lt(3);

        group.throughput(Throughput::Elements(*num_records as u64));
        group.bench_with_input(
            BenchmarkId::new("unfiltered", num_records),
            num_records,
            |bench, _| bench.iter(|| index.search(black_box(&query), 10, None).unwrap()),
        );
        group.bench_with_input(
            BenchmarkId::new("filtered", num_records),
            num_records,
            |bench, _| bench.iter(|| index.search(black_box(&query), 10, Some(&filter)).unwrap()),
        );
    }

    group.finish();
}

fn bench_text_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection_text_query");

    let catalog = Catalog::in_memory();
    let collection = catalog
        .create_collection(
            "bench_docs",
            CollectionOptions::new().with_embedding(EmbeddingConfig::local()),
        )
        .unwrap();

    let topics = ["flights", "hotels", "meals", "car rentals", "per diem"];
    let ids: Vec<String> = (0..5000).map(|i| format!("doc_{i}")).collect();
    let documents: Vec<String> = (0..5000)
        .map(|i| format!("policy {i} covering {} for region {}", topics[i % 5], i % 37))
        .collect();
    collection
        .add(RecordBatch::new(ids).with_documents(documents))
        .unwrap();

    group.bench_function("5000_docs", |bench| {
        bench.iter(|| {
            collection
                .query(QueryRequest::texts([black_box("hotel stays in region 12")]).with_n_results(5))
                .unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_index_search, bench_text_query);
criterion_main!(benches);
