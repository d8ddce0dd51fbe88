use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use reshape_engine::{FieldMapEntry, TransformOptions, TreeTransformer, UnmappedFields};
use reshape_test_utils::TestDataGenerator;

fn log_transformer() -> TreeTransformer {
    let options = TransformOptions::builder("log")
        .field_maps(vec![
            FieldMapEntry::new("id", "event.id", "log"),
            FieldMapEntry::new("timestamp", "event.ts", "log"),
            FieldMapEntry::new("level", "severity", "log"),
            FieldMapEntry::new("user", "actor", "log"),
            FieldMapEntry::new("tags", "labels", "log"),
            FieldMapEntry::new("name", "display_name", "log"),
            FieldMapEntry::new("uid", "id", "log"),
        ])
        .build()
        .unwrap();
    TreeTransformer::new(options)
}

fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");

    for count in [100usize, 1_000, 10_000] {
        let records = TestDataGenerator::large_record_set(count);
        group.throughput(Throughput::Elements(count as u64));

        let mapped = log_transformer();
        group.bench_with_input(BenchmarkId::new("mapped", count), &records, |b, records| {
            b.iter(|| {
                for record in records {
                    black_box(mapped.transform_root(black_box(record)));
                }
            })
        });

        let passthrough = TreeTransformer::new(
            TransformOptions::builder("log")
                .unmapped(UnmappedFields::KeepSourceKey)
                .build()
                .unwrap(),
        );
        group.bench_with_input(
            BenchmarkId::new("passthrough", count),
            &records,
            |b, records| {
                b.iter(|| {
                    for record in records {
                        black_box(passthrough.transform_root(black_box(record)));
                    }
                })
            },
        );
    }

    group.finish();
}

fn bench_deep_nesting(c: &mut Criterion) {
    let record = TestDataGenerator::deeply_nested_record(64);
    let transformer = TreeTransformer::new(
        TransformOptions::builder("node")
            .unmapped(UnmappedFields::KeepSourceKey)
            .build()
            .unwrap(),
    );

    c.bench_function("transform_deep_64", |b| {
        b.iter(|| black_box(transformer.transform_root(black_box(&record))))
    });
}

criterion_group!(benches, bench_transform, bench_deep_nesting);
criterion_main!(benches);
