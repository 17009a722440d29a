use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use modelite_core::{Backend, FieldSpec, FieldType, ModelRef, Query, Record};
use modelite_embedded::EmbeddedBackend;
use std::sync::Arc;

fn populated(rows: i64) -> Arc<EmbeddedBackend> {
    let backend = EmbeddedBackend::in_memory();
    let model = backend
        .create_model(
            "Item",
            vec![
                FieldSpec::new("name", FieldType::String),
                FieldSpec::new("price", FieldType::Int),
            ],
        )
        .unwrap();
    for i in 0..rows {
        backend
            .add(
                &model,
                Record::new()
                    .with("name", format!("item{}", i))
                    .with("price", (i * 37) % 1000),
            )
            .unwrap();
    }
    Arc::new(backend)
}

fn query_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("embedded_query");
    for rows in [1_000i64, 10_000] {
        let backend = populated(rows);
        let base = Query::new(ModelRef::new("Item"), backend);

        group.bench_with_input(BenchmarkId::new("filtered_page", rows), &base, |b, base| {
            let query = base
                .filter_by([("price__gte", 500)])
                .unwrap()
                .order_by("price DESC")
                .unwrap()
                .offset(20)
                .limit(10);
            b.iter(|| black_box(query.all().unwrap()))
        });

        group.bench_with_input(BenchmarkId::new("count", rows), &base, |b, base| {
            let query = base.filter_by([("name__contains", "9")]).unwrap();
            b.iter(|| black_box(query.count().unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, query_benchmark);
criterion_main!(benches);
