use annex_core::{Mapping, ResourceMeta, ResourceSample, RevisionCollector};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn mapping() -> Mapping {
    let mut mapping = Mapping::new("bench_mapping", "bench", 3);
    mapping.labels = vec!["app".into(), "version".into()];
    mapping.annotations = vec!["owner".into()];
    mapping.reference_labels = vec!["team".into()];
    mapping
}

fn sample(index: usize, version: usize) -> ResourceSample {
    ResourceSample::new(ResourceMeta::new(
        "apps/v1",
        "Deployment",
        "bench",
        format!("deployment-{index}"),
    ))
    .with_label("app", "bench")
    .with_label("team", "core")
    .with_label("version", version.to_string())
    .with_annotation("owner", "bench")
}

fn store_benchmark(c: &mut Criterion) {
    let collector = RevisionCollector::new(mapping()).unwrap();
    let unchanged = sample(0, 0);
    collector.store(&unchanged);

    c.bench_function("store_unchanged", |b| {
        b.iter(|| collector.store(black_box(&unchanged)))
    });

    let mut version = 0;
    c.bench_function("store_revised", |b| {
        b.iter(|| {
            version += 1;
            collector.store(black_box(&sample(1, version)))
        })
    });

    let populated = RevisionCollector::new(mapping()).unwrap();
    for index in 0..1_000 {
        for version in 0..3 {
            populated.store(&sample(index, version));
        }
    }
    c.bench_function("points_3000", |b| b.iter(|| black_box(populated.points())));
}

criterion_group!(benches, store_benchmark);
criterion_main!(benches);
