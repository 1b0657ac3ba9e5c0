//! Benchmarks : détection, parsing et reprojection

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geofiddle::{transform_geometry, FormatRegistry, Geometry, Position, SupportedProjection};

/// Trace CSV de `points` couples autour de Londres
fn csv_track(points: usize) -> String {
    (0..points)
        .map(|i| {
            let t = i as f64 / points as f64;
            format!("{:.6},{:.6}", -0.2 + 0.2 * t, 51.45 + 0.1 * t)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn geojson_collection(features: usize) -> String {
    let items: Vec<String> = (0..features)
        .map(|i| {
            let x = -0.2 + i as f64 * 1e-4;
            format!(
                r#"{{"type":"Feature","properties":{{"n":{i}}},"geometry":{{"type":"LineString","coordinates":[[{x},51.5],[{x},51.6],[{},51.6]]}}}}"#,
                x + 1e-3
            )
        })
        .collect();
    format!(r#"{{"type":"FeatureCollection","features":[{}]}}"#, items.join(","))
}

fn bench_detect(c: &mut Criterion) {
    let registry = FormatRegistry::new();
    let inputs = [
        ("geojson", geojson_collection(100)),
        ("csv", csv_track(1000)),
        ("wkt", "LINESTRING (30 10, 10 30, 40 40)".to_string()),
        ("polyline5", "_p~iF~ps|U_ulLnnqC_mqNvxq`@".to_string()),
    ];

    let mut group = c.benchmark_group("detect_format");
    for (name, text) in &inputs {
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), text, |b, text| {
            b.iter(|| black_box(registry.detect_format(black_box(text))))
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let registry = FormatRegistry::new();
    let mut group = c.benchmark_group("parse");

    for size in [100, 1000, 10_000] {
        let text = csv_track(size);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("csv", size), &text, |b, text| {
            b.iter(|| black_box(registry.parse(black_box(text), "csv")))
        });

        let text = geojson_collection(size / 10);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("geojson", size / 10), &text, |b, text| {
            b.iter(|| black_box(registry.parse(black_box(text), "geojson")))
        });
    }
    group.finish();
}

fn bench_reproject(c: &mut Criterion) {
    let line = Geometry::LineString(
        (0..10_000)
            .map(|i| Position::new(-0.2 + i as f64 * 1e-5, 51.5))
            .collect(),
    );

    let mut group = c.benchmark_group("reproject");
    group.throughput(Throughput::Elements(10_000));
    for target in [SupportedProjection::WebMercator, SupportedProjection::Bng] {
        group.bench_with_input(BenchmarkId::from_parameter(target), &target, |b, &target| {
            b.iter(|| {
                black_box(transform_geometry(
                    black_box(&line),
                    SupportedProjection::Wgs84,
                    target,
                ))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_detect, bench_parse, bench_reproject);
criterion_main!(benches);
