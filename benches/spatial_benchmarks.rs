use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use geo::polygon;
use nearpoly::compute::geometry::area_from_polygon;
use nearpoly::index::codec;
use nearpoly::prelude::*;
use nearpoly::point_to_area_distance_km;

fn features(count: usize) -> Vec<AreaFeature> {
    let side = (count as f64).sqrt().ceil() as usize;
    (0..count)
        .map(|i| {
            let cx = 5.0 + (i % side) as f64 * 0.05;
            let cy = 47.0 + (i / side) as f64 * 0.05;
            let geometry = area_from_polygon(polygon![
                (x: cx - 0.02, y: cy - 0.02),
                (x: cx + 0.02, y: cy - 0.015),
                (x: cx + 0.018, y: cy + 0.02),
                (x: cx - 0.021, y: cy + 0.017),
            ]);
            AreaFeature::new(geometry, AttributeRecord::new())
        })
        .collect()
}

fn dataset(features: Vec<AreaFeature>) -> Dataset {
    let output = IndexBuilder::new().build(&features).unwrap();
    let (geometries, attributes): (Vec<_>, Vec<_>) = features
        .into_iter()
        .map(|f| (f.geometry, f.attributes))
        .unzip();
    Dataset::from_parts(output.index, attributes, geometries, &Config::default()).unwrap()
}

fn benchmark_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for size in [1_000, 10_000, 50_000] {
        let input = features(size);
        group.bench_with_input(BenchmarkId::new("index_build", size), &input, |b, input| {
            b.iter(|| IndexBuilder::new().build(black_box(input)).unwrap())
        });
    }

    let output = IndexBuilder::new().build(&features(10_000)).unwrap();
    group.bench_function("decode_10000", |b| {
        b.iter(|| codec::decode(black_box(&output.index_bytes)).unwrap())
    });

    group.finish();
}

fn benchmark_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");
    let ds = dataset(features(10_000));
    let point = QueryPoint::new(49.5, 7.5);

    for k in [20, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("nearest_candidates", k), &k, |b, &k| {
            b.iter(|| ds.nearest_candidates(black_box(&point), k).unwrap())
        });
    }

    group.bench_function("range_small_window", |b| {
        let window = BoundingBox::new(7.4, 49.4, 7.6, 49.6);
        b.iter(|| ds.range(black_box(&window)).unwrap())
    });

    group.bench_function("search_default", |b| {
        b.iter(|| ds.search(black_box(&point), None).unwrap())
    });

    group.bench_function("search_outside_coverage", |b| {
        let far = QueryPoint::new(-30.0, 120.0);
        b.iter(|| ds.search(black_box(&far), None).unwrap())
    });

    group.finish();
}

fn benchmark_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("distance");
    let ring: Vec<(f64, f64)> = (0..256)
        .map(|i| {
            let angle = i as f64 / 256.0 * std::f64::consts::TAU;
            (10.0 + angle.cos(), 50.0 + angle.sin() * 0.6)
        })
        .collect();
    let area = area_from_polygon(geo::Polygon::new(ring.into(), vec![]));

    group.bench_function("point_to_area_inside", |b| {
        let p = geo::Point::new(10.0, 50.0);
        b.iter(|| point_to_area_distance_km(black_box(&p), &area))
    });

    group.bench_function("point_to_area_outside", |b| {
        let p = geo::Point::new(13.0, 51.0);
        b.iter(|| point_to_area_distance_km(black_box(&p), &area))
    });

    group.finish();
}

criterion_group!(benches, benchmark_build, benchmark_queries, benchmark_distance);
criterion_main!(benches);
