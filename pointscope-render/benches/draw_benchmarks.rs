use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pointscope_core::{Geometry, IncrementalDrawState, Point3d, ProgressReporter, TransformState, Vector3d};
use pointscope_io::PointData;
use pointscope_render::{PointCloudGeometry, RecordingShader};
use rand::{Rng, SeedableRng, rngs::StdRng};

const POINT_COUNTS: [usize; 3] = [10_000, 100_000, 1_000_000];
const QUALITIES: [f64; 4] = [0.1, 0.25, 0.5, 1.0];

fn random_cloud(n: usize) -> PointCloudGeometry {
    let mut rng = StdRng::seed_from_u64(42);
    let positions = (0..n)
        .map(|_| Point3d::new(
            350_000.0 + rng.gen_range(0.0..500.0),
            5_800_000.0 + rng.gen_range(0.0..500.0),
            rng.gen_range(0.0..30.0),
        ))
        .collect();
    let mut geom = PointCloudGeometry::new();
    geom.load_data("bench", PointData { positions, ..Default::default() }, usize::MAX, &mut ProgressReporter::silent())
        .unwrap();
    geom
}

fn camera() -> TransformState {
    let target = Point3d::new(350_250.0, 5_800_250.0, 0.0);
    TransformState::look_at(
        target + Vector3d::new(-200.0, -200.0, 150.0),
        target,
        Vector3d::z(),
        std::f64::consts::FRAC_PI_4,
        [1920, 1080],
        1.0,
        10_000.0,
    )
}

fn estimate_cost(c: &mut Criterion) {
    let transform = camera();
    let state = IncrementalDrawState::new();

    let mut g = c.benchmark_group("estimate cost");
    for n in POINT_COUNTS {
        let geom = random_cloud(n);
        g.bench_with_input(BenchmarkId::from_parameter(n), &geom, |b, geom| {
            b.iter(|| geom.estimate_cost(std::hint::black_box(&transform), false, &QUALITIES, &state));
        });
    }
    g.finish();
}

fn incremental_pass(c: &mut Criterion) {
    let transform = camera();

    let mut g = c.benchmark_group("incremental pass");
    g.sample_size(10);
    for n in POINT_COUNTS {
        let geom = random_cloud(n);
        g.bench_with_input(BenchmarkId::from_parameter(n), &geom, |b, geom| {
            b.iter(|| {
                let mut state = IncrementalDrawState::new();
                let mut shader = RecordingShader::counting();
                let mut count = geom.draw_points(&mut shader, &transform, 0.25, false, &mut state);
                while count.more_to_draw {
                    count = geom.draw_points(&mut shader, &transform, 0.25, true, &mut state);
                }
                std::hint::black_box(shader.vertex_count())
            });
        });
    }
    g.finish();
}

fn pick_vertex(c: &mut Criterion) {
    let origin = Point3d::new(350_250.0, 5_800_250.0, 500.0);
    let direction = Vector3d::new(0.01, -0.02, -1.0);

    let mut g = c.benchmark_group("pick vertex");
    for n in POINT_COUNTS {
        let geom = random_cloud(n);
        g.bench_with_input(BenchmarkId::from_parameter(n), &geom, |b, geom| {
            b.iter(|| geom.pick_vertex(std::hint::black_box(&origin), &direction, 0.1));
        });
    }
    g.finish();
}

criterion_group!(benches, estimate_cost, incremental_pass, pick_vertex);
criterion_main!(benches);
