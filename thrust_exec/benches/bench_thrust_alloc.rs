//! # Thrust Allocation Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use comms_if::cmd::AccelCmd;
use lsq::LinearSolverType;
use thrust_lib::{
    frame_client::StaticFrameSource,
    thrust_alloc::{InitData, Params, ThrustAlloc, ThrusterGeometry},
};
use std::time::Duration;
use util::module::State;

fn build_alloc(linear_solver_type: LinearSolverType) -> ThrustAlloc {
    let mut frames = StaticFrameSource::from_toml_str(include_str!("../../params/frames.toml"))
        .expect("Could not parse the frame table");
    let geometry = ThrusterGeometry::from_source(&mut frames, "base_link", Duration::from_secs(0))
        .expect("Could not build the geometry");

    let mut params = Params::default();
    params.solver.linear_solver_type = linear_solver_type;

    ThrustAlloc::init(InitData {
        params,
        geometry,
        archive_path: None,
    })
    .expect("Could not initialise ThrustAlloc")
}

fn thrust_alloc_benchmark(c: &mut Criterion) {
    // Feasible command, no thruster saturates
    let feasible = AccelCmd::from_axes([0.3, 0.1, -0.2, 0.4, 0.0, -0.1]);

    // Surge well beyond what the surge thrusters can deliver
    let saturating = AccelCmd::from_axes([3.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

    let mut qr = build_alloc(LinearSolverType::DenseQr);
    let mut chol = build_alloc(LinearSolverType::DenseNormalCholesky);

    c.bench_function("alloc feasible (dense qr)", |b| {
        b.iter(|| qr.proc(black_box(&feasible)).unwrap())
    });
    c.bench_function("alloc feasible (normal cholesky)", |b| {
        b.iter(|| chol.proc(black_box(&feasible)).unwrap())
    });
    c.bench_function("alloc saturating (dense qr)", |b| {
        b.iter(|| qr.proc(black_box(&saturating)).unwrap())
    });
}

criterion_group!(benches, thrust_alloc_benchmark);
criterion_main!(benches);
