use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use skelarm_core::{Chain, LinkProperties, Method, SystemState, dynamics, integrator::ZeroTorque};
use std::hint::black_box;

const DT: f64 = 1e-3;

fn make_chain(dof: usize) -> Chain {
    let links = (0..dof)
        .map(|i| LinkProperties::new(1.0 / (i + 1) as f64, 1.0, 0.05))
        .collect();
    let mut chain = Chain::new(links).unwrap();
    let q: Vec<f64> = (0..dof).map(|i| 0.1 * i as f64).collect();
    let dq: Vec<f64> = (0..dof).map(|i| 0.5 - 0.1 * i as f64).collect();
    chain.set_q(&q).unwrap();
    chain.set_dq(&dq).unwrap();
    chain
}

fn bench_forward_dynamics(c: &mut Criterion) {
    let mut group = c.benchmark_group("forward_dynamics");
    for &dof in &[2usize, 4, 8, 16] {
        let chain = make_chain(dof);
        let tau = vec![0.1; dof];
        group.bench_with_input(BenchmarkId::from_parameter(dof), &dof, |b, _| {
            b.iter_batched(
                || chain.clone(),
                |mut chain| dynamics::forward_dynamics(&mut chain, black_box(&tau)),
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");
    for &dof in &[2usize, 4, 8] {
        let chain = make_chain(dof);
        let state: SystemState = chain.state();
        for method in [Method::Euler, Method::RungeKutta4] {
            group.bench_with_input(BenchmarkId::new(method.name(), dof), &dof, |b, _| {
                b.iter(|| method.step(&chain, 0.0, black_box(&state), DT, &ZeroTorque))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_forward_dynamics, bench_step);
criterion_main!(benches);
