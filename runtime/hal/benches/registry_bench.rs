use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use edgeos_hal::*;

struct Passthrough;

impl DriverLifecycle for Passthrough {}

impl SensorFusion for Passthrough {
    fn input_len(&self) -> usize {
        3
    }

    fn output_len(&self) -> usize {
        3
    }

    fn process(&self, input: &[f32]) -> DriverResult<Vec<f32>> {
        Ok(input.to_vec())
    }
}

fn populated(count: usize) -> (DriverRegistry, Vec<DeviceId>) {
    let registry = DriverRegistry::new();
    let ids = (0..count)
        .map(|_| {
            registry
                .register(DeviceClass::SensorFusion, || Ok(Driver::sensor_fusion(Passthrough)))
                .expect("register")
        })
        .collect();
    (registry, ids)
}

fn bench_lookup(c: &mut Criterion) {
    let (registry, ids) = populated(32);
    let last = *ids.last().expect("ids");

    c.bench_function("lookup_last_of_32", |b| {
        b.iter(|| black_box(registry.lookup(black_box(last)).map(|h| h.class())))
    });
}

fn bench_invoke(c: &mut Criterion) {
    let (registry, ids) = populated(32);
    let id = ids[16];

    c.bench_function("with_fusion_process", |b| {
        b.iter(|| {
            registry
                .with_fusion(black_box(id), |f| f.process(&[1.0, 2.0, 3.0]))
                .expect("invoke")
        })
    });
}

criterion_group!(benches, bench_lookup, bench_invoke);
criterion_main!(benches);
