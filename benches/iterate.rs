use std::num::NonZeroU32;
use std::time::Duration;

use comptree::{Config, Store};
use criterion::*;
use rand::Rng;

#[derive(Clone, Copy)]
struct Position([f64; 3]);

#[derive(Clone, Copy)]
struct Velocity([f64; 3]);

fn store<C>(order: usize, entities: u32, mut new: impl FnMut() -> C) -> Store<NonZeroU32, C>
where
    C: 'static,
{
    let mut store = Store::new(Config::default().with_order(order)).unwrap();
    // every other entity, so that ids are sparse
    for i in 0..entities {
        store.upsert(NonZeroU32::new(i * 2 + 1).unwrap(), new());
    }
    store
}

fn iterate_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("iter store (a += b)");
    group.measurement_time(Duration::from_secs(10));

    for order in [4, 16, 64] {
        for log_entities in (4..=16).step_by(4) {
            let entities = 1u32 << log_entities;
            group.throughput(Throughput::Elements(entities.into()));

            let mut rng = rand::thread_rng();
            let mut positions = store(order, entities, || Position([0.0; 3]));
            let velocities = store(order, entities, || {
                Velocity([rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)])
            });

            group.bench_function(
                BenchmarkId::new(format!("order {order}"), format!("{entities} entities")),
                |b| {
                    b.iter(|| {
                        for ((_, position), (_, velocity)) in
                            positions.iter_mut().zip(velocities.iter())
                        {
                            for axis in 0..3 {
                                position.0[axis] += velocity.0[axis];
                            }
                        }
                    });
                },
            );
        }
    }
}

fn random_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("random lookup");

    for order in [4, 16, 64] {
        let entities = 1u32 << 16;
        let store = store(order, entities, || Position([1.0; 3]));
        let mut rng = rand::thread_rng();
        let lookups: Vec<_> = (0..1024)
            .map(|_| NonZeroU32::new(rng.gen_range(1..=entities * 2)).unwrap())
            .collect();

        group.throughput(Throughput::Elements(lookups.len() as u64));
        group.bench_function(BenchmarkId::new("order", order), |b| {
            b.iter(|| {
                lookups.iter().filter_map(|&key| store.get(key)).map(|position| position.0[0]).sum::<f64>()
            });
        });
    }
}

criterion_group!(benches, iterate_add, random_lookup);
criterion_main!(benches);
