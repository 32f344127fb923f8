use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use lifcore_params::{LifSpec, ParamBlockBuilder, Q15_16};
use lifcore_runtime::{IncomingSpikeEvent, NeuronProcessor, RunConfig};

fn build_processor(neurons: usize) -> NeuronProcessor {
    let block = ParamBlockBuilder::new(neurons, 1.0)
        .neuron_type(LifSpec {
            tau_refrac_ms: 2.0,
            ..LifSpec::default()
        })
        .bias_all(0.8)
        .build()
        .expect("bench block build");
    // Profiling off so the bench measures the tick itself
    let config = RunConfig::default().with_profiler_capacity(0);
    NeuronProcessor::new(Arc::new(block), config).expect("bench processor")
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("lifcore_tick");

    for &n in &[256usize, 1024, 4096] {
        let events: Vec<IncomingSpikeEvent> = (0..n as u32 / 4)
            .map(|i| IncomingSpikeEvent::new((i % 2) as u8, (i * 7) % n as u32, Q15_16::from_f64(0.5)))
            .collect();

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("idle", n), &n, |b, &n| {
            b.iter_batched_ref(
                || build_processor(n),
                |p| {
                    p.tick(&[]).unwrap();
                },
                BatchSize::SmallInput,
            );
        });
        group.bench_with_input(BenchmarkId::new("driven", n), &n, |b, &n| {
            b.iter_batched_ref(
                || build_processor(n),
                |p| {
                    p.tick(&events).unwrap();
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
