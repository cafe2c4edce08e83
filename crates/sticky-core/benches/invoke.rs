use std::cell::Cell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sticky_core::{
    AdaptiveConfig, AdaptiveDispatcher, DebounceOptions, Debouncer, FrameBatcher, Throttler,
};
use sticky_testing::{ms, TestRuntime};

const BURST_SIZES: &[u64] = &[16, 64, 256, 1024];

fn counter() -> (Rc<Cell<u64>>, impl FnMut(u64) + 'static) {
    let runs = Rc::new(Cell::new(0));
    let sink = runs.clone();
    (runs, move |value: u64| sink.set(sink.get() + value))
}

fn bench_debounce_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("debounce_burst");
    for &calls in BURST_SIZES {
        group.bench_with_input(BenchmarkId::new("calls", calls), &calls, |b, &calls| {
            let runtime = TestRuntime::new();
            let (runs, action) = counter();
            let options = DebounceOptions::default().with_max_wait(ms(250));
            let debouncer = Debouncer::new(&runtime.handle(), ms(100), options, action)
                .expect("valid debounce options");

            b.iter(|| {
                for tick in 0..calls {
                    runtime.advance_by(ms(5));
                    black_box(debouncer.invoke(tick));
                }
                runtime.run_until_idle(calls as usize);
            });
            black_box(runs.get());
        });
    }
    group.finish();
}

fn bench_throttle(c: &mut Criterion) {
    let runtime = TestRuntime::new();
    let (runs, action) = counter();
    let throttler = Throttler::new(&runtime.handle(), ms(16), action);

    c.bench_function("throttle_invoke", |b| {
        b.iter(|| {
            runtime.advance_by(ms(1));
            black_box(throttler.invoke(1));
        });
    });
    black_box(runs.get());
}

fn bench_frame_batch(c: &mut Criterion) {
    let runtime = TestRuntime::new();
    let (runs, action) = counter();
    let batcher = FrameBatcher::new(&runtime.handle(), action);

    c.bench_function("frame_batch_frame", |b| {
        b.iter(|| {
            for value in 0..32 {
                black_box(batcher.invoke(value));
            }
            runtime.run_frame();
        });
    });
    black_box(runs.get());
}

fn bench_adaptive(c: &mut Criterion) {
    let runtime = TestRuntime::new();
    let (runs, action) = counter();
    let dispatcher = AdaptiveDispatcher::new(&runtime.handle(), AdaptiveConfig::default(), action)
        .expect("valid adaptive config");

    c.bench_function("adaptive_update", |b| {
        b.iter(|| {
            runtime.advance_by(ms(7));
            black_box(dispatcher.update(1));
        });
    });
    black_box(runs.get());
}

criterion_group!(
    invoke,
    bench_debounce_burst,
    bench_throttle,
    bench_frame_batch,
    bench_adaptive
);
criterion_main!(invoke);
