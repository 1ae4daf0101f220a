use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use linucb::{LinUcb, LinUcbConfig};
use std::hint::black_box;

fn bench_select_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_update");
    for &dim in &[2usize, 8usize, 32usize] {
        let arms: Vec<String> = (0..4).map(|i| format!("arm{i}")).collect();
        let mut est = LinUcb::new(LinUcbConfig {
            dim,
            alpha: 1.0,
            arms: Some(arms.clone()),
            seed: 0,
        })
        .unwrap();

        // A deterministic, slightly-non-uniform context pattern.
        let contexts: Vec<Vec<f64>> = (0..64)
            .map(|t| {
                (0..dim)
                    .map(|j| (((t * 31 + j * 7) % 13) as f64) / 13.0)
                    .collect()
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("round", dim), &dim, |b, &_d| {
            let mut t = 0usize;
            b.iter(|| {
                let ctx = &contexts[t % contexts.len()];
                let sel = est.score_and_select(black_box(ctx), &arms).unwrap();
                let reward = if t % 3 == 0 { 1.0 } else { 0.0 };
                est.update(&sel.arm, ctx, reward).unwrap();
                t += 1;
                black_box(sel.score);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_select_update);
criterion_main!(benches);
