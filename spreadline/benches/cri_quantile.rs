use criterion::{criterion_group, criterion_main, Criterion};
use tinyrand::{Rand, Seeded, StdRand};

use spreadline::quantile::SortedSamples;

fn criterion_benchmark(c: &mut Criterion) {
    fn bench(c: &mut Criterion, len: usize) {
        let mut rand = StdRand::seed(7);
        let values: Vec<_> = (0..len).map(|_| (rand.next_u64() % 401) as f64 / 10.0 - 20.0).collect();

        // sanity check
        let samples = SortedSamples::from(&values[..]);
        assert!(samples.percentile(0.05) <= samples.percentile(0.95));

        c.bench_function(&format!("cri_quantile_prefix_{len}"), |b| {
            b.iter(|| {
                let mut samples = SortedSamples::with_capacity(len);
                let mut sum = 0.0;
                for &value in &values {
                    samples.insert(value);
                    sum += samples.median().unwrap_or_default();
                }
                sum
            });
        });
    }
    bench(c, 100);
    bench(c, 1_000);
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
