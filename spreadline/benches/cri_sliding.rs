use criterion::{criterion_group, criterion_main, Criterion};
use tinyrand::{Rand, Seeded, StdRand};

use spreadline::sliding::{Predicate, SlidingWindow};

fn criterion_benchmark(c: &mut Criterion) {
    fn samples(len: usize) -> Vec<Option<f64>> {
        let mut rand = StdRand::seed(42);
        (0..len)
            .map(|_| {
                let raw = rand.next_u64();
                if raw % 17 == 0 {
                    None
                } else {
                    Some((raw % 61) as f64 - 30.0)
                }
            })
            .collect()
    }

    fn predicates() -> Vec<Predicate> {
        vec![
            Predicate::AbsBelow(7.0),
            Predicate::AbsBelow(10.0),
            Predicate::Below(-10.0),
            Predicate::AtLeast(-8.0),
            Predicate::Above(0.0),
            Predicate::EqualTo(0.0),
        ]
    }

    fn bench(c: &mut Criterion, capacity: usize) {
        let samples = samples(1_000);
        c.bench_function(&format!("cri_sliding_{capacity}w"), |b| {
            b.iter(|| {
                let mut window = SlidingWindow::new(capacity, predicates());
                let mut sum = 0.0;
                for &sample in &samples {
                    sum += window.sample_stdev().unwrap_or_default() + window.rate(1).unwrap_or_default();
                    window.push(sample);
                }
                sum
            });
        });
    }
    bench(c, 5);
    bench(c, 20);
    bench(c, 100);
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
