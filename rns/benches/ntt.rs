use criterion::{criterion_group, criterion_main, Criterion};
use rns::poly::Poly;
use rns::ring::Ring;
use sampling::source::Source;

fn bench_ntt(c: &mut Criterion) {
    let mut group = c.benchmark_group("ntt");
    for log_n in [12usize, 13, 14] {
        let n: usize = 1 << log_n;
        let ring: Ring<u64> = Ring::new(n, 0x1fffffffffe00001);
        let mut source: Source = Source::new([0u8; 32]);
        let mut a: Poly<u64> = ring.new_poly();
        ring.fill_uniform(&mut source, &mut a);

        group.bench_function(format!("forward/n={}", n), |b| {
            b.iter(|| ring.ntt_inplace::<false>(&mut a))
        });
        group.bench_function(format!("backward/n={}", n), |b| {
            b.iter(|| ring.intt_inplace::<false>(&mut a))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ntt);
criterion_main!(benches);
