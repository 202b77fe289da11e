use criterion::{black_box, criterion_group, criterion_main, Criterion};

use streamcount::{CardinalitySketch, HyperLogLog, HyperLogLogPlus, MulHash};

fn generate_strings(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("- {} - {} -", i, i.wrapping_mul(2654435761)))
        .collect()
}

fn bench_add(c: &mut Criterion) {
    let workload = generate_strings(2000);

    macro_rules! bench_impls {
        ($testname:expr, $impl:ident, $precision:expr) => {
            c.bench_function($testname, |b| {
                b.iter(|| {
                    let mut hll: $impl<String> =
                        $impl::new($precision, MulHash::with_seed(1)).unwrap();

                    for val in &workload {
                        hll.add(val);
                    }
                })
            });
        };
    }

    bench_impls!["hyperloglog_add_p8", HyperLogLog, 8];
    bench_impls!["hyperloglog_add_p14", HyperLogLog, 14];
    bench_impls!["hyperloglog_add_p16", HyperLogLog, 16];

    bench_impls!["hyperloglogplus_add_p8", HyperLogLogPlus, 8];
    bench_impls!["hyperloglogplus_add_p14", HyperLogLogPlus, 14];
    bench_impls!["hyperloglogplus_add_p16", HyperLogLogPlus, 16];
}

fn bench_estimate(c: &mut Criterion) {
    macro_rules! bench_impls {
        ($testname:expr, $impl:ident, $precision:expr, $count:expr) => {
            let workload = generate_strings($count);

            let mut hll: $impl<String> =
                $impl::new($precision, MulHash::with_seed(1)).unwrap();

            for val in &workload {
                hll.add(val);
            }

            c.bench_function($testname, |b| {
                b.iter(|| {
                    let val = hll.estimate();
                    black_box(val);
                })
            });
        };
    }

    bench_impls!["hyperloglog_estimate_p8", HyperLogLog, 8, 20_000];
    bench_impls!["hyperloglog_estimate_p14", HyperLogLog, 14, 100_000];

    bench_impls![
        "hyperloglogplus_estimate_p14_sparse",
        HyperLogLogPlus,
        14,
        2_000
    ];
    bench_impls![
        "hyperloglogplus_estimate_p14_dense",
        HyperLogLogPlus,
        14,
        100_000
    ];
}

criterion_group!(benches, bench_add, bench_estimate);

criterion_main!(benches);
