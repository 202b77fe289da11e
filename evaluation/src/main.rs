use std::collections::HashSet;

use clap::{App, Arg, ArgMatches};
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

use streamcount::{CardinalitySketch, HyperLogLog, HyperLogLogPlus, MulHash};

const CHARS: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-";

// Generates a reproducible synthetic stream of random strings.
struct StreamGen {
    rng: StdRng,
}

impl StreamGen {
    fn new(seed: u64) -> StreamGen {
        StreamGen {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn make_str(&mut self) -> String {
        let len = self.rng.gen_range(1, 31);

        (0..len)
            .map(|_| CHARS[self.rng.gen_range(0, CHARS.len())] as char)
            .collect()
    }

    fn make_stream(&mut self, size: usize) -> Vec<String> {
        (0..size).map(|_| self.make_str()).collect()
    }
}

// Returns prefixes of the stream at `step` percent increments up to 100%.
fn split_stream(stream: &[String], step: usize) -> Vec<&[String]> {
    (1..=(100 / step))
        .map(|p| &stream[..stream.len() * p * step / 100])
        .collect()
}

// Counts distinct strings exactly, by brute-force deduplication.
fn count_unique_exact(strings: &[String]) -> usize {
    strings.iter().collect::<HashSet<_>>().len()
}

fn relative_error(estimate: f64, exact: usize) -> f64 {
    (estimate - exact as f64).abs() / exact as f64 * 100.0
}

// Reports how evenly the hash spreads a sample stream over buckets.
fn uniformity(args: &ArgMatches) {
    let (count, buckets, seed) = (
        args.value_of("count").unwrap().parse::<usize>().unwrap(),
        args.value_of("buckets").unwrap().parse::<usize>().unwrap(),
        args.value_of("seed").unwrap().parse::<u64>().unwrap(),
    );

    let stream = StreamGen::new(seed).make_stream(count);

    let hasher = MulHash::new();

    let mut counts = vec![0usize; buckets];

    for value in &stream {
        counts[hasher.hash(value) as usize % buckets] += 1;
    }

    let mean = count as f64 / buckets as f64;

    let variance = counts
        .iter()
        .map(|&c| (c as f64 - mean) * (c as f64 - mean))
        .sum::<f64>() /
        buckets as f64;

    let std_dev = variance.sqrt();

    println!("mean_per_bucket,std_dev,relative_pct,expected_uniform_pct");
    println!(
        "{},{},{},{}",
        mean,
        std_dev,
        std_dev / mean * 100.0,
        100.0 / (buckets as f64).sqrt()
    );
}

// Tracks estimation error over growing prefixes of one stream, reusing a
// single sketch through reset().
fn accuracy(args: &ArgMatches) {
    let (count, precision, seed) = (
        args.value_of("count").unwrap().parse::<usize>().unwrap(),
        args.value_of("precision").unwrap().parse::<u8>().unwrap(),
        args.value_of("seed").unwrap().parse::<u64>().unwrap(),
    );

    let stream = StreamGen::new(seed).make_stream(count);
    let parts = split_stream(&stream, 10);

    let mut hll: HyperLogLog<String> =
        HyperLogLog::new(precision, MulHash::new()).unwrap();

    println!("percent,exact,estimate,error_pct");

    for (i, part) in parts.iter().enumerate() {
        let exact = count_unique_exact(part);

        hll.reset();

        for value in *part {
            hll.add(value);
        }

        let estimate = hll.estimate();

        println!(
            "{},{},{},{}",
            (i + 1) * 10,
            exact,
            estimate,
            relative_error(estimate, exact)
        );
    }
}

// Repeats estimation over independently drawn hash functions and reports
// the spread per prefix.
fn stats(args: &ArgMatches) {
    let (count, runs, precision, seed) = (
        args.value_of("count").unwrap().parse::<usize>().unwrap(),
        args.value_of("runs").unwrap().parse::<usize>().unwrap(),
        args.value_of("precision").unwrap().parse::<u8>().unwrap(),
        args.value_of("seed").unwrap().parse::<u64>().unwrap(),
    );

    let stream = StreamGen::new(seed).make_stream(count);
    let parts = split_stream(&stream, 10);

    println!("percent,mean,std_dev,mean_minus_dev,mean_plus_dev");

    for (i, part) in parts.iter().enumerate() {
        let estimates: Vec<f64> = (0..runs)
            .into_par_iter()
            .map(|_| {
                let mut hll: HyperLogLog<String> =
                    HyperLogLog::new(precision, MulHash::new()).unwrap();

                for value in *part {
                    hll.add(value);
                }

                hll.estimate()
            })
            .collect();

        let mean = estimates.iter().sum::<f64>() / runs as f64;

        let variance = estimates
            .iter()
            .map(|est| (est - mean) * (est - mean))
            .sum::<f64>() /
            runs as f64;

        let std_dev = variance.sqrt();

        println!(
            "{},{},{},{},{}",
            (i + 1) * 10,
            mean,
            std_dev,
            mean - std_dev,
            mean + std_dev
        );
    }
}

// Sweeps the precision parameter and compares the observed average error
// against the theoretical bounds.
fn sweep(args: &ArgMatches) {
    let (count, seed) = (
        args.value_of("count").unwrap().parse::<usize>().unwrap(),
        args.value_of("seed").unwrap().parse::<u64>().unwrap(),
    );

    let stream = StreamGen::new(seed).make_stream(count);
    let parts = split_stream(&stream, 20);

    println!("bits,avg_error_pct,memory,theoretical_low_pct,theoretical_high_pct");

    for bits in (6u8..=14).step_by(2) {
        let mut hll: HyperLogLog<String> =
            HyperLogLog::new(bits, MulHash::new()).unwrap();

        let mut total_error = 0.0;

        for part in &parts {
            let exact = count_unique_exact(part);

            hll.reset();

            for value in *part {
                hll.add(value);
            }

            total_error += relative_error(hll.estimate(), exact);
        }

        let m = (1usize << bits) as f64;

        println!(
            "{},{},{},{},{}",
            bits,
            total_error / parts.len() as f64,
            hll.memory_used(),
            1.04 / m.sqrt() * 100.0,
            1.30 / m.sqrt() * 100.0
        );
    }
}

// Runs the dense and hybrid sketches side by side over the same stream.
fn compare(args: &ArgMatches) {
    let (count, precision, seed) = (
        args.value_of("count").unwrap().parse::<usize>().unwrap(),
        args.value_of("precision").unwrap().parse::<u8>().unwrap(),
        args.value_of("seed").unwrap().parse::<u64>().unwrap(),
    );

    let stream = StreamGen::new(seed).make_stream(count);
    let parts = split_stream(&stream, 10);

    let mut basic: HyperLogLog<String> =
        HyperLogLog::new(precision, MulHash::new()).unwrap();
    let mut plus: HyperLogLogPlus<String> =
        HyperLogLogPlus::new(precision, MulHash::new()).unwrap();

    println!(
        "percent,exact,basic_estimate,plus_estimate,\
         basic_error_pct,plus_error_pct,basic_memory,plus_memory"
    );

    for (i, part) in parts.iter().enumerate() {
        let exact = count_unique_exact(part);

        basic.reset();
        plus.reset();

        for value in *part {
            basic.add(value);
            plus.add(value);
        }

        let (basic_est, plus_est) = (basic.estimate(), plus.estimate());

        println!(
            "{},{},{},{},{},{},{},{}",
            (i + 1) * 10,
            exact,
            basic_est,
            plus_est,
            relative_error(basic_est, exact),
            relative_error(plus_est, exact),
            basic.memory_used(),
            plus.memory_used()
        );
    }
}

fn main() {
    let count_arg = |default: &'static str| {
        Arg::with_name("count")
            .short('c')
            .long("count")
            .takes_value(true)
            .default_value(default)
    };

    let seed_arg = Arg::with_name("seed")
        .short('s')
        .long("seed")
        .takes_value(true)
        .default_value("123");

    let precision_arg = Arg::with_name("precision")
        .short('p')
        .long("precision")
        .takes_value(true)
        .default_value("10");

    let matches: ArgMatches = App::new("evl")
        .about("run cardinality sketch evaluation experiments")
        .arg(
            Arg::with_name("jobs")
                .short('j')
                .long("jobs")
                .takes_value(true),
        )
        .subcommand(
            App::new("uniformity")
                .about("report how evenly the hash fills buckets.")
                .arg(count_arg("10000"))
                .arg(seed_arg.clone())
                .arg(
                    Arg::with_name("buckets")
                        .short('b')
                        .long("buckets")
                        .takes_value(true)
                        .default_value("100"),
                ),
        )
        .subcommand(
            App::new("accuracy")
                .about("report estimation error over stream prefixes.")
                .arg(count_arg("100000"))
                .arg(seed_arg.clone())
                .arg(precision_arg.clone()),
        )
        .subcommand(
            App::new("stats")
                .about("report estimate spread over repeated runs.")
                .arg(count_arg("80000"))
                .arg(seed_arg.clone())
                .arg(precision_arg.clone())
                .arg(
                    Arg::with_name("runs")
                        .short('r')
                        .long("runs")
                        .takes_value(true)
                        .default_value("30"),
                ),
        )
        .subcommand(
            App::new("sweep")
                .about("sweep precision and compare against theory.")
                .arg(count_arg("50000"))
                .arg(seed_arg.clone()),
        )
        .subcommand(
            App::new("compare")
                .about("run dense and hybrid sketches side by side.")
                .arg(count_arg("80000"))
                .arg(seed_arg.clone())
                .arg(precision_arg.clone()),
        )
        .get_matches();

    let jobs = matches
        .value_of("jobs")
        .unwrap_or("1")
        .parse::<usize>()
        .unwrap();

    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build_global()
        .unwrap();

    match matches.subcommand() {
        ("uniformity", Some(sub_matches)) => uniformity(sub_matches),
        ("accuracy", Some(sub_matches)) => accuracy(sub_matches),
        ("stats", Some(sub_matches)) => stats(sub_matches),
        ("sweep", Some(sub_matches)) => sweep(sub_matches),
        ("compare", Some(sub_matches)) => compare(sub_matches),
        _ => {},
    }
}
