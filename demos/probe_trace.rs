use clap::Parser;
use clap::ValueEnum;
use probe_verify::IdentityHashBuilder;
use probe_verify::InstrumentedKey;
use probe_verify::LinearProbe;
use probe_verify::OpenAddressingTable;
use probe_verify::ProbeStep;
use probe_verify::ProbingTable;
use probe_verify::QuadraticProbe;
use probe_verify::TableVerifier;
use tracing::Level;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Strategy {
    Linear,
    Quadratic,
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'b', long = "buckets", default_value_t = 8)]
    buckets: usize,

    #[arg(short = 's', long = "strategy", value_enum, default_value_t = Strategy::Linear)]
    strategy: Strategy,

    /// Log every observed comparison.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Keys to insert, in order. Key `k` starts probing at bucket `k % buckets`.
    #[arg(default_values_t = [1u64, 9, 17, 2, 10])]
    keys: Vec<u64>,
}

fn trace<P: ProbeStep>(buckets: usize, keys: &[u64]) {
    let table: ProbingTable<InstrumentedKey<u64>, u64, P, IdentityHashBuilder> =
        ProbingTable::with_buckets(buckets);
    let mut verifier = match TableVerifier::new(table) {
        Ok(verifier) => verifier,
        Err(error) => {
            eprintln!("Table layout rejected: {error}");
            return;
        }
    };

    for &key in keys {
        let (inserted, probes) = verifier.trace_insert(key, key);
        println!(
            "insert {:>4} -> {:<5} probes {:?}",
            key,
            if inserted { "ok" } else { "fail" },
            probes
        );
    }

    let table = verifier.table();
    println!(
        "Inserted {} of {} keys, {} buckets",
        table.element_count(),
        keys.len(),
        table.bucket_count()
    );
    println!("{table:#?}");
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            Level::TRACE
        } else {
            Level::INFO
        })
        .init();

    println!(
        "Tracing {} inserts into {} buckets with {:?} probing",
        args.keys.len(),
        args.buckets,
        args.strategy
    );

    match args.strategy {
        Strategy::Linear => trace::<LinearProbe>(args.buckets, &args.keys),
        Strategy::Quadratic => trace::<QuadraticProbe>(args.buckets, &args.keys),
    }
}
