//! Wall-clock comparison of the APSI strategies against plaintext baselines.
//!
//! For each set size, two random 4-byte sets with a planted overlap are
//! generated, every strategy is timed and checked against the plaintext
//! intersection, and a table is printed.
//!
//! Run with:
//! ```bash
//! cargo run --release --bin bench_apsi -- --sizes 10,100,1000 --workers 1,2,16
//! ```

use apsi_protocol::element::generate_random_set;
use apsi_protocol::oracle::{insecure_intersection, naive_hashing_intersection};
use apsi_protocol::{
    ApsiError, Element4, IntersectionResult, Role, Scheme, SchemeConfig, Strategy,
    BLS12_381,
};
use clap::Parser;
use log::{info, warn};
use rand::rngs::OsRng;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None, next_line_help = true)]
struct BenchArgs {
    /// Set sizes to benchmark, comma separated.
    #[arg(long, value_delimiter = ',', default_values_t = [10, 100, 1000])]
    sizes: Vec<usize>,

    /// Worker counts for the bounded strategies, comma separated.
    /// The set size itself is always added.
    #[arg(long, value_delimiter = ',', default_values_t = [1, 2, 16])]
    workers: Vec<usize>,

    /// Fraction of each set shared with the other.
    #[arg(long, default_value_t = 0.5)]
    overlap: f64,

    /// Repetitions averaged per measurement.
    #[arg(long, default_value_t = 1)]
    runs: u32,

    /// Write the rows as JSON to this path.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Log per-phase timings from the library.
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct Row {
    size: usize,
    method: String,
    mean_ms: f64,
    found: usize,
    expected: usize,
    correct: bool,
}

struct Sets {
    client: Vec<Element4>,
    server: Vec<Element4>,
}

/// Two sets of about `size` elements sharing `round(size * overlap)`.
fn planted_sets(size: usize, overlap: f64) -> Sets {
    let mut rng = OsRng;
    let shared = ((size as f64) * overlap.clamp(0.0, 1.0)).round() as usize;

    let client = generate_random_set::<4, _>(size, &mut rng);
    let taken: HashSet<Element4> = client.iter().copied().collect();
    let mut server: Vec<Element4> = client.iter().take(shared).copied().collect();
    server.extend(
        generate_random_set::<4, _>(size - shared.min(client.len()), &mut rng)
            .into_iter()
            .filter(|element| !taken.contains(element)),
    );
    Sets { client, server }
}

fn mean(total: Duration, runs: u32) -> f64 {
    total.as_secs_f64() * 1000.0 / f64::from(runs)
}

/// Time `f` over `runs` repetitions, keeping the last output.
fn timed<T, E>(runs: u32, mut f: impl FnMut() -> Result<T, E>) -> Result<(f64, T), E> {
    let runs = runs.max(1);
    let started = Instant::now();
    let mut value = f()?;
    for _ in 1..runs {
        value = f()?;
    }
    Ok((mean(started.elapsed(), runs), value))
}

fn strategies_for(size: usize, workers: &[usize]) -> Vec<Strategy> {
    let mut counts: Vec<usize> = workers.iter().copied().filter(|w| *w > 0).collect();
    if size > 0 && !counts.contains(&size) {
        counts.push(size);
    }

    let mut strategies = vec![Strategy::Sequential, Strategy::Unbounded];
    for count in counts {
        strategies.extend(Strategy::bounded(count));
    }
    strategies
}

fn bench_size(
    args: &BenchArgs,
    config: SchemeConfig,
    size: usize,
) -> Result<Vec<Row>, Box<dyn std::error::Error>> {
    let sets = planted_sets(size, args.overlap);
    let mut rows = Vec::new();

    let (setup_ms, scheme) = timed(args.runs, || Scheme::setup(config))?;
    let (ms, expected) = timed(args.runs, || {
        Ok::<_, ApsiError>(insecure_intersection(&sets.client, &sets.server))
    })?;
    let mut push = |method: String, ms: f64, found: usize, wanted: usize, correct: bool| {
        rows.push(Row {
            size,
            method,
            mean_ms: ms,
            found,
            expected: wanted,
            correct,
        });
    };
    let check = |found: &[Element4]| IntersectionResult::new(found.to_vec()).matches(&expected);
    push("setup".to_string(), setup_ms, 0, 0, true);
    push("oracle".to_string(), ms, expected.len(), expected.len(), true);

    let (ms, naive) = timed(args.runs, || {
        Ok::<_, ApsiError>(naive_hashing_intersection(&sets.client, &sets.server))
    })?;
    push("naive_hashing".to_string(), ms, naive.len(), expected.len(), check(&naive));

    let (ms, client_sigs) = timed(args.runs, || scheme.sign_set(&sets.client, Role::Client))?;
    let (found, wanted) = (client_sigs.len(), sets.client.len());
    push("sign_client".to_string(), ms, found, wanted, found == wanted);
    let (ms, server_sigs) = timed(args.runs, || scheme.sign_set(&sets.server, Role::Server))?;
    let (found, wanted) = (server_sigs.len(), sets.server.len());
    push("sign_server".to_string(), ms, found, wanted, found == wanted);

    for strategy in strategies_for(size, &args.workers) {
        let (ms, result) = timed(args.runs, || {
            scheme.interaction_with(
                strategy,
                &sets.client,
                &client_sigs,
                &sets.server,
                &server_sigs,
            )
        })?;
        let correct = check(&result.elements);
        push(strategy.to_string(), ms, result.len(), expected.len(), correct);
    }

    let (ms, precomputed) = timed(args.runs, || {
        scheme.precompute_server(&sets.server, &server_sigs)
    })?;
    let (found, wanted) = (precomputed.len(), sets.server.len());
    push("precompute_offline".to_string(), ms, found, wanted, found == wanted);
    let (ms, result) = timed(args.runs, || {
        scheme.online_interaction(&sets.client, &client_sigs, &precomputed)
    })?;
    let correct = check(&result.elements);
    push("precomputed_online".to_string(), ms, result.len(), expected.len(), correct);

    info!(
        "size {}: {} shared of {} client elements",
        size,
        expected.len(),
        sets.client.len()
    );
    Ok(rows)
}

fn print_table(rows: &[Row]) {
    println!(
        "{:>8}  {:<20} {:>12} {:>8} {:>8}  {}",
        "size", "method", "mean (ms)", "found", "expected", "check"
    );
    for row in rows {
        println!(
            "{:>8}  {:<20} {:>12.3} {:>8} {:>8}  {}",
            row.size,
            row.method,
            row.mean_ms,
            row.found,
            row.expected,
            if row.correct { "ok" } else { "MISMATCH" }
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let args = BenchArgs::parse();

    let config = SchemeConfig::default().with_verbose(args.verbose);
    info!("benchmarking on {}", BLS12_381.name);

    let mut rows = Vec::new();
    for size in &args.sizes {
        rows.extend(bench_size(&args, config, *size)?);
    }
    print_table(&rows);

    if let Some(path) = &args.json {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &rows)?;
        info!("wrote {} rows to {}", rows.len(), path.display());
    }

    let failures = rows.iter().filter(|row| !row.correct).count();
    if failures > 0 {
        warn!("{} measurements disagreed with the oracle", failures);
        return Err(format!("{} measurements disagreed with the oracle", failures).into());
    }
    Ok(())
}
