//! Joux three-party one-round key exchange on BLS12-381.
//!
//! Each party publishes `a·P1` and `a·P2` and derives `e(P1, P2)^{abc}` from
//! the other two parties' points and its own scalar. Setup and online times
//! are averaged over `--runs` exchanges.
//!
//! Run with:
//! ```bash
//! cargo run --release --bin joux -- --runs 100
//! ```

use apsi_protocol::crypto::{fingerprint, Gt};
use apsi_protocol::{SecurityLevel, BLS12_381};
use ark_bls12_381::{Bls12_381, Fr, G1Affine, G1Projective, G2Affine, G2Projective};
use ark_ec::pairing::Pairing;
use ark_ec::CurveGroup;
use ark_std::UniformRand;
use clap::Parser;
use log::{debug, info};
use rand::rngs::OsRng;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None, next_line_help = true)]
struct JouxArgs {
    /// Number of exchanges to average over.
    #[arg(long, default_value_t = 100)]
    runs: u32,

    /// Print every derived key.
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

/// A party's published points.
struct Published {
    g1: G1Affine,
    g2: G2Affine,
}

struct Party {
    secret: Fr,
    published: Published,
}

impl Party {
    fn new(p1: &G1Affine, p2: &G2Affine, rng: &mut OsRng) -> Self {
        let secret = Fr::rand(rng);
        Self {
            secret,
            published: Published {
                g1: (*p1 * secret).into_affine(),
                g2: (*p2 * secret).into_affine(),
            },
        }
    }

    /// `e(left·P1, right·P2)^secret`
    fn derive(&self, left: &Published, right: &Published) -> Gt {
        Bls12_381::pairing(left.g1, right.g2) * self.secret
    }
}

struct Exchange {
    setup: Duration,
    online: Duration,
    keys: [Gt; 3],
}

fn exchange(rng: &mut OsRng) -> Result<Exchange, Box<dyn std::error::Error>> {
    let started = Instant::now();
    BLS12_381.check(&SecurityLevel::default())?;
    let setup = started.elapsed();

    let started = Instant::now();
    let p1 = G1Projective::rand(rng).into_affine();
    let p2 = G2Projective::rand(rng).into_affine();

    let a = Party::new(&p1, &p2, rng);
    let b = Party::new(&p1, &p2, rng);
    let c = Party::new(&p1, &p2, rng);

    let keys = [
        a.derive(&b.published, &c.published),
        b.derive(&c.published, &a.published),
        c.derive(&a.published, &b.published),
    ];
    let online = started.elapsed();

    Ok(Exchange {
        setup,
        online,
        keys,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let args = JouxArgs::parse();
    let runs = args.runs.max(1);

    let mut rng = OsRng;
    let mut total_setup = Duration::ZERO;
    let mut total_online = Duration::ZERO;
    let mut mismatches = 0u32;

    for run in 0..runs {
        let result = exchange(&mut rng)?;
        total_setup += result.setup;
        total_online += result.online;

        let [key_a, key_b, key_c] = result.keys;
        if key_a != key_b || key_b != key_c {
            mismatches += 1;
        }
        if args.verbose {
            for (party, key) in ["a", "b", "c"].iter().zip(&result.keys) {
                let digest = fingerprint(key)?;
                println!("run {} key {}: {}", run, party, hex::encode(digest.as_bytes()));
            }
        }
        debug!("run {} online {:?}", run, result.online);
    }

    info!("{} exchanges on {}", runs, BLS12_381.name);
    println!("Done! Average time elapsed:");
    println!("   (setup) {:?}", total_setup / runs);
    println!("  (online) {:?}", total_online / runs);
    println!(
        "Keys match: {}",
        if mismatches == 0 { "yes" } else { "NO" }
    );

    if mismatches > 0 {
        return Err(format!("{} of {} exchanges derived different keys", mismatches, runs).into());
    }
    Ok(())
}
