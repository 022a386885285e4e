//! In-memory example of an APSI run.
//!
//! Both parties live in this process: one scheme is set up, each party's set
//! is authorized, and the intersection is computed under every work
//! distribution strategy.
//!
//! Run with:
//! ```bash
//! cargo run --bin in_memory
//! ```

use apsi_protocol::element::generate_random_set;
use apsi_protocol::oracle::insecure_intersection;
use apsi_protocol::{Element2, Role, Scheme, SchemeConfig, Strategy};
use rand::rngs::OsRng;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    println!("=== APSI In-Memory Example ===\n");

    let client: Vec<Element2> = [1u64, 2, 3, 0x0a0b].into_iter().map(Element2::from_u64).collect();
    let server: Vec<Element2> = [2u64, 3, 4, 0x0c0d].into_iter().map(Element2::from_u64).collect();

    println!("Client elements ({}):", client.len());
    for (i, element) in client.iter().enumerate() {
        println!("  {}: {}", i + 1, element);
    }
    println!("\nServer elements ({}):", server.len());
    for (i, element) in server.iter().enumerate() {
        println!("  {}: {}", i + 1, element);
    }

    // === Phase 1: Setup ===
    println!("\n--- Phase 1: Setup ---");
    let scheme = Scheme::setup(SchemeConfig::default().with_verbose(true))?;
    let params = scheme.parameters();
    println!(
        "Group {} ({}-bit order, embedding degree {})",
        params.group.name, params.group.order_bits, params.group.embedding_degree
    );

    // === Phase 2: Authorization ===
    println!("\n--- Phase 2: Authorize Elements ---");
    let client_sigs = scheme.sign_set(&client, Role::Client)?;
    let server_sigs = scheme.sign_set(&server, Role::Server)?;
    for (element, sig) in client.iter().zip(&client_sigs) {
        let bytes = sig.to_bytes()?;
        println!("  client {} -> {}..", element, hex::encode(&bytes[..8]));
    }
    for (element, sig) in server.iter().zip(&server_sigs) {
        let bytes = sig.to_bytes()?;
        println!("  server {} -> {}..", element, hex::encode(&bytes[..8]));
    }

    // === Phase 3: Interaction ===
    println!("\n--- Phase 3: Interaction ---");
    let expected = insecure_intersection(&client, &server);

    let mut strategies = vec![Strategy::Sequential, Strategy::Unbounded];
    strategies.extend(Strategy::bounded(2));
    for strategy in strategies {
        let result =
            scheme.interaction_with(strategy, &client, &client_sigs, &server, &server_sigs)?;
        let found: Vec<String> = result.sorted().iter().map(ToString::to_string).collect();
        println!(
            "  {:<14} [{}] {}",
            strategy.to_string(),
            found.join(", "),
            if result.matches(&expected) { "ok" } else { "MISMATCH" }
        );
    }

    let result = scheme.precomputed_interaction(&client, &client_sigs, &server, &server_sigs)?;
    println!(
        "  {:<14} {} elements {}",
        "precomputed",
        result.len(),
        if result.matches(&expected) { "ok" } else { "MISMATCH" }
    );

    // === Additional example: random sets ===
    println!("\n\n=== Random Sets Example ===\n");

    let mut rng = OsRng;
    let mut client = generate_random_set::<2, _>(100, &mut rng);
    let server_only = generate_random_set::<2, _>(100, &mut rng);
    let mut server: Vec<Element2> = server_only
        .into_iter()
        .filter(|element| !client.contains(element))
        .collect();
    // 10 planted common elements
    let common: Vec<Element2> = generate_random_set::<2, _>(200, &mut rng)
        .into_iter()
        .filter(|element| !client.contains(element) && !server.contains(element))
        .take(10)
        .collect();
    client.extend_from_slice(&common);
    server.extend_from_slice(&common);
    println!("Client: {} elements, Server: {} elements", client.len(), server.len());

    let client_sigs = scheme.sign_set(&client, Role::Client)?;
    let server_sigs = scheme.sign_set(&server, Role::Server)?;
    let result = scheme.atomic_interaction(&client, &client_sigs, &server, &server_sigs, 4)?;

    println!("\nIntersection size: {} (expected: {})", result.len(), common.len());
    println!(
        "Verification: {}",
        if result.matches(&common) { "PASSED" } else { "FAILED" }
    );

    Ok(())
}
