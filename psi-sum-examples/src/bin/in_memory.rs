//! In-memory example of an intersection-sum protocol run.
//!
//! This example runs both parties within a single process, simulating the
//! three-message exchange between the server and the client without network
//! I/O.
//!
//! Run with:
//! ```bash
//! cargo run --bin in_memory
//! ```

use num_bigint::BigUint;
use psi_sum_protocol::{Client, Context, PaillierPrivateKey, Server};

// Pregenerated 512-bit safe primes so the demo starts instantly. A real
// deployment generates a fresh key per client with `Client::new`.
const DEMO_PRIME_P: &str = "b7007d8c9b959e1293e9a99b5bc543be1ddf67a2c8d78286e3c38a49af380a9b\
                            9e4515299009d94fcd2b8a57f9929820bece16503aebdc9df2136f539a3de37f";
const DEMO_PRIME_Q: &str = "a36dbc822f0903a212503fe5311f88a0f043a7be32512284bb26a7da7311f9f6\
                            a236573a08d51dafc08f8a7a6bd677f76a559ab419975e8890b4c5dd11ab4ed7";

fn demo_paillier_key() -> PaillierPrivateKey {
    PaillierPrivateKey::from_primes(
        BigUint::from_bytes_be(&hex::decode(DEMO_PRIME_P).unwrap()),
        BigUint::from_bytes_be(&hex::decode(DEMO_PRIME_Q).unwrap()),
    )
    .unwrap()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Intersection-Sum In-Memory Example ===\n");

    // The server's private identifiers
    let server_ids: Vec<Vec<u8>> = vec![
        b"alice@example.com".to_vec(),
        b"bob@example.com".to_vec(),
        b"carol@example.com".to_vec(),
        b"dave@example.com".to_vec(),
    ];

    // The client's private identifiers with associated spend values
    let client_records: Vec<(Vec<u8>, u32)> = vec![
        (b"bob@example.com".to_vec(), 120),
        (b"carol@example.com".to_vec(), 45),
        (b"mallory@example.com".to_vec(), 999),
    ];

    println!("Server's identifiers ({}):", server_ids.len());
    for (i, id) in server_ids.iter().enumerate() {
        println!("  {}: {}", i + 1, String::from_utf8_lossy(id));
    }

    println!("\nClient's records ({}):", client_records.len());
    for (i, (id, value)) in client_records.iter().enumerate() {
        println!("  {}: {} -> {}", i + 1, String::from_utf8_lossy(id), value);
    }

    let mut server = Server::new(Context::new(), server_ids)?;
    let (elements, values): (Vec<_>, Vec<_>) = client_records
        .into_iter()
        .map(|(id, value)| (id, BigUint::from(value)))
        .unzip();
    let mut client = Client::with_key(Context::new(), elements, values, demo_paillier_key())?;

    // === Round 1: server encrypts its set ===
    println!("\n--- Round 1: Server Encrypts Its Set ---");
    let round_one = server.encrypt_set()?;
    println!("Server sent {} encrypted identifiers", round_one.len());

    // === Round 2: client re-encrypts and replies ===
    println!("\n--- Round 2: Client Re-Encrypts And Replies ---");
    let client_round_one = client.re_encrypt_set(&round_one)?;
    println!(
        "Client sent {} re-encrypted identifiers and {} encrypted records",
        client_round_one.reencrypted_set.len(),
        client_round_one.encrypted_set.len()
    );

    // === Round 3: server computes the blind intersection-sum ===
    println!("\n--- Round 3: Server Computes The Intersection-Sum ---");
    let round_two = server.compute_intersection(&client_round_one)?;
    println!(
        "Server found {} matches and returned the encrypted sum",
        round_two.intersection_size
    );

    // === Output: client decrypts ===
    let (size, sum) = client.decrypt_sum(&round_two)?;
    println!("\n=== Results ===");
    println!("Intersection size: {}", size);
    println!("Intersection sum:  {}", sum);

    println!("\n✓ Protocol completed!");
    Ok(())
}
