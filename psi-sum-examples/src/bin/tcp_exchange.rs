//! TCP-based intersection-sum example.
//!
//! This example runs the protocol over a TCP socket with u32-length-prefixed
//! frames carrying the byte-encoded messages. In production the connection
//! MUST be wrapped in TLS.
//!
//! Run the server (the party holding identifiers only):
//! ```bash
//! cargo run --bin tcp_exchange -- server
//! ```
//!
//! Run the client (the party holding values and the decryption key) in
//! another terminal:
//! ```bash
//! cargo run --bin tcp_exchange -- client
//! ```

use num_bigint::BigUint;
use psi_sum_protocol::{
    Client, ClientRoundOne, Context, PaillierPrivateKey, Server, ServerRoundOne, ServerRoundTwo,
};
use std::env;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};

const ADDRESS: &str = "127.0.0.1:7878";

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

/// Write one length-prefixed frame.
fn write_frame(stream: &mut TcpStream, payload: &[u8]) -> std::io::Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "frame too large"))?;
    stream.write_all(&len.to_be_bytes())?;
    stream.write_all(payload)?;
    stream.flush()
}

/// Read one length-prefixed frame.
fn read_frame(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut len_bytes = [0u8; 4];
    stream.read_exact(&mut len_bytes)?;
    let mut payload = vec![0u8; u32::from_be_bytes(len_bytes) as usize];
    stream.read_exact(&mut payload)?;
    Ok(payload)
}

/// Run the server role: listens, sends its encrypted set, answers with the
/// intersection-sum.
fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Intersection-Sum TCP Server ===");
    println!("Listening on {}", ADDRESS);

    let listener = TcpListener::bind(ADDRESS)?;
    println!("Waiting for client connection...");
    let (mut stream, addr) = listener.accept()?;
    println!("Connected to {}", addr);

    let server_ids: Vec<Vec<u8>> = vec![
        b"alice@example.com".to_vec(),
        b"bob@example.com".to_vec(),
        b"carol@example.com".to_vec(),
        b"dave@example.com".to_vec(),
    ];
    println!("\nServer holds {} identifiers", server_ids.len());

    let mut server = Server::new(Context::new(), server_ids)?;

    println!("\n--- Round 1: Sending Encrypted Set ---");
    let round_one = server.encrypt_set()?;
    write_frame(&mut stream, &round_one.to_bytes()?)?;
    println!("Sent {} encrypted identifiers", round_one.len());

    println!("\n--- Round 2: Receiving Client Reply ---");
    let client_round_one = ClientRoundOne::from_bytes(&read_frame(&mut stream)?)?;
    println!(
        "Received {} re-encrypted identifiers and {} encrypted records",
        client_round_one.reencrypted_set.len(),
        client_round_one.encrypted_set.len()
    );

    println!("\n--- Round 3: Computing Intersection-Sum ---");
    let round_two = server.compute_intersection(&client_round_one)?;
    write_frame(&mut stream, &round_two.to_bytes()?)?;

    println!("\n=== Results ===");
    println!("Intersection size: {}", round_two.intersection_size);
    println!("(the encrypted sum is only decryptable by the client)");

    println!("\n✓ Server protocol completed!");
    Ok(())
}

/// Run the client role: connects, replies to the server's set, decrypts the
/// final sum.
fn run_client() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Intersection-Sum TCP Client ===");
    println!("Connecting to {}", ADDRESS);

    let mut stream = TcpStream::connect(ADDRESS)?;
    println!("Connected to server");

    let client_records: Vec<(Vec<u8>, u32)> = vec![
        (b"bob@example.com".to_vec(), 120),
        (b"carol@example.com".to_vec(), 45),
        (b"mallory@example.com".to_vec(), 999),
    ];
    println!("\nClient holds {} records", client_records.len());

    let (elements, values): (Vec<_>, Vec<_>) = client_records
        .into_iter()
        .map(|(id, value)| (id, BigUint::from(value)))
        .unzip();
    let mut client = Client::with_key(Context::new(), elements, values, demo_paillier_key())?;

    println!("\n--- Round 1: Receiving Server Set ---");
    let round_one = ServerRoundOne::from_bytes(&read_frame(&mut stream)?)?;
    println!("Received {} encrypted identifiers", round_one.len());

    println!("\n--- Round 2: Sending Reply ---");
    let client_round_one = client.re_encrypt_set(&round_one)?;
    write_frame(&mut stream, &client_round_one.to_bytes()?)?;
    println!("Sent re-encrypted set and encrypted records");

    println!("\n--- Round 3: Receiving Encrypted Sum ---");
    let round_two = ServerRoundTwo::from_bytes(&read_frame(&mut stream)?)?;
    let (size, sum) = client.decrypt_sum(&round_two)?;

    println!("\n=== Results ===");
    println!("Intersection size: {}", size);
    println!("Intersection sum:  {}", sum);

    println!("\n✓ Client protocol completed!");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <server|client>", args[0]);
        eprintln!("\nRun server first: {} server", args[0]);
        eprintln!("Then run client: {} client", args[0]);
        std::process::exit(1);
    }

    match args[1].as_str() {
        "server" => run_server(),
        "client" => run_client(),
        _ => {
            eprintln!("Unknown mode: {}", args[1]);
            eprintln!("Usage: {} <server|client>", args[0]);
            std::process::exit(1);
        }
    }
}
