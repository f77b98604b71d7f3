//! # Envelope Demo
//!
//! Seals one envelope for a single recipient and one for a small group,
//! sends both through JSON, and opens them on the other side.
//!
//! ## Run
//!
//! ```bash
//! RUST_LOG=umbra_envelope=debug cargo run --example envelope_demo
//! ```

use tracing_subscriber::EnvFilter;
use umbra_envelope::{
    DualKeyIdentity, Envelope, EnvelopeCrypto, Error, PayloadType, SealRequest,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Umbra Envelope Demo ===\n");

    let crypto = EnvelopeCrypto::default();

    // Step 1: Identities
    println!("Step 1: Creating identities...");
    let alice = DualKeyIdentity::generate();
    let bob = DualKeyIdentity::generate();
    let carol = DualKeyIdentity::generate();
    let dave = DualKeyIdentity::generate();

    for (name, id) in [("Alice", &alice), ("Bob", &bob), ("Carol", &carol), ("Dave", &dave)] {
        println!("  {:<6} {}", name, id.did());
        println!("         encryption fingerprint {}...", &id.encryption_fingerprint()[..16]);
    }
    println!();

    // Step 2: Single recipient
    println!("Step 2: Alice seals \"hello\" for Bob...");
    let request = SealRequest::new(PayloadType::Chat, b"hello").to(bob.public_identity());
    let envelope = crypto.seal(&alice, request).expect("Failed to seal");

    let json = envelope.to_json().expect("Failed to serialize");
    println!("  Wire JSON ({} bytes):", json.len());
    println!("  {}", json);
    println!();

    let received = Envelope::from_json(&json).expect("Failed to parse");
    println!("  Signature valid: {}", crypto.verify(&received));
    let plaintext = crypto.open(&received, &bob).expect("Bob failed to open");
    println!("  Bob reads: \"{}\"", String::from_utf8_lossy(&plaintext));

    match crypto.open(&received, &carol) {
        Err(e) => println!("  Carol cannot read it: {} (code {})", e, e.code()),
        Ok(_) => println!("  [FAILED] Carol opened Bob's envelope!"),
    }
    println!();

    // Step 3: Multiple recipients
    println!("Step 3: Alice seals a post for Bob, cc Carol...");
    let request = SealRequest::new(PayloadType::Post, b"meeting moved to 3pm")
        .to(bob.public_identity())
        .cc(carol.public_identity());
    let envelope = crypto.seal(&alice, request).expect("Failed to seal");

    if let Some(keys) = envelope.body().key_material.recipient_keys() {
        println!("  recipientKeys has {} entries", keys.len());
    }
    for (name, id) in [("Bob", &bob), ("Carol", &carol)] {
        let plaintext = crypto.open(&envelope, id).expect("Recipient failed to open");
        println!("  {} reads: \"{}\"", name, String::from_utf8_lossy(&plaintext));
    }
    match crypto.open(&envelope, &dave) {
        Err(Error::NotARecipient) => println!("  Dave is not a recipient"),
        other => println!("  [FAILED] unexpected result for Dave: {:?}", other.map(|_| ())),
    }
    println!();

    // Step 4: Tampering
    println!("Step 4: Flipping one ciphertext byte in transit...");
    let (mut body, signature) = envelope.into_parts();
    body.encrypted_payload[0] ^= 0x01;
    let tampered = Envelope::from_parts(body, signature);
    println!("  Signature valid: {}", crypto.verify(&tampered));
    match crypto.open(&tampered, &bob) {
        Err(e) => println!("  Bob rejects it: {}", e),
        Ok(_) => println!("  [FAILED] tampered envelope opened!"),
    }

    println!("\n=== Demo Complete ===");
}
