//! Framing and morphing benchmarks.
//!
//! Measures the per-frame costs: AEAD seal/open at a typical morphed frame
//! size, session-key derivation, padding, and profile sampling.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use reflex::crypto::{derive_session_key, Aead, AeadKey, EphemeralSecret, Nonce, PublicKey};
use reflex::obfuscation::{add_padding, ProfileRegistry};

fn bench_x25519_keygen(c: &mut Criterion) {
    c.bench_function("x25519_keygen", |b| {
        b.iter(|| {
            let secret = EphemeralSecret::random();
            black_box(PublicKey::from(&secret))
        })
    });
}

fn bench_session_key_derive(c: &mut Criterion) {
    let client = EphemeralSecret::random();
    let server = EphemeralSecret::random();
    let server_public = PublicKey::from(&server);
    let shared = client.diffie_hellman(&server_public);
    let nonce = [0x42u8; 16];

    c.bench_function("session_key_derive", |b| {
        b.iter(|| black_box(derive_session_key(&shared, &nonce)))
    });
}

fn bench_frame_seal(c: &mut Criterion) {
    let aead = Aead::new(&AeadKey::from_bytes([0x42u8; 32]));
    let nonce = Nonce::from_counter(0);
    let plaintext = vec![0u8; 1400]; // YouTube profile's hottest bucket

    let mut group = c.benchmark_group("frame_seal");
    group.throughput(Throughput::Bytes(1400));
    group.bench_function("1400_bytes", |b| {
        b.iter(|| black_box(aead.encrypt(&nonce, &plaintext, b"").unwrap()))
    });
    group.finish();
}

fn bench_frame_open(c: &mut Criterion) {
    let aead = Aead::new(&AeadKey::from_bytes([0x42u8; 32]));
    let nonce = Nonce::from_counter(0);
    let plaintext = vec![0u8; 1400];
    let sealed = aead.encrypt(&nonce, &plaintext, b"").unwrap();

    let mut group = c.benchmark_group("frame_open");
    group.throughput(Throughput::Bytes(1400));
    group.bench_function("1400_bytes", |b| {
        b.iter(|| black_box(aead.decrypt(&nonce, &sealed, b"").unwrap()))
    });
    group.finish();
}

fn bench_add_padding(c: &mut Criterion) {
    let payload = vec![0u8; 200];

    c.bench_function("add_padding_200_to_1400", |b| {
        b.iter(|| black_box(add_padding(&payload, 1400)))
    });
}

fn bench_profile_sampling(c: &mut Criterion) {
    let registry = ProfileRegistry::builtin();
    let profile = registry.get("http2-api").unwrap();

    c.bench_function("profile_sample_size_and_delay", |b| {
        b.iter(|| {
            black_box(profile.packet_size());
            black_box(profile.delay())
        })
    });
}

criterion_group!(
    benches,
    bench_x25519_keygen,
    bench_session_key_derive,
    bench_frame_seal,
    bench_frame_open,
    bench_add_padding,
    bench_profile_sampling
);
criterion_main!(benches);
