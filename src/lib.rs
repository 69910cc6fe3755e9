//! # REFLEX
//!
//! Inbound side of a traffic-obfuscating proxy protocol. A single listening
//! port carries both REFLEX tunnels and ordinary web traffic: each accepted
//! connection is classified without consuming bytes, then either driven
//! through an implicit handshake into an encrypted, traffic-shaped session,
//! or spliced transparently to a local fallback web server.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     Inbound Handler                      │
//! │   peek-demux → handshake → authenticate → session loop   │
//! │          ↘ (anything else) → fallback relay              │
//! ├──────────────────────────────────────────────────────────┤
//! │  Obfuscation Engine (profile sampling, padding, delays)  │
//! ├──────────────────────────────────────────────────────────┤
//! │  Session Layer (AEAD framing, replay protection)         │
//! ├──────────────────────────────────────────────────────────┤
//! │  Crypto Layer (X25519, ChaCha20-Poly1305, HKDF-SHA256)   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The handshake is wrapped to look like an HTTP API exchange: clients may
//! send either a raw binary packet behind a 4-byte magic or a genuine-looking
//! `POST` with a base64 JSON body; the server always answers with HTTP. An
//! observer probing the port sees a plain web server.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod crypto;
pub mod dispatch;
pub mod error;
pub mod inbound;
pub mod obfuscation;
pub mod session;
pub mod user;

pub use error::{Error, Result};
pub use inbound::Handler;

/// Magic number ("REFX") opening a binary-path handshake.
pub const REFLEX_MAGIC: u32 = 0x5246_584C;

/// Number of bytes peeked (at most) to classify an incoming connection.
pub const MIN_HANDSHAKE_PEEK: usize = 64;

/// Handshake timestamps must lie within this many seconds of server time.
pub const HANDSHAKE_FRESHNESS_SECS: i64 = 300;

/// Maximum on-wire frame body (nonce + ciphertext); bounded by the u16
/// length prefix.
pub const MAX_FRAME_BODY: usize = 65535;
