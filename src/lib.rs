#[macro_use]
mod macros;

pub mod aead;
pub mod alert;
pub mod application_stream;
mod cipher;
mod cipher_suite;
pub mod client;
pub mod dh;
mod error;
pub mod extensions;
mod extensions_util;
pub mod handshake;
mod handshake_executor;
pub mod handshake_summary;
pub mod hasher;
pub mod hkdf;
pub mod key_schedule;
pub mod keylog;
pub mod options;
mod parsing;
pub mod record;
mod record_stream;
pub mod server;
pub mod session;
pub mod signatures;
pub mod transcript;
pub mod transport;

pub use application_stream::ApplicationStream;
pub use cipher_suite::CipherSuite;
pub use client::Client;
pub use error::{Error, Result};
pub use handshake_summary::HandshakeSummary;
pub use options::*;
pub use server::Server;
pub use transport::Transport;

// Big-endian network order

// https://tools.ietf.org/html/rfc8446
