//! Hashing primitives for the content-addressed file deployer.
//!
//! Provides domain-separated BLAKE3 hashing. Backing stores use it to derive
//! chunk addresses; the deployer uses it to fingerprint original file text.
//!
//! All crypto operations wrap established libraries -- no custom cryptography.

pub mod hasher;

pub use hasher::ContentHasher;
