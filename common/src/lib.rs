// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pqkat common: hybrid post-quantum handshake and its known-answer-test log
//
// Cryptographic stack:
//   KEM:        Kyber-1024 / ML-KEM-1024 (FIPS 203)
//   Signatures: Dilithium5 / ML-DSA-87 (FIPS 204), SPHINCS+ fallback (FIPS 205)
//   KDF:        HKDF-SHA3-512 (RFC 5869 + FIPS 202)
//   Digests:    SHA3-512 (transcript, log integrity)
//   RNG:        OsRng

pub mod config;
pub mod error;
pub mod handshake;
pub mod kat;
pub mod kdf;
pub mod kem;
pub mod secret;
pub mod signatures;
pub mod sphincs_fallback;

pub use config::{KatConfig, SignatureAlgorithm};
pub use error::{HandshakeError, Party, Step, Verdict};
pub use handshake::{Handshake, HandshakeOutcome};
pub use kat::{generate_kat, verify_kat, KatError, KatRecorder, KatReport};
pub use kdf::{derive, Salt, SessionKey, Transcript};
pub use kem::{Kem, Kyber1024};
pub use secret::{erase, KeyPair, SecretBuffer};
pub use signatures::{Dilithium5, SignatureScheme};
pub use sphincs_fallback::Sphincs;
