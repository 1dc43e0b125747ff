// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
//! Known-answer-test log: recording, sealing and verification.
//!
//! Log layout (UTF-8, hex values in lower case):
//!
//! ```text
//! # banner lines
//! == Alice Key Pairs ==        public keys; private keys only as "erased (N bytes)"
//! == Bob Key Pairs ==
//! == Key Exchange ==           ciphertext, salt, transcript, raw-secret commitments
//! == Derived Session Keys ==
//! == Signatures ==
//! == Verification ==           Valid / Invalid per signature
//! == Integrity ==
//! sha3_512 = <SHA3-512 of every byte above this line>
//! ```
//!
//! The integrity line is written only for accepted runs. A log without it is
//! the remains of a rejected or interrupted run and must not be used.

use std::fmt::Display;
use std::io::{self, Write};

use sha3::{Digest, Sha3_512};
use tracing::{debug, info};

use crate::error::{HandshakeError, Party, Verdict};
use crate::handshake::{Handshake, HandshakeOutcome};
use crate::kdf::{self, DIGEST_LEN};
use crate::kem::Kem;
use crate::signatures::SignatureScheme;

/// Label of the integrity line.
pub const DIGEST_LABEL: &str = "sha3_512";

const TITLE: &str = "Hybrid Post-Quantum Handshake Known-Answer Test";

#[derive(Debug, thiserror::Error)]
pub enum KatError {
    #[error("KAT I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("log has no integrity line")]
    MissingIntegrity,

    #[error("malformed integrity line: {0}")]
    MalformedDigest(String),

    #[error("integrity digest mismatch: recorded {recorded}, computed {computed}")]
    DigestMismatch { recorded: String, computed: String },

    #[error("log is not valid UTF-8")]
    NotUtf8,

    #[error("{party}'s signature is not recorded as Valid")]
    NotVerified { party: Party },
}

/// Streams log text to a sink while hashing exactly the bytes written.
pub struct KatRecorder<W: Write> {
    sink: W,
    hasher: Sha3_512,
    written: usize,
}

impl<W: Write> KatRecorder<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            hasher: Sha3_512::new(),
            written: 0,
        }
    }

    fn emit(&mut self, text: &str) -> io::Result<()> {
        self.sink.write_all(text.as_bytes())?;
        self.hasher.update(text.as_bytes());
        self.written += text.len();
        Ok(())
    }

    pub fn comment(&mut self, text: &str) -> io::Result<()> {
        self.emit(&format!("# {text}\n"))
    }

    pub fn section(&mut self, title: &str) -> io::Result<()> {
        self.emit(&format!("\n== {title} ==\n"))
    }

    pub fn hex_field(&mut self, label: &str, bytes: &[u8]) -> io::Result<()> {
        self.emit(&format!("{label} = {}\n", hex::encode(bytes)))
    }

    pub fn text_field(&mut self, label: &str, value: impl Display) -> io::Result<()> {
        self.emit(&format!("{label} = {value}\n"))
    }

    /// Bytes written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }

    /// Write the integrity section and return the sink with the digest.
    pub fn seal(mut self) -> io::Result<(W, [u8; DIGEST_LEN])> {
        self.section("Integrity")?;
        let digest = kdf::digest_bytes(self.hasher);
        writeln!(self.sink, "{DIGEST_LABEL} = {}", hex::encode(digest))?;
        self.sink.flush()?;
        Ok((self.sink, digest))
    }
}

/// Write every section of `outcome` except the integrity footer.
pub fn record_outcome<W: Write>(
    rec: &mut KatRecorder<W>,
    outcome: &HandshakeOutcome,
) -> io::Result<()> {
    rec.comment(TITLE)?;
    rec.comment(&format!("KEM:        {}", outcome.kem_algorithm))?;
    rec.comment(&format!("Signature:  {}", outcome.signature_algorithm))?;
    rec.comment("KDF:        HKDF-SHA3-512, 64-byte output, info = transcript")?;
    rec.comment("Transcript: SHA3-512(alice_kem_pk || bob_kem_pk || ciphertext || salt)")?;
    rec.comment("Signed:     session_key || salt")?;
    rec.comment("Raw shared secrets and private keys are never recorded.")?;

    for party in [Party::Alice, Party::Bob] {
        let p = outcome.party(party);
        let name = party.label();
        rec.section(&format!("{party} Key Pairs"))?;
        rec.hex_field(&format!("{name}_kem_public_key"), &p.kem_public_key)?;
        rec.text_field(
            &format!("{name}_kem_private_key"),
            format_args!("erased ({} bytes)", p.kem_private_key_len),
        )?;
        rec.hex_field(&format!("{name}_sig_public_key"), &p.sig_public_key)?;
        rec.text_field(
            &format!("{name}_sig_private_key"),
            format_args!("erased ({} bytes)", p.sig_private_key_len),
        )?;
    }

    rec.section("Key Exchange")?;
    rec.hex_field("ciphertext", &outcome.ciphertext)?;
    rec.hex_field("salt", outcome.salt.as_bytes())?;
    rec.hex_field("transcript", outcome.transcript.as_bytes())?;
    rec.hex_field(
        "alice_raw_secret_commitment",
        &outcome.alice.raw_secret_commitment,
    )?;
    rec.hex_field("bob_raw_secret_commitment", &outcome.bob.raw_secret_commitment)?;

    rec.section("Derived Session Keys")?;
    rec.hex_field("alice_session_key", outcome.alice.session_key.as_bytes())?;
    rec.hex_field("bob_session_key", outcome.bob.session_key.as_bytes())?;

    rec.section("Signatures")?;
    rec.hex_field("alice_signature", &outcome.alice.signature)?;
    rec.hex_field("bob_signature", &outcome.bob.signature)?;

    rec.section("Verification")?;
    rec.text_field("alice_verification", outcome.alice.verdict)?;
    rec.text_field("bob_verification", outcome.bob.verdict)?;

    Ok(())
}

/// Result of a sealed KAT run.
pub struct KatReport<W> {
    pub sink: W,
    pub digest: [u8; DIGEST_LEN],
    pub outcome: HandshakeOutcome,
}

impl<W> KatReport<W> {
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

/// Run `handshake`, log every artifact to `sink`, and seal the log if the
/// run is accepted.
///
/// On rejection the sections written so far stay in the sink without an
/// integrity line, and the acceptance error is returned.
pub fn generate_kat<K, S, W>(
    handshake: Handshake<'_, K, S>,
    sink: W,
) -> Result<KatReport<W>, KatError>
where
    K: Kem + ?Sized,
    S: SignatureScheme + ?Sized,
    W: Write,
{
    let outcome = handshake.execute()?;

    let mut rec = KatRecorder::new(sink);
    record_outcome(&mut rec, &outcome)?;
    rec.flush()?;
    debug!(bytes = rec.written(), "recorded handshake artifacts");

    outcome.accept()?;

    let (sink, digest) = rec.seal()?;
    info!(digest = %hex::encode(digest), "sealed KAT log");
    Ok(KatReport {
        sink,
        digest,
        outcome,
    })
}

/// Check a sealed log: the integrity line must be last, must match the
/// SHA3-512 of everything before it, and both signatures must read `Valid`.
pub fn verify_kat(log: &[u8]) -> Result<[u8; DIGEST_LEN], KatError> {
    let marker = format!("\n{DIGEST_LABEL} = ");
    let start = find_last(log, marker.as_bytes())
        .map(|i| i + 1)
        .ok_or(KatError::MissingIntegrity)?;
    let (body, footer) = log.split_at(start);

    let footer = std::str::from_utf8(footer).map_err(|_| KatError::NotUtf8)?;
    let recorded_hex = footer
        .strip_prefix(&marker[1..])
        .and_then(|rest| rest.strip_suffix('\n'))
        .ok_or_else(|| KatError::MalformedDigest(footer.trim_end().to_string()))?;
    if recorded_hex.len() != DIGEST_LEN * 2 {
        return Err(KatError::MalformedDigest(recorded_hex.to_string()));
    }
    let recorded = hex::decode(recorded_hex)
        .map_err(|e| KatError::MalformedDigest(format!("{recorded_hex}: {e}")))?;

    let mut hasher = Sha3_512::new();
    hasher.update(body);
    let computed = kdf::digest_bytes(hasher);
    if recorded != computed {
        return Err(KatError::DigestMismatch {
            recorded: recorded_hex.to_string(),
            computed: hex::encode(computed),
        });
    }

    let body = std::str::from_utf8(body).map_err(|_| KatError::NotUtf8)?;
    for party in [Party::Alice, Party::Bob] {
        let expected = format!("{}_verification = {}", party.label(), Verdict::Valid);
        if !body.lines().any(|line| line == expected) {
            return Err(KatError::NotVerified { party });
        }
    }

    Ok(computed)
}

fn find_last(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}
