// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Handshake error kinds. Every variant is terminal for the run.

use std::fmt;

use crate::kdf::DerivationError;
use crate::kem::KemError;
use crate::signatures::SignatureError;

/// One of the two handshake participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Alice,
    Bob,
}

impl Party {
    /// Lower-case label used for KAT field names.
    pub fn label(self) -> &'static str {
        match self {
            Party::Alice => "alice",
            Party::Bob => "bob",
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Alice => f.write_str("Alice"),
            Party::Bob => f.write_str("Bob"),
        }
    }
}

/// Handshake steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    KeyGen,
    Encapsulate,
    Decapsulate,
    EraseKemKeys,
    BindTranscript,
    Derive,
    Authenticate,
    EraseSignatureKeys,
    CrossVerify,
    Accept,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::KeyGen => "keygen",
            Step::Encapsulate => "encapsulate",
            Step::Decapsulate => "decapsulate",
            Step::EraseKemKeys => "erase-kem-keys",
            Step::BindTranscript => "bind-transcript",
            Step::Derive => "derive",
            Step::Authenticate => "authenticate",
            Step::EraseSignatureKeys => "erase-signature-keys",
            Step::CrossVerify => "cross-verify",
            Step::Accept => "accept",
        };
        f.write_str(name)
    }
}

/// Outcome of checking one party's confirmation signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid,
}

impl Verdict {
    pub fn is_valid(self) -> bool {
        self == Verdict::Valid
    }
}

impl From<bool> for Verdict {
    fn from(valid: bool) -> Self {
        if valid {
            Verdict::Valid
        } else {
            Verdict::Invalid
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Valid => f.write_str("Valid"),
            Verdict::Invalid => f.write_str("Invalid"),
        }
    }
}

/// Failure reported by a KEM or signature collaborator during key generation.
#[derive(Debug, thiserror::Error)]
pub enum PrimitiveError {
    #[error(transparent)]
    Kem(#[from] KemError),

    #[error(transparent)]
    Signature(#[from] SignatureError),
}

#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("key generation failed for {party}: {source}")]
    KeyGeneration {
        party: Party,
        #[source]
        source: PrimitiveError,
    },

    #[error("encapsulation to {recipient}'s KEM public key failed: {source}")]
    Encapsulation {
        recipient: Party,
        #[source]
        source: KemError,
    },

    #[error("decapsulation by {party} failed: {source}")]
    Decapsulation {
        party: Party,
        #[source]
        source: KemError,
    },

    #[error("session-key derivation failed for {party}: {source}")]
    Derivation {
        party: Party,
        #[source]
        source: DerivationError,
    },

    #[error("signing failed for {party}: {source}")]
    Signing {
        party: Party,
        #[source]
        source: SignatureError,
    },

    #[error("key confirmation failed: Alice's signature {alice}, Bob's signature {bob}")]
    Authentication { alice: Verdict, bob: Verdict },

    #[error("derived session keys differ between Alice and Bob")]
    SecretMismatch,
}

impl HandshakeError {
    /// The step at which the run was aborted.
    pub fn step(&self) -> Step {
        match self {
            HandshakeError::KeyGeneration { .. } => Step::KeyGen,
            HandshakeError::Encapsulation { .. } => Step::Encapsulate,
            HandshakeError::Decapsulation { .. } => Step::Decapsulate,
            HandshakeError::Derivation { .. } => Step::Derive,
            HandshakeError::Signing { .. } => Step::Authenticate,
            HandshakeError::Authentication { .. } => Step::CrossVerify,
            HandshakeError::SecretMismatch => Step::Accept,
        }
    }

    /// `true` for the two protocol-level acceptance checks, as opposed to a
    /// collaborator failing.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            HandshakeError::Authentication { .. } | HandshakeError::SecretMismatch
        )
    }
}
