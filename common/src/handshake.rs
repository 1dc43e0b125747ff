// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
//! Hybrid handshake orchestrator.
//!
//! One linear run between Alice and Bob:
//!
//! 1. both parties generate KEM and signature key pairs
//! 2. Bob encapsulates to Alice's KEM key, Alice decapsulates
//! 3. both KEM private keys are erased
//! 4. `transcript = SHA3-512(pk_A || pk_B || ct || salt)` with a fresh salt
//! 5. each party derives a 64-byte session key from its own raw secret
//! 6. each party signs `session_key || salt`
//! 7. both signature private keys are erased
//! 8. each signature is verified over the *verifier's* session key
//! 9. accept iff both verify and the derived keys are equal
//!
//! Step 8 is key confirmation: a verifier rebuilds the signed message from
//! its own derived key, so a signature only checks out when both sides
//! computed the same key. Any failure is terminal; nothing is retried.

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::error::{HandshakeError, Party, Step, Verdict};
use crate::kdf::{self, Salt, SessionKey, Transcript, DIGEST_LEN};
use crate::kem::Kem;
use crate::secret::SecretBuffer;
use crate::signatures::SignatureScheme;

type CiphertextTap<'a> = Box<dyn FnOnce(&mut Vec<u8>) + 'a>;

/// Everything one party contributes to the record of a run.
#[derive(Debug)]
pub struct PartyArtifacts {
    pub kem_public_key: Vec<u8>,
    /// Size of the KEM private key that was erased.
    pub kem_private_key_len: usize,
    pub sig_public_key: Vec<u8>,
    /// Size of the signature private key that was erased.
    pub sig_private_key_len: usize,
    /// SHA3-512 commitment to this party's raw shared secret.
    pub raw_secret_commitment: [u8; DIGEST_LEN],
    pub session_key: SessionKey,
    /// Signature over `session_key || salt`.
    pub signature: Vec<u8>,
    /// Result of the peer checking this party's signature.
    pub verdict: Verdict,
}

/// Record of a completed run, accepted or not.
#[derive(Debug)]
pub struct HandshakeOutcome {
    pub kem_algorithm: &'static str,
    pub signature_algorithm: &'static str,
    pub alice: PartyArtifacts,
    pub bob: PartyArtifacts,
    /// Ciphertext as produced by Bob.
    pub ciphertext: Vec<u8>,
    pub salt: Salt,
    pub transcript: Transcript,
}

impl HandshakeOutcome {
    pub fn party(&self, party: Party) -> &PartyArtifacts {
        match party {
            Party::Alice => &self.alice,
            Party::Bob => &self.bob,
        }
    }

    /// Constant-time comparison of the two derived keys.
    pub fn keys_agree(&self) -> bool {
        self.alice.session_key.ct_eq(&self.bob.session_key)
    }

    /// Apply the acceptance rule.
    ///
    /// Verification verdicts are checked first; the key comparison is a
    /// second, redundant gate.
    pub fn accept(&self) -> Result<(), HandshakeError> {
        if !(self.alice.verdict.is_valid() && self.bob.verdict.is_valid()) {
            warn!(
                step = %Step::CrossVerify,
                alice = %self.alice.verdict,
                bob = %self.bob.verdict,
                "handshake rejected: key confirmation failed"
            );
            return Err(HandshakeError::Authentication {
                alice: self.alice.verdict,
                bob: self.bob.verdict,
            });
        }
        if !self.keys_agree() {
            warn!(step = %Step::Accept, "handshake rejected: derived keys differ");
            return Err(HandshakeError::SecretMismatch);
        }
        info!(step = %Step::Accept, "handshake accepted");
        Ok(())
    }
}

/// A single Alice/Bob run over the given collaborators.
pub struct Handshake<'a, K: Kem + ?Sized, S: SignatureScheme + ?Sized> {
    kem: &'a K,
    signer: &'a S,
    ciphertext_tap: Option<CiphertextTap<'a>>,
}

impl<'a, K: Kem + ?Sized, S: SignatureScheme + ?Sized> Handshake<'a, K, S> {
    pub fn new(kem: &'a K, signer: &'a S) -> Self {
        Self {
            kem,
            signer,
            ciphertext_tap: None,
        }
    }

    /// Intercept the ciphertext on its way from Bob to Alice.
    ///
    /// The transcript still binds the ciphertext Bob sent, so any change made
    /// here surfaces as a rejected run rather than a silently different key.
    pub fn with_ciphertext_tap(mut self, tap: impl FnOnce(&mut Vec<u8>) + 'a) -> Self {
        self.ciphertext_tap = Some(Box::new(tap));
        self
    }

    /// Execute and accept in one go.
    pub fn run(self) -> Result<HandshakeOutcome, HandshakeError> {
        let outcome = self.execute()?;
        outcome.accept()?;
        Ok(outcome)
    }

    /// Run steps 1 through 8 and return the full record without applying the
    /// acceptance rule. Collaborator failures abort with an error.
    pub fn execute(mut self) -> Result<HandshakeOutcome, HandshakeError> {
        // 1. Key generation
        let (alice_kem_pk, alice_kem_sk) = self.kem_keygen(Party::Alice)?;
        let (bob_kem_pk, bob_kem_sk) = self.kem_keygen(Party::Bob)?;
        let (alice_sig_pk, alice_sig_sk) = self.sig_keygen(Party::Alice)?;
        let (bob_sig_pk, bob_sig_sk) = self.sig_keygen(Party::Bob)?;
        info!(
            step = %Step::KeyGen,
            kem = self.kem.name(),
            signature = self.signer.name(),
            "generated key pairs for both parties"
        );

        // 2. Encapsulation
        let (ciphertext, bob_raw) = self.kem.encapsulate(&alice_kem_pk).map_err(|source| {
            HandshakeError::Encapsulation {
                recipient: Party::Alice,
                source,
            }
        })?;
        debug!(step = %Step::Encapsulate, ct_len = ciphertext.len(), "Bob encapsulated");

        let mut delivered = ciphertext.clone();
        if let Some(tap) = self.ciphertext_tap.take() {
            tap(&mut delivered);
        }
        let alice_raw = self
            .kem
            .decapsulate(&delivered, &alice_kem_sk)
            .map_err(|source| HandshakeError::Decapsulation {
                party: Party::Alice,
                source,
            })?;
        debug!(step = %Step::Decapsulate, "Alice decapsulated");

        // 3. KEM private keys are not needed again
        let alice_kem_sk_len = alice_kem_sk.len();
        let bob_kem_sk_len = bob_kem_sk.len();
        alice_kem_sk.wipe();
        bob_kem_sk.wipe();
        debug!(step = %Step::EraseKemKeys, "erased KEM private keys");

        // 4. Transcript binding, one salt for the whole run
        let salt = Salt::generate();
        let transcript = Transcript::bind(&alice_kem_pk, &bob_kem_pk, &ciphertext, &salt);
        debug!(step = %Step::BindTranscript, transcript = ?transcript, "bound transcript");

        // 5. Derivation; raw secrets are erased as soon as they are consumed
        let alice_commitment = kdf::commit_raw_secret(alice_raw.expose());
        let alice_key = derive_for(Party::Alice, alice_raw, &transcript, &salt)?;
        let bob_commitment = kdf::commit_raw_secret(bob_raw.expose());
        let bob_key = derive_for(Party::Bob, bob_raw, &transcript, &salt)?;
        info!(step = %Step::Derive, "derived session keys");

        // 6-7. Authentication; each signing key is erased right after use
        let alice_sig_sk_len = alice_sig_sk.len();
        let alice_signature = self.sign_for(Party::Alice, &alice_key, &salt, alice_sig_sk)?;
        let bob_sig_sk_len = bob_sig_sk.len();
        let bob_signature = self.sign_for(Party::Bob, &bob_key, &salt, bob_sig_sk)?;
        info!(
            step = %Step::Authenticate,
            sig_len = alice_signature.len(),
            "both parties signed their session key"
        );

        // 8. Cross-verification against the verifier's own key
        let alice_verdict =
            confirm_peer(self.signer, &alice_signature, &alice_sig_pk, &bob_key, &salt);
        let bob_verdict =
            confirm_peer(self.signer, &bob_signature, &bob_sig_pk, &alice_key, &salt);
        info!(
            step = %Step::CrossVerify,
            alice = %alice_verdict,
            bob = %bob_verdict,
            "cross-verified signatures"
        );

        Ok(HandshakeOutcome {
            kem_algorithm: self.kem.name(),
            signature_algorithm: self.signer.name(),
            alice: PartyArtifacts {
                kem_public_key: alice_kem_pk,
                kem_private_key_len: alice_kem_sk_len,
                sig_public_key: alice_sig_pk,
                sig_private_key_len: alice_sig_sk_len,
                raw_secret_commitment: alice_commitment,
                session_key: alice_key,
                signature: alice_signature,
                verdict: alice_verdict,
            },
            bob: PartyArtifacts {
                kem_public_key: bob_kem_pk,
                kem_private_key_len: bob_kem_sk_len,
                sig_public_key: bob_sig_pk,
                sig_private_key_len: bob_sig_sk_len,
                raw_secret_commitment: bob_commitment,
                session_key: bob_key,
                signature: bob_signature,
                verdict: bob_verdict,
            },
            ciphertext,
            salt,
            transcript,
        })
    }

    fn kem_keygen(&self, party: Party) -> Result<(Vec<u8>, SecretBuffer), HandshakeError> {
        self.kem
            .keygen()
            .map(|kp| kp.into_parts())
            .map_err(|e| HandshakeError::KeyGeneration {
                party,
                source: e.into(),
            })
    }

    fn sig_keygen(&self, party: Party) -> Result<(Vec<u8>, SecretBuffer), HandshakeError> {
        self.signer
            .keygen()
            .map(|kp| kp.into_parts())
            .map_err(|e| HandshakeError::KeyGeneration {
                party,
                source: e.into(),
            })
    }

    fn sign_for(
        &self,
        party: Party,
        key: &SessionKey,
        salt: &Salt,
        secret_key: SecretBuffer,
    ) -> Result<Vec<u8>, HandshakeError> {
        let message = confirmation_message(key, salt);
        let signature = self.signer.sign(&message, &secret_key);
        secret_key.wipe();
        debug!(step = %Step::EraseSignatureKeys, %party, "erased signature private key");
        signature.map_err(|source| HandshakeError::Signing { party, source })
    }
}

fn derive_for(
    party: Party,
    raw: SecretBuffer,
    transcript: &Transcript,
    salt: &Salt,
) -> Result<SessionKey, HandshakeError> {
    let key = kdf::derive(raw.expose(), transcript.as_bytes(), Some(salt.as_bytes()));
    raw.wipe();
    key.map_err(|source| HandshakeError::Derivation { party, source })
}

/// The message each party signs: `session_key || salt`.
pub fn confirmation_message(key: &SessionKey, salt: &Salt) -> Zeroizing<Vec<u8>> {
    let mut message = Zeroizing::new(Vec::with_capacity(
        kdf::SESSION_KEY_LEN + kdf::SALT_LEN,
    ));
    message.extend_from_slice(key.as_bytes());
    message.extend_from_slice(salt.as_bytes());
    message
}

/// Check a peer's confirmation signature against the verifier's own key.
///
/// The message is rebuilt from `verifier_key`, never from anything the
/// signer claims, so a `Valid` verdict implies both keys are equal.
pub fn confirm_peer<S: SignatureScheme + ?Sized>(
    scheme: &S,
    signature: &[u8],
    signer_public_key: &[u8],
    verifier_key: &SessionKey,
    salt: &Salt,
) -> Verdict {
    let message = confirmation_message(verifier_key, salt);
    scheme.verify(&message, signature, signer_public_key).into()
}
