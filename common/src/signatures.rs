// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Signature collaborator: Dilithium5 / ML-DSA-87 (FIPS 204), detached mode.
//
// The handshake only needs keygen, detached sign and a boolean verify, so the
// scheme is expressed as a trait over byte slices. See `sphincs_fallback` for
// the hash-based alternative behind the same trait.

use pqcrypto_dilithium::dilithium5;
use pqcrypto_traits::sign::{
    DetachedSignature as DetachedSigTrait, PublicKey as PkTrait, SecretKey as SkTrait,
};

use crate::secret::{KeyPair, SecretBuffer};

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("{scheme} key generation failed: {reason}")]
    KeyGeneration { scheme: &'static str, reason: String },

    #[error("invalid {scheme} secret key: expected {expected} bytes, got {got}")]
    InvalidSecretKey {
        scheme: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{scheme} signing produced {got} bytes, expected at most {max}")]
    OversizedSignature {
        scheme: &'static str,
        max: usize,
        got: usize,
    },
}

/// A detached signature scheme as consumed by the handshake.
pub trait SignatureScheme {
    /// Human-readable algorithm name, recorded in the KAT header.
    fn name(&self) -> &'static str;

    fn keygen(&self) -> Result<KeyPair, SignatureError>;

    fn sign(&self, message: &[u8], secret_key: &SecretBuffer) -> Result<Vec<u8>, SignatureError>;

    /// `true` only if `signature` is a valid signature on `message` under
    /// `public_key`. Malformed keys or signatures verify as `false`.
    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool;
}

/// Dilithium5 backed by `pqcrypto-dilithium`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dilithium5;

impl Dilithium5 {
    const NAME: &'static str = "Dilithium5";
}

impl SignatureScheme for Dilithium5 {
    fn name(&self) -> &'static str {
        "Dilithium5 (ML-DSA-87, FIPS 204)"
    }

    fn keygen(&self) -> Result<KeyPair, SignatureError> {
        let (pk, sk) = dilithium5::keypair();
        let public = pk.as_bytes().to_vec();
        let private = SecretBuffer::from_slice(sk.as_bytes());

        if public.len() != dilithium5::public_key_bytes()
            || private.len() != dilithium5::secret_key_bytes()
        {
            return Err(SignatureError::KeyGeneration {
                scheme: Self::NAME,
                reason: format!("unexpected key sizes: pk={} sk={}", public.len(), private.len()),
            });
        }

        Ok(KeyPair { public, private })
    }

    fn sign(&self, message: &[u8], secret_key: &SecretBuffer) -> Result<Vec<u8>, SignatureError> {
        let invalid = || SignatureError::InvalidSecretKey {
            scheme: Self::NAME,
            expected: dilithium5::secret_key_bytes(),
            got: secret_key.len(),
        };
        if secret_key.len() != dilithium5::secret_key_bytes() {
            return Err(invalid());
        }
        let sk = dilithium5::SecretKey::from_bytes(secret_key.expose()).map_err(|_| invalid())?;

        let sig = dilithium5::detached_sign(message, &sk);
        let bytes = sig.as_bytes().to_vec();
        if bytes.len() > dilithium5::signature_bytes() {
            return Err(SignatureError::OversizedSignature {
                scheme: Self::NAME,
                max: dilithium5::signature_bytes(),
                got: bytes.len(),
            });
        }
        Ok(bytes)
    }

    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        let Ok(pk) = dilithium5::PublicKey::from_bytes(public_key) else {
            return false;
        };
        let Ok(sig) = dilithium5::DetachedSignature::from_bytes(signature) else {
            return false;
        };
        dilithium5::verify_detached_signature(&sig, message, &pk).is_ok()
    }
}
