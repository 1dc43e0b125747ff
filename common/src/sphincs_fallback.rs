// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
//! SPHINCS+ fallback signature scheme.
//!
//! Stateless hash-based signatures (SPHINCS+-SHA2-256s-simple, SLH-DSA-SHA2-256s
//! per FIPS 205) for runs where the lattice assumption behind Dilithium5
//! should not be relied on. Implements the same [`SignatureScheme`] trait, so
//! the handshake and the KAT format are unchanged.
//!
//! Trade-off: signatures are ~29 KiB and signing is slow.

use pqcrypto_sphincsplus::sphincssha2256ssimple;
use pqcrypto_traits::sign::{
    DetachedSignature as DetachedSigTrait, PublicKey as PkTrait, SecretKey as SkTrait,
};

use crate::secret::{KeyPair, SecretBuffer};
use crate::signatures::{SignatureError, SignatureScheme};

/// SPHINCS+-SHA2-256s-simple backed by `pqcrypto-sphincsplus`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sphincs;

impl Sphincs {
    const NAME: &'static str = "SPHINCS+";
}

impl SignatureScheme for Sphincs {
    fn name(&self) -> &'static str {
        "SPHINCS+-SHA2-256s-simple (SLH-DSA, FIPS 205)"
    }

    fn keygen(&self) -> Result<KeyPair, SignatureError> {
        let (pk, sk) = sphincssha2256ssimple::keypair();
        let public = pk.as_bytes().to_vec();
        let private = SecretBuffer::from_slice(sk.as_bytes());

        if public.len() != sphincssha2256ssimple::public_key_bytes()
            || private.len() != sphincssha2256ssimple::secret_key_bytes()
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
            expected: sphincssha2256ssimple::secret_key_bytes(),
            got: secret_key.len(),
        };
        if secret_key.len() != sphincssha2256ssimple::secret_key_bytes() {
            return Err(invalid());
        }
        let sk = sphincssha2256ssimple::SecretKey::from_bytes(secret_key.expose())
            .map_err(|_| invalid())?;

        let sig = sphincssha2256ssimple::detached_sign(message, &sk);
        let bytes = sig.as_bytes().to_vec();
        if bytes.len() > sphincssha2256ssimple::signature_bytes() {
            return Err(SignatureError::OversizedSignature {
                scheme: Self::NAME,
                max: sphincssha2256ssimple::signature_bytes(),
                got: bytes.len(),
            });
        }
        Ok(bytes)
    }

    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        let Ok(pk) = sphincssha2256ssimple::PublicKey::from_bytes(public_key) else {
            return false;
        };
        let Ok(sig) = sphincssha2256ssimple::DetachedSignature::from_bytes(signature) else {
            return false;
        };
        sphincssha2256ssimple::verify_detached_signature(&sig, message, &pk).is_ok()
    }
}
