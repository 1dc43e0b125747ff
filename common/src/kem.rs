// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Key-encapsulation collaborator: Kyber-1024 / ML-KEM-1024 (FIPS 203).
//
// Sizes:
//   public key   1568 bytes
//   secret key   3168 bytes
//   ciphertext   1568 bytes
//   shared secret  32 bytes

use pqcrypto_kyber::kyber1024;
use pqcrypto_traits::kem::{
    Ciphertext as CiphertextTrait, PublicKey as PublicKeyTrait, SecretKey as SecretKeyTrait,
    SharedSecret as SharedSecretTrait,
};

use crate::secret::{KeyPair, SecretBuffer};

/// Kyber-1024 public key size (bytes).
pub const KEM_PK_LEN: usize = 1568;
/// Kyber-1024 secret key size (bytes).
pub const KEM_SK_LEN: usize = 3168;
/// Kyber-1024 KEM ciphertext size (bytes).
pub const KEM_CT_LEN: usize = 1568;
/// Shared secret size produced by encapsulation/decapsulation (bytes).
pub const SHARED_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum KemError {
    #[error("KEM key generation failed: {0}")]
    KeyGeneration(String),

    #[error("invalid KEM public key: expected {expected} bytes, got {got}")]
    InvalidPublicKey { expected: usize, got: usize },

    #[error("invalid KEM secret key: expected {expected} bytes, got {got}")]
    InvalidSecretKey { expected: usize, got: usize },

    #[error("invalid KEM ciphertext: expected {expected} bytes, got {got}")]
    InvalidCiphertext { expected: usize, got: usize },

    #[error("unexpected shared secret length: expected {expected} bytes, got {got}")]
    InvalidSharedSecret { expected: usize, got: usize },
}

/// A key-encapsulation mechanism as consumed by the handshake.
///
/// Keys, ciphertexts and secrets cross this boundary as plain bytes so the
/// orchestrator does not depend on a particular library's types. Private
/// keys and shared secrets always travel in a [`SecretBuffer`].
pub trait Kem {
    /// Human-readable algorithm name, recorded in the KAT header.
    fn name(&self) -> &'static str;

    fn keygen(&self) -> Result<KeyPair, KemError>;

    /// Returns `(ciphertext, shared_secret)` for the holder of `public_key`.
    fn encapsulate(&self, public_key: &[u8]) -> Result<(Vec<u8>, SecretBuffer), KemError>;

    fn decapsulate(
        &self,
        ciphertext: &[u8],
        secret_key: &SecretBuffer,
    ) -> Result<SecretBuffer, KemError>;
}

/// Kyber-1024 backed by `pqcrypto-kyber`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Kyber1024;

impl Kem for Kyber1024 {
    fn name(&self) -> &'static str {
        "Kyber-1024 (ML-KEM-1024, FIPS 203)"
    }

    fn keygen(&self) -> Result<KeyPair, KemError> {
        let (pk, sk) = kyber1024::keypair();
        let public = pk.as_bytes().to_vec();
        let private = SecretBuffer::from_slice(sk.as_bytes());

        if public.len() != KEM_PK_LEN || private.len() != KEM_SK_LEN {
            return Err(KemError::KeyGeneration(format!(
                "unexpected key sizes: pk={} sk={}",
                public.len(),
                private.len()
            )));
        }

        Ok(KeyPair { public, private })
    }

    fn encapsulate(&self, public_key: &[u8]) -> Result<(Vec<u8>, SecretBuffer), KemError> {
        let pk = public_key_from_bytes(public_key)?;
        let (shared_secret, ct) = kyber1024::encapsulate(&pk);
        let secret = shared_secret_from_bytes(shared_secret.as_bytes())?;
        Ok((ct.as_bytes().to_vec(), secret))
    }

    fn decapsulate(
        &self,
        ciphertext: &[u8],
        secret_key: &SecretBuffer,
    ) -> Result<SecretBuffer, KemError> {
        if ciphertext.len() != KEM_CT_LEN {
            return Err(KemError::InvalidCiphertext {
                expected: KEM_CT_LEN,
                got: ciphertext.len(),
            });
        }
        let ct = kyber1024::Ciphertext::from_bytes(ciphertext).map_err(|_| {
            KemError::InvalidCiphertext {
                expected: KEM_CT_LEN,
                got: ciphertext.len(),
            }
        })?;
        let sk = secret_key_from_bytes(secret_key.expose())?;

        // Kyber uses implicit rejection: a corrupted ciphertext yields an
        // unrelated secret rather than an error.
        let shared_secret = kyber1024::decapsulate(&ct, &sk);
        shared_secret_from_bytes(shared_secret.as_bytes())
    }
}

/// Deserialize a Kyber-1024 public key (1568 bytes).
pub fn public_key_from_bytes(bytes: &[u8]) -> Result<kyber1024::PublicKey, KemError> {
    let invalid = || KemError::InvalidPublicKey {
        expected: KEM_PK_LEN,
        got: bytes.len(),
    };
    if bytes.len() != KEM_PK_LEN {
        return Err(invalid());
    }
    kyber1024::PublicKey::from_bytes(bytes).map_err(|_| invalid())
}

/// Deserialize a Kyber-1024 secret key (3168 bytes).
pub fn secret_key_from_bytes(bytes: &[u8]) -> Result<kyber1024::SecretKey, KemError> {
    let invalid = || KemError::InvalidSecretKey {
        expected: KEM_SK_LEN,
        got: bytes.len(),
    };
    if bytes.len() != KEM_SK_LEN {
        return Err(invalid());
    }
    kyber1024::SecretKey::from_bytes(bytes).map_err(|_| invalid())
}

fn shared_secret_from_bytes(bytes: &[u8]) -> Result<SecretBuffer, KemError> {
    if bytes.len() != SHARED_SECRET_LEN {
        return Err(KemError::InvalidSharedSecret {
            expected: SHARED_SECRET_LEN,
            got: bytes.len(),
        });
    }
    Ok(SecretBuffer::from_slice(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keygen_produces_expected_sizes() {
        let kp = Kyber1024.keygen().unwrap();
        assert_eq!(kp.public.len(), KEM_PK_LEN);
        assert_eq!(kp.private.len(), KEM_SK_LEN);
    }

    #[test]
    fn encapsulate_decapsulate_agree() {
        let kem = Kyber1024;
        let kp = kem.keygen().unwrap();

        let (ct, ss_bob) = kem.encapsulate(&kp.public).unwrap();
        assert_eq!(ct.len(), KEM_CT_LEN);
        assert_eq!(ss_bob.len(), SHARED_SECRET_LEN);

        let ss_alice = kem.decapsulate(&ct, &kp.private).unwrap();
        assert_eq!(ss_alice.expose(), ss_bob.expose());
    }

    #[test]
    fn decapsulate_with_wrong_key_disagrees() {
        let kem = Kyber1024;
        let kp = kem.keygen().unwrap();
        let other = kem.keygen().unwrap();

        let (ct, ss_bob) = kem.encapsulate(&kp.public).unwrap();
        let ss_wrong = kem.decapsulate(&ct, &other.private).unwrap();
        assert_ne!(ss_wrong.expose(), ss_bob.expose());
    }

    #[test]
    fn corrupted_ciphertext_yields_different_secret() {
        let kem = Kyber1024;
        let kp = kem.keygen().unwrap();

        let (mut ct, ss_bob) = kem.encapsulate(&kp.public).unwrap();
        ct[0] ^= 0x01;
        let ss_alice = kem.decapsulate(&ct, &kp.private).unwrap();
        assert_ne!(ss_alice.expose(), ss_bob.expose());
    }

    #[test]
    fn rejects_truncated_public_key() {
        let result = Kyber1024.encapsulate(&[0u8; 100]);
        assert!(matches!(
            result,
            Err(KemError::InvalidPublicKey { expected: KEM_PK_LEN, got: 100 })
        ));
    }

    #[test]
    fn rejects_truncated_ciphertext() {
        let kp = Kyber1024.keygen().unwrap();
        let result = Kyber1024.decapsulate(&[0u8; 10], &kp.private);
        assert!(matches!(result, Err(KemError::InvalidCiphertext { .. })));
    }

    #[test]
    fn rejects_wrong_size_secret_key() {
        let kp = Kyber1024.keygen().unwrap();
        let (ct, _) = Kyber1024.encapsulate(&kp.public).unwrap();
        let bogus = SecretBuffer::new(vec![0u8; 12]);
        let result = Kyber1024.decapsulate(&ct, &bogus);
        assert!(matches!(result, Err(KemError::InvalidSecretKey { .. })));
    }
}
