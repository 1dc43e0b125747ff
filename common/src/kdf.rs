// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session-key derivation: HKDF-SHA3-512 (RFC 5869 + FIPS 202).
//
//   PRK         = HKDF-Extract(salt, raw_secret)
//   session_key = HKDF-Expand(PRK, info = transcript, L = 64)
//
// Transcript:
//   SHA3-512(alice_kem_pk || bob_kem_pk || ciphertext || salt)

use std::fmt;

use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha3::{Digest, Sha3_512};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Derived session key size (bytes).
pub const SESSION_KEY_LEN: usize = 64;
/// Handshake salt size (bytes).
pub const SALT_LEN: usize = 32;
/// SHA3-512 digest size (bytes).
pub const DIGEST_LEN: usize = 64;

/// Domain separator for the logged commitment to a raw shared secret.
const RAW_SECRET_COMMITMENT_DOMAIN: &[u8] = b"pqkat/raw-secret-commitment/v1";

#[derive(Debug, thiserror::Error)]
pub enum DerivationError {
    #[error("raw shared secret is empty")]
    EmptySecret,

    #[error("transcript is empty")]
    EmptyTranscript,

    #[error("salt is empty")]
    EmptySalt,

    #[error("HKDF expansion failed for {len}-byte output")]
    Expand { len: usize },
}

/// Per-run handshake salt. Public, but never reused across runs.
#[derive(Clone, PartialEq, Eq)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    /// Fresh salt from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({})", hex::encode(self.0))
    }
}

/// SHA3-512 digest binding both KEM public keys, the ciphertext and the salt.
#[derive(Clone, PartialEq, Eq)]
pub struct Transcript([u8; DIGEST_LEN]);

impl Transcript {
    pub fn bind(alice_kem_pk: &[u8], bob_kem_pk: &[u8], ciphertext: &[u8], salt: &Salt) -> Self {
        let mut hasher = Sha3_512::new();
        hasher.update(alice_kem_pk);
        hasher.update(bob_kem_pk);
        hasher.update(ciphertext);
        hasher.update(salt.as_bytes());
        Self(digest_bytes(hasher))
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl fmt::Debug for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transcript({})", hex::encode(self.0))
    }
}

/// 64-byte derived session key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SESSION_KEY_LEN]);

impl SessionKey {
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.0
    }

    /// Constant-time equality.
    pub fn ct_eq(&self, other: &SessionKey) -> bool {
        self.0.ct_eq(&other.0).into()
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: [u8; SESSION_KEY_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

/// Derive a 64-byte session key from a raw shared secret.
///
/// `transcript` is the HKDF info, `salt` the HKDF extraction salt. When no
/// salt is given a fresh random one is drawn; such a key can only be
/// reproduced by whoever saw that salt, so the handshake always passes its
/// own.
pub fn derive(
    raw_secret: &[u8],
    transcript: &[u8],
    salt: Option<&[u8]>,
) -> Result<SessionKey, DerivationError> {
    if raw_secret.is_empty() {
        return Err(DerivationError::EmptySecret);
    }
    if transcript.is_empty() {
        return Err(DerivationError::EmptyTranscript);
    }

    let generated;
    let salt = match salt {
        Some([]) => return Err(DerivationError::EmptySalt),
        Some(salt) => salt,
        None => {
            generated = Salt::generate();
            generated.as_bytes().as_slice()
        }
    };

    let hk = Hkdf::<Sha3_512>::new(Some(salt), raw_secret);
    let mut okm = [0u8; SESSION_KEY_LEN];
    hk.expand(transcript, &mut okm)
        .map_err(|_| DerivationError::Expand {
            len: SESSION_KEY_LEN,
        })?;

    let key = SessionKey(okm);
    okm.zeroize();
    Ok(key)
}

/// One-way commitment to a raw shared secret, safe to persist.
pub fn commit_raw_secret(raw_secret: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha3_512::new();
    hasher.update(RAW_SECRET_COMMITMENT_DOMAIN);
    hasher.update(raw_secret);
    digest_bytes(hasher)
}

pub(crate) fn digest_bytes(hasher: Sha3_512) -> [u8; DIGEST_LEN] {
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&hasher.finalize());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: [u8; 32] = [0x11; 32];
    const SALT: [u8; SALT_LEN] = [0x22; SALT_LEN];

    fn transcript() -> Transcript {
        Transcript::bind(&[1u8; 1568], &[2u8; 1568], &[3u8; 1568], &Salt::from_bytes(SALT))
    }

    #[test]
    fn derive_is_deterministic() {
        let t = transcript();
        let a = derive(&SECRET, t.as_bytes(), Some(&SALT[..])).unwrap();
        let b = derive(&SECRET, t.as_bytes(), Some(&SALT[..])).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert!(a.ct_eq(&b));
    }

    #[test]
    fn derive_matches_rfc5869_construction() {
        let t = transcript();
        let key = derive(&SECRET, t.as_bytes(), Some(&SALT[..])).unwrap();

        let hk = Hkdf::<Sha3_512>::new(Some(&SALT[..]), &SECRET);
        let mut expected = [0u8; SESSION_KEY_LEN];
        hk.expand(t.as_bytes(), &mut expected).unwrap();
        assert_eq!(key.as_bytes(), &expected);
    }

    #[test]
    fn derive_depends_on_every_input() {
        let t = transcript();
        let base = derive(&SECRET, t.as_bytes(), Some(&SALT[..])).unwrap();

        let other_secret = derive(&[0x12; 32], t.as_bytes(), Some(&SALT[..])).unwrap();
        let other_info = derive(&SECRET, b"different transcript", Some(&SALT[..])).unwrap();
        let other_salt = derive(&SECRET, t.as_bytes(), Some(&[0x23; SALT_LEN][..])).unwrap();

        assert!(!base.ct_eq(&other_secret));
        assert!(!base.ct_eq(&other_info));
        assert!(!base.ct_eq(&other_salt));
    }

    #[test]
    fn derive_without_salt_draws_fresh_one() {
        let t = transcript();
        let a = derive(&SECRET, t.as_bytes(), None).unwrap();
        let b = derive(&SECRET, t.as_bytes(), None).unwrap();
        assert!(!a.ct_eq(&b));
    }

    #[test]
    fn derive_rejects_malformed_inputs() {
        let t = transcript();
        assert!(matches!(
            derive(&[], t.as_bytes(), Some(&SALT[..])),
            Err(DerivationError::EmptySecret)
        ));
        assert!(matches!(
            derive(&SECRET, &[], Some(&SALT[..])),
            Err(DerivationError::EmptyTranscript)
        ));
        assert!(matches!(
            derive(&SECRET, t.as_bytes(), Some(&[][..])),
            Err(DerivationError::EmptySalt)
        ));
    }

    #[test]
    fn transcript_changes_with_each_input() {
        let pk_a = [1u8; 1568];
        let pk_b = [2u8; 1568];
        let ct = [3u8; 1568];
        let salt = Salt::from_bytes(SALT);
        let base = Transcript::bind(&pk_a, &pk_b, &ct, &salt);

        let mut flipped = pk_a;
        flipped[0] ^= 1;
        assert_ne!(base, Transcript::bind(&flipped, &pk_b, &ct, &salt));

        let mut flipped = pk_b;
        flipped[1567] ^= 1;
        assert_ne!(base, Transcript::bind(&pk_a, &flipped, &ct, &salt));

        let mut flipped = ct;
        flipped[700] ^= 0x80;
        assert_ne!(base, Transcript::bind(&pk_a, &pk_b, &flipped, &salt));

        let mut flipped = SALT;
        flipped[31] ^= 1;
        assert_ne!(
            base,
            Transcript::bind(&pk_a, &pk_b, &ct, &Salt::from_bytes(flipped))
        );
    }

    #[test]
    fn salts_are_fresh() {
        assert_ne!(Salt::generate(), Salt::generate());
    }

    #[test]
    fn commitment_hides_but_binds() {
        let c1 = commit_raw_secret(&SECRET);
        let c2 = commit_raw_secret(&SECRET);
        assert_eq!(c1, c2);
        assert_ne!(&c1[..32], &SECRET[..]);
        assert_ne!(c1, commit_raw_secret(&[0x12; 32]));
    }

    #[test]
    fn session_key_debug_is_redacted() {
        let key = SessionKey::from_bytes([0xAB; SESSION_KEY_LEN]);
        assert_eq!(format!("{key:?}"), "SessionKey([REDACTED])");
    }
}
