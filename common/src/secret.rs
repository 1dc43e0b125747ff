// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
//! Exclusive-ownership secret buffers and best-effort erasure.
//!
//! Raw KEM shared secrets and private keys live in a [`SecretBuffer`] from the
//! moment a primitive hands them over until they are consumed. A buffer is
//! never `Clone`, prints as `[REDACTED]`, and is destroyed either explicitly
//! through [`SecretBuffer::wipe`] (which takes `self`, so it can run at most
//! once and never on a shared borrow), or implicitly on drop, where `zeroize`
//! clears it.
//!
//! Limitations: erasure is best-effort. It overwrites the buffer this type
//! owns and nothing else. Copies made by the allocator on reallocation, by the
//! primitive libraries while computing, by the compiler in registers or stack
//! spills, or by the OS when paging memory out are not reachable from here.

use std::fmt;
use std::ptr;
use std::sync::atomic::{compiler_fence, Ordering};

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

/// Overwrite every byte of `buf` with fresh random bytes from the OS RNG.
///
/// The result is unpredictable rather than a fixed pattern. Random bytes are
/// staged in a zeroizing scratch buffer and copied in with volatile writes,
/// followed by a compiler fence, so the store cannot be elided even when the
/// memory is released right after.
pub fn erase(buf: &mut [u8]) {
    let mut noise = Zeroizing::new(vec![0u8; buf.len()]);
    OsRng.fill_bytes(&mut noise);
    for (dst, src) in buf.iter_mut().zip(noise.iter()) {
        // SAFETY: `dst` is a unique, aligned reference to an initialized byte.
        unsafe { ptr::write_volatile(dst, *src) };
    }
    compiler_fence(Ordering::SeqCst);
}

/// Owned, non-cloneable secret byte buffer.
pub struct SecretBuffer {
    bytes: Vec<u8>,
    wiped: bool,
}

impl SecretBuffer {
    /// Take ownership of `bytes`. No copy is made.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            wiped: false,
        }
    }

    /// Copy `bytes` into a new buffer. The caller is responsible for the source.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }

    /// Read access to the secret.
    pub fn expose(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Erase the secret with [`erase`] and release the memory.
    pub fn wipe(mut self) {
        self.scrub();
    }

    fn scrub(&mut self) {
        if !self.wiped {
            erase(&mut self.bytes);
            self.wiped = true;
        }
    }

    /// Drop path: a buffer that was never wiped is zeroized, spare capacity
    /// included.
    fn release(&mut self) {
        if !self.wiped {
            self.bytes.zeroize();
            self.wiped = true;
        }
    }
}

impl Drop for SecretBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

/// A primitive's key pair: public half in the clear, private half owned.
#[derive(Debug)]
pub struct KeyPair {
    pub public: Vec<u8>,
    pub private: SecretBuffer,
}

impl KeyPair {
    /// Split into the public bytes and the private buffer.
    pub fn into_parts(self) -> (Vec<u8>, SecretBuffer) {
        (self.public, self.private)
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBuffer([REDACTED; {} bytes])", self.bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matching_positions(a: &[u8], b: &[u8]) -> usize {
        a.iter().zip(b).filter(|(x, y)| x == y).count()
    }

    #[test]
    fn erase_destroys_original_content() {
        let snapshot: Vec<u8> = (0..64u8).collect();
        let mut buf = snapshot.clone();

        erase(&mut buf);

        assert_ne!(buf, snapshot);
        // Expected overlap for random bytes is 64/256; 8 matches would be absurd.
        assert!(matching_positions(&buf, &snapshot) < 8);
    }

    #[test]
    fn erase_is_not_a_fixed_pattern() {
        let mut a = [0x5Au8; 64];
        let mut b = [0x5Au8; 64];
        erase(&mut a);
        erase(&mut b);

        assert_ne!(a, b);
        assert!(a.iter().any(|&x| x != a[0]));
    }

    #[test]
    fn scrub_overwrites_owned_bytes() {
        let snapshot = vec![0xC3u8; 32];
        let mut secret = SecretBuffer::from_slice(&snapshot);

        secret.scrub();

        assert!(secret.wiped);
        assert_ne!(secret.bytes, snapshot);
        assert!(matching_positions(&secret.bytes, &snapshot) < 8);
    }

    #[test]
    fn scrub_runs_once() {
        let mut secret = SecretBuffer::from_slice(&[1u8; 16]);
        secret.scrub();
        let after_first = secret.bytes.clone();
        secret.scrub();
        assert_eq!(secret.bytes, after_first);
    }

    #[test]
    fn erase_handles_empty_buffer() {
        let mut empty: [u8; 0] = [];
        erase(&mut empty);
    }

    #[test]
    fn drop_zeroizes_unwiped_buffer() {
        let mut secret = SecretBuffer::from_slice(&[0xA5u8; 48]);
        let capacity = secret.bytes.capacity();

        secret.release();

        assert!(secret.wiped);
        assert!(secret.bytes.is_empty());
        assert_eq!(secret.bytes.capacity(), capacity);
        // SAFETY: the allocation is still owned by `secret.bytes` and every
        // byte in it was initialized by `from_slice`.
        let spare = unsafe { std::slice::from_raw_parts(secret.bytes.as_ptr(), capacity) };
        assert!(spare.iter().all(|&b| b == 0));
    }

    #[test]
    fn drop_after_wipe_leaves_random_bytes() {
        let mut secret = SecretBuffer::from_slice(&[0u8; 32]);
        secret.scrub();
        let after_wipe = secret.bytes.clone();

        secret.release();

        assert_eq!(secret.bytes, after_wipe);
        assert!(after_wipe.iter().any(|&b| b != 0));
    }

    #[test]
    fn debug_is_redacted() {
        let secret = SecretBuffer::from_slice(b"do not print me");
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("print"));
        assert!(rendered.contains("REDACTED"));
        assert!(rendered.contains("15 bytes"));
    }

    #[test]
    fn expose_returns_contents_until_wiped() {
        let secret = SecretBuffer::new(vec![7u8; 32]);
        assert_eq!(secret.len(), 32);
        assert!(!secret.is_empty());
        assert_eq!(secret.expose(), &[7u8; 32]);
        secret.wipe();
    }
}
