//! Shared helpers for unit tests.

use rand_core::{CryptoRng, RngCore};
use std::num::NonZeroU32;

/// A random source that always fails.
pub(crate) struct FailingRng;

impl RngCore for FailingRng {
    fn next_u32(&mut self) -> u32 {
        unreachable!("only try_fill_bytes is used")
    }

    fn next_u64(&mut self) -> u64 {
        unreachable!("only try_fill_bytes is used")
    }

    fn fill_bytes(&mut self, _dest: &mut [u8]) {
        unreachable!("only try_fill_bytes is used")
    }

    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand_core::Error> {
        let code = NonZeroU32::new(rand_core::Error::CUSTOM_START).unwrap();
        Err(rand_core::Error::from(code))
    }
}

impl CryptoRng for FailingRng {}

/// CBC decryption without unpadding, for checking ciphertexts.
pub(crate) fn decrypt_cbc(key: &[u8], iv: &[u8; 16], ciphertext: &[u8]) -> Vec<u8> {
    use aes::cipher::{BlockDecrypt, KeyInit};

    let cipher = aes::Aes256Dec::new_from_slice(key).unwrap();
    let mut prev = *iv;
    let mut plaintext = Vec::with_capacity(ciphertext.len());

    for chunk in ciphertext.chunks_exact(16) {
        let mut block = aes::Block::clone_from_slice(chunk);
        cipher.decrypt_block(&mut block);
        for (b, p) in block.iter_mut().zip(prev.iter()) {
            *b ^= p;
        }
        prev.copy_from_slice(chunk);
        plaintext.extend_from_slice(&block);
    }

    plaintext
}
