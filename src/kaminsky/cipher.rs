//! AES-256-CBC with PKCS#7 padding.

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes256Enc;
use thiserror::Error;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// Errors from cipher construction.
///
/// Keys are always 32-byte SHA-256 digests, so this only fires on a
/// broken invariant, never on bad input data.
#[derive(Debug, Clone, Error)]
pub enum CipherError {
    /// The key was not 32 bytes.
    #[error("invalid AES-256 key length: {0} bytes")]
    InvalidKeyLength(usize),
}

/// Pads `data` to a multiple of `block_size`.
///
/// Every pad byte holds the pad length. Block-aligned input gets a full
/// extra block so the padding is always removable.
pub fn pkcs7_pad(data: &[u8], block_size: usize) -> Vec<u8> {
    let padding = block_size - data.len() % block_size;
    let mut padded = Vec::with_capacity(data.len() + padding);
    padded.extend_from_slice(data);
    padded.resize(data.len() + padding, padding as u8);
    padded
}

/// Encrypts `plaintext` in CBC mode after PKCS#7 padding.
///
/// Only the ciphertext is returned; the IV is not prepended.
pub fn encrypt_cbc(
    key: &[u8],
    iv: &[u8; BLOCK_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let cipher =
        Aes256Enc::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength(key.len()))?;

    let padded = pkcs7_pad(plaintext, BLOCK_SIZE);
    let mut ciphertext = Vec::with_capacity(padded.len());

    // previous ciphertext block, seeded with the IV
    let mut prev = *iv;

    for chunk in padded.chunks_exact(BLOCK_SIZE) {
        let mut block = aes::Block::default();
        for (dst, (&p, &c)) in block.iter_mut().zip(chunk.iter().zip(prev.iter())) {
            *dst = p ^ c;
        }

        cipher.encrypt_block(&mut block);

        prev.copy_from_slice(&block);
        ciphertext.extend_from_slice(&block);
    }

    Ok(ciphertext)
}
