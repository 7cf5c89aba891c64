//! Key and IV material for cipher cycles.

use super::cipher::{BLOCK_SIZE, KEY_SIZE};
use crate::error::DebiasError;
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Derives a cycle key from discarded bits.
///
/// The key is the SHA-256 digest of `material`. When no discard byte has
/// been completed yet the key is drawn from `rng` instead.
pub fn derive_key<G>(material: &[u8], rng: &mut G) -> Result<Zeroizing<[u8; KEY_SIZE]>, DebiasError>
where
    G: RngCore + CryptoRng,
{
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);

    if material.is_empty() {
        rng.try_fill_bytes(&mut key[..])
            .map_err(|e| DebiasError::RandomSource(e.to_string()))?;
        tracing::trace!("Key material empty, drew cycle key from random source");
    } else {
        let digest = Sha256::digest(material);
        key.copy_from_slice(&digest);
    }

    Ok(key)
}

/// Draws a fresh IV. Called once per cycle.
pub fn fresh_iv<G>(rng: &mut G) -> Result<[u8; BLOCK_SIZE], DebiasError>
where
    G: RngCore + CryptoRng,
{
    let mut iv = [0u8; BLOCK_SIZE];
    rng.try_fill_bytes(&mut iv)
        .map_err(|e| DebiasError::RandomSource(e.to_string()))?;
    Ok(iv)
}
