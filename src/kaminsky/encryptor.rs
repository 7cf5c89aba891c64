//! Periodic encryption of debiased output under discard-derived keys.

use super::cipher::encrypt_cbc;
use super::key::{derive_key, fresh_iv};
use crate::error::DebiasError;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// What happens to accumulated key material after a cipher cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DiscardPolicy {
    /// Start every cycle with empty key material (independent keys).
    #[default]
    ResetPerCycle,
    /// Keep all discard bytes for the whole stream; each key hashes everything so far.
    Cumulative,
}

/// Accumulates one cycle of plaintext and key material, then encrypts it.
///
/// A cycle hashes the completed discard bytes into an AES-256 key, draws
/// a fresh IV, and encrypts the buffered plaintext in CBC mode. Only the
/// ciphertext leaves; the IV is not recorded, so the output is a one-way
/// whitening of the debiased bits.
pub struct ChunkEncryptor<G> {
    /// Debiased bytes awaiting the next cycle.
    plaintext: Vec<u8>,
    /// Completed discard bytes used for key derivation.
    key_material: Vec<u8>,
    policy: DiscardPolicy,
    rng: G,
    cycles: u64,
}

impl<G> ChunkEncryptor<G>
where
    G: RngCore + CryptoRng,
{
    /// Creates an encryptor drawing IVs (and fallback keys) from `rng`.
    pub fn new(policy: DiscardPolicy, rng: G) -> Self {
        Self {
            plaintext: Vec::new(),
            key_material: Vec::new(),
            policy,
            rng,
            cycles: 0,
        }
    }

    /// Returns the plaintext and key-material buffers for the extractor to fill.
    pub fn buffers_mut(&mut self) -> (&mut Vec<u8>, &mut Vec<u8>) {
        (&mut self.plaintext, &mut self.key_material)
    }

    /// Runs one cipher cycle and returns its ciphertext.
    ///
    /// The plaintext buffer is always cleared afterwards; key material is
    /// cleared according to the discard policy.
    pub fn cycle(&mut self) -> Result<Vec<u8>, DebiasError> {
        let key = derive_key(&self.key_material, &mut self.rng)?;
        let iv = fresh_iv(&mut self.rng)?;
        let ciphertext = encrypt_cbc(&key[..], &iv, &self.plaintext)?;

        self.cycles += 1;
        tracing::trace!(
            cycle = self.cycles,
            plaintext = self.plaintext.len(),
            key_material = self.key_material.len(),
            ciphertext = ciphertext.len(),
            "Cipher cycle complete"
        );

        self.plaintext.zeroize();
        if self.policy == DiscardPolicy::ResetPerCycle {
            self.key_material.zeroize();
        }

        Ok(ciphertext)
    }

    /// Returns the number of cycles run.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Returns the buffered plaintext length.
    pub fn plaintext_len(&self) -> usize {
        self.plaintext.len()
    }

    /// Returns the buffered key-material length.
    pub fn key_material_len(&self) -> usize {
        self.key_material.len()
    }

    /// Returns the discard policy.
    pub fn policy(&self) -> DiscardPolicy {
        self.policy
    }
}

impl<G> Drop for ChunkEncryptor<G> {
    fn drop(&mut self) {
        self.plaintext.zeroize();
        self.key_material.zeroize();
    }
}

impl<G> std::fmt::Debug for ChunkEncryptor<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkEncryptor")
            .field("plaintext", &self.plaintext.len())
            .field("key_material", &self.key_material.len())
            .field("policy", &self.policy)
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}
