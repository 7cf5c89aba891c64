//! Kaminsky whitening of debiased output.
//!
//! The Von Neumann rule throws away equal bit pairs. This module puts
//! them to work: the discarded bits are hashed with SHA-256 into an
//! AES-256 key, and the debiased output is encrypted with it in CBC mode,
//! one cycle every `block_size` input bytes. The key therefore comes from
//! the same physical source as the plaintext.

mod chunk;
mod cipher;
mod encryptor;
mod key;

pub use chunk::ChunkBuffer;
pub use cipher::{encrypt_cbc, pkcs7_pad, CipherError, BLOCK_SIZE, KEY_SIZE};
pub use encryptor::{ChunkEncryptor, DiscardPolicy};
pub use key::{derive_key, fresh_iv};
