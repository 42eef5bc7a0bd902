//! Decryption of encrypted game data payloads.
//!
//! An encrypted payload starts with 16 bytes that, xor-ed with the iv mask,
//! give the CBC initialization vector. The ciphertext follows directly. The
//! key is used as is, its length selects AES-128, AES-192 or AES-256.

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::{BlockDecryptMut, KeyIvInit, block_padding::Pkcs7};
use thiserror::Error;

const IV_LEN: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecryptError {
    #[error("a key of {0} bytes is not a valid AES key")]
    InvalidKeyLength(usize),

    #[error("the iv mask must be at least {IV_LEN} bytes, got {0}")]
    ShortIvMask(usize),

    #[error("payload of {len} bytes is too short for an iv at offset {offset}")]
    Truncated { len: usize, offset: usize },

    #[error("invalid block padding")]
    Padding,
}

/// Decrypts `data[offset..]`.
pub fn decrypt(key: &str, iv_mask: &str, data: &[u8], offset: usize) -> Result<Vec<u8>, DecryptError> {
    let key = key.as_bytes();
    let iv_mask = iv_mask.as_bytes();
    if iv_mask.len() < IV_LEN {
        return Err(DecryptError::ShortIvMask(iv_mask.len()));
    }

    let payload = data
        .get(offset..)
        .filter(|payload| payload.len() >= IV_LEN)
        .ok_or(DecryptError::Truncated {
            len: data.len(),
            offset,
        })?;
    let (masked_iv, ciphertext) = payload.split_at(IV_LEN);

    let mut iv = [0u8; IV_LEN];
    for (i, byte) in iv.iter_mut().enumerate() {
        *byte = masked_iv[i] ^ iv_mask[i];
    }

    let invalid_key = |_| DecryptError::InvalidKeyLength(key.len());
    let plaintext = match key.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(key, &iv)
            .map_err(invalid_key)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        24 => cbc::Decryptor::<Aes192>::new_from_slices(key, &iv)
            .map_err(invalid_key)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        32 => cbc::Decryptor::<Aes256>::new_from_slices(key, &iv)
            .map_err(invalid_key)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        len => return Err(DecryptError::InvalidKeyLength(len)),
    };

    plaintext.map_err(|_| DecryptError::Padding)
}

/// Like [`decrypt`], but a failure is logged and yields the input unchanged,
/// so a batch keeps going with best-effort output.
pub fn decrypt_or_original(
    key: &str,
    iv_mask: &str,
    data: Vec<u8>,
    offset: usize,
    label: &str,
) -> Vec<u8> {
    match decrypt(key, iv_mask, &data, offset) {
        Ok(plaintext) => plaintext,
        Err(e) => {
            tracing::error!("Failed to decrypt {label}: {e}");
            data
        }
    }
}
