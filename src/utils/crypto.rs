// src/utils/crypto.rs
//! Byte encodings used for key material.
//!
//! - hex for private scalars
//! - base64url without padding for JWK coordinates
//! - multibase base58btc (`z` prefix) for multicodec-tagged public keys

use crate::errors::DidError;

/// Multibase prefix character for base58btc.
pub const MULTIBASE_BASE58BTC: char = 'z';

/// Encodes bytes as lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decodes a hex string (either case).
///
/// # Errors
/// Returns [`DidError::InvalidKeyFormat`] on odd length or non-hex characters.
pub fn from_hex(data: &str) -> Result<Vec<u8>, DidError> {
    hex::decode(data).map_err(|e| DidError::InvalidKeyFormat(e.to_string()))
}

/// Encodes bytes as unpadded base64url, the encoding JWK uses for key parameters.
pub fn to_base64url(bytes: &[u8]) -> String {
    base64::encode_config(bytes, base64::URL_SAFE_NO_PAD)
}

/// Decodes unpadded base64url.
#[cfg(test)]
pub fn from_base64url(data: &str) -> Result<Vec<u8>, DidError> {
    base64::decode_config(data, base64::URL_SAFE_NO_PAD)
        .map_err(|e| DidError::InvalidKeyFormat(e.to_string()))
}

/// Encodes bytes as a base58btc multibase string.
pub fn to_multibase(bytes: &[u8]) -> String {
    format!("{}{}", MULTIBASE_BASE58BTC, bs58::encode(bytes).into_string())
}

/// Decodes a base58btc multibase string.
///
/// # Errors
/// Returns [`DidError::InvalidPublicKey`] if the base prefix is not `z` or the
/// payload is not valid base58.
pub fn from_multibase(data: &str) -> Result<Vec<u8>, DidError> {
    let payload = data.strip_prefix(MULTIBASE_BASE58BTC).ok_or_else(|| {
        DidError::InvalidPublicKey(format!("expected base58btc multibase ('z'), got {data:?}"))
    })?;
    bs58::decode(payload)
        .with_alphabet(bs58::Alphabet::BITCOIN)
        .into_vec()
        .map_err(|e| DidError::InvalidPublicKey(e.to_string()))
}
