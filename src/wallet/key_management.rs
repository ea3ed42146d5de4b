// src/wallet/key_management.rs
//! secp256k1 key handling for rotation keys.
//!
//! Provides generation, hex import, and the encodings the identity layer
//! understands:
//! - `did:key` identifiers (multicodec `secp256k1-pub`, base58btc multibase)
//! - bare multibase identifiers, as they appear in some provider responses
//! - JSON Web Keys with the y-coordinate recovered by point decompression
//!
//! Uses the following cryptographic primitives:
//! - secp256k1 curve (via `k256` crate)
//! - Cryptographically secure random number generation (via `rand`)
//!
//! Nothing here is persisted. Printing a key is the only record of it.

use crate::errors::DidError;
use crate::utils::crypto::{from_hex, from_multibase, to_base64url, to_hex, to_multibase};
use crate::utils::serialization::to_pretty_json;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Varint-encoded multicodec value for `secp256k1-pub` (0xe7).
pub const SECP256K1_MULTICODEC: [u8; 2] = [0xe7, 0x01];

/// Scheme prefix of `did:key` identifiers.
pub const DID_KEY_PREFIX: &str = "did:key:";

/// Length in bytes of a secp256k1 private scalar.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Length in bytes of a compressed SEC1 public point.
pub const COMPRESSED_POINT_LEN: usize = 33;

/// Output encodings for a keypair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum KeyFormat {
    /// Bare private key hex.
    Hex,
    /// Object with the did:key, multibase, and hex forms.
    Json,
    /// JSON Web Key including the private `d` parameter.
    Jwk,
}

/// A secp256k1 JSON Web Key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub y: String,
    pub d: String,
}

/// The `json` export shape of a keypair.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportedKeypair {
    pub did: String,
    pub public_key_multibase: String,
    pub public_key_hex: String,
    pub private_key_hex: String,
}

/// A secp256k1 keypair. The public point is always derived from the scalar.
#[derive(Clone)]
pub struct Keypair {
    secret_key: SecretKey,
}

impl Keypair {
    /// Generates a keypair from the thread-local CSPRNG.
    pub fn generate() -> Self {
        Keypair {
            secret_key: SecretKey::random(&mut rand::thread_rng()),
        }
    }

    /// Imports a private key from 64 hex characters.
    ///
    /// # Errors
    /// Returns [`DidError::InvalidKeyFormat`] if:
    /// - the input is not exactly 64 hex characters
    /// - the scalar is zero or not below the curve order
    pub fn import(hex_key: &str) -> Result<Self, DidError> {
        if hex_key.len() != PRIVATE_KEY_LEN * 2 || !hex_key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DidError::InvalidKeyFormat(format!(
                "expected {} hex characters",
                PRIVATE_KEY_LEN * 2
            )));
        }
        let bytes = from_hex(hex_key)?;
        let secret_key = SecretKey::from_slice(&bytes).map_err(|_| {
            DidError::InvalidKeyFormat("not a valid secp256k1 private scalar".to_string())
        })?;
        Ok(Keypair { secret_key })
    }

    /// Raw 32-byte private scalar.
    pub fn private_key_bytes(&self) -> [u8; PRIVATE_KEY_LEN] {
        self.secret_key.to_bytes().into()
    }

    pub fn private_key_hex(&self) -> String {
        to_hex(&self.private_key_bytes())
    }

    /// 33-byte compressed public point.
    pub fn public_key_compressed(&self) -> Vec<u8> {
        compress(&self.secret_key.public_key())
    }

    /// `did:key:zQ3s...` identifier for the public key.
    pub fn did_key(&self) -> String {
        to_did_key(&self.secret_key.public_key())
    }

    pub fn multibase(&self) -> String {
        to_multibase_key(&self.secret_key.public_key())
    }

    pub fn to_jwk(&self) -> Result<Jwk, DidError> {
        to_jwk(&self.private_key_bytes(), &self.public_key_compressed())
    }

    pub fn to_exported(&self) -> ExportedKeypair {
        ExportedKeypair {
            did: self.did_key(),
            public_key_multibase: self.multibase(),
            public_key_hex: to_hex(&self.public_key_compressed()),
            private_key_hex: self.private_key_hex(),
        }
    }

    /// Renders the keypair in the requested format.
    pub fn export(&self, format: KeyFormat) -> Result<String, DidError> {
        match format {
            KeyFormat::Hex => Ok(self.private_key_hex()),
            KeyFormat::Json => to_pretty_json(&self.to_exported()),
            KeyFormat::Jwk => to_pretty_json(&self.to_jwk()?),
        }
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair").field("did", &self.did_key()).finish_non_exhaustive()
    }
}

fn compress(public_key: &PublicKey) -> Vec<u8> {
    public_key.to_encoded_point(true).as_bytes().to_vec()
}

/// Multicodec-tagged, base58btc multibase encoding of a public key.
pub fn to_multibase_key(public_key: &PublicKey) -> String {
    let mut tagged = Vec::with_capacity(SECP256K1_MULTICODEC.len() + COMPRESSED_POINT_LEN);
    tagged.extend_from_slice(&SECP256K1_MULTICODEC);
    tagged.extend_from_slice(&compress(public_key));
    to_multibase(&tagged)
}

/// `did:key` identifier of a public key.
pub fn to_did_key(public_key: &PublicKey) -> String {
    format!("{}{}", DID_KEY_PREFIX, to_multibase_key(public_key))
}

/// Strips a `did:key:` scheme prefix, if any.
///
/// Rotation key lists must be compared in this form, otherwise a bare
/// multibase key and its `did:key:` spelling look different.
pub fn normalize_key(key: &str) -> &str {
    let key = key.trim();
    key.strip_prefix(DID_KEY_PREFIX).unwrap_or(key)
}

/// Parses a `did:key` or bare multibase secp256k1 key.
///
/// # Errors
/// Returns [`DidError::InvalidPublicKey`] on a wrong multibase prefix, a
/// multicodec other than `secp256k1-pub`, or an off-curve point.
pub fn parse_did_key(key: &str) -> Result<PublicKey, DidError> {
    let decoded = from_multibase(normalize_key(key))?;
    let point = decoded.strip_prefix(&SECP256K1_MULTICODEC[..]).ok_or_else(|| {
        DidError::InvalidPublicKey("multicodec is not secp256k1-pub".to_string())
    })?;
    PublicKey::from_sec1_bytes(point).map_err(|_| {
        DidError::InvalidPublicKey("bytes are not a point on secp256k1".to_string())
    })
}

/// Builds a JWK from a private scalar and its compressed public point.
///
/// The point is decompressed to recover `y`; the parity comes from the
/// compressed point's tag byte.
///
/// # Errors
/// Returns [`DidError::InvalidPublicKey`] if the point is not on the curve.
pub fn to_jwk(private_key: &[u8; PRIVATE_KEY_LEN], compressed: &[u8]) -> Result<Jwk, DidError> {
    let public_key = PublicKey::from_sec1_bytes(compressed).map_err(|_| {
        DidError::InvalidPublicKey("compressed point is not on secp256k1".to_string())
    })?;
    let uncompressed = public_key.to_encoded_point(false);
    let (x, y) = match (uncompressed.x(), uncompressed.y()) {
        (Some(x), Some(y)) => (x, y),
        _ => return Err(DidError::InvalidPublicKey("point at infinity".to_string())),
    };

    Ok(Jwk {
        kty: "EC".to_string(),
        crv: "secp256k1".to_string(),
        x: to_base64url(x),
        y: to_base64url(y),
        d: to_base64url(private_key),
    })
}
