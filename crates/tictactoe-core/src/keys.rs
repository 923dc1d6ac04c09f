//! Device mnemonic and signer derivation
//!
//! The client keeps one BIP-39 phrase per device. A secp256k1 key is
//! derived from it along a BIP-32 path and the owner string presented to
//! the faucet is computed from the compressed public key.

use crate::{Error, Result};
use bip32::{DerivationPath, XPrv};
use bip39::{Language, Mnemonic};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

/// BIP-32 path used for the signing key
pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

/// Generate new random mnemonic
///
/// # Arguments
/// * `word_count` - Number of words in mnemonic (12, 18, or 24). Defaults to 24.
pub fn generate_mnemonic(word_count: Option<u32>) -> Result<String> {
    // 12 words = 16 bytes, 18 words = 24 bytes, 24 words = 32 bytes
    let entropy_size = match word_count.unwrap_or(24) {
        12 => 16,
        18 => 24,
        _ => 32,
    };

    let mut entropy = Zeroizing::new(vec![0u8; entropy_size]);
    rand::thread_rng().fill_bytes(&mut entropy);

    let mnemonic = Mnemonic::from_entropy(&entropy)
        .map_err(|e| Error::InvalidMnemonic(e.to_string()))?;
    Ok(mnemonic.to_string())
}

/// Signing identity derived from the device mnemonic
#[derive(Clone)]
pub struct Signer {
    owner: String,
    public_key: [u8; 33],
    secret: Zeroizing<[u8; 32]>,
}

impl Signer {
    /// Derive the signer from a mnemonic phrase
    pub fn from_mnemonic(phrase: &str) -> Result<Self> {
        Self::from_mnemonic_with_path(phrase, DEFAULT_DERIVATION_PATH)
    }

    /// Derive the signer along an explicit BIP-32 path
    pub fn from_mnemonic_with_path(phrase: &str, path: &str) -> Result<Self> {
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase.trim())
            .map_err(|e| Error::InvalidMnemonic(e.to_string()))?;
        let seed = Zeroizing::new(mnemonic.to_seed(""));

        let path: DerivationPath = path
            .parse()
            .map_err(|e: bip32::Error| Error::KeyDerivation(e.to_string()))?;
        let xprv = XPrv::derive_from_path(seed.as_slice(), &path)
            .map_err(|e| Error::KeyDerivation(e.to_string()))?;

        let public_key = xprv.public_key().to_bytes();
        let digest = Sha256::digest(public_key);
        let owner = format!("0x{}", hex::encode(&digest[12..]));

        Ok(Self {
            owner,
            public_key,
            secret: Zeroizing::new(xprv.to_bytes()),
        })
    }

    /// Owner string registered with the faucet
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Compressed secp256k1 public key
    pub fn public_key(&self) -> &[u8; 33] {
        &self.public_key
    }

    /// Raw private key bytes
    pub fn secret_bytes(&self) -> &[u8; 32] {
        &self.secret
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}
