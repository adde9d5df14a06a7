use crate::error::{HarnessError, Result};
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::SecretKey;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use std::fmt;
use std::str::FromStr;

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// 20-byte account address, the tail of the keccak-256 hash of the public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Address([u8; 20]);

impl Address {
    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    fn from_secret_key(key: &SecretKey) -> Self {
        let point = key.public_key().to_encoded_point(false);
        // skip the sec1 tag byte
        let hash = Keccak256::digest(&point.as_bytes()[1..]);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash[12..]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(strip_hex_prefix(s))
            .map_err(|err| HarnessError::InvalidInput(format!("bad address {s}: {err}")))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| HarnessError::InvalidInput(format!("address {s} is not 20 bytes")))?;
        Ok(Self(bytes))
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl TryFrom<String> for Address {
    type Error = HarnessError;

    fn try_from(value: String) -> Result<Self> {
        Address::from_str(&value)
    }
}

/// secp256k1 signing key, persisted as `0x`-prefixed hex.
#[derive(Clone)]
pub struct PrivateKey(SecretKey);

impl PrivateKey {
    pub fn generate() -> Self {
        Self(SecretKey::random(&mut rand::thread_rng()))
    }

    pub fn address(&self) -> Address {
        Address::from_secret_key(&self.0)
    }

    pub(crate) fn signing_key(&self) -> SigningKey {
        SigningKey::from(&self.0)
    }

    pub fn to_hex_string(&self) -> String {
        format!("0x{}", hex::encode(self.0.to_bytes()))
    }
}

impl FromStr for PrivateKey {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(strip_hex_prefix(s.trim()))
            .map_err(|err| HarnessError::InvalidInput(format!("private key is not hex: {err}")))?;
        if bytes.len() != 32 {
            return Err(HarnessError::InvalidInput(format!(
                "private key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let key = SecretKey::from_slice(&bytes)
            .map_err(|_| HarnessError::InvalidInput("private key is out of range".to_string()))?;
        Ok(Self(key))
    }
}

// never print key material
impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({})", self.address())
    }
}

#[derive(Clone, Debug)]
pub struct Account {
    key: PrivateKey,
    address: Address,
    estimated_balance: U256,
}

impl Account {
    pub fn new(key: PrivateKey) -> Self {
        let address = key.address();
        Self {
            key,
            address,
            estimated_balance: U256::zero(),
        }
    }

    pub fn generate() -> Self {
        Self::new(PrivateKey::generate())
    }

    pub fn with_estimated_balance(mut self, balance: U256) -> Self {
        self.estimated_balance = balance;
        self
    }

    pub fn key(&self) -> &PrivateKey {
        &self.key
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn estimated_balance(&self) -> U256 {
        self.estimated_balance
    }

    pub(crate) fn set_estimated_balance(&mut self, balance: U256) {
        self.estimated_balance = balance;
    }
}

impl FromStr for Account {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self::new(PrivateKey::from_str(s)?))
    }
}
