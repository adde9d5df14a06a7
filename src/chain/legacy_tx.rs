use crate::account::Address;
use crate::error::ChainError;
use k256::ecdsa::SigningKey;
use primitive_types::U256;
use sha3::{Digest, Keccak256};

/// Gas of a plain value transfer.
pub const TRANSFER_GAS: u64 = 21_000;

/// Pre-EIP-2718 value transfer, signed with EIP-155 replay protection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub chain_id: u64,
    pub nonce: U256,
    pub gas_price: U256,
    pub gas: u64,
    pub to: Address,
    pub value: U256,
}

#[derive(Clone, Debug)]
pub struct SignedTransaction {
    pub raw: Vec<u8>,
    pub tx_hash: String,
}

impl SignedTransaction {
    /// `0x`-prefixed payload for `eth_sendRawTransaction`.
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }
}

impl LegacyTransaction {
    fn rlp_fields(&self) -> Vec<Vec<u8>> {
        vec![
            rlp_uint(self.nonce),
            rlp_uint(self.gas_price),
            rlp_uint(U256::from(self.gas)),
            rlp_bytes(self.to.as_bytes()),
            rlp_uint(self.value),
            // no calldata
            rlp_bytes(&[]),
        ]
    }

    /// RLP of `[nonce, gas_price, gas, to, value, data, chain_id, 0, 0]`.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut fields = self.rlp_fields();
        fields.push(rlp_uint(U256::from(self.chain_id)));
        fields.push(rlp_bytes(&[]));
        fields.push(rlp_bytes(&[]));
        rlp_list(&fields)
    }

    pub fn signing_hash(&self) -> [u8; 32] {
        Keccak256::digest(self.signing_payload()).into()
    }

    pub fn sign(&self, key: &SigningKey) -> Result<SignedTransaction, ChainError> {
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(&self.signing_hash())
            .map_err(|err| ChainError::Rejected(format!("cannot sign transfer: {err}")))?;
        let v = u128::from(recovery_id.to_byte()) + u128::from(self.chain_id) * 2 + 35;
        let rs = signature.to_bytes();

        let mut fields = self.rlp_fields();
        fields.push(rlp_uint(U256::from(v)));
        fields.push(rlp_uint(U256::from_big_endian(&rs[..32])));
        fields.push(rlp_uint(U256::from_big_endian(&rs[32..])));
        let raw = rlp_list(&fields);

        let tx_hash = format!("0x{}", hex::encode(Keccak256::digest(&raw)));
        Ok(SignedTransaction { raw, tx_hash })
    }
}

fn rlp_length_prefix(len: usize, short_base: u8, long_base: u8) -> Vec<u8> {
    if len <= 55 {
        return vec![short_base + len as u8];
    }
    let len_bytes = len.to_be_bytes();
    let skip = len_bytes.iter().take_while(|byte| **byte == 0).count();
    let mut prefix = vec![long_base + (len_bytes.len() - skip) as u8];
    prefix.extend_from_slice(&len_bytes[skip..]);
    prefix
}

fn rlp_bytes(bytes: &[u8]) -> Vec<u8> {
    if let [byte] = bytes {
        if *byte < 0x80 {
            return vec![*byte];
        }
    }
    let mut out = rlp_length_prefix(bytes.len(), 0x80, 0xb7);
    out.extend_from_slice(bytes);
    out
}

fn rlp_uint(value: U256) -> Vec<u8> {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    let skip = buf.iter().take_while(|byte| **byte == 0).count();
    rlp_bytes(&buf[skip..])
}

fn rlp_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload_len = items.iter().map(Vec::len).sum();
    let mut out = rlp_length_prefix(payload_len, 0xc0, 0xf7);
    for item in items {
        out.extend_from_slice(item);
    }
    out
}
