use alloy::{
    primitives::{Bytes, I256, U256},
    sol_types::SolValue,
};

/// A computation result in the network's binary format.
///
/// Values are ABI-encoded, so every value (including the empty string) has a
/// non-empty encoding. Empty bytes are reserved for "the computation failed".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedResult(Bytes);

impl EncodedResult {
    /// Encodes an unsigned 256-bit integer.
    pub fn uint256(value: U256) -> Self {
        Self(value.abi_encode().into())
    }

    /// Encodes a signed 256-bit integer.
    pub fn int256(value: I256) -> Self {
        Self(value.abi_encode().into())
    }

    /// Encodes a UTF-8 string.
    pub fn string(value: &str) -> Self {
        Self(value.to_string().abi_encode().into())
    }

    /// Encodes a byte string.
    pub fn bytes(value: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(value).abi_encode().into())
    }

    /// The encoded bytes.
    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    /// Consumes the result, returning the encoded bytes.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}
