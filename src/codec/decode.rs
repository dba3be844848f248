use std::fmt;

use alloy::{
    primitives::{Bytes, I256, U256},
    sol_types::SolValue,
};

use super::{DecodeError, ReturnType};

/// A successfully decoded result value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedValue {
    /// An unsigned 256-bit integer.
    Uint256(U256),
    /// A signed 256-bit integer.
    Int256(I256),
    /// A UTF-8 string; may be empty.
    String(String),
    /// A byte string.
    Bytes(Bytes),
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint256(v) => write!(f, "{v}"),
            Self::Int256(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Bytes(v) => write!(f, "{v}"),
        }
    }
}

/// Outcome of decoding a callback payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedResult {
    /// The payload was empty: the computation reported an error instead of a value.
    Empty,
    /// The payload decoded to a value of the expected type.
    Value(DecodedValue),
}

impl DecodedResult {
    /// Whether this is the error outcome.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Decodes `raw` as `expected`.
///
/// Zero-length input is [`DecodedResult::Empty`] for every type and is never
/// handed to the ABI decoder. Otherwise the value must re-encode to exactly
/// `raw`; trailing garbage or a differently-typed encoding is a
/// [`DecodeError`].
pub fn decode_result(raw: &[u8], expected: ReturnType) -> Result<DecodedResult, DecodeError> {
    if raw.is_empty() {
        return Ok(DecodedResult::Empty);
    }

    let value = match expected {
        ReturnType::Uint256 => DecodedValue::Uint256(strict::<U256>(raw, expected)?),
        ReturnType::Int256 => DecodedValue::Int256(strict::<I256>(raw, expected)?),
        ReturnType::String => DecodedValue::String(strict::<String>(raw, expected)?),
        ReturnType::Bytes => DecodedValue::Bytes(strict::<Bytes>(raw, expected)?),
    };
    Ok(DecodedResult::Value(value))
}

fn strict<T>(raw: &[u8], expected: ReturnType) -> Result<T, DecodeError>
where
    T: SolValue + From<<T::SolType as alloy::sol_types::SolType>::RustType>,
{
    let value = T::abi_decode(raw)
        .map_err(|e| DecodeError::Abi { expected, reason: e.to_string() })?;
    if value.abi_encode() != raw {
        return Err(DecodeError::NonCanonical { expected, len: raw.len() });
    }
    Ok(value)
}
