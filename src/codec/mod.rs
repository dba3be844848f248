//! Binary result format shared by the sandboxed computation and the decoder.

mod decode;
mod encode;

use std::{fmt, str::FromStr};

use thiserror::Error;

pub use decode::{DecodedResult, DecodedValue, decode_result};
pub use encode::EncodedResult;

/// The scalar type a caller expects back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnType {
    /// `uint256`
    Uint256,
    /// `int256`
    Int256,
    /// `string`
    String,
    /// `bytes`
    Bytes,
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uint256 => "uint256",
            Self::Int256 => "int256",
            Self::String => "string",
            Self::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

impl FromStr for ReturnType {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uint256" | "uint" => Ok(Self::Uint256),
            "int256" | "int" => Ok(Self::Int256),
            "string" => Ok(Self::String),
            "bytes" => Ok(Self::Bytes),
            other => Err(DecodeError::UnknownType(other.to_string())),
        }
    }
}

/// A payload that is neither empty nor a valid encoding of the expected type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The ABI decoder rejected the bytes.
    #[error("Cannot decode result as {expected}: {reason}")]
    Abi {
        /// Type the caller asked for.
        expected: ReturnType,
        /// Decoder message.
        reason: String,
    },

    /// The bytes decode but are not the canonical encoding of that value.
    #[error("Result of {len} bytes is not a canonical {expected} encoding")]
    NonCanonical {
        /// Type the caller asked for.
        expected: ReturnType,
        /// Payload length.
        len: usize,
    },

    /// The requested type name is not supported.
    #[error("Unsupported return type '{0}'")]
    UnknownType(String),
}
