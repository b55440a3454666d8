//! Error types for attribute construction and the BER codec.

use std::string::FromUtf8Error;

use base64::DecodeError;
use thiserror::Error;

/// Result type for attribute operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The wire structure is not `SEQUENCE { type, SET OF value }`
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    /// The attribute type read from the wire is not text
    #[error("attribute type must be UTF-8 text")]
    InvalidType(#[source] FromUtf8Error),

    /// A plain-data value is neither text nor raw bytes
    #[error("invalid attribute value: {0}")]
    InvalidValue(String),

    /// A text value for a `;binary` type is not valid base64
    #[error("base64 decode: {0}")]
    Base64Decode(DecodeError),

    /// TLV-layer failure, propagated unchanged
    #[error("ber: {0}")]
    Ber(#[source] ber::error::Error),
}
