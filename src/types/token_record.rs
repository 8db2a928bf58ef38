use data_encoding::BASE32_NOPAD;

use crate::enums::{TokenAlgorithm, TokenType};

/// One OTP credential recovered from the token store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    /// Issuer shown to the user, if any.
    pub issuer: Option<String>,
    /// Account label, prefixed with `issuer:` when the provisioning URI carried one.
    pub label: String,
    pub secret: Vec<u8>,
    pub algorithm: TokenAlgorithm,
    pub digits: u32,
    pub token_type: TokenType,
    pub image: Option<String>,
}

impl TokenRecord {
    /// Secret as upper-case, unpadded RFC 4648 base32.
    pub fn encoded_secret(&self) -> String {
        BASE32_NOPAD.encode(&self.secret)
    }
}

/// Decodes a base32 secret as typed by users: spaces, padding and case are ignored.
pub fn decode_base32_secret(encoded: &str) -> Result<Vec<u8>, data_encoding::DecodeError> {
    let normalized: String = encoded
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .map(|ch| ch.to_ascii_uppercase())
        .collect();

    // Padding is only valid at the end.
    BASE32_NOPAD.decode(normalized.trim_end_matches('=').as_bytes())
}
