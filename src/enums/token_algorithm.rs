use serde::Serialize;
use std::fmt;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenAlgorithm {
    #[default]
    Sha1,
    Sha256,
    Sha512,
}

impl TokenAlgorithm {
    /// Parses the `algo` value FreeOTP stores, ignoring case.
    pub fn from_name(name: &str) -> Option<TokenAlgorithm> {
        match name.to_ascii_uppercase().as_str() {
            "SHA1" => Some(TokenAlgorithm::Sha1),
            "SHA256" => Some(TokenAlgorithm::Sha256),
            "SHA512" => Some(TokenAlgorithm::Sha512),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenAlgorithm::Sha1 => "SHA1",
            TokenAlgorithm::Sha256 => "SHA256",
            TokenAlgorithm::Sha512 => "SHA512",
        }
    }
}

impl fmt::Display for TokenAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
