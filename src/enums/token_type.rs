use serde::Serialize;

pub const DEFAULT_PERIOD: u64 = 30;

/// TOTP tokens carry their period, HOTP tokens their counter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TokenType {
    Totp { period: u64 },
    Hotp { counter: u64 },
}

impl TokenType {
    /// Scheme host used in otpauth URIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Totp { .. } => "totp",
            TokenType::Hotp { .. } => "hotp",
        }
    }
}

impl Default for TokenType {
    fn default() -> Self {
        TokenType::Totp {
            period: DEFAULT_PERIOD,
        }
    }
}
