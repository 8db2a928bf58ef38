use serde::Serialize;

use crate::{
    enums::{TokenAlgorithm, TokenType},
    types::TokenRecord,
};

use super::format_otpauth_uri;

#[derive(Debug, Serialize)]
struct TokenView<'a> {
    #[serde(flatten)]
    token_type: TokenType,
    label: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    issuer: Option<&'a str>,
    secret: String,
    algorithm: TokenAlgorithm,
    digits: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
    uri: String,
}

impl<'a> From<&'a TokenRecord> for TokenView<'a> {
    fn from(token: &'a TokenRecord) -> Self {
        Self {
            token_type: token.token_type,
            label: token.label.as_str(),
            issuer: token.issuer.as_deref(),
            secret: token.encoded_secret(),
            algorithm: token.algorithm,
            digits: token.digits,
            image: token.image.as_deref(),
            uri: format_otpauth_uri(token),
        }
    }
}

/// Renders records as a pretty-printed JSON array.
pub fn format_json(tokens: &[TokenRecord]) -> serde_json::Result<String> {
    let views: Vec<TokenView> = tokens.iter().map(TokenView::from).collect();

    serde_json::to_string_pretty(&views)
}
