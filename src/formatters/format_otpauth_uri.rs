use urlencoding::encode;

use crate::{enums::TokenType, types::TokenRecord};

/// Renders a record as an `otpauth://` provisioning URI.
pub fn format_otpauth_uri(token: &TokenRecord) -> String {
    let mut params = vec![("secret", token.encoded_secret())];

    if let Some(issuer) = token.issuer.as_deref() {
        params.push(("issuer", encode(issuer).into_owned()));
    }

    params.push(("algorithm", token.algorithm.to_string()));
    params.push(("digits", token.digits.to_string()));

    match token.token_type {
        TokenType::Totp { period } => params.push(("period", period.to_string())),
        TokenType::Hotp { counter } => params.push(("counter", counter.to_string())),
    }

    if let Some(image) = token.image.as_deref() {
        params.push(("image", encode(image).into_owned()));
    }

    let query = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "otpauth://{}/{}?{}",
        token.token_type.as_str(),
        encode_label(token.label.as_str()),
        query
    )
}

/// Percent-encodes each `:` separated part, keeping the separators.
fn encode_label(label: &str) -> String {
    label
        .split(':')
        .map(|part| encode(part).into_owned())
        .collect::<Vec<_>>()
        .join(":")
}
