use qrcode::{render::unicode::Dense1x2, types::QrError, QrCode};

use crate::types::TokenRecord;

use super::format_otpauth_uri;

/// Renders each token's label followed by the QR code of its `otpauth://` URI.
///
/// Codes are drawn two modules per character cell, so they scan from a
/// terminal as well as from a text file.
pub fn format_qr_codes(tokens: &[TokenRecord]) -> Result<String, QrError> {
    tokens.iter().map(format_qr_code).collect()
}

fn format_qr_code(token: &TokenRecord) -> Result<String, QrError> {
    let code = QrCode::new(format_otpauth_uri(token).as_bytes())?;
    let image = code.render::<Dense1x2>().quiet_zone(true).build();

    Ok(format!("{}\n{}\n\n", token.label, image))
}
