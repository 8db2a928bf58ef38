mod format_json;
mod format_otpauth_uri;
mod format_qr_codes;

pub use format_json::format_json;
pub use format_otpauth_uri::format_otpauth_uri;
pub use format_qr_codes::format_qr_codes;
