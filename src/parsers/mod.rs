mod decrypt_keys;
mod parse_android_backup;
mod parse_freeotp_backup;
mod parse_token_store;

pub use parse_android_backup::parse_android_backup;
pub use parse_freeotp_backup::parse_freeotp_backup;
pub use parse_token_store::TokenStore;
