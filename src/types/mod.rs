mod token_record;

pub use token_record::{decode_base32_secret, TokenRecord};
