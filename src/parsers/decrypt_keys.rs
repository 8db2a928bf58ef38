use aes_gcm::{aead::KeyInit, AeadInPlace, Aes256Gcm, Nonce};
use pbkdf2::pbkdf2_hmac_array;
use serde::Deserialize;
use sha2::Sha512;

use crate::errors::UnlockError;

/// GCM parameters are DER encoded: `30 11 04 0c <12 byte nonce> 02 01 10`.
const NONCE_RANGE: std::ops::Range<usize> = 4..16;

#[allow(dead_code)]
#[derive(Clone, Debug, Deserialize)]
#[cfg_attr(test, derive(serde::Serialize))]
#[serde(rename_all = "camelCase")]
pub struct EncryptedKey {
    pub m_cipher: String,
    pub m_cipher_text: Vec<i8>,
    pub m_parameters: Vec<i8>,
    pub m_token: String,
}

#[allow(dead_code)]
#[derive(Clone, Debug, Deserialize)]
#[cfg_attr(test, derive(serde::Serialize))]
#[serde(rename_all = "camelCase")]
pub struct EncryptedMasterKey {
    pub m_algorithm: String,
    pub m_encrypted_key: EncryptedKey,
    pub m_iterations: u32,
    pub m_salt: Vec<i8>,
}

#[derive(Clone, Debug, Deserialize)]
#[cfg_attr(test, derive(serde::Serialize))]
pub struct EncryptedTokenKeyWrapper {
    pub key: String,
}

pub fn decrypt_master_key(
    encrypted_master_key: &EncryptedMasterKey,
    password: &str,
) -> Result<Vec<u8>, UnlockError> {
    let master_pwd = pbkdf2_hmac_array::<Sha512, 32>(
        password.as_bytes(),
        from_java_bytes(encrypted_master_key.m_salt.as_slice()).as_slice(),
        encrypted_master_key.m_iterations,
    );

    decrypt_key(&encrypted_master_key.m_encrypted_key, master_pwd.as_slice())
        .map_err(|err| match err {
            KeyError::Cipher(msg) => UnlockError::Cipher(msg),
            KeyError::Parameters | KeyError::Decrypt => UnlockError::WrongPassword,
        })
}

pub fn decrypt_token_key(
    encrypted_token_key: &EncryptedKey,
    master_key: &[u8],
) -> Result<Vec<u8>, String> {
    decrypt_key(encrypted_token_key, master_key).map_err(|err| err.to_string())
}

fn decrypt_key(encrypted_key: &EncryptedKey, key: &[u8]) -> Result<Vec<u8>, KeyError> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|err| KeyError::Cipher(err.to_string()))?;

    let parameters = from_java_bytes(encrypted_key.m_parameters.as_slice());
    let nonce = parameters.get(NONCE_RANGE).ok_or(KeyError::Parameters)?;

    let mut plain_key: Vec<u8> = from_java_bytes(encrypted_key.m_cipher_text.as_slice());

    cipher
        .decrypt_in_place(
            Nonce::from_slice(nonce),
            encrypted_key.m_token.as_bytes(),
            &mut plain_key,
        )
        .map_err(|_| KeyError::Decrypt)?;

    Ok(plain_key)
}

enum KeyError {
    Cipher(String),
    Parameters,
    Decrypt,
}

impl std::fmt::Display for KeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyError::Cipher(msg) => write!(f, "invalid key: {}", msg),
            KeyError::Parameters => write!(f, "cipher parameters too short"),
            KeyError::Decrypt => write!(f, "authentication failed"),
        }
    }
}

pub fn from_java_bytes(bytes: &[i8]) -> Vec<u8> {
    bytes.iter().map(|b| b.to_be_bytes()[0]).collect()
}
