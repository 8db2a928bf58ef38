use thiserror::Error;

/// The input is not a FreeOTP token store.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Token store is not well-formed XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("Unexpected root element <{0}>, expected <map>")]
    UnexpectedRoot(String),
    #[error("Found <string> entry without a name attribute")]
    UnnamedEntry,
    #[error("tokenOrder is not a list of token names: {0}")]
    TokenOrder(serde_json::Error),
    #[error("Token store is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// A single token entry could not be turned into a record.
#[derive(Error, Debug)]
#[error("Invalid token '{record}': {kind}")]
pub struct FieldError {
    pub record: String,
    pub kind: FieldErrorKind,
}

impl FieldError {
    pub fn new(record: impl Into<String>, kind: FieldErrorKind) -> Self {
        Self {
            record: record.into(),
            kind,
        }
    }
}

#[derive(Error, Debug)]
pub enum FieldErrorKind {
    #[error("failed to deserialize token data: {0}")]
    Json(serde_json::Error),
    #[error("missing required field `{0}`")]
    Missing(&'static str),
    #[error("secret cannot be decoded: {0}")]
    Secret(String),
    #[error("secret is empty")]
    EmptySecret,
    #[error("unsupported token algorithm: {0}")]
    Algorithm(String),
    #[error("unsupported token type: {0}")]
    TokenType(String),
    #[error("digits must be 6 or 8, got {0}")]
    Digits(u32),
    #[error("period must be greater than zero")]
    Period,
    #[error("failed to decrypt token key: {0}")]
    Decrypt(String),
    #[error("token is encrypted and the store has not been unlocked")]
    Locked,
}

/// The container wrapping the token store could not be read.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Not an Android backup: {0}")]
    InvalidHeader(String),
    #[error("Encrypted Android backups are not supported (encryption: {0})")]
    Encrypted(String),
    #[error("No {0} found in backup archive")]
    MissingTokens(String),
    #[error("Provided data is not a Java HashMap: {0}")]
    JavaObject(String),
}

/// The master key of an encrypted store could not be recovered.
#[derive(Error, Debug)]
pub enum UnlockError {
    #[error("No masterKey found in token store")]
    MissingMasterKey,
    #[error("Failed to deserialize master key data: {0}")]
    MasterKey(serde_json::Error),
    #[error("Failed to construct decryption key: {0}")]
    Cipher(String),
    #[error("Failed to decrypt master key, wrong password?")]
    WrongPassword,
}
