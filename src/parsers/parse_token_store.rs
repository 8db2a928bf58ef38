use roxmltree::Document;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::{
    enums::{TokenAlgorithm, TokenType, DEFAULT_PERIOD},
    errors::{FieldError, FieldErrorKind, FormatError, UnlockError},
    types::{decode_base32_secret, TokenRecord},
};

use super::decrypt_keys::{
    decrypt_master_key, decrypt_token_key, EncryptedKey, EncryptedMasterKey,
    EncryptedTokenKeyWrapper,
};

const ROOT_ELEMENT: &str = "map";
const ENTRY_ELEMENT: &str = "string";
const TOKEN_ORDER_KEY: &str = "tokenOrder";
const MASTER_KEY_KEY: &str = "masterKey";
const TOKEN_INFO_SUFFIX: &str = "-token";

/// Named `<string>` entry of the FreeOTP shared preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub name: String,
    pub value: String,
}

/// Parsed FreeOTP token store.
///
/// The document shape is checked when the store is built; token entries are
/// only decoded while iterating [`TokenStore::records`].
#[derive(Debug, Clone)]
pub struct TokenStore {
    entries: Vec<StoreEntry>,
    index: HashMap<String, usize>,
    token_order: Vec<String>,
    master_key: Option<Vec<u8>>,
}

impl TokenStore {
    pub fn parse(xml: &str) -> Result<Self, FormatError> {
        let document = Document::parse(xml)?;
        let root = document.root_element();

        if root.tag_name().name() != ROOT_ELEMENT {
            return Err(FormatError::UnexpectedRoot(
                root.tag_name().name().to_owned(),
            ));
        }

        let mut entries = Vec::new();

        for node in root.children().filter(|node| node.is_element()) {
            if node.tag_name().name() != ENTRY_ELEMENT {
                debug!(element = node.tag_name().name(), "Skipping non-string entry");
                continue;
            }

            let name = node.attribute("name").ok_or(FormatError::UnnamedEntry)?;

            entries.push(StoreEntry {
                name: name.to_owned(),
                value: node.text().unwrap_or_default().to_owned(),
            });
        }

        Self::from_entries(entries)
    }

    pub fn from_entries(entries: Vec<StoreEntry>) -> Result<Self, FormatError> {
        let token_order = match entries.iter().find(|entry| entry.name == TOKEN_ORDER_KEY) {
            Some(entry) => serde_json::from_str::<Vec<String>>(entry.value.as_str())
                .map_err(FormatError::TokenOrder)?,
            None => Vec::new(),
        };

        let index = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.name.clone(), position))
            .collect();

        Ok(Self {
            entries,
            index,
            token_order,
            master_key: None,
        })
    }

    /// Whether the store keeps its secrets encrypted under a master key.
    pub fn is_encrypted(&self) -> bool {
        self.index.contains_key(MASTER_KEY_KEY)
    }

    pub fn unlock(&mut self, password: &str) -> Result<(), UnlockError> {
        let encrypted_master_key = self
            .entry(MASTER_KEY_KEY)
            .ok_or(UnlockError::MissingMasterKey)
            .and_then(|key_data| {
                serde_json::from_str::<EncryptedMasterKey>(key_data)
                    .map_err(UnlockError::MasterKey)
            })?;

        self.master_key = Some(decrypt_master_key(&encrypted_master_key, password)?);
        Ok(())
    }

    /// Token names as arranged in the app, from the `tokenOrder` entry.
    pub fn token_order(&self) -> &[String] {
        self.token_order.as_slice()
    }

    /// Reorders entries to follow `tokenOrder`; unlisted entries keep their
    /// relative position after the listed ones.
    pub fn sort_by_token_order(&mut self) {
        let positions: HashMap<&str, usize> = self
            .token_order
            .iter()
            .enumerate()
            .map(|(position, name)| (name.as_str(), position))
            .collect();

        let mut entries = std::mem::take(&mut self.entries);
        entries.sort_by_key(|entry| {
            positions
                .get(entry.name.as_str())
                .copied()
                .unwrap_or(usize::MAX)
        });

        self.index = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.name.clone(), position))
            .collect();
        self.entries = entries;
    }

    /// Iterates over the tokens in the store, decoding each on demand.
    pub fn records(&self) -> Records<'_> {
        Records {
            store: self,
            entries: self.entries.iter(),
        }
    }

    fn entry(&self, name: &str) -> Option<&str> {
        self.index
            .get(name)
            .map(|position| self.entries[*position].value.as_str())
    }

    fn is_token_entry(&self, entry: &StoreEntry) -> bool {
        if entry.name == TOKEN_ORDER_KEY || entry.name == MASTER_KEY_KEY {
            return false;
        }

        match entry.name.strip_suffix(TOKEN_INFO_SUFFIX) {
            Some(base) => !self.index.contains_key(base),
            None => true,
        }
    }

    fn decode_entry(&self, entry: &StoreEntry) -> Result<TokenRecord, FieldError> {
        let info_key = format!("{}{}", entry.name, TOKEN_INFO_SUFFIX);

        match self.entry(info_key.as_str()) {
            Some(info) => {
                let token_info = parse_token_info(entry.name.as_str(), info)?;
                let secret = self.decrypt_secret(&token_info, entry)?;
                token_info.into_record(secret)
            }
            None => {
                let token_info = parse_token_info(entry.name.as_str(), entry.value.as_str())?;
                let secret = token_info
                    .secret
                    .as_ref()
                    .ok_or_else(|| token_info.error(FieldErrorKind::Missing("secret")))
                    .and_then(|secret| {
                        decode_secret(secret)
                            .map_err(|reason| token_info.error(FieldErrorKind::Secret(reason)))
                    })?;
                token_info.into_record(secret)
            }
        }
    }

    fn decrypt_secret(
        &self,
        token_info: &TokenInfo,
        entry: &StoreEntry,
    ) -> Result<Vec<u8>, FieldError> {
        let master_key = self
            .master_key
            .as_deref()
            .ok_or_else(|| token_info.error(FieldErrorKind::Locked))?;

        let encrypted_token_key_wrapper =
            serde_json::from_str::<EncryptedTokenKeyWrapper>(entry.value.as_str())
                .map_err(|err| token_info.error(FieldErrorKind::Json(err)))?;

        let encrypted_token_key =
            serde_json::from_str::<EncryptedKey>(encrypted_token_key_wrapper.key.as_str())
                .map_err(|err| token_info.error(FieldErrorKind::Json(err)))?;

        decrypt_token_key(&encrypted_token_key, master_key)
            .map_err(|reason| token_info.error(FieldErrorKind::Decrypt(reason)))
    }
}

/// Lazy sequence of the records in a [`TokenStore`].
pub struct Records<'a> {
    store: &'a TokenStore,
    entries: std::slice::Iter<'a, StoreEntry>,
}

impl Iterator for Records<'_> {
    type Item = Result<TokenRecord, FieldError>;

    fn next(&mut self) -> Option<Self::Item> {
        let store = self.store;
        let entry = self.entries.find(|entry| store.is_token_entry(entry))?;

        Some(store.decode_entry(entry))
    }
}

/// Decodes a secret as stored by FreeOTP (Java signed bytes) or as typed (base32).
fn decode_secret(secret: &Value) -> Result<Vec<u8>, String> {
    match secret {
        Value::Array(bytes) => bytes
            .iter()
            .map(|byte| match byte.as_i64() {
                Some(value @ -128..=255) => Ok(((value + 256) & 255) as u8),
                _ => Err(format!("invalid byte value {}", byte)),
            })
            .collect(),
        Value::String(encoded) => {
            decode_base32_secret(encoded.as_str()).map_err(|err| err.to_string())
        }
        other => Err(format!("expected a byte array or base32 string, got {}", other)),
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenInfo {
    #[serde(skip)]
    entry_name: String,
    algo: Option<String>,
    counter: Option<u64>,
    digits: Option<u32>,
    #[serde(default)]
    issuer_ext: String,
    #[serde(default)]
    issuer_int: String,
    #[serde(default)]
    issuer_alt: String,
    label: Option<String>,
    #[serde(default)]
    label_alt: String,
    period: Option<u64>,
    secret: Option<Value>,
    #[serde(rename = "type")]
    token_type: Option<String>,
    image: Option<String>,
    image_alt: Option<String>,
}

fn parse_token_info(entry_name: &str, data: &str) -> Result<TokenInfo, FieldError> {
    let mut token_info = serde_json::from_str::<TokenInfo>(data)
        .map_err(|err| FieldError::new(entry_name, FieldErrorKind::Json(err)))?;
    token_info.entry_name = entry_name.to_owned();

    Ok(token_info)
}

impl TokenInfo {
    /// Label as it appears in the URI path: `issuerExt:label` when an issuer was provisioned.
    fn full_label(&self) -> Option<String> {
        self.label.as_ref().map(|label| {
            if self.issuer_ext.is_empty() {
                label.to_owned()
            } else {
                format!("{}:{}", self.issuer_ext, label)
            }
        })
    }

    fn error(&self, kind: FieldErrorKind) -> FieldError {
        FieldError::new(
            self.full_label().unwrap_or_else(|| self.entry_name.clone()),
            kind,
        )
    }

    fn into_record(self, secret: Vec<u8>) -> Result<TokenRecord, FieldError> {
        let label = self
            .full_label()
            .ok_or_else(|| self.error(FieldErrorKind::Missing("label")))?;

        if secret.is_empty() {
            return Err(self.error(FieldErrorKind::EmptySecret));
        }

        let algorithm = match self.algo.as_deref() {
            Some(algo) => TokenAlgorithm::from_name(algo)
                .ok_or_else(|| self.error(FieldErrorKind::Algorithm(algo.to_owned())))?,
            None => TokenAlgorithm::Sha1,
        };

        let digits = self.digits.unwrap_or(6);
        if digits != 6 && digits != 8 {
            return Err(self.error(FieldErrorKind::Digits(digits)));
        }

        let token_type = match self.token_type.as_deref().map(str::to_ascii_uppercase) {
            Some(ref token_type) if token_type == "HOTP" => TokenType::Hotp {
                counter: self.counter.unwrap_or(0),
            },
            Some(ref token_type) if token_type == "TOTP" => self.totp()?,
            None => self.totp()?,
            Some(_) => {
                return Err(self.error(FieldErrorKind::TokenType(
                    self.token_type.clone().unwrap_or_default(),
                )))
            }
        };

        let issuer = [
            &self.issuer_int,
            &self.issuer_ext,
            &self.issuer_alt,
            &self.label_alt,
        ]
        .into_iter()
        .find(|issuer| !issuer.is_empty())
        .cloned();

        let image = [&self.image, &self.image_alt]
            .into_iter()
            .flatten()
            .find(|image| !image.is_empty())
            .cloned();

        Ok(TokenRecord {
            issuer,
            label,
            secret,
            algorithm,
            digits,
            token_type,
            image,
        })
    }

    fn totp(&self) -> Result<TokenType, FieldError> {
        match self.period.unwrap_or(DEFAULT_PERIOD) {
            0 => Err(self.error(FieldErrorKind::Period)),
            period => Ok(TokenType::Totp { period }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::parsers::decrypt_keys::tests::{encrypt_key, encrypt_master_key};

    const HELLO_SECRET: &[u8] = b"Hello!\xde\xad\xbe\xef";

    fn store_xml(entries: &[(&str, &str)]) -> String {
        let mut xml = String::from("<?xml version='1.0' encoding='utf-8' standalone='yes' ?>\n<map>\n");
        for (name, value) in entries {
            xml.push_str(&format!(
                "    <string name=\"{}\">{}</string>\n",
                escape(name),
                escape(value)
            ));
        }
        xml.push_str("</map>\n");
        xml
    }

    fn escape(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('"', "&quot;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    }

    fn records(xml: &str) -> Vec<Result<TokenRecord, FieldError>> {
        TokenStore::parse(xml).unwrap().records().collect()
    }

    #[test]
    fn decodes_freeotp_token() {
        let xml = store_xml(&[
            (
                "Example:alice",
                r#"{"algo":"SHA256","counter":0,"digits":8,"issuerExt":"Example","issuerInt":"Example Inc","label":"alice","period":60,"secret":[72,101,108,108,111,33,-34,-83,-66,-17],"type":"TOTP","imageAlt":"content://icon"}"#,
            ),
            ("tokenOrder", r#"["Example:alice"]"#),
        ]);

        let records = records(&xml);
        assert_eq!(records.len(), 1);

        let record = records.into_iter().next().unwrap().unwrap();
        assert_eq!(
            record,
            TokenRecord {
                issuer: Some("Example Inc".to_owned()),
                label: "Example:alice".to_owned(),
                secret: HELLO_SECRET.to_vec(),
                algorithm: TokenAlgorithm::Sha256,
                digits: 8,
                token_type: TokenType::Totp { period: 60 },
                image: Some("content://icon".to_owned()),
            }
        );
    }

    #[test]
    fn yields_records_in_document_order() {
        let xml = store_xml(&[
            ("c", r#"{"label":"charlie","secret":"MZXW6==="}"#),
            ("tokenOrder", r#"["a","b","c"]"#),
            ("a", r#"{"label":"alice","secret":"MZXW6==="}"#),
            ("b", r#"{"label":"bob","secret":"MZXW6==="}"#),
        ]);

        let labels: Vec<String> = records(&xml)
            .into_iter()
            .map(|record| record.unwrap().label)
            .collect();

        assert_eq!(labels, vec!["charlie", "alice", "bob"]);
    }

    #[test]
    fn records_restart_from_the_beginning() {
        let xml = store_xml(&[
            ("a", r#"{"label":"alice","secret":"MZXW6==="}"#),
            ("b", r#"{"label":"bob","secret":"MZXW6==="}"#),
        ]);
        let store = TokenStore::parse(&xml).unwrap();

        let mut first = store.records();
        first.next();

        assert_eq!(store.records().count(), 2);
        assert_eq!(first.count(), 1);
    }

    #[test]
    fn missing_optional_fields_use_defaults() {
        let xml = store_xml(&[("alice", r#"{"label":"alice","secret":"JBSWY3DPEHPK3PXP"}"#)]);

        let record = records(&xml).into_iter().next().unwrap().unwrap();

        assert_eq!(record.algorithm, TokenAlgorithm::Sha1);
        assert_eq!(record.digits, 6);
        assert_eq!(record.token_type, TokenType::Totp { period: 30 });
        assert_eq!(record.issuer, None);
        assert_eq!(record.image, None);
        assert_eq!(record.secret, HELLO_SECRET.to_vec());
    }

    #[test]
    fn hotp_token_keeps_counter() {
        let xml = store_xml(&[(
            "bob",
            r#"{"label":"bob","secret":[1,2,3],"type":"hotp","counter":5,"period":30}"#,
        )]);

        let record = records(&xml).into_iter().next().unwrap().unwrap();

        assert_eq!(record.token_type, TokenType::Hotp { counter: 5 });
    }

    #[test]
    fn malformed_secret_names_the_record() {
        let xml = store_xml(&[
            ("ok", r#"{"label":"fine","secret":"MZXW6==="}"#),
            ("Example:alice", r#"{"label":"alice","issuerExt":"Example","secret":"!!not base32!!"}"#),
        ]);

        let records = records(&xml);
        assert!(records[0].is_ok());

        let err = records[1].as_ref().unwrap_err();
        assert_eq!(err.record, "Example:alice");
        assert!(matches!(err.kind, FieldErrorKind::Secret(_)));
        assert!(err.to_string().contains("Example:alice"));
    }

    #[test]
    fn out_of_range_secret_bytes_are_rejected() {
        let xml = store_xml(&[("alice", r#"{"label":"alice","secret":[1,300]}"#)]);

        let err = records(&xml).into_iter().next().unwrap().unwrap_err();

        assert_eq!(err.record, "alice");
        assert!(matches!(err.kind, FieldErrorKind::Secret(_)));
    }

    #[test]
    fn secret_of_wrong_shape_names_the_label() {
        let xml = store_xml(&[
            ("entry-1", r#"{"label":"alice","secret":42}"#),
            ("entry-2", r#"{"label":"bob","secret":{}}"#),
            ("entry-3", r#"{"label":"carol","secret":[1,40000]}"#),
            ("entry-4", r#"{"label":"dave","secret":[1,"2"]}"#),
        ]);

        let errors: Vec<FieldError> = records(&xml)
            .into_iter()
            .map(|record| record.unwrap_err())
            .collect();

        let labels: Vec<&str> = errors.iter().map(|err| err.record.as_str()).collect();
        assert_eq!(labels, ["alice", "bob", "carol", "dave"]);
        assert!(errors
            .iter()
            .all(|err| matches!(err.kind, FieldErrorKind::Secret(_))));
    }

    #[test]
    fn issuer_falls_back_to_label_alt() {
        let xml = store_xml(&[
            ("alice", r#"{"label":"alice","labelAlt":"Example","secret":"MZXW6"}"#),
            (
                "bob",
                r#"{"label":"bob","issuerAlt":"Zeta","labelAlt":"Example","secret":"MZXW6"}"#,
            ),
            ("carol", r#"{"label":"carol","labelAlt":"","secret":"MZXW6"}"#),
        ]);

        let issuers: Vec<Option<String>> = records(&xml)
            .into_iter()
            .map(|record| record.unwrap().issuer)
            .collect();

        assert_eq!(
            issuers,
            [Some("Example".to_owned()), Some("Zeta".to_owned()), None]
        );
    }

    #[test]
    fn missing_required_fields() {
        let xml = store_xml(&[
            ("no-secret", r#"{"label":"alice"}"#),
            ("no-label", r#"{"secret":"MZXW6==="}"#),
            ("empty-secret", r#"{"label":"carol","secret":[]}"#),
        ]);

        let errors: Vec<FieldError> = records(&xml)
            .into_iter()
            .map(|record| record.unwrap_err())
            .collect();

        assert_eq!(errors[0].record, "alice");
        assert!(matches!(errors[0].kind, FieldErrorKind::Missing("secret")));
        assert_eq!(errors[1].record, "no-label");
        assert!(matches!(errors[1].kind, FieldErrorKind::Missing("label")));
        assert_eq!(errors[2].record, "carol");
        assert!(matches!(errors[2].kind, FieldErrorKind::EmptySecret));
    }

    #[test]
    fn unsupported_values_are_field_errors() {
        let xml = store_xml(&[
            ("a", r#"{"label":"a","secret":"MZXW6===","algo":"MD5"}"#),
            ("b", r#"{"label":"b","secret":"MZXW6===","digits":7}"#),
            ("c", r#"{"label":"c","secret":"MZXW6===","type":"STEAM"}"#),
            ("d", r#"{"label":"d","secret":"MZXW6===","period":0}"#),
            ("e", "not json"),
        ]);

        let kinds: Vec<FieldErrorKind> = records(&xml)
            .into_iter()
            .map(|record| record.unwrap_err().kind)
            .collect();

        assert!(matches!(&kinds[0], FieldErrorKind::Algorithm(algo) if algo == "MD5"));
        assert!(matches!(kinds[1], FieldErrorKind::Digits(7)));
        assert!(matches!(&kinds[2], FieldErrorKind::TokenType(kind) if kind == "STEAM"));
        assert!(matches!(kinds[3], FieldErrorKind::Period));
        assert!(matches!(kinds[4], FieldErrorKind::Json(_)));
    }

    #[test]
    fn empty_store_has_no_records() {
        assert_eq!(records("<map />").len(), 0);
        assert_eq!(
            records("<?xml version='1.0' encoding='utf-8' standalone='yes' ?>\n<map>\n</map>").len(),
            0
        );
    }

    #[test]
    fn non_string_entries_are_ignored() {
        let xml = r#"<map><int name="version" value="2" /><string name="a">{"label":"a","secret":"MZXW6==="}</string></map>"#;

        assert_eq!(records(xml).len(), 1);
    }

    #[test]
    fn document_shape_errors() {
        assert!(matches!(TokenStore::parse("not xml"), Err(FormatError::Xml(_))));
        assert!(matches!(TokenStore::parse(""), Err(FormatError::Xml(_))));
        assert!(matches!(
            TokenStore::parse("<set />"),
            Err(FormatError::UnexpectedRoot(root)) if root == "set"
        ));
        assert!(matches!(
            TokenStore::parse("<map><string>{}</string></map>"),
            Err(FormatError::UnnamedEntry)
        ));
        assert!(matches!(
            TokenStore::parse(r#"<map><string name="tokenOrder">{}</string></map>"#),
            Err(FormatError::TokenOrder(_))
        ));
    }

    #[test]
    fn sorts_by_token_order() {
        let xml = store_xml(&[
            ("c", r#"{"label":"charlie","secret":"MZXW6==="}"#),
            ("x", r#"{"label":"xavier","secret":"MZXW6==="}"#),
            ("a", r#"{"label":"alice","secret":"MZXW6==="}"#),
            ("tokenOrder", r#"["a","c"]"#),
        ]);
        let mut store = TokenStore::parse(&xml).unwrap();
        store.sort_by_token_order();

        let labels: Vec<String> = store
            .records()
            .map(|record| record.unwrap().label)
            .collect();

        assert_eq!(store.token_order(), &["a".to_owned(), "c".to_owned()]);
        assert_eq!(labels, vec!["alice", "charlie", "xavier"]);
    }

    pub fn encrypted_store_xml(password: &str) -> String {
        let master_key = [5u8; 32];
        let master = encrypt_master_key(&master_key, password);
        let token_key = encrypt_key(HELLO_SECRET, &master_key, &[8u8; 12], "1111-2222");
        let wrapper = serde_json::json!({
            "key": serde_json::to_string(&token_key).unwrap(),
        });

        store_xml(&[
            ("masterKey", serde_json::to_string(&master).unwrap().as_str()),
            ("1111-2222", wrapper.to_string().as_str()),
            (
                "1111-2222-token",
                r#"{"algo":"SHA1","digits":6,"issuerExt":"Example","label":"alice","period":30,"type":"TOTP"}"#,
            ),
            ("tokenOrder", r#"["1111-2222"]"#),
        ])
    }

    #[test]
    fn decrypts_encrypted_store() {
        let mut store = TokenStore::parse(&encrypted_store_xml("hunter2")).unwrap();
        assert!(store.is_encrypted());

        store.unlock("hunter2").unwrap();
        let records: Vec<TokenRecord> = store.records().map(|record| record.unwrap()).collect();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label, "Example:alice");
        assert_eq!(records[0].secret, HELLO_SECRET.to_vec());
    }

    #[test]
    fn locked_store_reports_locked_records() {
        let store = TokenStore::parse(&encrypted_store_xml("hunter2")).unwrap();

        let err = store.records().next().unwrap().unwrap_err();

        assert_eq!(err.record, "Example:alice");
        assert!(matches!(err.kind, FieldErrorKind::Locked));
    }

    #[test]
    fn wrong_password_fails_unlock() {
        let mut store = TokenStore::parse(&encrypted_store_xml("hunter2")).unwrap();

        assert!(matches!(
            store.unlock("letmein"),
            Err(UnlockError::WrongPassword)
        ));
    }

    #[test]
    fn plain_store_cannot_be_unlocked() {
        let mut store = TokenStore::parse("<map />").unwrap();

        assert!(!store.is_encrypted());
        assert!(matches!(
            store.unlock("hunter2"),
            Err(UnlockError::MissingMasterKey)
        ));
    }
}
