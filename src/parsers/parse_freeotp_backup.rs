use jaded::Parser;

use crate::errors::BackupError;

use super::parse_token_store::StoreEntry;

const HASHMAP_CLASS: &str = "java.util.HashMap";

/// Reads the `HashMap<String, String>` FreeOTP writes as its backup file.
/// Entries are returned in stream order.
pub fn parse_freeotp_backup(data: &[u8]) -> Result<Vec<StoreEntry>, BackupError> {
    let mut parser = Parser::new(data)
        .map_err(|err| BackupError::JavaObject(format!("{:?}", err)))?;

    let obj = parser
        .read()
        .map_err(|err| BackupError::JavaObject(format!("{:?}", err)))?;

    let java_hashmap = match obj {
        jaded::Content::Object(jaded::Value::Object(java_object)) => {
            if java_object.class_name() == HASHMAP_CLASS {
                Ok(java_object)
            } else {
                Err(BackupError::JavaObject(format!(
                    "unexpected class {}",
                    java_object.class_name()
                )))
            }
        }
        _ => Err(BackupError::JavaObject(
            "stream does not start with an object".to_owned(),
        )),
    }?;

    let mut fields = java_hashmap
        .get_annotation(0)
        .ok_or(BackupError::JavaObject("HashMap has no entries block".to_owned()))?;

    let _capacity = fields
        .read_i32()
        .map_err(|err| BackupError::JavaObject(format!("Failed to parse capacity: {:?}", err)))?;
    let size = fields
        .read_i32()
        .map_err(|err| BackupError::JavaObject(format!("Failed to parse size: {:?}", err)))?;

    let mut entries = Vec::with_capacity(size.max(0) as usize);

    for _ in 0..size {
        let name = fields
            .read_object_as::<String>()
            .map_err(|err| BackupError::JavaObject(format!("Failed to parse key: {:?}", err)))?;
        let value = fields
            .read_object_as::<String>()
            .map_err(|err| BackupError::JavaObject(format!("Failed to parse value: {:?}", err)))?;
        entries.push(StoreEntry { name, value });
    }

    Ok(entries)
}
