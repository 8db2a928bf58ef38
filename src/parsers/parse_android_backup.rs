use flate2::read::ZlibDecoder;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tar::Archive;
use tracing::{debug, info};

use crate::errors::BackupError;

const BACKUP_MAGIC: &str = "ANDROID BACKUP";
const FREEOTP_PACKAGE: &str = "org.fedorahosted.freeotp";
const TOKENS_FILE: &str = "tokens.xml";

/// Path of the token store inside an app backup archive.
pub fn tokens_file_path() -> String {
    format!("apps/{}/sp/{}", FREEOTP_PACKAGE, TOKENS_FILE)
}

/// Extracts FreeOTP's `tokens.xml` from an unencrypted `adb backup` archive.
///
/// The archive starts with four text lines (magic, format version,
/// compression flag, encryption) followed by a tar stream, zlib-compressed
/// when the compression flag is `1`.
pub fn parse_android_backup(data: &[u8]) -> Result<Vec<u8>, BackupError> {
    let mut reader = BufReader::new(data);

    let magic = read_header_line(&mut reader)?;
    if magic != BACKUP_MAGIC {
        return Err(BackupError::InvalidHeader(format!(
            "unexpected magic '{}'",
            magic
        )));
    }

    let version = read_header_line(&mut reader)?;
    let compression = read_header_line(&mut reader)?;
    let encryption = read_header_line(&mut reader)?;

    debug!(
        version = version.as_str(),
        compression = compression.as_str(),
        encryption = encryption.as_str(),
        "Read Android backup header"
    );

    if encryption != "none" {
        return Err(BackupError::Encrypted(encryption));
    }

    match compression.as_str() {
        "1" => find_tokens_file(ZlibDecoder::new(reader)),
        "0" => find_tokens_file(reader),
        other => Err(BackupError::InvalidHeader(format!(
            "unknown compression flag '{}'",
            other
        ))),
    }
}

fn read_header_line(reader: &mut impl BufRead) -> Result<String, BackupError> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(BackupError::InvalidHeader("truncated header".to_owned()));
    }

    Ok(line.trim_end_matches('\n').to_owned())
}

fn find_tokens_file(tar_stream: impl Read) -> Result<Vec<u8>, BackupError> {
    let tokens_path = tokens_file_path();
    let mut archive = Archive::new(tar_stream);

    for entry in archive.entries()? {
        let mut entry = entry?;

        if entry.path()? == Path::new(tokens_path.as_str()) {
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents)?;

            info!(path = tokens_path.as_str(), "Found token store in backup");
            return Ok(contents);
        }
    }

    Err(BackupError::MissingTokens(tokens_path))
}
