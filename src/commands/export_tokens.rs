use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::io::{stderr, stdin, stdout, Write};
use std::path::PathBuf;
use termion::input::TermRead;
use tracing::{info, warn};

use crate::{
    enums::{BackupType, OutputFormat, SortOrder},
    errors::FormatError,
    formatters::{format_json, format_otpauth_uri, format_qr_codes},
    parsers::{parse_android_backup, parse_freeotp_backup, TokenStore},
    types::TokenRecord,
};

pub struct ExportOptions {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub backup_type: BackupType,
    pub format: OutputFormat,
    pub sort: SortOrder,
    pub skip_invalid: bool,
    pub password: Option<String>,
}

pub fn export_tokens(options: &ExportOptions) -> Result<()> {
    let data = fs::read(&options.input)
        .with_context(|| format!("Failed to read {}", options.input.display()))?;

    let mut store = open_store(&data, options.backup_type)?;

    if store.is_encrypted() {
        let password = match options.password.as_ref() {
            Some(password) => password.to_owned(),
            None => prompt_password()?,
        };
        store.unlock(password.as_str())?;
        info!("Token store unlocked");
    }

    if options.sort == SortOrder::App {
        if store.token_order().is_empty() {
            warn!("Token store has no tokenOrder, keeping document order");
        }
        store.sort_by_token_order();
    }

    let mut tokens = collect_tokens(&store, options.skip_invalid)?;

    if options.sort == SortOrder::Label {
        tokens.sort_by(|a, b| a.label.cmp(&b.label));
    }

    warn_duplicate_labels(&tokens);

    let rendered = match options.format {
        OutputFormat::Uri => tokens
            .iter()
            .map(|token| format!("{}\n", format_otpauth_uri(token)))
            .collect::<String>(),
        OutputFormat::Json => format!("{}\n", format_json(&tokens)?),
        OutputFormat::Qr => format_qr_codes(&tokens)
            .map_err(|err| anyhow!("Failed to render QR code: {}", err))?,
    };

    match options.output.as_ref() {
        Some(output) => fs::write(output, rendered)
            .with_context(|| format!("Failed to write {}", output.display()))?,
        None => {
            let mut stdout = stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }

    info!(count = tokens.len(), "Tokens exported");
    Ok(())
}

fn open_store(data: &[u8], backup_type: BackupType) -> Result<TokenStore> {
    let backup_type = backup_type.detect(data);
    info!(?backup_type, "Reading token store");

    let store = match backup_type {
        BackupType::AndroidBackup => {
            let xml = parse_android_backup(data)?;
            TokenStore::parse(String::from_utf8(xml).map_err(FormatError::from)?.as_str())?
        }
        BackupType::FreeOtpBackup => TokenStore::from_entries(parse_freeotp_backup(data)?)?,
        BackupType::TokensXml | BackupType::Auto => {
            let xml = String::from_utf8(data.to_vec()).map_err(FormatError::from)?;
            TokenStore::parse(xml.as_str())?
        }
    };

    Ok(store)
}

fn collect_tokens(store: &TokenStore, skip_invalid: bool) -> Result<Vec<TokenRecord>> {
    let mut tokens = Vec::new();

    for record in store.records() {
        match record {
            Ok(token) => tokens.push(token),
            Err(err) if skip_invalid => warn!(record = err.record.as_str(), "Skipping token: {}", err),
            Err(err) => return Err(err.into()),
        }
    }

    Ok(tokens)
}

fn warn_duplicate_labels(tokens: &[TokenRecord]) {
    let mut seen = HashSet::new();

    for token in tokens {
        if !seen.insert(token.label.as_str()) {
            warn!(label = token.label.as_str(), "Duplicate token label");
        }
    }
}

fn prompt_password() -> Result<String> {
    let stderr = stderr();
    let mut stderr = stderr.lock();
    let stdin = stdin();
    let mut stdin = stdin.lock();

    stderr.write_all(b"Enter backup password: ")?;
    stderr.flush()?;
    let password = stdin
        .read_passwd(&mut stderr)?
        .ok_or(anyhow!("No password entered"))?;
    stderr.write_all(b"\n")?;

    Ok(password)
}
