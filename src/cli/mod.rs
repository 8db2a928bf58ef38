use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::{
    commands::{export_tokens, ExportOptions},
    enums::{BackupType, OutputFormat, SortOrder},
    logging::{init_logging, LogLevel},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to FreeOTP tokens.xml, Android backup or FreeOTP backup file
    #[arg(value_name = "INPUT")]
    input: PathBuf,
    /// Path to output file (stdout if omitted)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,
    /// Input type (detected from file contents by default)
    #[arg(short = 't', long = "type", value_name = "TYPE", default_value = "auto")]
    backup_type: BackupType,
    /// Output format
    #[arg(short, long, value_name = "FORMAT", default_value = "uri")]
    format: OutputFormat,
    /// Order of exported tokens [default: label for qr, document otherwise]
    #[arg(short, long, value_name = "ORDER")]
    sort: Option<SortOrder>,
    /// Skip malformed tokens with a warning instead of aborting
    #[arg(long)]
    skip_invalid: bool,
    /// Password of an encrypted token store (prompted for if needed and omitted)
    #[arg(short, long, env = "FREEOTP_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// Log level (overrides RUST_LOG)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<LogLevel>,
}

impl Cli {
    pub fn run() -> Result<()> {
        let cli = Cli::parse();

        init_logging(cli.log_level);

        export_tokens(&cli.into_options())
    }

    fn into_options(self) -> ExportOptions {
        ExportOptions {
            input: self.input,
            output: self.output,
            backup_type: self.backup_type,
            format: self.format,
            sort: self.sort.unwrap_or(self.format.default_sort()),
            skip_invalid: self.skip_invalid,
            password: self.password,
        }
    }
}
