use clap::ValueEnum;

use super::SortOrder;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    /// One otpauth:// URI per line
    Uri,
    /// JSON array of token objects
    Json,
    /// Label and QR code of each token, drawn with unicode blocks
    Qr,
}

impl OutputFormat {
    /// Order used when none is given on the command line.
    pub fn default_sort(&self) -> SortOrder {
        match *self {
            OutputFormat::Qr => SortOrder::Label,
            OutputFormat::Uri | OutputFormat::Json => SortOrder::Document,
        }
    }
}
