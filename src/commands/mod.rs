mod export_tokens;

pub use export_tokens::{export_tokens, ExportOptions};
