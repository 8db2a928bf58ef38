mod backup_type;
mod output_format;
mod sort_order;
mod token_algorithm;
mod token_type;

pub use backup_type::BackupType;
pub use output_format::OutputFormat;
pub use sort_order::SortOrder;
pub use token_algorithm::TokenAlgorithm;
pub use token_type::{TokenType, DEFAULT_PERIOD};
