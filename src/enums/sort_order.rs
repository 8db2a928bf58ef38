use clap::ValueEnum;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum SortOrder {
    /// Order of entries in the store
    Document,
    /// Order shown in the FreeOTP app (`tokenOrder`)
    App,
    /// Alphabetical by label
    Label,
}
