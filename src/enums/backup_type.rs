use clap::ValueEnum;

const ANDROID_BACKUP_MAGIC: &[u8] = b"ANDROID BACKUP\n";
const JAVA_SERIALIZATION_MAGIC: &[u8] = &[0xAC, 0xED];

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum BackupType {
    /// Detect from the file contents
    Auto,
    /// Bare FreeOTP `tokens.xml` shared preferences
    TokensXml,
    /// Unencrypted `adb backup` archive of the FreeOTP app
    AndroidBackup,
    /// FreeOTP Java-serialized backup map
    #[value(name = "freeotp-backup")]
    FreeOtpBackup,
}

impl BackupType {
    /// Resolves `Auto` by sniffing the leading bytes of the input.
    pub fn detect(self, data: &[u8]) -> BackupType {
        match self {
            BackupType::Auto if data.starts_with(ANDROID_BACKUP_MAGIC) => BackupType::AndroidBackup,
            BackupType::Auto if data.starts_with(JAVA_SERIALIZATION_MAGIC) => {
                BackupType::FreeOtpBackup
            }
            BackupType::Auto => BackupType::TokensXml,
            explicit => explicit,
        }
    }
}
