// Error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing configuration key: {0}")]
    MissingConfigKey(&'static str),
    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },
    #[error("Config parse error: {0}")]
    ConfigParse(String),
    #[error("Vault is not authenticated")]
    NotAuthenticated { address: String },
    #[error("File not found: {path}")]
    FileNotFound { path: String },
    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Vault {operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },
    #[error("Vault request failed: {0}")]
    Backend(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Text shown to the operator before the process exits.
    pub fn remediation(&self) -> Option<String> {
        match self {
            Error::NotAuthenticated { address } => Some(format!(
                "Vault is not authenticated. Please login to vault using \"vault login -address {}\".",
                address
            )),
            _ => None,
        }
    }
}
