// Certificate bundle files and the secret record built from them

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Error;

/// File suffix on disk paired with the field suffix stored in Vault.
///
/// The key file is `<domain>_key.key` but is stored as `<domain>_server.key`.
/// Existing secrets already use that field name, so both are kept as is.
const BUNDLE_PARTS: [(&str, &str); 4] = [
    ("intermediate.crt", "intermediate.crt"),
    ("root.crt", "root.crt"),
    ("server.crt", "server.crt"),
    ("key.key", "server.key"),
];

/// The four PEM payloads for one domain.
#[derive(Debug, Clone)]
pub struct CertificateBundle {
    domain: String,
    intermediate: String,
    root: String,
    server_cert: String,
    server_key: String,
}

impl CertificateBundle {
    /// Paths read for `domain`, in read order.
    pub fn file_paths(certs_dir: &Path, domain: &str) -> [PathBuf; 4] {
        BUNDLE_PARTS.map(|(file_suffix, _)| certs_dir.join(format!("{}_{}", domain, file_suffix)))
    }

    /// Read all four files. The first missing file aborts the whole read.
    pub fn read(certs_dir: &Path, domain: &str) -> Result<Self, Error> {
        let [intermediate, root, server_cert, server_key] = Self::file_paths(certs_dir, domain);

        Ok(Self {
            domain: domain.to_string(),
            intermediate: read_part(&intermediate)?,
            root: read_part(&root)?,
            server_cert: read_part(&server_cert)?,
            server_key: read_part(&server_key)?,
        })
    }

    pub fn into_record(self) -> SecretRecord {
        let contents = [self.intermediate, self.root, self.server_cert, self.server_key];
        let fields = BUNDLE_PARTS
            .iter()
            .zip(contents)
            .map(|((_, field_suffix), body)| (format!("{}_{}", self.domain, field_suffix), body))
            .collect();
        SecretRecord { fields }
    }
}

fn read_part(path: &Path) -> Result<String, Error> {
    tracing::debug!(path = %path.display(), "reading bundle file");
    std::fs::read_to_string(path).map_err(|source| {
        let path = path.display().to_string();
        if source.kind() == ErrorKind::NotFound {
            Error::FileNotFound { path }
        } else {
            Error::ReadFile { path, source }
        }
    })
}

/// Field name to content mapping submitted as a single KV write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SecretRecord {
    fields: BTreeMap<String, String>,
}

impl SecretRecord {
    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}
