use colored::Colorize;

use crate::backend::{SecretBackend, WriteAck};
use crate::bundle::CertificateBundle;
use crate::config::UploadSettings;
use crate::error::Error;

/// Print a dimmed status message (for progress steps)
fn status(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a success message with checkmark
fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg.green());
}

/// Where a bundle was written and what the backend answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub path: String,
    pub ack: WriteAck,
}

/// Fails with [`Error::NotAuthenticated`] unless the backend accepts the
/// current credentials. Logging in is left to the operator.
pub fn check_authenticated(backend: &impl SecretBackend) -> Result<(), Error> {
    if backend.is_authenticated()? {
        Ok(())
    } else {
        Err(Error::NotAuthenticated {
            address: backend.address().to_string(),
        })
    }
}

/// Read the domain's bundle and store it as one new secret version.
///
/// Nothing is sent unless all four files were read.
pub fn write_secret(
    backend: &impl SecretBackend,
    settings: &UploadSettings,
    domain: &str,
) -> Result<WriteOutcome, Error> {
    let record = CertificateBundle::read(&settings.certs_dir, domain)?.into_record();
    let path = settings.path_for(domain);
    tracing::debug!(
        path = %path,
        fields = ?record.field_names().collect::<Vec<_>>(),
        "submitting certificate bundle"
    );

    let ack = backend.write(&path, &record)?;
    Ok(WriteOutcome { path, ack })
}

pub struct App<B> {
    backend: B,
    settings: UploadSettings,
}

impl<B: SecretBackend> App<B> {
    pub fn new(backend: B, settings: UploadSettings) -> Self {
        Self { backend, settings }
    }

    pub fn run(&self, domain: &str) -> Result<WriteOutcome, Error> {
        check_authenticated(&self.backend)?;

        status(&format!(
            "Uploading {} bundle from {}...",
            domain,
            self.settings.certs_dir.display()
        ));
        let outcome = write_secret(&self.backend, &self.settings, domain)?;

        success(&format!(
            "Secret written successfully at {} with version: {}",
            outcome.path, outcome.ack.version
        ));
        tracing::debug!(created = ?outcome.ack.created_time, "write acknowledged");
        Ok(outcome)
    }
}
