// Secret backends - trait + Vault implementation

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Runtime;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::{kv2, token};

use crate::bundle::SecretRecord;
use crate::config::VaultSettings;
use crate::error::Error;

/// Acknowledgment returned by the backend for a versioned write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteAck {
    pub version: u64,
    pub created_time: Option<String>,
}

pub trait SecretBackend {
    /// Address shown to the operator in login instructions.
    fn address(&self) -> &str;
    fn is_authenticated(&self) -> Result<bool, Error>;
    /// Create or update the secret at `path`, producing a new version.
    fn write(&self, path: &str, record: &SecretRecord) -> Result<WriteAck, Error>;
}

// --- Vault KV v2 ---

/// Vault client bound to one address and KV v2 mount.
///
/// vaultrs is async; every call is driven to completion on a private
/// current-thread runtime, so callers see plain blocking functions.
pub struct VaultBackend {
    runtime: Runtime,
    client: VaultClient,
    address: String,
    mount: String,
    timeout: Duration,
    has_token: bool,
}

impl VaultBackend {
    pub fn new(settings: &VaultSettings) -> Result<Self, Error> {
        let mut builder = VaultClientSettingsBuilder::default();
        builder
            .address(&settings.address)
            .token(settings.token.clone().unwrap_or_default())
            .namespace(settings.namespace.clone())
            .verify(settings.verify)
            .ca_certs(settings.ca_cert.iter().cloned().collect());

        let client_settings = builder.build().map_err(|e| Error::InvalidConfig {
            key: "VAULT_ADDR",
            reason: e.to_string(),
        })?;
        let client = VaultClient::new(client_settings)
            .map_err(|e| Error::Backend(format!("Failed to create Vault client: {}", e)))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        tracing::debug!(
            address = %settings.address,
            mount = %settings.mount,
            timeout_secs = settings.timeout.as_secs(),
            "vault client ready"
        );

        Ok(Self {
            runtime,
            client,
            address: settings.address.clone(),
            mount: settings.mount.clone(),
            timeout: settings.timeout,
            has_token: settings.token.is_some(),
        })
    }

    /// Drive one request to completion, bounded by the configured timeout.
    fn call<T>(
        &self,
        operation: &'static str,
        request: impl Future<Output = Result<T, ClientError>>,
    ) -> Result<Result<T, ClientError>, Error> {
        self.runtime
            .block_on(async { tokio::time::timeout(self.timeout, request).await })
            .map_err(|_| {
                tracing::debug!(operation, timeout_secs = self.timeout.as_secs(), "vault request timed out");
                Error::Timeout {
                    operation,
                    secs: self.timeout.as_secs(),
                }
            })
    }
}

impl SecretBackend for VaultBackend {
    fn address(&self) -> &str {
        &self.address
    }

    fn is_authenticated(&self) -> Result<bool, Error> {
        if !self.has_token {
            tracing::debug!("no vault token available");
            return Ok(false);
        }

        // Malformed or unknown tokens can come back as 400 or 404, not only 403.
        match self.call("token lookup", token::lookup_self(&self.client))? {
            Ok(_) => Ok(true),
            Err(ClientError::APIError { code: 400 | 401 | 403 | 404, errors }) => {
                tracing::debug!(?errors, "token rejected by vault");
                Ok(false)
            }
            Err(e) => {
                tracing::debug!(error = %e, address = %self.address, "token lookup failed");
                Err(Error::Backend(e.to_string()))
            }
        }
    }

    fn write(&self, path: &str, record: &SecretRecord) -> Result<WriteAck, Error> {
        let meta = self
            .call("secret write", kv2::set(&self.client, &self.mount, path, record))?
            .map_err(|e| {
                tracing::debug!(error = %e, mount = %self.mount, path = %path, "secret write failed");
                Error::Backend(format!("Failed to write secret '{}': {}", path, e))
            })?;

        tracing::info!(mount = %self.mount, path = %path, version = meta.version, "secret written");
        Ok(WriteAck {
            version: meta.version,
            created_time: Some(meta.created_time).filter(|t| !t.is_empty()),
        })
    }
}

// --- in-memory, for tests ---
