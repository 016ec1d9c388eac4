// Configuration loaded from the .env file

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;

pub const ENV_FILE: &str = ".env";

const DEFAULT_KV_MOUNT: &str = "secret";
const DEFAULT_SECRET_PATH: &str = "ssl_certs";
const DEFAULT_CERTS_DIR: &str = "certs";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Immutable key/value view of the .env file.
///
/// Values are only ever read from the file; the process environment is left
/// untouched. Empty values count as absent.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: HashMap<String, String>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let iter = match dotenvy::from_path_iter(path) {
            Ok(iter) => iter,
            Err(e) if e.not_found() => {
                tracing::debug!(path = %path.display(), "no env file, using empty configuration");
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::ConfigParse(e.to_string())),
        };

        let mut values = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| Error::ConfigParse(e.to_string()))?;
            values.insert(key, value);
        }
        tracing::debug!(path = %path.display(), keys = values.len(), "loaded env file");
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, key: &'static str) -> Result<&str, Error> {
        self.get(key).ok_or(Error::MissingConfigKey(key))
    }

    fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    fn flag(&self, key: &'static str) -> Result<bool, Error> {
        match self.get(key) {
            None => Ok(false),
            Some(v) => match v.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Ok(true),
                "0" | "false" | "no" => Ok(false),
                _ => Err(Error::InvalidConfig {
                    key,
                    reason: format!("expected a boolean, got '{}'", v),
                }),
            },
        }
    }
}

impl FromIterator<(String, String)> for Config {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}

/// Connection settings for the Vault client.
#[derive(Debug, Clone)]
pub struct VaultSettings {
    pub address: String,
    pub token: Option<String>,
    pub namespace: Option<String>,
    pub mount: String,
    pub timeout: Duration,
    pub verify: bool,
    pub ca_cert: Option<String>,
}

impl VaultSettings {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let address = config.require("VAULT_ADDR")?;
        url::Url::parse(address).map_err(|e| Error::InvalidConfig {
            key: "VAULT_ADDR",
            reason: e.to_string(),
        })?;

        let timeout = match config.get("VAULT_TIMEOUT") {
            Some(v) => v.parse::<u64>().map_err(|_| Error::InvalidConfig {
                key: "VAULT_TIMEOUT",
                reason: format!("expected whole seconds, got '{}'", v),
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if timeout == 0 {
            return Err(Error::InvalidConfig {
                key: "VAULT_TIMEOUT",
                reason: "must be at least 1 second".to_string(),
            });
        }

        Ok(Self {
            address: address.to_string(),
            token: resolve_token(
                config.get("VAULT_TOKEN"),
                std::env::var("VAULT_TOKEN").ok(),
                token_file_path(),
            ),
            namespace: config.get("VAULT_NAMESPACE").map(str::to_string),
            mount: config.get_or("VAULT_KV_MOUNT", DEFAULT_KV_MOUNT).to_string(),
            timeout: Duration::from_secs(timeout),
            verify: !config.flag("VAULT_SKIP_VERIFY")?,
            ca_cert: config.get("VAULT_CACERT").map(str::to_string),
        })
    }
}

/// Where certificate bundles are read from and where they land in Vault.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub certs_dir: PathBuf,
    pub secret_path: String,
}

impl UploadSettings {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let secret_path = config
            .get_or("VAULT_SECRET_PATH", DEFAULT_SECRET_PATH)
            .trim_matches('/');
        if secret_path.is_empty() {
            return Err(Error::InvalidConfig {
                key: "VAULT_SECRET_PATH",
                reason: "base path must not be empty".to_string(),
            });
        }

        Ok(Self {
            certs_dir: PathBuf::from(config.get_or("CERTS_DIR", DEFAULT_CERTS_DIR)),
            secret_path: secret_path.to_string(),
        })
    }

    /// Secret path for a domain, relative to the KV mount.
    pub fn path_for(&self, domain: &str) -> String {
        format!("{}/{}", self.secret_path, domain)
    }
}

/// ~/.vault-token, as written by `vault login`.
fn token_file_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".vault-token"))
}

// .env first, then the environment, then the token helper file.
fn resolve_token(
    configured: Option<&str>,
    from_env: Option<String>,
    token_file: Option<PathBuf>,
) -> Option<String> {
    if let Some(token) = configured {
        return Some(token.to_string());
    }
    if let Some(token) = from_env.filter(|t| !t.is_empty()) {
        return Some(token);
    }
    let token = std::fs::read_to_string(token_file?).ok()?;
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config(pairs: &[(&str, &str)]) -> Config {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn load_reads_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "VAULT_ADDR=http://127.0.0.1:8200").unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "VAULT_NAMESPACE=\"infra\"").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.get("VAULT_ADDR"), Some("http://127.0.0.1:8200"));
        assert_eq!(config.get("VAULT_NAMESPACE"), Some("infra"));
    }

    #[test]
    fn missing_env_file_is_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join(".env")).unwrap();
        assert!(config.get("VAULT_ADDR").is_none());
    }

    #[test]
    fn missing_address_fails_at_client_settings() {
        let err = VaultSettings::from_config(&config(&[("VAULT_TOKEN", "t")])).unwrap_err();
        assert!(matches!(err, Error::MissingConfigKey("VAULT_ADDR")));

        let err = VaultSettings::from_config(&config(&[("VAULT_ADDR", "")])).unwrap_err();
        assert!(matches!(err, Error::MissingConfigKey("VAULT_ADDR")));
    }

    #[test]
    fn invalid_address_is_rejected() {
        let err = VaultSettings::from_config(&config(&[("VAULT_ADDR", "not a url")])).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { key: "VAULT_ADDR", .. }));
    }

    #[test]
    fn vault_settings_defaults_and_overrides() {
        let settings = VaultSettings::from_config(&config(&[
            ("VAULT_ADDR", "https://vault.example.com"),
            ("VAULT_TOKEN", "s.abc"),
        ]))
        .unwrap();
        assert_eq!(settings.mount, "secret");
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert!(settings.verify);
        assert_eq!(settings.token.as_deref(), Some("s.abc"));

        let settings = VaultSettings::from_config(&config(&[
            ("VAULT_ADDR", "https://vault.example.com"),
            ("VAULT_KV_MOUNT", "kv"),
            ("VAULT_TIMEOUT", "5"),
            ("VAULT_SKIP_VERIFY", "true"),
        ]))
        .unwrap();
        assert_eq!(settings.mount, "kv");
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert!(!settings.verify);
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = VaultSettings::from_config(&config(&[
            ("VAULT_ADDR", "https://vault.example.com"),
            ("VAULT_TIMEOUT", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { key: "VAULT_TIMEOUT", .. }));

        let err = VaultSettings::from_config(&config(&[
            ("VAULT_ADDR", "https://vault.example.com"),
            ("VAULT_TIMEOUT", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { key: "VAULT_TIMEOUT", .. }));
    }

    #[test]
    fn token_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let token_file = dir.path().join(".vault-token");
        std::fs::write(&token_file, "from-file\n").unwrap();

        assert_eq!(
            resolve_token(Some("from-config"), Some("from-env".into()), Some(token_file.clone())),
            Some("from-config".to_string())
        );
        assert_eq!(
            resolve_token(None, Some("from-env".into()), Some(token_file.clone())),
            Some("from-env".to_string())
        );
        assert_eq!(
            resolve_token(None, None, Some(token_file)),
            Some("from-file".to_string())
        );
        assert_eq!(resolve_token(None, None, Some(dir.path().join("absent"))), None);
        assert_eq!(resolve_token(None, None, None), None);
    }

    #[test]
    fn upload_settings_paths() {
        let settings = UploadSettings::from_config(&Config::default()).unwrap();
        assert_eq!(settings.certs_dir, PathBuf::from("certs"));
        assert_eq!(settings.path_for("example.com"), "ssl_certs/example.com");

        let settings = UploadSettings::from_config(&config(&[
            ("CERTS_DIR", "/etc/ssl/bundles"),
            ("VAULT_SECRET_PATH", "/tls/prod/"),
        ]))
        .unwrap();
        assert_eq!(settings.certs_dir, PathBuf::from("/etc/ssl/bundles"));
        assert_eq!(settings.path_for("a.org"), "tls/prod/a.org");
    }

    #[test]
    fn empty_secret_path_is_rejected() {
        for value in ["/", "//"] {
            let err = UploadSettings::from_config(&config(&[("VAULT_SECRET_PATH", value)])).unwrap_err();
            assert!(matches!(err, Error::InvalidConfig { key: "VAULT_SECRET_PATH", .. }));
        }
    }
}
