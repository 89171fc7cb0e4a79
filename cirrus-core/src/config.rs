//! Startup configuration for accounts and broker policy.
//!
//! Configuration is loaded once at process start and turned into an immutable
//! [`crate::registry::AccountRegistry`] snapshot. `${VAR}` and
//! `${VAR:-default}` references in the file are expanded from the environment
//! before parsing, so credential *references* (never raw secrets) and regions
//! can vary per deployment.
//!
//! ```json
//! {
//!   "accounts": {
//!     "default": {
//!       "display_name": "Production",
//!       "provider": "aws",
//!       "region": "us-east-1",
//!       "credentials": "env:PROD_AWS",
//!       "description": "Main production account"
//!     },
//!     "staging": {
//!       "provider": "aws",
//!       "region": "us-west-2",
//!       "credentials": "profile:staging"
//!     }
//!   },
//!   "default_account": "default",
//!   "default_timeout_secs": 30
//! }
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::account::{Account, CredentialRef, CredentialRefParseError, ProviderKind};

/// Startup-fatal configuration errors.
///
/// The only error class allowed to abort process initialization; every
/// per-invocation error is recovered into a structured failure instead.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("account '{0}' is registered twice")]
    DuplicateAccount(String),

    #[error("account '{account}' is missing required field '{field}'")]
    MissingField {
        account: String,
        field: &'static str,
    },

    #[error("default_account '{0}' is not present in the account mapping")]
    UnknownDefaultAccount(String),

    #[error("configuration is missing '{0}'")]
    Incomplete(&'static str),

    #[error(transparent)]
    Credential(#[from] CredentialRefParseError),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_session_ttl_secs() -> u64 {
    3600
}

/// One account entry in the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountEntry {
    /// Display name; the account id is used when absent.
    #[serde(default)]
    pub display_name: Option<String>,
    pub provider: ProviderKind,
    pub region: String,
    /// Credential reference string: `env:NAME`, `profile:NAME`, `default`.
    pub credentials: String,
    #[serde(default)]
    pub description: String,
}

/// Top-level broker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    pub accounts: HashMap<String, AccountEntry>,
    /// Account new sessions start on. Must be present in `accounts`.
    pub default_account: String,
    /// Uniform capability deadline; individual tools may override it.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    /// Idle lifetime before sessions are purged.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

impl BrokerConfig {
    /// Parse configuration from a JSON string, expanding `${VAR}` references.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content);
        let config: BrokerConfig = serde_json::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Reject configurations the registry could not be built from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accounts.is_empty() {
            return Err(ConfigError::Incomplete("accounts"));
        }
        if !self.accounts.contains_key(&self.default_account) {
            return Err(ConfigError::UnknownDefaultAccount(
                self.default_account.clone(),
            ));
        }
        for (id, entry) in &self.accounts {
            if entry.region.is_empty() {
                return Err(ConfigError::MissingField {
                    account: id.clone(),
                    field: "region",
                });
            }
            if entry.credentials.is_empty() {
                return Err(ConfigError::MissingField {
                    account: id.clone(),
                    field: "credentials",
                });
            }
            // Fail fast on malformed references rather than at first use.
            entry.credentials.parse::<CredentialRef>()?;
        }
        Ok(())
    }

    /// Accounts in deterministic (id-sorted) order.
    pub fn accounts(&self) -> Result<Vec<Account>, ConfigError> {
        let mut ids: Vec<&String> = self.accounts.keys().collect();
        ids.sort();
        ids.into_iter()
            .map(|id| {
                let entry = &self.accounts[id];
                Ok(Account {
                    id: id.clone(),
                    display_name: entry.display_name.clone().unwrap_or_else(|| id.clone()),
                    provider: entry.provider,
                    region: entry.region.clone(),
                    credentials: entry.credentials.parse()?,
                    description: entry.description.clone(),
                })
            })
            .collect()
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

/// Expand environment variables in a string.
///
/// Supports:
/// - `${VAR}` - expands to the value of VAR, or empty string if not set
/// - `${VAR:-default}` - expands to the value of VAR, or "default" if not set
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_expr.push(c);
            }
            if !closed {
                // Unterminated reference; keep the literal text.
                result.push_str("${");
                result.push_str(&var_expr);
                continue;
            }

            let (name, default) = match var_expr.split_once(":-") {
                Some((name, default)) => (name, Some(default)),
                None => (var_expr.as_str(), None),
            };
            match std::env::var(name) {
                Ok(value) => result.push_str(&value),
                Err(_) => result.push_str(default.unwrap_or("")),
            }
        } else {
            result.push(ch);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> &'static str {
        r#"{
            "accounts": {
                "default": {
                    "display_name": "Production",
                    "provider": "aws",
                    "region": "us-east-1",
                    "credentials": "env:PROD_AWS",
                    "description": "Main production account"
                },
                "staging": {
                    "provider": "aws",
                    "region": "us-west-2",
                    "credentials": "profile:staging"
                }
            },
            "default_account": "default"
        }"#
    }

    #[test]
    fn test_parse_valid_config() {
        let config = BrokerConfig::parse(sample()).unwrap();
        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.default_account, "default");
        assert_eq!(config.default_timeout_secs, 30);
        assert_eq!(config.session_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_accounts_sorted_and_defaulted() {
        let config = BrokerConfig::parse(sample()).unwrap();
        let accounts = config.accounts().unwrap();
        let ids: Vec<&str> = accounts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["default", "staging"]);
        // display_name falls back to the id.
        assert_eq!(accounts[1].display_name, "staging");
        assert_eq!(
            accounts[0].credentials,
            CredentialRef::Env("PROD_AWS".to_string())
        );
    }

    #[test]
    fn test_absent_default_account_rejected() {
        let content = sample().replace("\"default_account\": \"default\"", "\"default_account\": \"phantom\"");
        let err = BrokerConfig::parse(&content).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDefaultAccount(id) if id == "phantom"));
    }

    #[test]
    fn test_empty_region_rejected() {
        let content = sample().replace("us-west-2", "");
        let err = BrokerConfig::parse(&content).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField { field: "region", .. }
        ));
    }

    #[test]
    fn test_malformed_credential_ref_rejected() {
        let content = sample().replace("profile:staging", "AKIARAWSECRET");
        assert!(matches!(
            BrokerConfig::parse(&content),
            Err(ConfigError::Credential(_))
        ));
    }

    #[test]
    fn test_env_expansion_with_default() {
        let expanded = expand_env_vars("region-${CIRRUS_TEST_UNSET_VAR:-us-east-1}");
        assert_eq!(expanded, "region-us-east-1");
    }

    #[test]
    fn test_env_expansion_reads_environment() {
        std::env::set_var("CIRRUS_TEST_REGION", "eu-central-1");
        let expanded = expand_env_vars("${CIRRUS_TEST_REGION}");
        assert_eq!(expanded, "eu-central-1");
        std::env::remove_var("CIRRUS_TEST_REGION");
    }

    #[test]
    fn test_env_expansion_leaves_plain_text() {
        assert_eq!(expand_env_vars("no variables here"), "no variables here");
        assert_eq!(expand_env_vars("cost: $5"), "cost: $5");
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        tokio::fs::write(&path, sample()).await.unwrap();
        let config = BrokerConfig::load(&path).await.unwrap();
        assert_eq!(config.accounts.len(), 2);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        assert!(matches!(
            BrokerConfig::load("/nonexistent/accounts.json").await,
            Err(ConfigError::Io(_))
        ));
    }
}
