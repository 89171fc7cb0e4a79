//! Account identity and credential references.
//!
//! An [`Account`] names a cloud account the broker can target. Credentials are
//! never stored inline; accounts carry a [`CredentialRef`] that the provider
//! client resolves at construction time (environment variables first, then a
//! provider-specific profile, then the default chain).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Cloud provider backing an account.
///
/// Only AWS ships a client today; the variants exist so configuration and
/// dispatch stay provider-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Aws,
    Gcp,
    Azure,
}

impl ProviderKind {
    /// Human-readable provider name for advertisements and summaries.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Aws => "Amazon Web Services",
            ProviderKind::Gcp => "Google Cloud Platform",
            ProviderKind::Azure => "Microsoft Azure",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderKind::Aws => "aws",
            ProviderKind::Gcp => "gcp",
            ProviderKind::Azure => "azure",
        };
        f.write_str(s)
    }
}

/// Opaque handle to credentials, resolved at client-construction time.
///
/// Serialized form is a string: `env:NAME`, `profile:NAME`, or `default`.
/// `Env("PROD")` means the provider client reads a named environment variable
/// pair (for AWS: `PROD_ACCESS_KEY_ID` / `PROD_SECRET_ACCESS_KEY`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CredentialRef {
    /// Resolve from a named environment-variable pair.
    Env(String),
    /// Resolve from a named provider profile (e.g. ~/.aws/credentials).
    Profile(String),
    /// Use the provider's default credential chain.
    Default,
}

/// Error for malformed credential reference strings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid credential reference '{0}' (expected 'env:NAME', 'profile:NAME', or 'default')")]
pub struct CredentialRefParseError(pub String);

impl FromStr for CredentialRef {
    type Err = CredentialRefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "default" {
            return Ok(CredentialRef::Default);
        }
        match s.split_once(':') {
            Some(("env", name)) if !name.is_empty() => Ok(CredentialRef::Env(name.to_string())),
            Some(("profile", name)) if !name.is_empty() => {
                Ok(CredentialRef::Profile(name.to_string()))
            }
            _ => Err(CredentialRefParseError(s.to_string())),
        }
    }
}

impl TryFrom<String> for CredentialRef {
    type Error = CredentialRefParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CredentialRef> for String {
    fn from(r: CredentialRef) -> String {
        r.to_string()
    }
}

impl fmt::Display for CredentialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialRef::Env(name) => write!(f, "env:{}", name),
            CredentialRef::Profile(name) => write!(f, "profile:{}", name),
            CredentialRef::Default => f.write_str("default"),
        }
    }
}

/// A named cloud account the broker can dispatch calls to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique id within the registry (e.g. "prod", "staging").
    pub id: String,
    /// Display name for summaries shown to the model.
    pub display_name: String,
    /// Provider backing this account.
    pub provider: ProviderKind,
    /// Provider region (e.g. "us-east-1").
    pub region: String,
    /// Credential handle, resolved when the client is constructed.
    pub credentials: CredentialRef,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// Account summary returned by the account-listing tools.
///
/// Deliberately excludes the credential reference.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AccountSummary {
    pub id: String,
    pub display_name: String,
    pub provider: ProviderKind,
    pub region: String,
    pub description: String,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        AccountSummary {
            id: account.id.clone(),
            display_name: account.display_name.clone(),
            provider: account.provider,
            region: account.region.clone(),
            description: account.description.clone(),
        }
    }
}
