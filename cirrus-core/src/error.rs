//! Top-level error type for cirrus setup paths.
//!
//! Per-invocation errors never surface here; the broker recovers them into
//! [`crate::outcome::ToolOutcome`] failures. This type covers the startup
//! phase (configuration, catalogue assembly, registry construction), where
//! aborting is the correct behavior.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::client::ClientError;
use crate::config::ConfigError;
use crate::registry::RegistryError;

/// Errors from building a broker and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed account or broker configuration. Startup-fatal.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tool registration failed while assembling the catalogue.
    #[error("catalogue error: {0}")]
    Catalog(#[from] CatalogError),

    /// Account lookup or client acquisition failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Provider client error outside the invoke path.
    #[error("client error: {0}")]
    Client(#[from] ClientError),
}

/// Result type for cirrus setup operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_converts() {
        let err: Error = ConfigError::Incomplete("accounts").into();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("accounts"));
    }

    #[test]
    fn test_catalog_error_converts() {
        let err: Error = CatalogError::DuplicateTool("list_instances".into()).into();
        assert!(matches!(err, Error::Catalog(_)));
    }

    #[test]
    fn test_client_error_converts_through_registry() {
        let registry_err = RegistryError::Client(ClientError::Credential("missing env".into()));
        let err: Error = registry_err.into();
        assert!(err.to_string().contains("missing env"));
    }
}
