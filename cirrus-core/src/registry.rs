//! The account registry.
//!
//! Owns every [`Account`] and every constructed [`CloudClient`]. Clients are
//! built lazily on first use through a [`ClientFactory`] and cached for the
//! process lifetime; construction is single-flighted so concurrent callers
//! observe at most one build per account.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::account::Account;
use crate::client::{ClientError, CloudClient};
use crate::config::ConfigError;

/// Builds provider clients for accounts.
///
/// Keeps the registry free of SDK dependencies and lets tests inject mocks.
/// A factory resolves the account's credential reference and must fail with
/// [`ClientError::Credential`] when it cannot, never hand back a client with
/// silently empty credentials.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn build(&self, account: &Account) -> Result<Arc<dyn CloudClient>, ClientError>;
}

/// Errors from registry lookups and client acquisition.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

type ClientCell = Arc<OnceCell<Arc<dyn CloudClient>>>;

/// Immutable snapshot of configured accounts plus a lazy client cache.
pub struct AccountRegistry {
    accounts: HashMap<String, Account>,
    order: Vec<String>,
    default_account: String,
    factory: Arc<dyn ClientFactory>,
    clients: parking_lot::Mutex<HashMap<String, ClientCell>>,
}

/// Builder assembling a registry at startup.
///
/// All registration errors are [`ConfigError`]s: they abort initialization,
/// the only phase where that is allowed.
pub struct AccountRegistryBuilder {
    accounts: HashMap<String, Account>,
    order: Vec<String>,
    default_account: Option<String>,
    factory: Arc<dyn ClientFactory>,
}

impl AccountRegistryBuilder {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        AccountRegistryBuilder {
            accounts: HashMap::new(),
            order: Vec::new(),
            default_account: None,
            factory,
        }
    }

    /// Register an account. Fails on duplicate ids or missing required fields.
    pub fn register(mut self, account: Account) -> Result<Self, ConfigError> {
        if account.id.is_empty() {
            return Err(ConfigError::MissingField {
                account: "<unnamed>".to_string(),
                field: "id",
            });
        }
        if account.region.is_empty() {
            return Err(ConfigError::MissingField {
                account: account.id,
                field: "region",
            });
        }
        if self.accounts.contains_key(&account.id) {
            return Err(ConfigError::DuplicateAccount(account.id));
        }
        self.order.push(account.id.clone());
        self.accounts.insert(account.id.clone(), account);
        Ok(self)
    }

    /// Mark the account new sessions start on. Exactly one is required.
    pub fn default_account(mut self, account_id: impl Into<String>) -> Self {
        self.default_account = Some(account_id.into());
        self
    }

    pub fn build(self) -> Result<AccountRegistry, ConfigError> {
        let default_account = self
            .default_account
            .ok_or(ConfigError::Incomplete("default_account"))?;
        if !self.accounts.contains_key(&default_account) {
            return Err(ConfigError::UnknownDefaultAccount(default_account));
        }
        Ok(AccountRegistry {
            accounts: self.accounts,
            order: self.order,
            default_account,
            factory: self.factory,
            clients: parking_lot::Mutex::new(HashMap::new()),
        })
    }
}

impl std::fmt::Debug for AccountRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountRegistry")
            .field("accounts", &self.accounts)
            .field("order", &self.order)
            .field("default_account", &self.default_account)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for AccountRegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountRegistryBuilder")
            .field("accounts", &self.accounts)
            .field("order", &self.order)
            .field("default_account", &self.default_account)
            .finish_non_exhaustive()
    }
}

impl AccountRegistry {
    pub fn builder(factory: Arc<dyn ClientFactory>) -> AccountRegistryBuilder {
        AccountRegistryBuilder::new(factory)
    }

    /// Look up an account by id.
    pub fn resolve(&self, account_id: &str) -> Result<&Account, RegistryError> {
        self.accounts
            .get(account_id)
            .ok_or_else(|| RegistryError::UnknownAccount(account_id.to_string()))
    }

    /// Id of the account new sessions start on.
    pub fn default_account(&self) -> &str {
        &self.default_account
    }

    /// Accounts in registration order.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.order.iter().filter_map(|id| self.accounts.get(id))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Get the cached client for an account, constructing it on first use.
    ///
    /// Construction is single-flighted per account: the cell is created under
    /// the map lock, then initialized outside it, so concurrent callers for
    /// the same account await one build while other accounts proceed
    /// independently. A failed build leaves the cell empty, so the next
    /// invocation retries (credentials may have been fixed in the meantime).
    pub async fn get_client(&self, account_id: &str) -> Result<Arc<dyn CloudClient>, RegistryError> {
        let account = self.resolve(account_id)?.clone();
        let cell = {
            let mut clients = self.clients.lock();
            clients
                .entry(account_id.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        let client = cell
            .get_or_try_init(|| async {
                tracing::debug!(account = %account.id, provider = %account.provider, "constructing cloud client");
                self.factory.build(&account).await
            })
            .await?;
        Ok(client.clone())
    }

    /// Whether a client has already been constructed for an account.
    pub fn has_client(&self, account_id: &str) -> bool {
        self.clients
            .lock()
            .get(account_id)
            .map(|cell| cell.initialized())
            .unwrap_or(false)
    }
}
