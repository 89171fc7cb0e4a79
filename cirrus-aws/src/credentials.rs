//! Credential-reference resolution for AWS accounts.
//!
//! A [`CredentialRef`] is resolved into an SDK config at client-construction
//! time. `env:NAME` reads the `<NAME>_ACCESS_KEY_ID` / `<NAME>_SECRET_ACCESS_KEY`
//! variable pair (plus an optional `<NAME>_SESSION_TOKEN`), `profile:NAME`
//! selects a profile from the shared AWS config files, and `default` walks the
//! standard credential chain (environment, shared files, IMDS, SSO).

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_types::region::Region;
use aws_types::SdkConfig;

use cirrus_core::{Account, ClientError, CredentialRef};

/// Load an SDK config for an account, resolving its credential reference.
///
/// Fails with [`ClientError::Credential`] when an `env:` reference names
/// variables that are not set; never falls through to another source.
pub async fn sdk_config_for(account: &Account) -> Result<SdkConfig, ClientError> {
    let loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(account.region.clone()));

    let loader = match &account.credentials {
        CredentialRef::Default => loader,
        CredentialRef::Profile(name) => loader.profile_name(name),
        CredentialRef::Env(name) => {
            let access_key = read_env(name, "ACCESS_KEY_ID")?;
            let secret_key = read_env(name, "SECRET_ACCESS_KEY")?;
            let session_token = std::env::var(format!("{}_SESSION_TOKEN", name)).ok();
            loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                session_token,
                None,
                "cirrus-env",
            ))
        }
    };

    Ok(loader.load().await)
}

fn read_env(name: &str, suffix: &str) -> Result<String, ClientError> {
    let var = format!("{}_{}", name, suffix);
    std::env::var(&var).map_err(|_| {
        ClientError::Credential(format!("environment variable '{}' is not set", var))
    })
}
