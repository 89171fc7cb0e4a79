//! # Cirrus
//!
//! A tool-invocation broker that mediates between an LLM response composer
//! and cloud provider SDKs.
//!
//! The broker advertises a typed tool catalogue, resolves which cloud account
//! each session targets, dispatches capability calls against provider clients
//! under a deadline, and normalizes every result (data and errors alike) into
//! a structured outcome the model can reason about. All catalogue tools are
//! read-only; the only mutation the broker performs is switching a session's
//! active account.
//!
//! ## Quick Start
//!
//! ```ignore
//! use cirrus_core::{Broker, BrokerConfig, ToolCallRequest};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> cirrus_core::Result<()> {
//!     let config = BrokerConfig::load("accounts.json").await?;
//!     let broker = Broker::from_config(&config, Arc::new(cirrus_aws::AwsClientFactory))?;
//!
//!     // Advertise the catalogue to the model at session start.
//!     let tools = broker.advertisement();
//!
//!     // Execute a tool call the model requested.
//!     let request = ToolCallRequest::new("session-1", "list_instances");
//!     let response = broker.invoke(request).await;
//!     println!("{}", serde_json::to_string_pretty(&response).unwrap());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`catalog`]: the typed tool catalogue, with JSON schemas generated
//!   from input structs via `schemars`
//! - [`registry`]: configured accounts plus lazily constructed, cached
//!   provider clients
//! - [`session`]: per-conversation active-account state
//! - [`broker`]: the invocation pipeline tying the above together
//! - [`client`]: the provider-agnostic [`CloudClient`] trait; provider
//!   crates (cirrus-aws) implement it
//!
//! Provider SDKs never appear in this crate: clients are built through a
//! [`ClientFactory`], and everything a client returns is already normalized.

pub mod account;
pub mod broker;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod outcome;
pub mod registry;
pub mod session;
pub mod tools;

pub use account::{Account, AccountSummary, CredentialRef, CredentialRefParseError, ProviderKind};
pub use broker::{Broker, BrokerBuilder, DEFAULT_TOOL_TIMEOUT};
pub use catalog::{
    Capability, CatalogError, ToolAdvertisement, ToolCatalog, ToolDefinition,
};
pub use client::{
    AlarmRecord, BucketRecord, ClientError, CloudClient, CostGranularity, CostPeriod, CostQuery,
    CostReport, InstanceRecord, MonitoringQuery, ResourceKind, ResourceRecord,
};
pub use config::{AccountEntry, BrokerConfig, ConfigError};
pub use error::{Error, Result};
pub use events::{BrokerHook, InvocationEvent};
pub use outcome::{
    FailureKind, OutcomeKind, ToolCallError, ToolCallRequest, ToolCallResponse, ToolOutcome,
};
pub use registry::{AccountRegistry, AccountRegistryBuilder, ClientFactory, RegistryError};
pub use session::{SessionManager, SessionState, DEFAULT_SESSION_TTL};
pub use tools::builtin_catalog;
