//! # Cirrus AWS
//!
//! AWS provider implementation for the cirrus tool-invocation broker.
//!
//! Implements [`cirrus_core::CloudClient`] over the official AWS SDK service
//! clients (EC2, S3, CloudWatch, Cost Explorer) and resolves the broker's
//! opaque credential references into SDK configs. Everything this crate
//! returns is already normalized: pagination is drained, records use the
//! broker's provider-agnostic field names, and SDK errors are classified
//! into the broker's error taxonomy before they leave.
//!
//! ```ignore
//! use cirrus_aws::AwsClientFactory;
//! use cirrus_core::{Broker, BrokerConfig};
//! use std::sync::Arc;
//!
//! let config = BrokerConfig::load("accounts.json").await?;
//! let broker = Broker::from_config(&config, Arc::new(AwsClientFactory))?;
//! ```

pub mod classify;
pub mod client;
pub mod convert;
pub mod credentials;

pub use classify::{classify_code, classify_error};
pub use client::{AwsClient, AwsClientFactory};
pub use credentials::sdk_config_for;
