//! The provider-agnostic cloud client interface.
//!
//! A [`CloudClient`] exposes the capability set the broker dispatches to:
//! listing and describing resources, reading monitoring alerts, and reading
//! cost data. Implementations live in provider crates (cirrus-aws today) and
//! must return fully materialized, normalized collections; pagination
//! cursors and provider-native response shapes never cross this boundary.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::account::ProviderKind;

/// Kinds of cloud resources the broker knows how to list and describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Compute instances (EC2, Compute Engine, ...).
    Instance,
    /// Object storage buckets (S3, Cloud Storage, ...).
    StorageBucket,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Instance => f.write_str("instance"),
            ResourceKind::StorageBucket => f.write_str("storage_bucket"),
        }
    }
}

/// Normalized compute instance record.
///
/// Field names are stable across providers; provider-native shapes are
/// converted before the record leaves the client.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstanceRecord {
    /// Provider-assigned instance id.
    pub id: String,
    /// Name tag, or the instance id when unnamed.
    pub name: String,
    /// Provider instance type (e.g. "t3.micro").
    pub instance_type: String,
    /// Lifecycle state: "running", "stopped", ...
    pub state: String,
    pub region: String,
    pub availability_zone: Option<String>,
    pub launch_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Normalized storage bucket record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BucketRecord {
    pub name: String,
    pub region: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// A resource record of any kind.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ResourceRecord {
    Instance(InstanceRecord),
    Bucket(BucketRecord),
}

impl ResourceRecord {
    /// Stable identifier used by describe lookups.
    pub fn id(&self) -> &str {
        match self {
            ResourceRecord::Instance(i) => &i.id,
            ResourceRecord::Bucket(b) => &b.name,
        }
    }
}

/// Normalized monitoring alarm record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AlarmRecord {
    pub name: String,
    pub description: Option<String>,
    /// Metric the alarm watches (e.g. "CPUUtilization").
    pub metric: Option<String>,
    pub namespace: Option<String>,
    /// Alarm state: "ok", "alarm", or "insufficient_data".
    pub state: String,
    pub reason: Option<String>,
    pub threshold: Option<f64>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Filter for monitoring queries. Empty filter matches every alarm.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringQuery {
    /// Restrict to a metric namespace (e.g. "AWS/EC2").
    pub namespace: Option<String>,
    /// Restrict to a normalized alarm state ("ok", "alarm", "insufficient_data").
    pub state: Option<String>,
}

/// Reporting granularity for cost queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CostGranularity {
    Daily,
    Monthly,
}

impl fmt::Display for CostGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostGranularity::Daily => f.write_str("daily"),
            CostGranularity::Monthly => f.write_str("monthly"),
        }
    }
}

/// A closed date range plus granularity for cost reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub granularity: CostGranularity,
}

/// One period of spend within a cost report.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CostPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub amount: f64,
    /// Currency unit as reported by the provider (e.g. "USD").
    pub unit: String,
}

/// Normalized cost report.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CostReport {
    pub granularity: CostGranularity,
    pub periods: Vec<CostPeriod>,
    /// Sum across periods, in `unit` of the first period.
    pub total: f64,
}

impl CostReport {
    pub fn new(granularity: CostGranularity, periods: Vec<CostPeriod>) -> Self {
        let total = periods.iter().map(|p| p.amount).sum();
        CostReport {
            granularity,
            periods,
            total,
        }
    }
}

/// Errors a provider client can surface to the broker.
///
/// The broker converts these into the structured failure shape of
/// [`crate::outcome::ToolOutcome`]; no provider-native error type crosses the
/// broker boundary.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Credential reference could not be resolved. Terminal for this call.
    #[error("credential resolution failed: {0}")]
    Credential(String),

    /// The credentials lack permission for the operation. Terminal.
    #[error("permission denied: {0}")]
    Forbidden(String),

    /// Rate limiting, connection failures, provider-side 5xx. Retryable.
    #[error("transient provider error: {0}")]
    Transient(String),

    /// The requested resource does not exist. The broker reports this as an
    /// empty successful result, not a failure.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Any other provider-reported error. Terminal.
    #[error("provider error: {0}")]
    Provider(String),
}

impl ClientError {
    /// Whether a caller could reasonably retry the same call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Transient(_))
    }
}

/// Polymorphic capability set implemented once per provider.
///
/// All operations are read-only. Implementations are shared across concurrent
/// invocations for the same account and must be safe for concurrent use. Every
/// call runs under the broker's deadline; implementations must not block
/// indefinitely outside of awaited I/O.
#[async_trait]
pub trait CloudClient: Send + Sync + fmt::Debug {
    /// Provider this client talks to.
    fn provider(&self) -> ProviderKind;

    /// Registry account id this client was built for.
    fn account_id(&self) -> &str;

    /// List all resources of a kind, with pagination fully materialized.
    async fn list_resources(&self, kind: ResourceKind) -> Result<Vec<ResourceRecord>, ClientError>;

    /// Describe a single resource. `Ok(None)` when it does not exist.
    async fn describe_resource(
        &self,
        kind: ResourceKind,
        id: &str,
    ) -> Result<Option<ResourceRecord>, ClientError>;

    /// Fetch monitoring alarms matching the query.
    async fn get_monitoring(&self, query: MonitoringQuery)
        -> Result<Vec<AlarmRecord>, ClientError>;

    /// Fetch a cost report for the query's date range.
    async fn get_cost(&self, query: CostQuery) -> Result<CostReport, ClientError>;
}
