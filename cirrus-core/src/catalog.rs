//! The typed tool catalogue.
//!
//! Built once at startup, immutable while serving, so concurrent readers need
//! no locking. Advertisement order is registration order, which keeps the
//! model-facing tool list stable across runs.

use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::client::ResourceKind;

/// Provider-agnostic operation a tool definition targets.
///
/// Most capabilities dispatch to the active account's [`crate::client::CloudClient`];
/// the session/registry capabilities are served by the broker itself, but flow
/// through the same `invoke` path as everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// List all resources of a kind on the active account.
    ListResources(ResourceKind),
    /// Describe one resource by kind and id on the active account.
    DescribeResource,
    /// Fetch monitoring alarms for the active account.
    GetMonitoring,
    /// Fetch cost data for the active account.
    GetCost,
    /// Change the session's active account.
    SwitchAccount,
    /// List registered accounts and the session's active one.
    ListAccounts,
    /// Summarize the session's active account.
    CurrentAccount,
    /// List supported cloud providers.
    ListProviders,
}

impl Capability {
    /// Whether dispatch needs a cloud client (versus registry/session state).
    pub fn needs_client(&self) -> bool {
        matches!(
            self,
            Capability::ListResources(_)
                | Capability::DescribeResource
                | Capability::GetMonitoring
                | Capability::GetCost
        )
    }
}

/// A registered, invocable tool.
///
/// Immutable once registered. Input schemas are generated from typed input
/// structs via `schemars`; output schemas describe the normalized payload the
/// broker returns on success.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Value,
    pub capability: Capability,
    /// True when repeating the call cannot change any state.
    pub idempotent: bool,
    /// Per-tool deadline override; the broker default applies when `None`.
    pub timeout: Option<Duration>,
}

impl ToolDefinition {
    /// Define a tool with schemas generated from its input/output types.
    pub fn new<I: JsonSchema, O: JsonSchema>(
        name: impl Into<String>,
        description: impl Into<String>,
        capability: Capability,
    ) -> Self {
        ToolDefinition {
            name: name.into(),
            description: description.into(),
            input_schema: schema_of::<I>(),
            output_schema: schema_of::<O>(),
            capability,
            idempotent: true,
            timeout: None,
        }
    }

    pub fn non_idempotent(mut self) -> Self {
        self.idempotent = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Generate the JSON schema for a type.
pub fn schema_of<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema).expect("Failed to serialize schema")
}

/// Catalogue advertisement entry shown to the model at session start.
#[derive(Debug, Clone, Serialize)]
pub struct ToolAdvertisement {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Value,
}

/// Errors from catalogue registration and lookup.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

/// Registry of invocable tools, ordered by registration.
#[derive(Debug, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Fails on a name collision; the catalogue is built
    /// once at process start and never mutated afterwards.
    pub fn register(&mut self, definition: ToolDefinition) -> Result<(), CatalogError> {
        if self.index.contains_key(&definition.name) {
            return Err(CatalogError::DuplicateTool(definition.name));
        }
        self.index.insert(definition.name.clone(), self.tools.len());
        self.tools.push(definition);
        Ok(())
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Result<&ToolDefinition, CatalogError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| CatalogError::UnknownTool(name.to_string()))
    }

    /// All tools in registration order.
    pub fn describe_all(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Model-facing advertisement, in registration order.
    pub fn advertisement(&self) -> Vec<ToolAdvertisement> {
        self.tools
            .iter()
            .map(|t| ToolAdvertisement {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.input_schema.clone(),
                output_schema: t.output_schema.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
