//! The built-in tool set.
//!
//! Typed input structs with `#[derive(Deserialize, JsonSchema)]` generate the
//! catalogue's JSON schemas, so the model-facing contract and the broker's
//! argument parsing never drift apart. Doc comments on fields become schema
//! descriptions the model reads when deciding how to call a tool.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::account::AccountSummary;
use crate::catalog::{Capability, CatalogError, ToolCatalog, ToolDefinition};
use crate::client::{
    AlarmRecord, BucketRecord, CostGranularity, CostReport, InstanceRecord, ResourceKind,
    ResourceRecord,
};

/// Input for tools that take no arguments.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct EmptyInput {}

/// Input for the `switch_account` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SwitchAccountInput {
    /// Registry id of the account to switch this session to.
    pub account_id: String,
}

/// Input for the `describe_resource` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DescribeResourceInput {
    /// Kind of resource to describe.
    pub resource_kind: ResourceKind,
    /// Provider-assigned resource id (instance id, bucket name, ...).
    pub resource_id: String,
}

/// Input for the `get_monitoring_alerts` tool.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct MonitoringInput {
    /// Restrict to a metric namespace (e.g. "AWS/EC2").
    #[serde(default)]
    pub namespace: Option<String>,
    /// Restrict to an alarm state: "ok", "alarm", or "insufficient_data".
    #[serde(default)]
    pub state: Option<String>,
}

/// Input for the `get_cost_report` tool.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CostInput {
    /// Inclusive start date, ISO format (YYYY-MM-DD). Defaults to 30 days ago.
    #[serde(default)]
    pub start: Option<String>,
    /// Exclusive end date, ISO format (YYYY-MM-DD). Defaults to today.
    #[serde(default)]
    pub end: Option<String>,
    /// Reporting granularity. Defaults to monthly.
    #[serde(default)]
    pub granularity: Option<CostGranularity>,
}

/// Output of the `switch_account` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwitchAccountOutput {
    /// Account the session was on before the switch.
    pub previous_account: String,
    /// Account the session is on now.
    pub active_account: String,
}

/// Output of the `list_accounts` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AccountListOutput {
    pub accounts: Vec<AccountSummary>,
    /// The session's currently active account id.
    pub active_account: String,
}

/// Output of the `current_account` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CurrentAccountOutput {
    pub account: AccountSummary,
}

/// One provider entry in the `list_providers` output.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Output of the `list_providers` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProviderListOutput {
    pub providers: Vec<ProviderInfo>,
}

/// Build the standard catalogue advertised to the model.
///
/// Registration order here is the advertisement order.
pub fn builtin_catalog() -> Result<ToolCatalog, CatalogError> {
    let mut catalog = ToolCatalog::new();

    catalog.register(ToolDefinition::new::<EmptyInput, Vec<InstanceRecord>>(
        "list_instances",
        "List compute instances on the active cloud account, with type, state, \
         region, and tags.",
        Capability::ListResources(ResourceKind::Instance),
    ))?;

    catalog.register(ToolDefinition::new::<EmptyInput, Vec<BucketRecord>>(
        "list_storage_buckets",
        "List object storage buckets on the active cloud account.",
        Capability::ListResources(ResourceKind::StorageBucket),
    ))?;

    catalog.register(ToolDefinition::new::<
        DescribeResourceInput,
        Vec<ResourceRecord>,
    >(
        "describe_resource",
        "Describe a single resource by kind and id on the active cloud account. \
         Returns a one-element list, or an empty list when the resource does \
         not exist.",
        Capability::DescribeResource,
    ))?;

    catalog.register(ToolDefinition::new::<MonitoringInput, Vec<AlarmRecord>>(
        "get_monitoring_alerts",
        "Get monitoring alarms for the active cloud account, optionally \
         filtered by namespace or state.",
        Capability::GetMonitoring,
    ))?;

    catalog.register(ToolDefinition::new::<CostInput, CostReport>(
        "get_cost_report",
        "Get a spend report for the active cloud account over a date range.",
        Capability::GetCost,
    ))?;

    catalog.register(
        ToolDefinition::new::<SwitchAccountInput, SwitchAccountOutput>(
            "switch_account",
            "Switch this session to a different registered cloud account. \
             Subsequent tool calls target the new account.",
            Capability::SwitchAccount,
        )
        .non_idempotent(),
    )?;

    catalog.register(ToolDefinition::new::<EmptyInput, AccountListOutput>(
        "list_accounts",
        "List the registered cloud accounts and which one this session is on.",
        Capability::ListAccounts,
    ))?;

    catalog.register(ToolDefinition::new::<EmptyInput, CurrentAccountOutput>(
        "current_account",
        "Show the account this session's tool calls currently target.",
        Capability::CurrentAccount,
    ))?;

    catalog.register(ToolDefinition::new::<EmptyInput, ProviderListOutput>(
        "list_providers",
        "List the cloud providers this broker supports.",
        Capability::ListProviders,
    ))?;

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_registers_all_tools_in_order() {
        let catalog = builtin_catalog().unwrap();
        let names: Vec<&str> = catalog
            .describe_all()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "list_instances",
                "list_storage_buckets",
                "describe_resource",
                "get_monitoring_alerts",
                "get_cost_report",
                "switch_account",
                "list_accounts",
                "current_account",
                "list_providers",
            ]
        );
    }

    #[test]
    fn test_switch_account_is_the_only_non_idempotent_tool() {
        let catalog = builtin_catalog().unwrap();
        for def in catalog.describe_all() {
            assert_eq!(
                def.idempotent,
                def.name != "switch_account",
                "unexpected idempotence for {}",
                def.name
            );
        }
    }

    #[test]
    fn test_switch_account_schema_requires_account_id() {
        let catalog = builtin_catalog().unwrap();
        let def = catalog.get("switch_account").unwrap();
        let required = def.input_schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "account_id"));
    }

    #[test]
    fn test_no_arg_tools_accept_empty_object() {
        let catalog = builtin_catalog().unwrap();
        let def = catalog.get("list_instances").unwrap();
        // EmptyInput has no required fields.
        assert!(def.input_schema.get("required").is_none()
            || def.input_schema["required"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_client_capabilities_marked() {
        let catalog = builtin_catalog().unwrap();
        for name in [
            "list_instances",
            "list_storage_buckets",
            "describe_resource",
            "get_monitoring_alerts",
            "get_cost_report",
        ] {
            assert!(catalog.get(name).unwrap().capability.needs_client());
        }
        for name in [
            "switch_account",
            "list_accounts",
            "current_account",
            "list_providers",
        ] {
            assert!(!catalog.get(name).unwrap().capability.needs_client());
        }
    }
}
