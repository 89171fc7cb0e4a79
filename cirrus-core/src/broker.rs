//! The invocation broker.
//!
//! One `invoke` call runs the full pipeline: catalogue lookup, argument
//! validation against the tool's input schema, active-account resolution,
//! client acquisition, capability dispatch under a deadline, and error
//! normalization. Every path out of the pipeline produces a [`ToolOutcome`]
//! and exactly one [`InvocationEvent`]; the broker never panics or returns a
//! transport error for a bad request.
//!
//! Cancellation is by drop: the capability future runs inline in `invoke`
//! rather than on a spawned task, so dropping the invocation future cancels
//! the provider call with it.

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::account::AccountSummary;
use crate::catalog::{Capability, ToolAdvertisement, ToolCatalog, ToolDefinition};
use crate::client::{
    ClientError, CloudClient, CostGranularity, CostQuery, MonitoringQuery, ResourceKind,
};
use crate::config::{BrokerConfig, ConfigError};
use crate::error::Error;
use crate::events::{BrokerHook, InvocationEvent};
use crate::outcome::{FailureKind, ToolCallRequest, ToolCallResponse, ToolOutcome};
use crate::registry::{AccountRegistry, ClientFactory, RegistryError};
use crate::session::{SessionManager, DEFAULT_SESSION_TTL};
use crate::tools::{
    builtin_catalog, AccountListOutput, CostInput, CurrentAccountOutput, DescribeResourceInput,
    MonitoringInput, ProviderInfo, ProviderListOutput, SwitchAccountInput, SwitchAccountOutput,
};

/// Deadline applied when neither the tool nor the builder overrides it.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Mediates tool calls between the response composer and cloud clients.
pub struct Broker {
    catalog: ToolCatalog,
    registry: Arc<AccountRegistry>,
    sessions: SessionManager,
    hooks: Vec<Arc<dyn BrokerHook>>,
    default_timeout: Duration,
}

/// Builder for [`Broker`]. The registry is required; everything else has a
/// default (the built-in catalogue, a 30s deadline, a one-hour session TTL).
pub struct BrokerBuilder {
    catalog: Option<ToolCatalog>,
    registry: Option<Arc<AccountRegistry>>,
    hooks: Vec<Arc<dyn BrokerHook>>,
    default_timeout: Duration,
    session_ttl: Duration,
}

impl Default for BrokerBuilder {
    fn default() -> Self {
        BrokerBuilder {
            catalog: None,
            registry: None,
            hooks: Vec::new(),
            default_timeout: DEFAULT_TOOL_TIMEOUT,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

impl BrokerBuilder {
    pub fn catalog(mut self, catalog: ToolCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn registry(mut self, registry: Arc<AccountRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Add an invocation hook. Hooks run in registration order after each
    /// invocation's outcome is decided.
    pub fn hook(mut self, hook: Arc<dyn BrokerHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn build(self) -> Result<Broker, Error> {
        let registry = self
            .registry
            .ok_or(ConfigError::Incomplete("account registry"))?;
        let catalog = match self.catalog {
            Some(catalog) => catalog,
            None => builtin_catalog()?,
        };
        let sessions = SessionManager::new(registry.default_account(), self.session_ttl);
        Ok(Broker {
            catalog,
            registry,
            sessions,
            hooks: self.hooks,
            default_timeout: self.default_timeout,
        })
    }
}

/// A client-capability call with its arguments fully parsed.
enum ClientCall {
    List(ResourceKind),
    Describe(ResourceKind, String),
    Monitoring(MonitoringQuery),
    Cost(CostQuery),
}

impl Broker {
    pub fn builder() -> BrokerBuilder {
        BrokerBuilder::default()
    }

    /// Build a broker from configuration, constructing the registry along
    /// the way.
    pub fn from_config(
        config: &BrokerConfig,
        factory: Arc<dyn ClientFactory>,
    ) -> Result<Broker, Error> {
        let mut builder = AccountRegistry::builder(factory);
        for account in config.accounts()? {
            builder = builder.register(account)?;
        }
        let registry = builder
            .default_account(&config.default_account)
            .build()?;
        Broker::builder()
            .registry(Arc::new(registry))
            .default_timeout(config.default_timeout())
            .session_ttl(config.session_ttl())
            .build()
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &Arc<AccountRegistry> {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Model-facing tool advertisement, in registration order.
    pub fn advertisement(&self) -> Vec<ToolAdvertisement> {
        self.catalog.advertisement()
    }

    /// Drop sessions idle past the TTL. Returns how many were removed.
    pub fn purge_expired_sessions(&self) -> usize {
        self.sessions.purge_expired()
    }

    /// Invoke a tool and compose the response.
    ///
    /// Never fails at the transport level: every error becomes a structured
    /// failure outcome, and exactly one invocation event fires regardless of
    /// where the pipeline exited.
    pub async fn invoke(&self, request: ToolCallRequest) -> ToolCallResponse {
        let started = Instant::now();
        let (outcome, account_id) = self.dispatch(&request).await;

        let event = InvocationEvent {
            tool_name: request.tool_name.clone(),
            account_id,
            correlation_id: request.correlation_id.clone(),
            duration: started.elapsed(),
            outcome: outcome.kind(),
        };
        tracing::debug!(
            tool = %event.tool_name,
            account = event.account_id.as_deref().unwrap_or("-"),
            outcome = %event.outcome,
            duration_ms = event.duration.as_millis() as u64,
            "tool invocation finished"
        );
        for hook in &self.hooks {
            hook.on_invocation(&event);
        }

        ToolCallResponse::from_outcome(request.correlation_id, outcome)
    }

    /// Run the pipeline up to an outcome, also reporting the account the
    /// invocation resolved to (when it got that far).
    async fn dispatch(&self, request: &ToolCallRequest) -> (ToolOutcome, Option<String>) {
        let definition = match self.catalog.get(&request.tool_name) {
            Ok(definition) => definition,
            Err(err) => {
                return (
                    ToolOutcome::failure(FailureKind::UnknownTool, err.to_string()),
                    None,
                );
            }
        };

        if let Err(message) = validate_arguments(&definition.input_schema, &request.arguments) {
            return (
                ToolOutcome::failure(FailureKind::InvalidArguments, message),
                None,
            );
        }

        if !definition.capability.needs_client() {
            return self.dispatch_local(definition.capability, request).await;
        }

        let account_id = self.sessions.active_account(&request.session_id).await;
        if let Err(err) = self.registry.resolve(&account_id) {
            return (
                ToolOutcome::failure(FailureKind::UnknownAccount, err.to_string()),
                Some(account_id),
            );
        }

        let client = match self.registry.get_client(&account_id).await {
            Ok(client) => client,
            Err(RegistryError::UnknownAccount(id)) => {
                return (
                    ToolOutcome::failure(
                        FailureKind::UnknownAccount,
                        format!("unknown account: {}", id),
                    ),
                    Some(account_id),
                );
            }
            Err(RegistryError::Client(err)) => {
                return (outcome_from_client_error(err), Some(account_id));
            }
        };

        let call = match plan_call(definition, &request.arguments) {
            Ok(call) => call,
            Err(message) => {
                return (
                    ToolOutcome::failure(FailureKind::InvalidArguments, message),
                    Some(account_id),
                );
            }
        };

        let budget = definition.timeout.unwrap_or(self.default_timeout);
        let outcome = match tokio::time::timeout(budget, execute(client.as_ref(), call)).await {
            Err(_) => ToolOutcome::failure(
                FailureKind::Timeout,
                format!(
                    "tool '{}' exceeded its {:?} deadline",
                    definition.name, budget
                ),
            ),
            Ok(Ok(data)) => ToolOutcome::success(data),
            Ok(Err(err)) => outcome_from_client_error(err),
        };
        (outcome, Some(account_id))
    }

    /// Capabilities served from registry and session state, no client needed.
    async fn dispatch_local(
        &self,
        capability: Capability,
        request: &ToolCallRequest,
    ) -> (ToolOutcome, Option<String>) {
        match capability {
            Capability::SwitchAccount => {
                let input: SwitchAccountInput = match serde_json::from_value(
                    request.arguments.clone(),
                ) {
                    Ok(input) => input,
                    Err(err) => {
                        return (
                            ToolOutcome::failure(FailureKind::InvalidArguments, err.to_string()),
                            None,
                        );
                    }
                };
                // Validate before touching the session: a failed switch must
                // leave the active account exactly as it was.
                if self.registry.resolve(&input.account_id).is_err() {
                    return (
                        ToolOutcome::failure(
                            FailureKind::UnknownAccount,
                            format!("cannot switch to unknown account '{}'", input.account_id),
                        ),
                        None,
                    );
                }
                let previous = self
                    .sessions
                    .set_active(&request.session_id, &input.account_id)
                    .await;
                let output = SwitchAccountOutput {
                    previous_account: previous,
                    active_account: input.account_id.clone(),
                };
                (success_payload(&output), Some(input.account_id))
            }

            Capability::ListAccounts => {
                let active = self.sessions.active_account(&request.session_id).await;
                let output = AccountListOutput {
                    accounts: self.registry.accounts().map(AccountSummary::from).collect(),
                    active_account: active.clone(),
                };
                (success_payload(&output), Some(active))
            }

            Capability::CurrentAccount => {
                let active = self.sessions.active_account(&request.session_id).await;
                match self.registry.resolve(&active) {
                    Ok(account) => (
                        success_payload(&CurrentAccountOutput {
                            account: account.into(),
                        }),
                        Some(active),
                    ),
                    Err(err) => (
                        ToolOutcome::failure(FailureKind::UnknownAccount, err.to_string()),
                        Some(active),
                    ),
                }
            }

            Capability::ListProviders => {
                let mut providers: Vec<ProviderInfo> = Vec::new();
                for account in self.registry.accounts() {
                    if providers.iter().any(|p| p.id == account.provider.to_string()) {
                        continue;
                    }
                    let count = self
                        .registry
                        .accounts()
                        .filter(|a| a.provider == account.provider)
                        .count();
                    providers.push(ProviderInfo {
                        id: account.provider.to_string(),
                        name: account.provider.display_name().to_string(),
                        description: format!("{} registered account(s)", count),
                    });
                }
                (success_payload(&ProviderListOutput { providers }), None)
            }

            // needs_client capabilities never reach here.
            _ => (
                ToolOutcome::failure(
                    FailureKind::Provider,
                    "capability dispatched without a client".to_string(),
                ),
                None,
            ),
        }
    }
}

/// Run one client capability and normalize the payload.
async fn execute(client: &dyn CloudClient, call: ClientCall) -> Result<Value, ClientError> {
    match call {
        ClientCall::List(kind) => {
            let records = client.list_resources(kind).await?;
            to_json(&records)
        }
        ClientCall::Describe(kind, id) => {
            // Describe shares the collection shape: one element, or empty
            // when the resource does not exist.
            let records: Vec<_> = client.describe_resource(kind, &id).await?.into_iter().collect();
            to_json(&records)
        }
        ClientCall::Monitoring(query) => {
            let alarms = client.get_monitoring(query).await?;
            to_json(&alarms)
        }
        ClientCall::Cost(query) => {
            let report = client.get_cost(query).await?;
            to_json(&report)
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ClientError> {
    serde_json::to_value(value).map_err(|e| ClientError::Provider(e.to_string()))
}

fn success_payload<T: Serialize>(value: &T) -> ToolOutcome {
    match serde_json::to_value(value) {
        Ok(data) => ToolOutcome::success(data),
        Err(e) => ToolOutcome::failure(
            FailureKind::Provider,
            format!("failed to serialize result: {}", e),
        ),
    }
}

/// Map a client error onto the failure taxonomy. A missing resource is data,
/// not an error: the model sees an empty collection.
fn outcome_from_client_error(err: ClientError) -> ToolOutcome {
    match err {
        ClientError::NotFound(_) => ToolOutcome::success(json!([])),
        ClientError::Credential(message) => ToolOutcome::failure(FailureKind::Credential, message),
        ClientError::Forbidden(message) => ToolOutcome::failure(FailureKind::Forbidden, message),
        ClientError::Transient(message) => ToolOutcome::failure(FailureKind::Transient, message),
        ClientError::Provider(message) => ToolOutcome::failure(FailureKind::Provider, message),
    }
}

/// Parse a client capability's arguments into a concrete call.
fn plan_call(definition: &ToolDefinition, arguments: &Value) -> Result<ClientCall, String> {
    match definition.capability {
        Capability::ListResources(kind) => Ok(ClientCall::List(kind)),
        Capability::DescribeResource => {
            let input: DescribeResourceInput =
                serde_json::from_value(arguments.clone()).map_err(|e| e.to_string())?;
            Ok(ClientCall::Describe(input.resource_kind, input.resource_id))
        }
        Capability::GetMonitoring => {
            let input: MonitoringInput =
                serde_json::from_value(arguments.clone()).map_err(|e| e.to_string())?;
            Ok(ClientCall::Monitoring(MonitoringQuery {
                namespace: input.namespace,
                state: input.state,
            }))
        }
        Capability::GetCost => {
            let input: CostInput =
                serde_json::from_value(arguments.clone()).map_err(|e| e.to_string())?;
            Ok(ClientCall::Cost(cost_query(input)?))
        }
        _ => Err(format!(
            "tool '{}' does not dispatch to a client",
            definition.name
        )),
    }
}

/// Resolve a cost input into a concrete date range: last 30 days by default,
/// monthly granularity unless asked otherwise.
fn cost_query(input: CostInput) -> Result<CostQuery, String> {
    let today = Utc::now().date_naive();
    let end = match input.end {
        Some(s) => parse_date(&s, "end")?,
        None => today,
    };
    let start = match input.start {
        Some(s) => parse_date(&s, "start")?,
        None => end - chrono::Duration::days(30),
    };
    if start >= end {
        return Err(format!(
            "start date {} must precede end date {}",
            start, end
        ));
    }
    Ok(CostQuery {
        start,
        end,
        granularity: input.granularity.unwrap_or(CostGranularity::Monthly),
    })
}

fn parse_date(s: &str, field: &str) -> Result<chrono::NaiveDate, String> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("field '{}' must be an ISO date (YYYY-MM-DD), got '{}'", field, s))
}

/// Validate arguments against a tool's input schema.
///
/// Checks required fields in schema order, then each supplied field's JSON
/// type, so identical bad input always yields the identical message.
/// Enum and `$ref` constraints are enforced by the typed parse that follows.
fn validate_arguments(schema: &Value, arguments: &Value) -> Result<(), String> {
    let args = match arguments.as_object() {
        Some(args) => args,
        None => return Err("arguments must be a JSON object".to_string()),
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required {
            if let Some(name) = field.as_str() {
                if !args.contains_key(name) {
                    return Err(format!("missing required field '{}'", name));
                }
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (name, value) in args {
            let property = match properties.get(name) {
                Some(property) => property,
                None => continue,
            };
            if let Some(expected) = expected_types(property) {
                if !type_matches(&expected, value) {
                    return Err(format!(
                        "field '{}' must be of type {}, got {}",
                        name,
                        expected.join(" or "),
                        json_type_name(value)
                    ));
                }
            }
        }
    }

    Ok(())
}

/// Acceptable JSON types for a schema property, when it declares any.
fn expected_types(property: &Value) -> Option<Vec<String>> {
    match property.get("type") {
        Some(Value::String(t)) => Some(vec![t.clone()]),
        Some(Value::Array(types)) => Some(
            types
                .iter()
                .filter_map(|t| t.as_str().map(String::from))
                .collect(),
        ),
        _ => None,
    }
}

fn type_matches(expected: &[String], value: &Value) -> bool {
    expected.iter().any(|t| match t.as_str() {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
