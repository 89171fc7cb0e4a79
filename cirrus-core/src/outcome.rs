//! Structured invocation results and the broker's wire types.
//!
//! Every invocation resolves to a [`ToolOutcome`], a tagged variant the
//! response composer can consume without ever seeing a provider-native error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Classification of an invocation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Tool name is not in the catalogue.
    UnknownTool,
    /// Arguments did not match the tool's input schema.
    InvalidArguments,
    /// The session's account (or a switch target) is not registered.
    UnknownAccount,
    /// Credential reference could not be resolved at client construction.
    Credential,
    /// The credentials lack permission for the operation.
    Forbidden,
    /// Rate limiting, connectivity, provider-side 5xx.
    Transient,
    /// The capability call exceeded its deadline.
    Timeout,
    /// Any other provider-reported error.
    Provider,
}

impl FailureKind {
    /// Whether the composer may retry an identical invocation.
    pub fn retryable(self) -> bool {
        matches!(self, FailureKind::Transient | FailureKind::Timeout)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::UnknownTool => "unknown_tool",
            FailureKind::InvalidArguments => "invalid_arguments",
            FailureKind::UnknownAccount => "unknown_account",
            FailureKind::Credential => "credential",
            FailureKind::Forbidden => "forbidden",
            FailureKind::Transient => "transient",
            FailureKind::Timeout => "timeout",
            FailureKind::Provider => "provider",
        };
        f.write_str(s)
    }
}

/// Result of one tool invocation.
///
/// An empty collection is a successful result, not a failure: an account
/// with zero buckets is valid data the model should see as such.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success {
        /// Normalized payload in the tool's declared output shape.
        data: Value,
        /// When the data was fetched from the provider.
        fetched_at: DateTime<Utc>,
    },
    Failure {
        kind: FailureKind,
        message: String,
        retryable: bool,
    },
}

impl ToolOutcome {
    /// Successful outcome fetched now.
    pub fn success(data: Value) -> Self {
        ToolOutcome::Success {
            data,
            fetched_at: Utc::now(),
        }
    }

    /// Failure with retryability derived from the kind.
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        ToolOutcome::Failure {
            kind,
            message: message.into(),
            retryable: kind.retryable(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
    }

    /// Kind label for observability events.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            ToolOutcome::Success { .. } => OutcomeKind::Success,
            ToolOutcome::Failure { kind, .. } => OutcomeKind::Failure(*kind),
        }
    }
}

/// Outcome label carried by observability events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    Failure(FailureKind),
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Success => f.write_str("success"),
            OutcomeKind::Failure(kind) => kind.fmt(f),
        }
    }
}

/// Inbound tool-call request from the response composer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub session_id: String,
    pub tool_name: String,
    /// JSON object of arguments; defaults to `{}` when absent.
    #[serde(default = "empty_object")]
    pub arguments: Value,
    /// Caller-supplied id, echoed back unchanged in the response.
    pub correlation_id: String,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

impl ToolCallRequest {
    /// Build a request with a generated correlation id and empty arguments.
    pub fn new(session_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        ToolCallRequest {
            session_id: session_id.into(),
            tool_name: tool_name.into(),
            arguments: empty_object(),
            correlation_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_arguments(mut self, arguments: Value) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }
}

/// Error body of a failed tool-call response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallError {
    pub kind: FailureKind,
    pub message: String,
    pub retryable: bool,
}

/// Outbound tool-call response to the response composer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResponse {
    pub correlation_id: String,
    /// "success" or "failure".
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolCallError>,
}

impl ToolCallResponse {
    pub fn from_outcome(correlation_id: impl Into<String>, outcome: ToolOutcome) -> Self {
        match outcome {
            ToolOutcome::Success { data, fetched_at } => ToolCallResponse {
                correlation_id: correlation_id.into(),
                outcome: "success".to_string(),
                data: Some(data),
                fetched_at: Some(fetched_at),
                error: None,
            },
            ToolOutcome::Failure {
                kind,
                message,
                retryable,
            } => ToolCallResponse {
                correlation_id: correlation_id.into(),
                outcome: "failure".to_string(),
                data: None,
                fetched_at: None,
                error: Some(ToolCallError {
                    kind,
                    message,
                    retryable,
                }),
            },
        }
    }
}
