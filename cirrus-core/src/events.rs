//! Observability events emitted by the broker.
//!
//! One [`InvocationEvent`] fires per invocation, success or failure, including
//! early returns (unknown tool, invalid arguments) and timeouts.

use std::time::Duration;

use crate::outcome::OutcomeKind;

/// Record of one tool invocation.
#[derive(Debug, Clone)]
pub struct InvocationEvent {
    /// Requested tool name (as received, even when unknown).
    pub tool_name: String,
    /// Resolved account id; `None` when the invocation failed before
    /// account resolution.
    pub account_id: Option<String>,
    /// Caller-supplied correlation id from the request.
    pub correlation_id: String,
    /// Wall-clock duration of the invocation.
    pub duration: Duration,
    /// How the invocation ended.
    pub outcome: OutcomeKind,
}

/// Hook for observing broker invocations.
///
/// # Example
/// ```
/// use cirrus_core::events::{BrokerHook, InvocationEvent};
///
/// struct Logger;
///
/// impl BrokerHook for Logger {
///     fn on_invocation(&self, event: &InvocationEvent) {
///         println!("{} -> {} in {:?}", event.tool_name, event.outcome, event.duration);
///     }
/// }
/// ```
pub trait BrokerHook: Send + Sync {
    /// Called exactly once per invocation, after the outcome is decided.
    fn on_invocation(&self, event: &InvocationEvent);
}

/// Blanket implementation for closures
impl<F> BrokerHook for F
where
    F: Fn(&InvocationEvent) + Send + Sync,
{
    fn on_invocation(&self, event: &InvocationEvent) {
        self(event)
    }
}
