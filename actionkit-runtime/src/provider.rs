//! Action providers and their registration tables.
//!
//! A provider owns an [`ActionTable`] built once in its constructor. The table
//! maps each action's metadata and schema to a plain handler function, so
//! dispatch never depends on reflection or attribute machinery.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::{format_failure, ActionError};
use crate::schema::{ActionSchema, ValidatedInput};
use crate::types::Network;
use crate::wallet::WalletPort;

/// Boxed future returned by an action handler.
pub type ActionFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ActionError>> + Send + 'a>>;

/// Handler signature: the provider, the wallet, and input that already
/// passed the action's schema.
pub type ActionHandler<P> = for<'a> fn(&'a P, &'a dyn WalletPort, ValidatedInput) -> ActionFuture<'a>;

/// Discovery metadata for one action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionMetadata {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// One row of a provider's registration table.
pub struct ActionDefinition<P> {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: ActionSchema,
    /// Prefix of the message returned when the action fails.
    pub failure_context: &'static str,
    pub handler: ActionHandler<P>,
}

impl<P> std::fmt::Debug for ActionDefinition<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDefinition")
            .field("name", &self.name)
            .field("failure_context", &self.failure_context)
            .finish_non_exhaustive()
    }
}

impl<P> ActionDefinition<P> {
    pub fn metadata(&self) -> ActionMetadata {
        ActionMetadata {
            name: self.name.to_string(),
            description: self.description.trim().to_string(),
            input_schema: self.schema.to_json_schema(),
        }
    }
}

/// Registration table of a provider's actions.
pub struct ActionTable<P> {
    definitions: Vec<ActionDefinition<P>>,
}

impl<P> std::fmt::Debug for ActionTable<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.definitions).finish()
    }
}

impl<P> Default for ActionTable<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> ActionTable<P> {
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
        }
    }

    /// Add an action. Panics on duplicate names (programming error).
    pub fn register(mut self, definition: ActionDefinition<P>) -> Self {
        if self.get(definition.name).is_some() {
            panic!("Duplicate action name: {}", definition.name);
        }
        self.definitions.push(definition);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ActionDefinition<P>> {
        self.definitions.iter().find(|d| d.name == name)
    }

    pub fn metadata(&self) -> Vec<ActionMetadata> {
        self.definitions.iter().map(ActionDefinition::metadata).collect()
    }

    pub fn failure_context(&self, name: &str) -> &'static str {
        self.get(name)
            .map(|d| d.failure_context)
            .unwrap_or("Error invoking action")
    }

    /// VALIDATE, then hand off to the action's handler.
    pub async fn dispatch(
        &self,
        provider: &P,
        action: &str,
        wallet: &dyn WalletPort,
        args: &Value,
    ) -> Result<String, ActionError> {
        let definition = self
            .get(action)
            .ok_or_else(|| ActionError::UnknownAction(action.to_string()))?;
        let input = definition.schema.validate(args)?;
        (definition.handler)(provider, wallet, input).await
    }
}

/// A protocol family exposing one or more named actions.
#[async_trait]
pub trait ActionProvider: Send + Sync {
    /// Short identifier, e.g. `"aerodrome"`.
    fn name(&self) -> &'static str;

    /// Static network gate. Must not touch the network.
    fn supports_network(&self, network: &Network) -> bool;

    fn actions(&self) -> Vec<ActionMetadata>;

    /// Message prefix used when `action` fails.
    fn failure_context(&self, action: &str) -> &'static str;

    /// Run one action, returning the tagged outcome.
    async fn try_invoke(
        &self,
        action: &str,
        wallet: &dyn WalletPort,
        args: &Value,
    ) -> Result<String, ActionError>;

    /// Run one action and render any failure as a message. Never errors.
    async fn invoke(&self, action: &str, wallet: &dyn WalletPort, args: &Value) -> String {
        match self.try_invoke(action, wallet, args).await {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("{}.{action} failed ({}): {e}", self.name(), e.kind());
                format_failure(self.failure_context(action), &e)
            }
        }
    }
}
