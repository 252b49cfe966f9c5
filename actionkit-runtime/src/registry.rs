//! Registry of action providers, addressed by `<provider>_<action>` names.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;

use crate::error::{format_failure, ActionError, ErrorKind};
use crate::provider::{ActionMetadata, ActionProvider};
use crate::providers::{aerodrome::AerodromeActionProvider, pendle::PendleActionProvider};
use crate::types::Network;
use crate::wallet::WalletPort;

/// An action as exposed to the agent, with its qualified name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredAction {
    pub provider: &'static str,
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Tagged result of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub action: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub message: String,
}

pub struct ProviderRegistry {
    providers: BTreeMap<&'static str, Box<dyn ActionProvider>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: BTreeMap::new(),
        }
    }

    /// Registry with Aerodrome and Pendle at their default contracts.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register(Box::new(AerodromeActionProvider::new()));
        reg.register(Box::new(PendleActionProvider::new()));
        reg
    }

    /// Register a provider. Panics on duplicate names (programming error).
    pub fn register(&mut self, provider: Box<dyn ActionProvider>) {
        let name = provider.name();
        if self.providers.contains_key(name) {
            panic!("Duplicate provider name: {name}");
        }
        self.providers.insert(name, provider);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.providers.keys().copied().collect()
    }

    /// Actions whose provider accepts `network`, sorted by qualified name.
    pub fn actions(&self, network: &Network) -> Vec<RegisteredAction> {
        let mut actions: Vec<RegisteredAction> = self
            .providers
            .values()
            .filter(|p| p.supports_network(network))
            .flat_map(|p| {
                let provider = p.name();
                p.actions()
                    .into_iter()
                    .map(move |meta| qualify(provider, meta))
            })
            .collect();
        actions.sort_by(|a, b| a.name.cmp(&b.name));
        actions
    }

    /// Split a qualified name into its provider and the provider-local action.
    ///
    /// When provider names share a prefix (`dex`, `dex_v2`), the longest
    /// matching name wins. A name sorts after its own prefixes, so walking the
    /// map in reverse tries it first.
    pub fn resolve<'a>(&self, qualified: &'a str) -> Option<(&dyn ActionProvider, &'a str)> {
        self.providers.iter().rev().find_map(|(name, provider)| {
            qualified
                .strip_prefix(*name)
                .and_then(|rest| rest.strip_prefix('_'))
                .filter(|action| provider.actions().iter().any(|a| a.name == *action))
                .map(|action| (provider.as_ref(), action))
        })
    }

    pub fn contains(&self, qualified: &str) -> bool {
        self.resolve(qualified).is_some()
    }

    /// Gate on `network`, then run the action.
    pub async fn try_invoke(
        &self,
        network: &Network,
        qualified: &str,
        wallet: &dyn WalletPort,
        args: &Value,
    ) -> Result<String, ActionError> {
        let (provider, action) = self
            .resolve(qualified)
            .ok_or_else(|| ActionError::UnknownAction(qualified.to_string()))?;

        if !provider.supports_network(network) {
            tracing::debug!("{} rejected network {network}", provider.name());
            return Err(ActionError::UnsupportedNetwork {
                provider: provider.name().to_string(),
                network: network.to_string(),
            });
        }

        let span = tracing::info_span!(
            "action",
            action = qualified,
            network = %network,
            invocation_id = %uuid::Uuid::new_v4(),
        );
        provider
            .try_invoke(action, wallet, args)
            .instrument(span)
            .await
    }

    /// Run an action and report the tagged outcome. Never errors.
    pub async fn execute(
        &self,
        network: &Network,
        qualified: &str,
        wallet: &dyn WalletPort,
        args: &Value,
    ) -> ActionOutcome {
        match self.try_invoke(network, qualified, wallet, args).await {
            Ok(message) => ActionOutcome {
                action: qualified.to_string(),
                success: true,
                error_kind: None,
                message,
            },
            Err(e) => self.failure(qualified, e),
        }
    }

    /// Tagged failed outcome for `qualified`, prefixed with its action's
    /// failure context.
    pub fn failure(&self, qualified: &str, error: ActionError) -> ActionOutcome {
        tracing::warn!("{qualified} failed ({}): {error}", error.kind());
        let context = self
            .resolve(qualified)
            .map(|(p, action)| p.failure_context(action))
            .unwrap_or("Error invoking action");
        ActionOutcome {
            action: qualified.to_string(),
            success: false,
            error_kind: Some(error.kind()),
            message: format_failure(context, &error),
        }
    }

    /// Run an action and return only the message handed to the agent.
    pub async fn invoke(
        &self,
        network: &Network,
        qualified: &str,
        wallet: &dyn WalletPort,
        args: &Value,
    ) -> String {
        self.execute(network, qualified, wallet, args).await.message
    }
}

fn qualify(provider: &'static str, meta: ActionMetadata) -> RegisteredAction {
    RegisteredAction {
        provider,
        name: format!("{provider}_{}", meta.name),
        description: meta.description,
        input_schema: meta.input_schema,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockWallet;
    use async_trait::async_trait;
    use serde_json::json;

    /// Provider with fixed action names that answers with its own name.
    struct Named {
        name: &'static str,
        actions: &'static [&'static str],
    }

    #[async_trait]
    impl ActionProvider for Named {
        fn name(&self) -> &'static str {
            self.name
        }

        fn supports_network(&self, _network: &Network) -> bool {
            true
        }

        fn actions(&self) -> Vec<ActionMetadata> {
            self.actions
                .iter()
                .map(|a| ActionMetadata {
                    name: a.to_string(),
                    description: String::new(),
                    input_schema: json!({"type": "object"}),
                })
                .collect()
        }

        fn failure_context(&self, _action: &str) -> &'static str {
            "Error"
        }

        async fn try_invoke(
            &self,
            action: &str,
            _wallet: &dyn WalletPort,
            _args: &Value,
        ) -> Result<String, ActionError> {
            Ok(format!("{}:{action}", self.name))
        }
    }

    #[test]
    fn test_builtin_providers() {
        let reg = ProviderRegistry::with_builtins();
        assert_eq!(reg.names(), vec!["aerodrome", "pendle"]);
    }

    #[test]
    #[should_panic(expected = "Duplicate provider name")]
    fn test_duplicate_provider_panics() {
        let mut reg = ProviderRegistry::with_builtins();
        reg.register(Box::new(PendleActionProvider::new()));
    }

    #[test]
    fn test_actions_filtered_by_network() {
        let reg = ProviderRegistry::with_builtins();
        let names = |network: &str| -> Vec<String> {
            reg.actions(&Network::evm(network))
                .into_iter()
                .map(|a| a.name)
                .collect()
        };
        assert_eq!(
            names("base-mainnet"),
            vec![
                "aerodrome_swap_tokens",
                "pendle_compare_yields",
                "pendle_enter_pool",
                "pendle_exit_position",
            ]
        );
        assert_eq!(
            names("base-sepolia"),
            vec![
                "pendle_compare_yields",
                "pendle_enter_pool",
                "pendle_exit_position",
            ]
        );
        assert!(names("ethereum-mainnet").is_empty());
    }

    #[test]
    fn test_resolve() {
        let reg = ProviderRegistry::with_builtins();
        let (provider, action) = reg.resolve("pendle_exit_position").unwrap();
        assert_eq!(provider.name(), "pendle");
        assert_eq!(action, "exit_position");
        assert!(reg.resolve("pendle_swap_tokens").is_none());
        assert!(reg.resolve("pendleenter_pool").is_none());
        assert!(!reg.contains("uniswap_swap"));
    }

    #[tokio::test]
    async fn test_resolve_prefers_longest_provider_name() {
        let dex = || Named {
            name: "dex",
            actions: &["v2_swap", "swap"],
        };
        let dex_v2 = || Named {
            name: "dex_v2",
            actions: &["swap"],
        };

        let mut forward = ProviderRegistry::new();
        forward.register(Box::new(dex()));
        forward.register(Box::new(dex_v2()));
        let mut backward = ProviderRegistry::new();
        backward.register(Box::new(dex_v2()));
        backward.register(Box::new(dex()));

        let wallet = MockWallet::new();
        let network = Network::evm("base-mainnet");
        for reg in [&forward, &backward] {
            let (provider, action) = reg.resolve("dex_v2_swap").unwrap();
            assert_eq!((provider.name(), action), ("dex_v2", "swap"));
            let (provider, action) = reg.resolve("dex_swap").unwrap();
            assert_eq!((provider.name(), action), ("dex", "swap"));
            assert_eq!(
                reg.invoke(&network, "dex_v2_swap", &wallet, &json!({})).await,
                "dex_v2:swap"
            );
        }
    }

    #[tokio::test]
    async fn test_unsupported_network_short_circuits() {
        let reg = ProviderRegistry::with_builtins();
        let wallet = MockWallet::new();
        let outcome = reg
            .execute(
                &Network::evm("ethereum-mainnet"),
                "pendle_enter_pool",
                &wallet,
                &json!({"poolAddress": "0x00000000000000000000000000000000000000d1", "amount": "1"}),
            )
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.error_kind, Some(ErrorKind::UnsupportedNetwork));
        assert!(outcome.message.starts_with("Error entering pool: Unsupported network"));
        assert!(wallet.reads().is_empty());
        assert!(wallet.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let reg = ProviderRegistry::with_builtins();
        let wallet = MockWallet::new();
        let outcome = reg
            .execute(&Network::evm("base-mainnet"), "aave_supply", &wallet, &json!({}))
            .await;
        assert_eq!(outcome.error_kind, Some(ErrorKind::UnknownAction));
        assert_eq!(outcome.message, "Error invoking action: Unknown action: aave_supply");
    }

    #[test]
    fn test_outcome_serialization() {
        let ok = ActionOutcome {
            action: "pendle_compare_yields".into(),
            success: true,
            error_kind: None,
            message: "done".into(),
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert!(json.get("errorKind").is_none());

        let failed = ActionOutcome {
            error_kind: Some(ErrorKind::Read),
            success: false,
            ..ok
        };
        assert_eq!(serde_json::to_value(&failed).unwrap()["errorKind"], "read");
    }
}
