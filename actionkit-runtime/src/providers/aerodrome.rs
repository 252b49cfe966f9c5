use alloy::primitives::{address, Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ActionError;
use crate::provider::{ActionDefinition, ActionFuture, ActionMetadata, ActionProvider, ActionTable};
use crate::schema::{ActionSchema, FieldSpec, ValidatedInput};
use crate::types::{Network, NetworkGate, TransactionRequest, WeiAmount};
use crate::wallet::{submit_and_confirm, WalletPort};

sol! {
    interface IAerodromeRouter {
        struct Route {
            address from;
            address to;
            bool stable;
            address factory;
        }

        function swapExactTokensForTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            Route[] calldata routes,
            address to,
            uint256 deadline
        ) external returns (uint256[] memory amounts);
    }
}

/// Aerodrome Router on Base.
pub const AERODROME_ROUTER: Address = address!("0xcF77a3Ba9A5CA399B7c97c74d54e5b1Beb874E43");
/// Aerodrome PoolFactory on Base; every route leg goes through it.
pub const AERODROME_FACTORY: Address = address!("0x420DD381b31aEf6683db6B902084cB0FFECe40Da");

/// Seconds a swap stays valid after it is built.
pub const SWAP_DEADLINE_SECS: u64 = 600;

const GATE: NetworkGate = NetworkGate::Family {
    protocol_family: "evm",
    network_ids: &["base-mainnet"],
};

const SWAP_DESCRIPTION: &str = "
This tool can be used to swap tokens on Aerodrome DEX on Base.
Do not use this tool for any other purpose.

Inputs:
- Input token address
- Output token address
- Amount of input tokens (in wei)
- Minimum amount of output tokens to receive (in wei)

Important notes:
- All amounts are in wei
- Only supported on Base mainnet";

/// Validated arguments of `swap_tokens`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapArgs {
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: WeiAmount,
    pub min_amount_out: WeiAmount,
}

fn swap_schema() -> ActionSchema {
    ActionSchema::new("Instructions for swapping tokens on Aerodrome")
        .field(FieldSpec::address("tokenIn", "The input token address"))
        .field(FieldSpec::address("tokenOut", "The output token address"))
        .field(FieldSpec::wei_amount(
            "amountIn",
            "Amount of input tokens (in wei)",
        ))
        .field(FieldSpec::wei_amount(
            "minAmountOut",
            "Minimum amount of output tokens to receive (in wei)",
        ))
}

/// Build the router call for a single-leg volatile-pool swap.
///
/// `now` is the current unix time in seconds; the deadline is
/// `now + SWAP_DEADLINE_SECS`.
pub fn build_swap(
    router: Address,
    factory: Address,
    args: &SwapArgs,
    recipient: Address,
    now: u64,
) -> Result<TransactionRequest, ActionError> {
    if args.token_in == args.token_out {
        return Err(ActionError::build(format!(
            "route from {} to itself is not swappable",
            args.token_in
        )));
    }

    let routes = vec![IAerodromeRouter::Route {
        from: args.token_in,
        to: args.token_out,
        stable: false,
        factory,
    }];

    let call = IAerodromeRouter::swapExactTokensForTokensCall {
        amountIn: args.amount_in.to_u256()?,
        amountOutMin: args.min_amount_out.to_u256()?,
        routes,
        to: recipient,
        deadline: U256::from(now) + U256::from(SWAP_DEADLINE_SECS),
    };

    Ok(TransactionRequest {
        to: router,
        data: Bytes::from(call.abi_encode()),
    })
}

/// Token swaps through the Aerodrome router.
#[derive(Debug)]
pub struct AerodromeActionProvider {
    router: Address,
    factory: Address,
    table: ActionTable<Self>,
}

impl AerodromeActionProvider {
    pub fn new() -> Self {
        Self::with_contracts(AERODROME_ROUTER, AERODROME_FACTORY)
    }

    /// Point at a different router/factory pair, e.g. on a fork.
    pub fn with_contracts(router: Address, factory: Address) -> Self {
        let table = ActionTable::new().register(ActionDefinition {
            name: "swap_tokens",
            description: SWAP_DESCRIPTION,
            schema: swap_schema(),
            failure_context: "Error swapping tokens on Aerodrome",
            handler: Self::swap_tokens_handler,
        });
        Self {
            router,
            factory,
            table,
        }
    }

    fn swap_tokens_handler<'a>(
        &'a self,
        wallet: &'a dyn WalletPort,
        input: ValidatedInput,
    ) -> ActionFuture<'a> {
        Box::pin(self.swap_tokens(wallet, input))
    }

    async fn swap_tokens(
        &self,
        wallet: &dyn WalletPort,
        input: ValidatedInput,
    ) -> Result<String, ActionError> {
        let args: SwapArgs = input.parse()?;
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let request = build_swap(self.router, self.factory, &args, wallet.address(), now)?;

        let confirmation = submit_and_confirm(wallet, request).await?;
        Ok(format!(
            "Swapped tokens on Aerodrome with transaction hash: {}, and receipt:\n{}",
            confirmation.tx_id, confirmation.receipt
        ))
    }
}

impl Default for AerodromeActionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionProvider for AerodromeActionProvider {
    fn name(&self) -> &'static str {
        "aerodrome"
    }

    fn supports_network(&self, network: &Network) -> bool {
        GATE.allows(network)
    }

    fn actions(&self) -> Vec<ActionMetadata> {
        self.table.metadata()
    }

    fn failure_context(&self, action: &str) -> &'static str {
        self.table.failure_context(action)
    }

    async fn try_invoke(
        &self,
        action: &str,
        wallet: &dyn WalletPort,
        args: &Value,
    ) -> Result<String, ActionError> {
        self.table.dispatch(self, action, wallet, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mock::{MockWallet, MOCK_WALLET_ADDRESS};
    use serde_json::json;

    const TOKEN_A: &str = "0x4200000000000000000000000000000000000006";
    const TOKEN_B: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";

    fn args(amount_in: &str, min_out: &str) -> SwapArgs {
        serde_json::from_value(json!({
            "tokenIn": TOKEN_A,
            "tokenOut": TOKEN_B,
            "amountIn": amount_in,
            "minAmountOut": min_out,
        }))
        .unwrap()
    }

    #[test]
    fn test_build_swap_round_trip() {
        let now = 1_700_000_000u64;
        let req = build_swap(
            AERODROME_ROUTER,
            AERODROME_FACTORY,
            &args("1000", "900"),
            MOCK_WALLET_ADDRESS,
            now,
        )
        .unwrap();
        assert_eq!(req.to, AERODROME_ROUTER);
        assert_eq!(
            &req.data[..4],
            IAerodromeRouter::swapExactTokensForTokensCall::SELECTOR.as_slice()
        );

        let decoded = IAerodromeRouter::swapExactTokensForTokensCall::abi_decode(&req.data).unwrap();
        assert_eq!(decoded.amountIn, U256::from(1000u64));
        assert_eq!(decoded.amountOutMin, U256::from(900u64));
        assert_eq!(decoded.to, MOCK_WALLET_ADDRESS);
        assert_eq!(decoded.deadline, U256::from(now + 600));
        assert_eq!(decoded.routes.len(), 1);
        let leg = &decoded.routes[0];
        assert_eq!(leg.from, TOKEN_A.parse::<Address>().unwrap());
        assert_eq!(leg.to, TOKEN_B.parse::<Address>().unwrap());
        assert!(!leg.stable);
        assert_eq!(leg.factory, AERODROME_FACTORY);
    }

    #[test]
    fn test_build_swap_keeps_full_precision() {
        let max = U256::MAX.to_string();
        let req = build_swap(
            AERODROME_ROUTER,
            AERODROME_FACTORY,
            &args(&max, "1"),
            MOCK_WALLET_ADDRESS,
            0,
        )
        .unwrap();
        let decoded = IAerodromeRouter::swapExactTokensForTokensCall::abi_decode(&req.data).unwrap();
        assert_eq!(decoded.amountIn, U256::MAX);
    }

    #[test]
    fn test_build_swap_rejects_same_token_route() {
        let mut same = args("1000", "900");
        same.token_out = same.token_in;
        let err = build_swap(AERODROME_ROUTER, AERODROME_FACTORY, &same, MOCK_WALLET_ADDRESS, 0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Build);
    }

    #[test]
    fn test_build_swap_rejects_overflowing_amount() {
        let too_big = format!("{}1", U256::MAX);
        let err = build_swap(
            AERODROME_ROUTER,
            AERODROME_FACTORY,
            &args(&too_big, "0"),
            MOCK_WALLET_ADDRESS,
            0,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Build);
    }

    #[test]
    fn test_network_gate() {
        let provider = AerodromeActionProvider::new();
        assert!(provider.supports_network(&Network::evm("base-mainnet")));
        assert!(!provider.supports_network(&Network::evm("base-sepolia")));
        assert!(!provider.supports_network(&Network::new("solana", "base-mainnet")));
    }

    #[test]
    fn test_actions_metadata() {
        let provider = AerodromeActionProvider::new();
        let actions = provider.actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].name, "swap_tokens");
        assert!(actions[0].description.starts_with("This tool can be used to swap tokens"));
    }

    #[tokio::test]
    async fn test_swap_sends_to_router() {
        let wallet = MockWallet::new();
        let provider = AerodromeActionProvider::new();
        let before = chrono::Utc::now().timestamp() as u64;
        let out = provider
            .invoke(
                "swap_tokens",
                &wallet,
                &json!({
                    "tokenIn": TOKEN_A,
                    "tokenOut": TOKEN_B,
                    "amountIn": "1000",
                    "minAmountOut": "900",
                }),
            )
            .await;
        let after = chrono::Utc::now().timestamp() as u64;

        assert!(out.starts_with("Swapped tokens on Aerodrome"));
        let sent = wallet.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, AERODROME_ROUTER);
        let decoded = IAerodromeRouter::swapExactTokensForTokensCall::abi_decode(&sent[0].data).unwrap();
        assert!(decoded.deadline >= U256::from(before + 600));
        assert!(decoded.deadline <= U256::from(after + 600));
    }

    #[tokio::test]
    async fn test_invalid_swap_never_sends() {
        let wallet = MockWallet::new();
        let provider = AerodromeActionProvider::new();
        let out = provider
            .invoke(
                "swap_tokens",
                &wallet,
                &json!({
                    "tokenIn": TOKEN_A,
                    "tokenOut": "not-an-address",
                    "amountIn": "abc",
                    "minAmountOut": "900",
                }),
            )
            .await;
        assert!(out.starts_with("Error swapping tokens on Aerodrome: Invalid input"));
        assert!(out.contains("tokenOut"));
        assert!(out.contains("amountIn"));
        assert!(wallet.sent().is_empty());
    }
}
