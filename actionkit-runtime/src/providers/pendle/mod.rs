//! Pendle yield pools: yield comparison, liquidity entry and exit.

pub mod contracts;
pub mod risk;

use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ActionError;
use crate::provider::{ActionDefinition, ActionFuture, ActionMetadata, ActionProvider, ActionTable};
use crate::schema::{ActionSchema, FieldSpec, ValidatedInput};
use crate::types::{Network, NetworkGate, WeiAmount};
use crate::wallet::{submit_and_confirm, WalletPort};

use contracts::{MarketDetails, PendleContracts};
use risk::{PoolCandidate, RiskPolicy, RiskTolerance};

const GATE: NetworkGate = NetworkGate::NetworkIds(&["base-mainnet", "base-sepolia"]);

const COMPARE_YIELDS_DESCRIPTION: &str = "
This tool analyzes all available Pendle pools and provides yield comparisons.
It takes into account:
- Current APR
- Pool liquidity
- Time to maturity
- User's risk tolerance

Returns the pools that fit the risk tolerance, highest APR first.";

const ENTER_POOL_DESCRIPTION: &str = "
This tool allows entering a Pendle yield pool position.

Inputs:
- Pool (market) address
- Amount to deposit (in wei)

Important notes:
- Verify pool address and amount before entering
- Ensure sufficient balance and approvals
- Inactive or expired pools are rejected";

const EXIT_POSITION_DESCRIPTION: &str = "
This tool handles exiting a Pendle yield position.
Features:
- Complete or partial position exit
- Conditional exit based on a price threshold

Use this when:
- Wanting to take profits
- Responding to market conditions
- Implementing stop-loss";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareYieldsArgs {
    pub risk_tolerance: RiskTolerance,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnterPoolArgs {
    pub pool_address: Address,
    pub amount: WeiAmount,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitPositionArgs {
    pub pool_address: Address,
    pub amount: WeiAmount,
    #[serde(default)]
    pub price_threshold: Option<Decimal>,
}

/// Pre-exit check run when the caller supplies a price threshold.
///
/// Returning an error aborts the exit before anything is submitted.
#[async_trait]
pub trait ExitGuard: Send + Sync {
    async fn check(
        &self,
        wallet: &dyn WalletPort,
        market: &MarketDetails,
        price_threshold: Decimal,
    ) -> Result<(), ActionError>;
}

/// Guard that accepts every exit. Thresholds are logged, not enforced.
#[derive(Debug, Clone, Copy, Default)]
pub struct UncheckedExit;

#[async_trait]
impl ExitGuard for UncheckedExit {
    async fn check(
        &self,
        _wallet: &dyn WalletPort,
        market: &MarketDetails,
        price_threshold: Decimal,
    ) -> Result<(), ActionError> {
        tracing::debug!(
            "price threshold {price_threshold} for {} not enforced",
            market.market
        );
        Ok(())
    }
}

pub struct PendleActionProvider {
    contracts: PendleContracts,
    policy: RiskPolicy,
    exit_guard: Arc<dyn ExitGuard>,
    table: ActionTable<Self>,
}

impl std::fmt::Debug for PendleActionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendleActionProvider")
            .field("contracts", &self.contracts)
            .field("policy", &self.policy)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl Default for PendleActionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PendleActionProvider {
    pub fn new() -> Self {
        Self::with_contracts(PendleContracts::default())
    }

    pub fn with_contracts(contracts: PendleContracts) -> Self {
        let table = ActionTable::new()
            .register(ActionDefinition {
                name: "compare_yields",
                description: COMPARE_YIELDS_DESCRIPTION,
                schema: ActionSchema::new("Parameters for comparing yields across pools").field(
                    FieldSpec::one_of(
                        "riskTolerance",
                        "User's risk tolerance level",
                        RiskTolerance::ALL,
                    ),
                ),
                failure_context: "Error comparing yields",
                handler: Self::compare_yields_handler,
            })
            .register(ActionDefinition {
                name: "enter_pool",
                description: ENTER_POOL_DESCRIPTION,
                schema: ActionSchema::new("Instructions for entering a Pendle yield pool")
                    .field(FieldSpec::address(
                        "poolAddress",
                        "The address of the Pendle pool to enter",
                    ))
                    .field(FieldSpec::wei_amount(
                        "amount",
                        "Amount to deposit into the pool in wei",
                    )),
                failure_context: "Error entering pool",
                handler: Self::enter_pool_handler,
            })
            .register(ActionDefinition {
                name: "exit_position",
                description: EXIT_POSITION_DESCRIPTION,
                schema: ActionSchema::new("Instructions for exiting a Pendle position")
                    .field(FieldSpec::address(
                        "poolAddress",
                        "The address of the pool to exit from",
                    ))
                    .field(FieldSpec::wei_amount(
                        "amount",
                        "Amount to withdraw from the pool in wei",
                    ))
                    .field(
                        FieldSpec::decimal(
                            "priceThreshold",
                            "Optional price threshold for conditional exit",
                        )
                        .optional(),
                    ),
                failure_context: "Error exiting position",
                handler: Self::exit_position_handler,
            });

        Self {
            contracts,
            policy: RiskPolicy::default(),
            exit_guard: Arc::new(UncheckedExit),
            table,
        }
    }

    pub fn with_risk_policy(mut self, policy: RiskPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_exit_guard(mut self, guard: Arc<dyn ExitGuard>) -> Self {
        self.exit_guard = guard;
        self
    }

    fn compare_yields_handler<'a>(
        &'a self,
        wallet: &'a dyn WalletPort,
        input: ValidatedInput,
    ) -> ActionFuture<'a> {
        Box::pin(self.compare_yields(wallet, input))
    }

    fn enter_pool_handler<'a>(
        &'a self,
        wallet: &'a dyn WalletPort,
        input: ValidatedInput,
    ) -> ActionFuture<'a> {
        Box::pin(self.enter_pool(wallet, input))
    }

    fn exit_position_handler<'a>(
        &'a self,
        wallet: &'a dyn WalletPort,
        input: ValidatedInput,
    ) -> ActionFuture<'a> {
        Box::pin(self.exit_position(wallet, input))
    }

    async fn compare_yields(
        &self,
        wallet: &dyn WalletPort,
        input: ValidatedInput,
    ) -> Result<String, ActionError> {
        let args: CompareYieldsArgs = input.parse()?;
        let markets = contracts::read_all_markets(wallet, &self.contracts).await?;
        tracing::debug!("comparing {} Pendle markets", markets.len());

        let candidates = try_join_all(
            markets
                .into_iter()
                .map(|market| self.read_candidate(wallet, market)),
        )
        .await?;

        let now = Utc::now();
        let selected = self.policy.select(args.risk_tolerance, candidates, now);
        Ok(render_yields(args.risk_tolerance, &selected))
    }

    async fn read_candidate(
        &self,
        wallet: &dyn WalletPort,
        market: Address,
    ) -> Result<PoolCandidate, ActionError> {
        let (market, pool) = futures::try_join!(
            contracts::read_market(wallet, &self.contracts, market),
            contracts::read_pool(wallet, &self.contracts, market),
        )?;
        Ok(PoolCandidate { market, pool })
    }

    async fn enter_pool(
        &self,
        wallet: &dyn WalletPort,
        input: ValidatedInput,
    ) -> Result<String, ActionError> {
        let args: EnterPoolArgs = input.parse()?;
        let market = contracts::read_market(wallet, &self.contracts, args.pool_address).await?;
        ensure_enterable(&market, Utc::now())?;

        let request =
            contracts::build_add_liquidity(&self.contracts, args.pool_address, &args.amount)?;
        let confirmation = submit_and_confirm(wallet, request).await?;
        Ok(format!(
            "Entered Pendle pool {} with transaction hash: {}, and receipt:\n{}",
            args.pool_address, confirmation.tx_id, confirmation.receipt
        ))
    }

    async fn exit_position(
        &self,
        wallet: &dyn WalletPort,
        input: ValidatedInput,
    ) -> Result<String, ActionError> {
        let args: ExitPositionArgs = input.parse()?;
        let market = contracts::read_market(wallet, &self.contracts, args.pool_address).await?;
        if let Some(threshold) = args.price_threshold {
            self.exit_guard.check(wallet, &market, threshold).await?;
        }

        let request =
            contracts::build_remove_liquidity(&self.contracts, args.pool_address, &args.amount)?;
        let confirmation = submit_and_confirm(wallet, request).await?;
        Ok(format!(
            "Exited Pendle position in {} with transaction hash: {}, and receipt:\n{}",
            args.pool_address, confirmation.tx_id, confirmation.receipt
        ))
    }
}

fn ensure_enterable(market: &MarketDetails, now: DateTime<Utc>) -> Result<(), ActionError> {
    if !market.is_active() {
        return Err(ActionError::build(format!(
            "market {} is not active",
            market.market
        )));
    }
    if market.is_expired(now) {
        return Err(ActionError::build(format!(
            "market {} expired at {}",
            market.market,
            market.expiry.to_rfc3339()
        )));
    }
    Ok(())
}

fn render_yields(tolerance: RiskTolerance, selected: &[PoolCandidate]) -> String {
    if selected.is_empty() {
        return format!("No Pendle pools match {tolerance} risk tolerance.");
    }
    let lines: Vec<String> = selected
        .iter()
        .map(|c| {
            format!(
                "{}: {}% APR, liquidity {}, matures {}",
                c.market.market,
                c.pool.apr_percent,
                c.pool.liquidity_units(),
                c.market.expiry.format("%Y-%m-%d")
            )
        })
        .collect();
    format!(
        "Current yield opportunities for {tolerance} risk tolerance:\n{}",
        lines.join("\n")
    )
}

#[async_trait]
impl ActionProvider for PendleActionProvider {
    fn name(&self) -> &'static str {
        "pendle"
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
