//! Pendle contract bindings and the typed read boundary.
//!
//! Raw `getMarketInfo`/`getPoolInfo` tuples are decoded and range-checked
//! here, so the rest of the provider only sees [`MarketDetails`] and
//! [`PoolDetails`].

use alloy::primitives::{address, Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::ActionError;
use crate::types::{TransactionRequest, WeiAmount};
use crate::wallet::{read_call, WalletPort};

sol! {
    interface IPendleMarketFactory {
        struct MarketInfo {
            address yieldToken;
            uint256 expiry;
            uint8 state;
        }

        function getAllMarkets() external view returns (address[] memory);
        function getMarketInfo(address marketAddress) external view returns (MarketInfo memory);
    }

    interface IPendleSwap {
        struct PoolInfo {
            uint256 totalSupply;
            uint256 virtualTotalSupply;
            uint256 currentYieldAPR;
        }

        function getPoolInfo(address marketAddress) external view returns (PoolInfo memory);
    }

    interface IPendleRouter {
        function addLiquidity(address marketAddress, uint256 amount) external returns (uint256);
        function removeLiquidity(address marketAddress, uint256 amount) external returns (uint256);
    }
}

pub const MARKET_FACTORY: Address = address!("0x59968008a703dC13E6beaECed644bdCe4ee45d13");
pub const PENDLE_SWAP: Address = address!("0x313e7Ef7d52f5C10aC04ebaa4d33CDc68634c212");
pub const ROUTER: Address = address!("0x888888888889758F76e7103c6CbF23ABbF58F946");

/// Fixed-point scale of on-chain APR and supply values.
pub const WAD_DECIMALS: u32 = 18;

/// Upper bound on a plausible APR: 100x, i.e. 10,000%.
const MAX_APR_WAD: u128 = 100 * 10u128.pow(WAD_DECIMALS);

/// Addresses of the Pendle contracts a provider talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendleContracts {
    pub market_factory: Address,
    pub pendle_swap: Address,
    pub router: Address,
}

impl Default for PendleContracts {
    fn default() -> Self {
        Self {
            market_factory: MARKET_FACTORY,
            pendle_swap: PENDLE_SWAP,
            router: ROUTER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketState {
    Active,
    Inactive,
}

impl TryFrom<u8> for MarketState {
    type Error = ActionError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(MarketState::Active),
            1 => Ok(MarketState::Inactive),
            other => Err(ActionError::read(format!("unknown market state {other}"))),
        }
    }
}

/// Decoded `getMarketInfo` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketDetails {
    pub market: Address,
    pub yield_token: Address,
    pub expiry: DateTime<Utc>,
    pub state: MarketState,
}

impl MarketDetails {
    pub fn from_raw(
        market: Address,
        raw: IPendleMarketFactory::MarketInfo,
    ) -> Result<Self, ActionError> {
        let expiry = i64::try_from(raw.expiry)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| {
                ActionError::read(format!("market {market} has out-of-range expiry {}", raw.expiry))
            })?;
        Ok(Self {
            market,
            yield_token: raw.yieldToken,
            expiry,
            state: MarketState::try_from(raw.state)?,
        })
    }

    pub fn is_active(&self) -> bool {
        self.state == MarketState::Active
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }
}

/// Decoded `getPoolInfo` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolDetails {
    pub total_supply: U256,
    pub virtual_total_supply: U256,
    /// Current APR in percent.
    pub apr_percent: Decimal,
}

impl PoolDetails {
    pub fn from_raw(market: Address, raw: IPendleSwap::PoolInfo) -> Result<Self, ActionError> {
        let apr_wad = u128::try_from(raw.currentYieldAPR)
            .ok()
            .filter(|apr| *apr <= MAX_APR_WAD)
            .ok_or_else(|| {
                ActionError::read(format!(
                    "market {market} reports implausible APR {}",
                    raw.currentYieldAPR
                ))
            })?;
        // Bounded above, so the conversion cannot overflow the 96-bit mantissa.
        let fraction = Decimal::try_from_i128_with_scale(apr_wad as i128, WAD_DECIMALS)
            .map_err(|e| ActionError::read(format!("market {market} APR: {e}")))?;
        Ok(Self {
            total_supply: raw.totalSupply,
            virtual_total_supply: raw.virtualTotalSupply,
            apr_percent: (fraction * Decimal::ONE_HUNDRED).normalize(),
        })
    }

    /// Total supply in whole 18-decimal units, rounded down.
    pub fn liquidity_units(&self) -> U256 {
        self.total_supply / U256::from(10u64).pow(U256::from(WAD_DECIMALS))
    }
}

pub async fn read_all_markets(
    wallet: &dyn WalletPort,
    contracts: &PendleContracts,
) -> Result<Vec<Address>, ActionError> {
    read_call(
        wallet,
        contracts.market_factory,
        &IPendleMarketFactory::getAllMarketsCall {},
    )
    .await
}

pub async fn read_market(
    wallet: &dyn WalletPort,
    contracts: &PendleContracts,
    market: Address,
) -> Result<MarketDetails, ActionError> {
    let raw = read_call(
        wallet,
        contracts.market_factory,
        &IPendleMarketFactory::getMarketInfoCall {
            marketAddress: market,
        },
    )
    .await?;
    MarketDetails::from_raw(market, raw)
}

pub async fn read_pool(
    wallet: &dyn WalletPort,
    contracts: &PendleContracts,
    market: Address,
) -> Result<PoolDetails, ActionError> {
    let raw = read_call(
        wallet,
        contracts.pendle_swap,
        &IPendleSwap::getPoolInfoCall {
            marketAddress: market,
        },
    )
    .await?;
    PoolDetails::from_raw(market, raw)
}

pub fn build_add_liquidity(
    contracts: &PendleContracts,
    market: Address,
    amount: &WeiAmount,
) -> Result<TransactionRequest, ActionError> {
    let call = IPendleRouter::addLiquidityCall {
        marketAddress: market,
        amount: amount.to_u256()?,
    };
    Ok(TransactionRequest {
        to: contracts.router,
        data: Bytes::from(call.abi_encode()),
    })
}

pub fn build_remove_liquidity(
    contracts: &PendleContracts,
    market: Address,
    amount: &WeiAmount,
) -> Result<TransactionRequest, ActionError> {
    let call = IPendleRouter::removeLiquidityCall {
        marketAddress: market,
        amount: amount.to_u256()?,
    };
    Ok(TransactionRequest {
        to: contracts.router,
        data: Bytes::from(call.abi_encode()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mock::MockWallet;

    const MARKET: Address = address!("0x00000000000000000000000000000000000000a1");
    const SY: Address = address!("0x00000000000000000000000000000000000000b1");

    fn wad(units: u64) -> U256 {
        U256::from(units) * U256::from(10u64).pow(U256::from(18u64))
    }

    #[test]
    fn test_market_state_decoding() {
        assert_eq!(MarketState::try_from(0).unwrap(), MarketState::Active);
        assert_eq!(MarketState::try_from(1).unwrap(), MarketState::Inactive);
        assert_eq!(MarketState::try_from(7).unwrap_err().kind(), ErrorKind::Read);
    }

    #[test]
    fn test_market_expiry_out_of_range() {
        let err = MarketDetails::from_raw(
            MARKET,
            IPendleMarketFactory::MarketInfo {
                yieldToken: SY,
                expiry: U256::MAX,
                state: 0,
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Read);
        assert!(err.to_string().contains("expiry"));
    }

    #[test]
    fn test_apr_is_wad_fraction() {
        // 0.125e18 == 12.5%
        let pool = PoolDetails::from_raw(
            MARKET,
            IPendleSwap::PoolInfo {
                totalSupply: wad(2_500_000),
                virtualTotalSupply: wad(2_500_000),
                currentYieldAPR: U256::from(125_000_000_000_000_000u64),
            },
        )
        .unwrap();
        assert_eq!(pool.apr_percent, Decimal::new(125, 1));
        assert_eq!(pool.liquidity_units(), U256::from(2_500_000u64));
    }

    #[test]
    fn test_implausible_apr_rejected() {
        let err = PoolDetails::from_raw(
            MARKET,
            IPendleSwap::PoolInfo {
                totalSupply: U256::ZERO,
                virtualTotalSupply: U256::ZERO,
                currentYieldAPR: wad(101),
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Read);
    }

    #[test]
    fn test_liquidity_builders_target_router() {
        let contracts = PendleContracts::default();
        let amount: WeiAmount = serde_json::from_value(serde_json::json!("5000")).unwrap();

        let enter = build_add_liquidity(&contracts, MARKET, &amount).unwrap();
        assert_eq!(enter.to, ROUTER);
        let decoded = IPendleRouter::addLiquidityCall::abi_decode(&enter.data).unwrap();
        assert_eq!(decoded.marketAddress, MARKET);
        assert_eq!(decoded.amount, U256::from(5000u64));

        let exit = build_remove_liquidity(&contracts, MARKET, &amount).unwrap();
        assert_eq!(exit.to, ROUTER);
        assert_eq!(
            &exit.data[..4],
            IPendleRouter::removeLiquidityCall::SELECTOR.as_slice()
        );
    }

    #[tokio::test]
    async fn test_read_market_through_wallet() {
        let wallet = MockWallet::new();
        let contracts = PendleContracts::default();
        wallet.on_call(
            MARKET_FACTORY,
            &IPendleMarketFactory::getMarketInfoCall {
                marketAddress: MARKET,
            },
            Ok(IPendleMarketFactory::getMarketInfoCall::abi_encode_returns(
                &IPendleMarketFactory::MarketInfo {
                    yieldToken: SY,
                    expiry: U256::from(1_900_000_000u64),
                    state: 0,
                },
            )
            .into()),
        );

        let market = read_market(&wallet, &contracts, MARKET).await.unwrap();
        assert_eq!(market.yield_token, SY);
        assert!(market.is_active());
        assert_eq!(market.expiry.timestamp(), 1_900_000_000);
        assert_eq!(wallet.reads().len(), 1);
    }
}
