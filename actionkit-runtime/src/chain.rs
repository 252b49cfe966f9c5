//! Alloy-backed wallet for EVM-compatible chains.
//!
//! Wraps an HTTP provider with a local signer. Nonce, gas and chain id are
//! filled by the provider; receipts are polled until the configured timeout.

use std::time::Duration;

use alloy::network::{Ethereum, EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::fillers::{
    BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
};
use alloy::providers::{Identity, Provider, ProviderBuilder, RootProvider};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::{RpcError, TransportErrorKind};
use async_trait::async_trait;

use crate::config::{ConfigError, RuntimeConfig};
use crate::types::{TransactionId, TransactionReceipt, TransactionRequest};
use crate::wallet::{ContractRead, WalletError, WalletPort};

/// Provider type produced by `ProviderBuilder::new().wallet(..).connect_http(..)`.
pub type HttpProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Ethereum>,
    Ethereum,
>;

pub struct ChainWallet {
    provider: HttpProvider,
    address: Address,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

impl ChainWallet {
    /// Create a wallet from an RPC URL and hex-encoded private key
    /// (with or without `0x`).
    pub fn new(rpc_url: &str, private_key: &str) -> Result<Self, ConfigError> {
        let signer: PrivateKeySigner = private_key.parse().map_err(|e| ConfigError::Invalid {
            key: "PRIVATE_KEY".into(),
            message: format!("Invalid private key: {e}"),
        })?;
        let address = signer.address();

        let url: url::Url = rpc_url.parse().map_err(|e| ConfigError::Invalid {
            key: "RPC_URL".into(),
            message: format!("Invalid RPC URL: {e}"),
        })?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url);

        Ok(Self {
            provider,
            address,
            receipt_timeout: Duration::from_secs(crate::config::DEFAULT_RECEIPT_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(crate::config::DEFAULT_RECEIPT_POLL_INTERVAL_MS),
        })
    }

    pub fn from_config(config: &RuntimeConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(&config.rpc_url, &config.private_key)?
            .with_receipt_polling(config.receipt_timeout, config.receipt_poll_interval))
    }

    pub fn with_receipt_polling(mut self, timeout: Duration, interval: Duration) -> Self {
        self.receipt_timeout = timeout;
        self.poll_interval = interval;
        self
    }

    async fn poll_receipt(&self, hash: B256) -> Result<TransactionReceipt, WalletError> {
        loop {
            match self.provider.get_transaction_receipt(hash).await {
                Ok(Some(receipt)) => {
                    let status = receipt.status();
                    let json = serde_json::to_value(&receipt)
                        .map_err(|e| WalletError::Dropped(format!("unreadable receipt: {e}")))?;
                    if !status {
                        return Err(WalletError::Reverted(format!("{hash} has failed status")));
                    }
                    return Ok(TransactionReceipt(json));
                }
                Ok(None) => {}
                Err(e) => tracing::debug!("receipt poll for {hash} failed: {e}"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Map a send failure onto the submission error kinds.
fn classify_send_error(error: RpcError<TransportErrorKind>) -> WalletError {
    let message = error.to_string();
    let lower = message.to_lowercase();
    if lower.contains("insufficient funds") {
        WalletError::InsufficientFunds(message)
    } else if lower.contains("nonce") {
        WalletError::NonceConflict(message)
    } else {
        WalletError::Rejected(message)
    }
}

fn classify_call_error(error: RpcError<TransportErrorKind>) -> WalletError {
    match error {
        RpcError::ErrorResp(payload) => WalletError::CallReverted(payload.to_string()),
        other => WalletError::Unreachable(other.to_string()),
    }
}

#[async_trait]
impl WalletPort for ChainWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn send_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<TransactionId, WalletError> {
        let tx = alloy::rpc::types::TransactionRequest::default()
            .from(self.address)
            .to(request.to)
            .input(request.data.into());

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(classify_send_error)?;
        Ok(TransactionId(pending.tx_hash().to_string()))
    }

    async fn wait_for_transaction_receipt(
        &self,
        tx_id: &TransactionId,
    ) -> Result<TransactionReceipt, WalletError> {
        let hash: B256 = tx_id
            .as_str()
            .parse()
            .map_err(|e| WalletError::Dropped(format!("unrecognized transaction id {tx_id}: {e}")))?;

        tokio::time::timeout(self.receipt_timeout, self.poll_receipt(hash))
            .await
            .map_err(|_| {
                WalletError::TimedOut(format!(
                    "no receipt for {hash} after {}s",
                    self.receipt_timeout.as_secs()
                ))
            })?
    }

    async fn read_contract(&self, read: ContractRead) -> Result<Bytes, WalletError> {
        let tx = alloy::rpc::types::TransactionRequest::default()
            .to(read.to)
            .input(read.data.into());
        self.provider.call(tx).await.map_err(classify_call_error)
    }
}
