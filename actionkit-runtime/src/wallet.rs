//! The wallet port: everything the action pipeline needs from a wallet,
//! and nothing about how signing, nonces or gas are handled.

use alloy::primitives::{Address, Bytes};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use thiserror::Error;

use crate::error::ActionError;
use crate::types::{Confirmation, TransactionId, TransactionReceipt, TransactionRequest};

/// Failures reported by a wallet implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("nonce conflict: {0}")]
    NonceConflict(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("transaction dropped: {0}")]
    Dropped(String),

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("timed out: {0}")]
    TimedOut(String),

    #[error("node unreachable: {0}")]
    Unreachable(String),

    #[error("call reverted: {0}")]
    CallReverted(String),
}

impl WalletError {
    pub fn code(&self) -> &'static str {
        match self {
            WalletError::InsufficientFunds(_) => "insufficient_funds",
            WalletError::NonceConflict(_) => "nonce_conflict",
            WalletError::Rejected(_) => "rejected",
            WalletError::Dropped(_) => "dropped",
            WalletError::Reverted(_) => "reverted",
            WalletError::TimedOut(_) => "timed_out",
            WalletError::Unreachable(_) => "unreachable",
            WalletError::CallReverted(_) => "call_reverted",
        }
    }
}

/// Read-only contract call: target plus ABI-encoded calldata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractRead {
    pub to: Address,
    pub data: Bytes,
}

/// Capabilities consumed by action providers.
///
/// Implementations own retry and timeout policy; callers treat every method
/// as at-most-once.
#[async_trait]
pub trait WalletPort: Send + Sync {
    /// Address transactions are sent from.
    fn address(&self) -> Address;

    /// Sign and broadcast. Returns once the node has accepted the transaction.
    async fn send_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<TransactionId, WalletError>;

    /// Block until the transaction is confirmed, dropped, reverted or the
    /// wallet's own deadline passes.
    async fn wait_for_transaction_receipt(
        &self,
        tx_id: &TransactionId,
    ) -> Result<TransactionReceipt, WalletError>;

    /// Execute a read-only call and return the raw return data.
    async fn read_contract(&self, read: ContractRead) -> Result<Bytes, WalletError>;
}

/// Encode `call`, run it against `to` and decode the typed return value.
pub async fn read_call<C: SolCall>(
    wallet: &dyn WalletPort,
    to: Address,
    call: &C,
) -> Result<C::Return, ActionError> {
    tracing::debug!("reading {} on {to}", C::SIGNATURE);
    let raw = wallet
        .read_contract(ContractRead {
            to,
            data: Bytes::from(call.abi_encode()),
        })
        .await
        .map_err(|e| ActionError::read(format!("{} on {to}: {e}", C::SIGNATURE)))?;
    C::abi_decode_returns(&raw).map_err(|e| {
        ActionError::read(format!("{} on {to} returned malformed data: {e}", C::SIGNATURE))
    })
}

/// SUBMIT then CONFIRM. Neither step is retried here.
pub async fn submit_and_confirm(
    wallet: &dyn WalletPort,
    request: TransactionRequest,
) -> Result<Confirmation, ActionError> {
    let to = request.to;
    let tx_id = wallet
        .send_transaction(request)
        .await
        .map_err(ActionError::Submission)?;
    tracing::info!("submitted transaction {tx_id} to {to}");

    let receipt = wallet
        .wait_for_transaction_receipt(&tx_id)
        .await
        .map_err(ActionError::Confirmation)?;
    tracing::info!("transaction {tx_id} confirmed");

    Ok(Confirmation { tx_id, receipt })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mock::MockWallet;
    use alloy::primitives::address;
    use alloy::sol;

    sol! {
        interface ICounter {
            function count() external view returns (uint256);
        }
    }

    const COUNTER: Address = address!("0x00000000000000000000000000000000000000c0");

    #[tokio::test]
    async fn test_read_call_decodes_return() {
        let wallet = MockWallet::new();
        wallet.on_read(
            COUNTER,
            ICounter::countCall::SELECTOR,
            Ok(ICounter::countCall::abi_encode_returns(&alloy::primitives::U256::from(7u64)).into()),
        );
        let count = read_call(&wallet, COUNTER, &ICounter::countCall {})
            .await
            .unwrap();
        assert_eq!(count, alloy::primitives::U256::from(7u64));
    }

    #[tokio::test]
    async fn test_read_call_maps_wallet_error() {
        let wallet = MockWallet::new();
        wallet.on_read(
            COUNTER,
            ICounter::countCall::SELECTOR,
            Err(WalletError::Unreachable("connection refused".into())),
        );
        let err = read_call(&wallet, COUNTER, &ICounter::countCall {})
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Read);
        assert!(err.to_string().contains("count()"));
    }

    #[tokio::test]
    async fn test_read_call_rejects_malformed_return() {
        let wallet = MockWallet::new();
        wallet.on_read(COUNTER, ICounter::countCall::SELECTOR, Ok(Bytes::from(vec![1u8, 2, 3])));
        let err = read_call(&wallet, COUNTER, &ICounter::countCall {})
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Read);
        assert!(err.to_string().contains("malformed"));
    }

    #[tokio::test]
    async fn test_submission_failure_skips_confirmation() {
        let wallet = MockWallet::new();
        wallet.fail_send(WalletError::InsufficientFunds("balance 0".into()));
        let err = submit_and_confirm(
            &wallet,
            TransactionRequest {
                to: COUNTER,
                data: Bytes::new(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Submission);
        assert_eq!(wallet.receipt_waits(), 0);
    }

    #[tokio::test]
    async fn test_confirmation_failure_reported() {
        let wallet = MockWallet::new();
        wallet.fail_receipt(WalletError::Reverted("status 0".into()));
        let err = submit_and_confirm(
            &wallet,
            TransactionRequest {
                to: COUNTER,
                data: Bytes::new(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Confirmation);
        assert_eq!(wallet.sent().len(), 1);
    }
}
