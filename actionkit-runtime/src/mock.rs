//! Scripted in-memory [`WalletPort`] for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{address, Address, Bytes};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde_json::json;

use crate::types::{TransactionId, TransactionReceipt, TransactionRequest};
use crate::wallet::{ContractRead, WalletError, WalletPort};

pub const MOCK_WALLET_ADDRESS: Address = address!("0x00000000000000000000000000000000000a11ce");

/// Wallet double that records every call and answers from a script.
///
/// Reads match an exact scripted call first, then the target address and
/// 4-byte selector; an unscripted read fails with [`WalletError::CallReverted`].
#[derive(Debug)]
pub struct MockWallet {
    address: Address,
    send_result: Mutex<Result<TransactionId, WalletError>>,
    receipt_result: Mutex<Result<TransactionReceipt, WalletError>>,
    read_results: Mutex<HashMap<(Address, [u8; 4]), Result<Bytes, WalletError>>>,
    call_results: Mutex<HashMap<(Address, Bytes), Result<Bytes, WalletError>>>,
    sent: Mutex<Vec<TransactionRequest>>,
    reads: Mutex<Vec<ContractRead>>,
    receipt_waits: Mutex<usize>,
}

impl Default for MockWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWallet {
    pub fn new() -> Self {
        Self {
            address: MOCK_WALLET_ADDRESS,
            send_result: Mutex::new(Ok(TransactionId(format!("0x{}", "ab".repeat(32))))),
            receipt_result: Mutex::new(Ok(TransactionReceipt(json!({"status": 1})))),
            read_results: Mutex::new(HashMap::new()),
            call_results: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            reads: Mutex::new(Vec::new()),
            receipt_waits: Mutex::new(0),
        }
    }

    pub fn with_tx_id(self, tx_id: &str) -> Self {
        *lock(&self.send_result) = Ok(TransactionId::from(tx_id));
        self
    }

    pub fn with_receipt(self, receipt: serde_json::Value) -> Self {
        *lock(&self.receipt_result) = Ok(TransactionReceipt(receipt));
        self
    }

    pub fn fail_send(&self, error: WalletError) {
        *lock(&self.send_result) = Err(error);
    }

    pub fn fail_receipt(&self, error: WalletError) {
        *lock(&self.receipt_result) = Err(error);
    }

    pub fn on_read(&self, to: Address, selector: [u8; 4], result: Result<Bytes, WalletError>) {
        lock(&self.read_results).insert((to, selector), result);
    }

    /// Script the answer for one exact call; takes precedence over [`Self::on_read`].
    pub fn on_call<C: SolCall>(&self, to: Address, call: &C, result: Result<Bytes, WalletError>) {
        lock(&self.call_results).insert((to, Bytes::from(call.abi_encode())), result);
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        lock(&self.sent).clone()
    }

    pub fn reads(&self) -> Vec<ContractRead> {
        lock(&self.reads).clone()
    }

    pub fn receipt_waits(&self) -> usize {
        *lock(&self.receipt_waits)
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait]
impl WalletPort for MockWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn send_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<TransactionId, WalletError> {
        lock(&self.sent).push(request);
        lock(&self.send_result).clone()
    }

    async fn wait_for_transaction_receipt(
        &self,
        _tx_id: &TransactionId,
    ) -> Result<TransactionReceipt, WalletError> {
        *lock(&self.receipt_waits) += 1;
        lock(&self.receipt_result).clone()
    }

    async fn read_contract(&self, read: ContractRead) -> Result<Bytes, WalletError> {
        let selector: [u8; 4] = read
            .data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .unwrap_or_default();
        let exact = lock(&self.call_results)
            .get(&(read.to, read.data.clone()))
            .cloned();
        let by_selector = lock(&self.read_results).get(&(read.to, selector)).cloned();
        lock(&self.reads).push(read);
        exact
            .or(by_selector)
            .unwrap_or_else(|| Err(WalletError::CallReverted("no scripted response".into())))
    }
}
