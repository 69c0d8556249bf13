//! Mock collaborators shared by the crate's test modules.

use crate::adapter::{
    Adapter, ContractData, RawTransaction, SubscribeOptions, SubscriptionEvent, TxEvent, TxParams,
    TxReceipt,
};
use crate::error::{Error, Result};
use crate::overload::FunctionCall;
use crate::transaction::multisig::{standard_message_digest, trezor_message_digest};
use crate::wallet::Wallet;
use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::mpsc;

pub(crate) const ADDR_A: &str = "0xaf88d065e77c8cC2239327C5EDb3A432268e5831";
pub(crate) const ADDR_B: &str = "0x6D0bA1f9996DBD8885827e1b2e8f6593e7702411";

/// A minimal successful receipt.
pub(crate) fn receipt(hash: B256) -> TxReceipt {
    TxReceipt {
        transaction_hash: hash,
        block_number: 1_234_567,
        status: true,
        gas_used: 21_000,
        events: BTreeMap::new(),
    }
}

/// Scriptable adapter: broadcast progress and call results are driven by
/// queues the test fills in.
pub(crate) struct MockAdapter {
    pub gas_price: U256,
    pub nonce: u64,
    pub chain_id: u64,
    pub gas_estimate: U256,
    pub estimate_calls: Mutex<u32>,
    pub sent: Mutex<Vec<RawTransaction>>,
    scripts: Mutex<VecDeque<Vec<TxEvent>>>,
    subscriptions: Mutex<VecDeque<Vec<SubscriptionEvent>>>,
    call_results: Mutex<VecDeque<Vec<DynSolValue>>>,
    encoded: Mutex<BTreeMap<Bytes, FunctionCall>>,
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self {
            gas_price: U256::from(2_000_000_000u64),
            nonce: 7,
            chain_id: 42_161,
            gas_estimate: U256::from(84_000u64),
            estimate_calls: Mutex::new(0),
            sent: Mutex::new(Vec::new()),
            scripts: Mutex::new(VecDeque::new()),
            subscriptions: Mutex::new(VecDeque::new()),
            call_results: Mutex::new(VecDeque::new()),
            encoded: Mutex::new(BTreeMap::new()),
        }
    }
}

impl MockAdapter {
    /// Queue the progress events for the next broadcast.
    pub fn push_script(&self, events: Vec<TxEvent>) {
        self.scripts.lock().unwrap().push_back(events);
    }

    /// Queue the signals for the next subscription.
    pub fn push_subscription(&self, events: Vec<SubscriptionEvent>) {
        self.subscriptions.lock().unwrap().push_back(events);
    }

    /// Queue the result of the next read-only call.
    pub fn push_call_result(&self, values: Vec<DynSolValue>) {
        self.call_results.lock().unwrap().push_back(values);
    }
}

impl Adapter for MockAdapter {
    async fn initialize(&self, _contract: &ContractData) -> Result<()> {
        Ok(())
    }

    fn encode_deploy(&self, args: &[DynSolValue]) -> Result<Bytes> {
        let mut data = keccak256(b"deploy")[..4].to_vec();
        data.extend_from_slice(&DynSolValue::Tuple(args.to_vec()).abi_encode_params());
        Ok(Bytes::from(data))
    }

    fn encode_function_call(&self, call: &FunctionCall) -> Result<Bytes> {
        let mut data = keccak256(call.signature.as_bytes())[..4].to_vec();
        data.extend_from_slice(&DynSolValue::Tuple(call.args.clone()).abi_encode_params());
        let data = Bytes::from(data);
        self.encoded
            .lock()
            .unwrap()
            .insert(data.clone(), call.clone());
        Ok(data)
    }

    fn decode_function_call_data(&self, data: &Bytes) -> Result<FunctionCall> {
        self.encoded
            .lock()
            .unwrap()
            .get(data)
            .cloned()
            .ok_or_else(|| Error::state("unknown calldata"))
    }

    async fn estimate(&self, _params: &TxParams) -> Result<U256> {
        *self.estimate_calls.lock().unwrap() += 1;
        Ok(self.gas_estimate)
    }

    async fn get_gas_price(&self) -> Result<U256> {
        Ok(self.gas_price)
    }

    async fn get_nonce(&self, _address: Address) -> Result<u64> {
        Ok(self.nonce)
    }

    async fn get_current_network(&self) -> Result<u64> {
        Ok(self.chain_id)
    }

    async fn call(&self, _call: &FunctionCall) -> Result<Vec<DynSolValue>> {
        Ok(self.call_results.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn send_transaction(&self, tx: &RawTransaction) -> Result<mpsc::Receiver<TxEvent>> {
        self.sent.lock().unwrap().push(tx.clone());
        let events = self.scripts.lock().unwrap().pop_front().unwrap_or_else(|| {
            let hash = keccak256(&tx.data);
            vec![TxEvent::Hash(hash), TxEvent::Receipt(receipt(hash))]
        });
        let (sender, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            sender.send(event).await.expect("channel sized to script");
        }
        Ok(rx)
    }

    async fn subscribe(
        &self,
        _options: &SubscribeOptions,
    ) -> Result<mpsc::Receiver<SubscriptionEvent>> {
        let events = self.subscriptions.lock().unwrap().pop_front().unwrap_or_default();
        let (sender, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            sender.send(event).await.expect("channel sized to script");
        }
        Ok(rx)
    }
}

/// Wallet over a throwaway local key, signing with either message-digest
/// convention.
pub(crate) struct MockWallet {
    signer: PrivateKeySigner,
    trezor: bool,
}

impl MockWallet {
    pub fn random() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
            trezor: false,
        }
    }

    pub fn trezor() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
            trezor: true,
        }
    }
}

impl Wallet for MockWallet {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn sign(&self, tx: &RawTransaction) -> Result<Bytes> {
        Ok(Bytes::from(keccak256(&tx.data).to_vec()))
    }

    async fn sign_message(&self, payload: &[u8]) -> Result<Bytes> {
        let digest = if self.trezor {
            trezor_message_digest(payload)
        } else {
            standard_message_digest(payload)
        };
        let signature = self
            .signer
            .sign_hash_sync(&digest)
            .map_err(|e| Error::Transport(eyre::Report::new(e)))?;
        let mut bytes = Vec::with_capacity(65);
        bytes.extend_from_slice(&signature.r().to_be_bytes::<32>());
        bytes.extend_from_slice(&signature.s().to_be_bytes::<32>());
        bytes.push(27 + signature.v() as u8);
        Ok(Bytes::from(bytes))
    }

    async fn verify_message(&self, message: &[u8], signature: &[u8]) -> Result<bool> {
        if signature.len() != 65 {
            return Ok(false);
        }
        let r = U256::from_be_slice(&signature[..32]);
        let s = U256::from_be_slice(&signature[32..64]);
        let parity = matches!(signature[64], 1 | 28);
        let sig = alloy::primitives::Signature::new(r, s, parity);
        for digest in [
            standard_message_digest(message),
            trezor_message_digest(message),
        ] {
            if let Ok(address) = sig.recover_address_from_prehash(&digest) {
                if address == self.signer.address() {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}
