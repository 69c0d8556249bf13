//! Transaction lifecycle state machine
//!
//! A transaction moves through construction, estimation, signing, broadcast
//! and confirmation tracking, driven by the adapter's event channel. The
//! committed state is owned exclusively by its transaction: hash and
//! receipt are set exactly once, confirmations are append-only, and the
//! numeric fields freeze the moment the transaction is sent. An error
//! event that arrives before any receipt clears the sent marker so the
//! caller may retry.

pub mod multisig;

use crate::adapter::{Adapter, RawTransaction, TxEvent, TxParams, TxReceipt};
use crate::error::{Error, Result};
use crate::events::{DecodedEvent, Event};
use crate::hooks::HookManager;
use crate::overload::FunctionCall;
use crate::value::Value;
use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{hex, Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

/// What the transaction carries: a resolved contract call, constructor
/// arguments for a deploy, or raw calldata.
#[derive(Debug, Clone)]
pub enum TxPayload {
    /// Raw calldata supplied by the caller.
    Raw,
    /// A resolved contract function call.
    Call(FunctionCall),
    /// Constructor arguments for a contract deploy.
    Deploy(Vec<DynSolValue>),
}

/// Caller-supplied overrides merged over computed defaults at
/// construction.
#[derive(Debug, Clone, Default)]
pub struct TxOptions {
    /// Sender address.
    pub from: Option<Address>,
    /// Recipient address; must match the bound contract for contract
    /// calls.
    pub to: Option<Address>,
    /// Value in wei.
    pub value: Option<U256>,
    /// Gas limit; set explicitly to skip estimation.
    pub gas: Option<U256>,
    /// Gas price in wei.
    pub gas_price: Option<U256>,
    /// Account nonce.
    pub nonce: Option<u64>,
    /// Chain id.
    pub chain_id: Option<u64>,
}

/// The committed state of one transaction.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// Payload kind.
    pub payload: TxPayload,
    /// Encoded calldata.
    pub data: Bytes,
    /// Recipient address.
    pub to: Option<Address>,
    /// Sender address.
    pub from: Option<Address>,
    /// Value in wei.
    pub value: Option<U256>,
    /// Gas limit.
    pub gas: Option<U256>,
    /// Gas price in wei.
    pub gas_price: Option<U256>,
    /// Account nonce.
    pub nonce: Option<u64>,
    /// Chain id.
    pub chain_id: Option<u64>,
    /// Confirmation counts in arrival order.
    pub confirmations: Vec<u64>,
    /// Set when the first confirmation arrives.
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Set when the transaction hash is assigned; cleared by an error
    /// event that precedes any receipt.
    pub sent_at: Option<DateTime<Utc>>,
    /// Transaction hash.
    pub hash: Option<B256>,
    /// Receipt, once obtained.
    pub receipt: Option<TxReceipt>,
    /// Decoded contract events from the receipt.
    pub events: Vec<DecodedEvent>,
    /// Construction instant.
    pub created_at: DateTime<Utc>,
    /// Signed raw bytes injected by a send hook, when signing happens
    /// before broadcast.
    pub signed: Option<Bytes>,
}

impl TransactionState {
    /// Fresh state for a payload.
    pub fn new(payload: TxPayload) -> Self {
        Self {
            payload,
            data: Bytes::new(),
            to: None,
            from: None,
            value: None,
            gas: None,
            gas_price: None,
            nonce: None,
            chain_id: None,
            confirmations: Vec::new(),
            confirmed_at: None,
            sent_at: None,
            hash: None,
            receipt: None,
            events: Vec::new(),
            created_at: Utc::now(),
            signed: None,
        }
    }

    fn apply_options(&mut self, options: &TxOptions) {
        self.from = options.from;
        self.value = options.value;
        self.gas = options.gas;
        self.gas_price = options.gas_price;
        self.nonce = options.nonce;
        self.chain_id = options.chain_id;
    }

    /// The raw transaction shape for broadcast.
    pub fn raw_transaction(&self) -> RawTransaction {
        RawTransaction {
            from: self.from,
            to: self.to,
            value: self.value.unwrap_or_default(),
            data: self.data.clone(),
            gas: self.gas,
            gas_price: self.gas_price,
            nonce: self.nonce,
            chain_id: self.chain_id,
            signed: self.signed.clone(),
        }
    }

    /// Serialize the committed state; optional fields appear only when
    /// set.
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = json!({
            "createdAt": self.created_at.timestamp(),
            "data": format!("0x{}", hex::encode(&self.data)),
            "confirmations": self.confirmations,
        });
        let map = obj.as_object_mut().expect("object literal");
        if let TxPayload::Call(call) = &self.payload {
            map.insert("functionCall".into(), json!({ "signature": call.signature }));
        }
        if let Some(to) = self.to {
            map.insert("to".into(), json!(to.to_string()));
        }
        if let Some(from) = self.from {
            map.insert("from".into(), json!(from.to_string()));
        }
        if let Some(value) = self.value {
            map.insert("value".into(), json!(value.to_string()));
        }
        if let Some(gas) = self.gas {
            map.insert("gas".into(), json!(gas.to_string()));
        }
        if let Some(gas_price) = self.gas_price {
            map.insert("gasPrice".into(), json!(gas_price.to_string()));
        }
        if let Some(nonce) = self.nonce {
            map.insert("nonce".into(), json!(nonce));
        }
        if let Some(chain_id) = self.chain_id {
            map.insert("chainId".into(), json!(chain_id));
        }
        if let Some(sent_at) = self.sent_at {
            map.insert("sentAt".into(), json!(sent_at.timestamp()));
        }
        if let Some(confirmed_at) = self.confirmed_at {
            map.insert("confirmedAt".into(), json!(confirmed_at.timestamp()));
        }
        if let Some(hash) = self.hash {
            map.insert("hash".into(), json!(hash.to_string()));
        }
        if let Some(receipt) = &self.receipt {
            map.insert(
                "receipt".into(),
                json!({
                    "transactionHash": receipt.transaction_hash.to_string(),
                    "blockNumber": receipt.block_number,
                    "status": receipt.status,
                    "gasUsed": receipt.gas_used,
                }),
            );
        }
        obj
    }
}

type HashObserver = Box<dyn Fn(B256) + Send + Sync>;
type ConfirmationObserver = Box<dyn Fn(u64) + Send + Sync>;
type ReceiptObserver = Box<dyn Fn(&TxReceipt) + Send + Sync>;
type ErrorObserver = Box<dyn Fn(&Error) + Send + Sync>;

#[derive(Default)]
struct Observers {
    hash: Vec<HashObserver>,
    confirmation: Vec<ConfirmationObserver>,
    receipt: Vec<ReceiptObserver>,
    error: Vec<ErrorObserver>,
}

/// A single on-chain transaction with at-most-once send semantics.
pub struct Transaction<A: Adapter> {
    adapter: Arc<A>,
    hooks: Arc<HookManager>,
    event_defs: Option<Arc<BTreeMap<String, Event>>>,
    state: TransactionState,
    observers: Observers,
}

impl<A: Adapter> std::fmt::Debug for Transaction<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("event_defs", &self.event_defs)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<A: Adapter> Transaction<A> {
    /// A raw-calldata transaction.
    pub fn raw(adapter: Arc<A>, data: Bytes, options: TxOptions) -> Self {
        let mut state = TransactionState::new(TxPayload::Raw);
        state.apply_options(&options);
        state.to = options.to;
        state.data = data;
        Self {
            adapter,
            hooks: Arc::new(HookManager::new()),
            event_defs: None,
            state,
            observers: Observers::default(),
        }
    }

    /// A contract-call transaction bound to a deployed contract.
    ///
    /// A supplied `to` override must equal the bound contract address.
    pub fn contract_call(
        adapter: Arc<A>,
        contract_address: Address,
        events: Arc<BTreeMap<String, Event>>,
        call: FunctionCall,
        options: TxOptions,
        parent_hooks: Option<Arc<HookManager>>,
    ) -> Result<Self> {
        if let Some(to) = options.to {
            if to != contract_address {
                return Err(Error::state("\"to\" address does not match contract address"));
            }
        }
        let data = adapter.encode_function_call(&call)?;
        let mut state = TransactionState::new(TxPayload::Call(call));
        state.apply_options(&options);
        state.to = Some(contract_address);
        state.data = data;
        let hooks = match parent_hooks {
            Some(parent) => Arc::new(HookManager::with_parent(parent)),
            None => Arc::new(HookManager::new()),
        };
        Ok(Self {
            adapter,
            hooks,
            event_defs: Some(events),
            state,
            observers: Observers::default(),
        })
    }

    /// A contract-deploy transaction carrying constructor arguments.
    pub fn deploy(adapter: Arc<A>, args: Vec<DynSolValue>, options: TxOptions) -> Result<Self> {
        if options.to.is_some() {
            return Err(Error::state(
                "\"to\" address cannot be set for deploy transactions",
            ));
        }
        let data = adapter.encode_deploy(&args)?;
        let mut state = TransactionState::new(TxPayload::Deploy(args));
        state.apply_options(&options);
        state.data = data;
        Ok(Self {
            adapter,
            hooks: Arc::new(HookManager::new()),
            event_defs: None,
            state,
            observers: Observers::default(),
        })
    }

    /// The committed state.
    pub fn state(&self) -> &TransactionState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut TransactionState {
        &mut self.state
    }

    pub(crate) fn adapter(&self) -> &Arc<A> {
        &self.adapter
    }

    /// This transaction's hook manager.
    pub fn hooks(&self) -> &Arc<HookManager> {
        &self.hooks
    }

    /// The resolved function call, for contract-call transactions.
    pub fn function_call(&self) -> Option<&FunctionCall> {
        match &self.state.payload {
            TxPayload::Call(call) => Some(call),
            _ => None,
        }
    }

    /// Decoded contract events from the receipt.
    pub fn events(&self) -> &[DecodedEvent] {
        &self.state.events
    }

    // ========== Observers ==========

    /// Observe transaction-hash assignment.
    pub fn on_transaction_hash(&mut self, f: impl Fn(B256) + Send + Sync + 'static) {
        self.observers.hash.push(Box::new(f));
    }

    /// Observe confirmations.
    pub fn on_confirmation(&mut self, f: impl Fn(u64) + Send + Sync + 'static) {
        self.observers.confirmation.push(Box::new(f));
    }

    /// Observe receipt arrival.
    pub fn on_receipt(&mut self, f: impl Fn(&TxReceipt) + Send + Sync + 'static) {
        self.observers.receipt.push(Box::new(f));
    }

    /// Observe lifecycle errors.
    pub fn on_error(&mut self, f: impl Fn(&Error) + Send + Sync + 'static) {
        self.observers.error.push(Box::new(f));
    }

    // ========== Mutable fields (frozen after send) ==========

    fn guard_not_sent(&self, what: &str) -> Result<()> {
        if self.state.sent_at.is_some() {
            return Err(Error::state(format!(
                "Unable to set {what}: the transaction has already been sent"
            )));
        }
        Ok(())
    }

    /// Set the gas limit. Unnormalizable input stores nothing; mutation
    /// after send fails.
    pub fn set_gas(&mut self, value: Value) -> Result<()> {
        self.guard_not_sent("gas limit")?;
        self.state.gas = value.as_u256();
        Ok(())
    }

    /// Set the gas price in wei.
    pub fn set_gas_price(&mut self, value: Value) -> Result<()> {
        self.guard_not_sent("gas price")?;
        self.state.gas_price = value.as_u256();
        Ok(())
    }

    /// Set the account nonce.
    pub fn set_nonce(&mut self, value: Value) -> Result<()> {
        self.guard_not_sent("nonce")?;
        self.state.nonce = value.as_u64();
        Ok(())
    }

    /// Set the value transferred in wei.
    pub fn set_value(&mut self, value: Value) -> Result<()> {
        self.guard_not_sent("value")?;
        self.state.value = value.as_u256();
        Ok(())
    }

    /// Set the chain id.
    pub fn set_chain_id(&mut self, value: Value) -> Result<()> {
        self.guard_not_sent("chain id")?;
        self.state.chain_id = value.as_u64();
        Ok(())
    }

    // ========== Lifecycle ==========

    /// Estimate the gas cost of the encoded call. Does not mutate
    /// committed state and may be called any number of times.
    pub async fn estimate(&self) -> Result<U256> {
        let params = TxParams {
            from: self.state.from,
            to: self.state.to,
            value: self.state.value,
            data: self.state.data.clone(),
        };
        self.adapter.estimate(&params).await
    }

    /// Broadcast the transaction and drive it to a receipt.
    ///
    /// Unset fields fill lazily (gas via estimation, gas price, nonce and
    /// chain id via adapter queries); explicit values always win. Fails
    /// synchronously if the transaction was already sent.
    pub async fn send(&mut self) -> Result<()> {
        if self.state.sent_at.is_some() {
            return Err(Error::state(
                "Unable to send: the transaction has already been sent",
            ));
        }
        if self.state.gas.is_none() {
            self.state.gas = Some(self.estimate().await?);
        }
        if self.state.gas_price.is_none() {
            self.state.gas_price = Some(self.adapter.get_gas_price().await?);
        }
        if self.state.nonce.is_none() {
            let from = self
                .state
                .from
                .ok_or_else(|| Error::state("\"from\" address is required to send"))?;
            self.state.nonce = Some(self.adapter.get_nonce(from).await?);
        }
        if self.state.chain_id.is_none() {
            self.state.chain_id = Some(self.adapter.get_current_network().await?);
        }
        self.send_inner().await
    }

    async fn send_inner(&mut self) -> Result<()> {
        let hooks = self.hooks.clone();
        hooks.run_send(&mut self.state)?;

        let raw = self.state.raw_transaction();
        let mut progress = self.adapter.send_transaction(&raw).await?;
        tracing::debug!(to = ?raw.to, nonce = ?raw.nonce, "transaction submitted");

        while let Some(event) = progress.recv().await {
            match event {
                TxEvent::Hash(hash) => {
                    self.state.hash = Some(hash);
                    self.state.sent_at = Some(Utc::now());
                    tracing::info!(%hash, "transaction hash assigned");
                    for observer in &self.observers.hash {
                        observer(hash);
                    }
                }
                TxEvent::Confirmation(count) => {
                    if self.state.confirmations.is_empty() {
                        self.state.confirmed_at = Some(Utc::now());
                    }
                    self.state.confirmations.push(count);
                    for observer in &self.observers.confirmation {
                        observer(count);
                    }
                }
                TxEvent::Receipt(mut receipt) => {
                    hooks.run_receipt(&mut receipt)?;
                    if matches!(self.state.payload, TxPayload::Call(_)) {
                        self.state.events =
                            decode_receipt_events(self.event_defs.as_deref(), &receipt)?;
                    }
                    tracing::info!(block = receipt.block_number, "transaction receipt received");
                    for observer in &self.observers.receipt {
                        observer(&receipt);
                    }
                    self.state.receipt = Some(receipt);
                    return Ok(());
                }
                TxEvent::Error(err) => {
                    if self.state.receipt.is_none() {
                        // The transaction never landed; make it eligible
                        // for a fresh send.
                        self.state.sent_at = None;
                    }
                    tracing::warn!(error = %err, "transaction failed");
                    for observer in &self.observers.error {
                        observer(&err);
                    }
                    return Err(err);
                }
            }
        }
        Err(Error::state("event stream ended before a receipt was received"))
    }

    /// Serialize the committed state for persistence.
    pub fn to_json(&self) -> serde_json::Value {
        self.state.to_json()
    }
}

fn decode_receipt_events(
    defs: Option<&BTreeMap<String, Event>>,
    receipt: &TxReceipt,
) -> Result<Vec<DecodedEvent>> {
    let Some(defs) = defs else {
        return Ok(Vec::new());
    };
    let mut decoded: Vec<(u64, DecodedEvent)> = Vec::new();
    for (name, logs) in &receipt.events {
        let Some(event) = defs.get(name) else {
            tracing::debug!(event = %name, "receipt log has no matching event definition");
            continue;
        };
        for log in logs {
            decoded.push((log.log_index, event.decode(log)?));
        }
    }
    decoded.sort_by_key(|(index, _)| *index);
    Ok(decoded.into_iter().map(|(_, event)| event).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::AbiParam;
    use crate::adapter::RawEventLog;
    use crate::events::Event;
    use crate::testutil::{receipt, MockAdapter, ADDR_A, ADDR_B};
    use std::sync::atomic::{AtomicU64, Ordering};

    fn call() -> FunctionCall {
        FunctionCall {
            signature: "ping()".into(),
            args: vec![],
        }
    }

    fn contract_tx(adapter: Arc<MockAdapter>, options: TxOptions) -> Transaction<MockAdapter> {
        Transaction::contract_call(
            adapter,
            ADDR_A.parse().unwrap(),
            Arc::new(BTreeMap::new()),
            call(),
            options,
            None,
        )
        .unwrap()
    }

    fn options_from_b() -> TxOptions {
        TxOptions {
            from: Some(ADDR_B.parse().unwrap()),
            ..TxOptions::default()
        }
    }

    #[test]
    fn test_to_mismatch_fails_construction() {
        let adapter = Arc::new(MockAdapter::default());
        let err = Transaction::contract_call(
            adapter,
            ADDR_A.parse().unwrap(),
            Arc::new(BTreeMap::new()),
            call(),
            TxOptions {
                to: Some(ADDR_B.parse().unwrap()),
                ..TxOptions::default()
            },
            None,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "\"to\" address does not match contract address"
        );
    }

    #[tokio::test]
    async fn test_setters_freeze_after_send() {
        let adapter = Arc::new(MockAdapter::default());
        adapter.push_script(vec![
            TxEvent::Hash(B256::repeat_byte(1)),
            TxEvent::Receipt(receipt(B256::repeat_byte(1))),
        ]);
        let mut tx = contract_tx(adapter, options_from_b());

        tx.set_gas(Value::from("123456")).unwrap();
        assert_eq!(tx.state().gas, Some(U256::from(123_456u64)));

        tx.send().await.unwrap();
        assert!(tx.state().sent_at.is_some());

        let err = tx.set_gas(Value::Int(1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to set gas limit: the transaction has already been sent"
        );
        for result in [
            tx.set_gas_price(Value::Int(1)),
            tx.set_nonce(Value::Int(1)),
            tx.set_value(Value::Int(1)),
            tx.set_chain_id(Value::Int(1)),
        ] {
            assert!(result.is_err());
        }
    }

    #[test]
    fn test_bad_literal_stores_nothing_without_failing() {
        let adapter = Arc::new(MockAdapter::default());
        let mut tx = contract_tx(adapter, options_from_b());
        tx.set_gas(Value::from("not a number")).unwrap();
        assert_eq!(tx.state().gas, None);
    }

    #[tokio::test]
    async fn test_send_twice_is_rejected() {
        let adapter = Arc::new(MockAdapter::default());
        adapter.push_script(vec![
            TxEvent::Hash(B256::repeat_byte(2)),
            TxEvent::Receipt(receipt(B256::repeat_byte(2))),
        ]);
        let mut tx = contract_tx(adapter, options_from_b());
        tx.send().await.unwrap();
        let err = tx.send().await.unwrap_err();
        assert!(err.to_string().contains("already been sent"));
    }

    #[tokio::test]
    async fn test_lazy_defaulting_fills_only_unset_fields() {
        let adapter = Arc::new(MockAdapter::default());
        adapter.push_script(vec![
            TxEvent::Hash(B256::repeat_byte(3)),
            TxEvent::Receipt(receipt(B256::repeat_byte(3))),
        ]);
        let mut tx = contract_tx(
            adapter.clone(),
            TxOptions {
                from: Some(ADDR_B.parse().unwrap()),
                gas: Some(U256::from(55_555u64)),
                ..TxOptions::default()
            },
        );
        tx.send().await.unwrap();

        // Explicit gas wins: estimation never ran.
        assert_eq!(*adapter.estimate_calls.lock().unwrap(), 0);
        let sent = adapter.sent.lock().unwrap();
        assert_eq!(sent[0].gas, Some(U256::from(55_555u64)));
        assert_eq!(sent[0].gas_price, Some(adapter.gas_price));
        assert_eq!(sent[0].nonce, Some(adapter.nonce));
        assert_eq!(sent[0].chain_id, Some(adapter.chain_id));
    }

    #[tokio::test]
    async fn test_lifecycle_records_hash_confirmations_receipt() {
        let adapter = Arc::new(MockAdapter::default());
        let hash = B256::repeat_byte(4);
        adapter.push_script(vec![
            TxEvent::Hash(hash),
            TxEvent::Confirmation(1),
            TxEvent::Confirmation(2),
            TxEvent::Receipt(receipt(hash)),
        ]);
        let mut tx = contract_tx(adapter, options_from_b());

        let seen = Arc::new(AtomicU64::new(0));
        let seen_in_observer = seen.clone();
        tx.on_confirmation(move |_| {
            seen_in_observer.fetch_add(1, Ordering::SeqCst);
        });

        tx.send().await.unwrap();
        let state = tx.state();
        assert_eq!(state.hash, Some(hash));
        assert_eq!(state.confirmations, vec![1, 2]);
        assert!(state.confirmed_at.is_some());
        assert!(state.receipt.is_some());
        // Receipt does not clear the sent marker.
        assert!(state.sent_at.is_some());
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_error_before_receipt_clears_sent_and_allows_retry() {
        let adapter = Arc::new(MockAdapter::default());
        adapter.push_script(vec![
            TxEvent::Hash(B256::repeat_byte(5)),
            TxEvent::Error(Error::Transport(eyre::eyre!("nonce too low"))),
        ]);
        adapter.push_script(vec![
            TxEvent::Hash(B256::repeat_byte(6)),
            TxEvent::Receipt(receipt(B256::repeat_byte(6))),
        ]);
        let mut tx = contract_tx(adapter, options_from_b());

        let err = tx.send().await.unwrap_err();
        assert!(err.to_string().contains("nonce too low"));
        assert!(tx.state().sent_at.is_none());

        // Caller-driven retry succeeds.
        tx.send().await.unwrap();
        assert!(tx.state().receipt.is_some());
        assert!(tx.state().sent_at.is_some());
    }

    #[tokio::test]
    async fn test_receipt_events_decode_in_log_order() {
        let transfer = Event::from_def(&crate::abi::EventDef {
            name: "Transfer".into(),
            inputs: vec![
                AbiParam::new("from", "address"),
                AbiParam::new("to", "address"),
                AbiParam::new("value", "uint256"),
            ],
            anonymous: false,
        })
        .unwrap();
        let approval = Event::from_def(&crate::abi::EventDef {
            name: "Approval".into(),
            inputs: vec![
                AbiParam::new("owner", "address"),
                AbiParam::new("spender", "address"),
                AbiParam::new("value", "uint256"),
            ],
            anonymous: false,
        })
        .unwrap();

        let addr: Address = ADDR_B.parse().unwrap();
        let transfer_log = |index: u64, amount: u64| RawEventLog {
            name: "Transfer".into(),
            signature: Some(transfer.topic),
            values: vec![
                DynSolValue::Address(addr),
                DynSolValue::Address(Address::ZERO),
                DynSolValue::Uint(U256::from(amount), 256),
            ],
            log_index: index,
        };
        let approval_log = RawEventLog {
            name: "Approval".into(),
            signature: Some(approval.topic),
            values: vec![
                DynSolValue::Address(addr),
                DynSolValue::Address(Address::ZERO),
                DynSolValue::Uint(U256::from(7u64), 256),
            ],
            log_index: 1,
        };

        let mut rcpt = receipt(B256::repeat_byte(7));
        rcpt.events
            .insert("Transfer".into(), vec![transfer_log(0, 10), transfer_log(2, 20)]);
        rcpt.events.insert("Approval".into(), vec![approval_log]);

        let adapter = Arc::new(MockAdapter::default());
        adapter.push_script(vec![
            TxEvent::Hash(B256::repeat_byte(7)),
            TxEvent::Receipt(rcpt),
        ]);

        let mut defs = BTreeMap::new();
        defs.insert("Transfer".to_string(), transfer);
        defs.insert("Approval".to_string(), approval);
        let mut tx = Transaction::contract_call(
            adapter,
            ADDR_A.parse().unwrap(),
            Arc::new(defs),
            call(),
            options_from_b(),
            None,
        )
        .unwrap();

        tx.send().await.unwrap();
        let events = tx.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event, "Transfer");
        assert_eq!(events[1].event, "Approval");
        assert_eq!(events[2].event, "Transfer");
        assert_eq!(events[2].data["value"], Value::Uint(U256::from(20u64)));
    }

    #[tokio::test]
    async fn test_send_hook_injects_signing() {
        let adapter = Arc::new(MockAdapter::default());
        adapter.push_script(vec![
            TxEvent::Hash(B256::repeat_byte(8)),
            TxEvent::Receipt(receipt(B256::repeat_byte(8))),
        ]);
        let mut tx = contract_tx(adapter.clone(), options_from_b());
        tx.hooks().on_send(|state| {
            state.signed = Some(Bytes::from(vec![0xAA, 0xBB]));
            Ok(())
        });
        tx.send().await.unwrap();

        let sent = adapter.sent.lock().unwrap();
        assert_eq!(sent[0].signed, Some(Bytes::from(vec![0xAA, 0xBB])));
    }

    #[tokio::test]
    async fn test_deploy_takes_no_recipient() {
        let adapter = Arc::new(MockAdapter::default());
        let err = Transaction::deploy(
            adapter.clone(),
            vec![],
            TxOptions {
                to: Some(ADDR_A.parse().unwrap()),
                ..TxOptions::default()
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("deploy"));

        let tx = Transaction::deploy(
            adapter,
            vec![DynSolValue::Bool(true)],
            TxOptions {
                from: Some(ADDR_B.parse().unwrap()),
                ..TxOptions::default()
            },
        )
        .unwrap();
        assert!(tx.state().to.is_none());
        assert!(!tx.state().data.is_empty());
        assert!(matches!(tx.state().payload, TxPayload::Deploy(_)));
    }

    #[tokio::test]
    async fn test_to_json_includes_only_set_fields() {
        let adapter = Arc::new(MockAdapter::default());
        let mut tx = contract_tx(adapter.clone(), options_from_b());
        let json = tx.to_json();
        assert!(json.get("hash").is_none());
        assert!(json.get("sentAt").is_none());
        assert_eq!(json["functionCall"]["signature"], "ping()");

        adapter.push_script(vec![
            TxEvent::Hash(B256::repeat_byte(9)),
            TxEvent::Receipt(receipt(B256::repeat_byte(9))),
        ]);
        tx.send().await.unwrap();
        let json = tx.to_json();
        assert!(json.get("hash").is_some());
        assert!(json.get("sentAt").is_some());
        assert_eq!(json["receipt"]["status"], true);
    }
}
