//! Client adapter abstraction
//!
//! The SDK never talks to a node directly: encoding, estimation, calls,
//! broadcast, and subscriptions go through an [`Adapter`] implementation.
//! Broadcast progress arrives as a [`TxEvent`] channel covering the
//! transaction-hash, confirmation, receipt, and error signals.

use crate::abi::ContractAbi;
use crate::error::{Error, Result};
use crate::overload::FunctionCall;
use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Bytes, B256, U256};
use std::collections::BTreeMap;
use std::future::Future;
use tokio::sync::mpsc;

/// Deployed-contract binding data handed to [`Adapter::initialize`].
#[derive(Debug, Clone)]
pub struct ContractData {
    /// Deployed contract address.
    pub address: Address,
    /// Parsed ABI.
    pub abi: ContractAbi,
}

/// Parameters for a gas estimation or read-only call.
#[derive(Debug, Clone, Default)]
pub struct TxParams {
    /// Sender address, when known.
    pub from: Option<Address>,
    /// Recipient address; `None` for deploys.
    pub to: Option<Address>,
    /// Value transferred in wei.
    pub value: Option<U256>,
    /// Encoded calldata.
    pub data: Bytes,
}

/// The raw transaction shape handed to the adapter for broadcast.
#[derive(Debug, Clone, Default)]
pub struct RawTransaction {
    /// Sender address.
    pub from: Option<Address>,
    /// Recipient address; `None` for deploys.
    pub to: Option<Address>,
    /// Value transferred in wei.
    pub value: U256,
    /// Encoded calldata.
    pub data: Bytes,
    /// Gas limit.
    pub gas: Option<U256>,
    /// Gas price in wei.
    pub gas_price: Option<U256>,
    /// Account nonce.
    pub nonce: Option<u64>,
    /// Chain id.
    pub chain_id: Option<u64>,
    /// Pre-signed transaction bytes, when a send hook injected signing.
    /// The adapter selects the signed or unsigned broadcast path from this.
    pub signed: Option<Bytes>,
}

/// One raw event log, with values already decoded to wire shape by the
/// client and grouped under the event's name in the receipt.
#[derive(Debug, Clone)]
pub struct RawEventLog {
    /// Event name as reported by the client.
    pub name: String,
    /// Signature topic, absent for anonymous events.
    pub signature: Option<B256>,
    /// Decoded wire values in parameter order.
    pub values: Vec<DynSolValue>,
    /// Position within the block, used to preserve log order.
    pub log_index: u64,
}

/// The result record of a broadcast transaction once included in a block.
#[derive(Debug, Clone)]
pub struct TxReceipt {
    /// Transaction hash.
    pub transaction_hash: B256,
    /// Block the transaction was included in.
    pub block_number: u64,
    /// Execution status.
    pub status: bool,
    /// Gas consumed.
    pub gas_used: u64,
    /// Event logs grouped per event name.
    pub events: BTreeMap<String, Vec<RawEventLog>>,
}

/// Broadcast progress signal.
#[derive(Debug)]
pub enum TxEvent {
    /// The transaction hash was assigned; the transaction is in flight.
    Hash(B256),
    /// A confirmation block arrived.
    Confirmation(u64),
    /// The receipt is available.
    Receipt(TxReceipt),
    /// Broadcast or receipt retrieval failed.
    Error(Error),
}

/// Live subscription signal.
#[derive(Debug)]
pub enum SubscriptionEvent {
    /// A matching log arrived.
    Data(RawEventLog),
    /// The subscription failed.
    Error(Error),
}

/// Filter options for a live event subscription.
#[derive(Debug, Clone, Default)]
pub struct SubscribeOptions {
    /// Restrict to logs from this address.
    pub address: Option<Address>,
    /// Restrict to logs carrying these topics.
    pub topics: Vec<B256>,
}

/// The external client collaborator.
///
/// All operations that reach the node are asynchronous; encoding and
/// decoding are local and synchronous. Implementations decide the
/// signed-vs-unsigned broadcast path from [`RawTransaction::signed`].
pub trait Adapter: Send + Sync {
    /// Bind to a deployed contract.
    fn initialize(&self, contract: &ContractData)
        -> impl Future<Output = Result<()>> + Send;

    /// Encode constructor arguments into deploy data.
    fn encode_deploy(&self, args: &[DynSolValue]) -> Result<Bytes>;

    /// Encode a resolved function call into calldata.
    fn encode_function_call(&self, call: &FunctionCall) -> Result<Bytes>;

    /// Decode calldata back into the function call it encodes.
    fn decode_function_call_data(&self, data: &Bytes) -> Result<FunctionCall>;

    /// Estimate the gas cost of a transaction.
    fn estimate(&self, params: &TxParams) -> impl Future<Output = Result<U256>> + Send;

    /// Current gas price in wei.
    fn get_gas_price(&self) -> impl Future<Output = Result<U256>> + Send;

    /// Next account nonce for an address.
    fn get_nonce(&self, address: Address) -> impl Future<Output = Result<u64>> + Send;

    /// Chain id of the connected network.
    fn get_current_network(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Read-only invocation of a resolved function call.
    fn call(
        &self,
        call: &FunctionCall,
    ) -> impl Future<Output = Result<Vec<DynSolValue>>> + Send;

    /// Broadcast a transaction and stream its progress events.
    fn send_transaction(
        &self,
        tx: &RawTransaction,
    ) -> impl Future<Output = Result<mpsc::Receiver<TxEvent>>> + Send;

    /// Open a live log subscription.
    fn subscribe(
        &self,
        options: &SubscribeOptions,
    ) -> impl Future<Output = Result<mpsc::Receiver<SubscriptionEvent>>> + Send;
}
