//! Quorum SDK for Rust
//!
//! A contract-calling convenience layer over a blockchain client: given a
//! contract's ABI it builds typed constant/method/event accessors,
//! converts values between native and wire types, drives the transaction
//! lifecycle (estimate, sign, send, confirm), and coordinates
//! multi-signature transactions.
//!
//! # Features
//!
//! - Positional-or-named argument conversion with overload resolution
//! - Transaction lifecycle with at-most-once send and caller-driven retry
//! - Threshold-signature coordination with per-signer mode detection
//!
//! # Example
//!
//! ```rust,ignore
//! use quorum_sdk::{CallArgs, Contract, ContractAbi, TxOptions, Value};
//!
//! #[tokio::main]
//! async fn main() -> quorum_sdk::Result<()> {
//!     let abi = ContractAbi::from_json(include_str!("token.json"))?;
//!     let contract = Contract::new(adapter, token_address, abi).await?;
//!
//!     // Read a constant; outputs come back as a named-field map
//!     let out = contract
//!         .call("balanceOf", CallArgs::named([("owner", Value::from(me))]))
//!         .await?;
//!
//!     // Build and send a transaction; the signature resolves from the
//!     // arguments across all overloads of `transfer`
//!     let mut tx = contract.transaction(
//!         "transfer",
//!         CallArgs::from(vec![Value::from(recipient), Value::from(10u64)]),
//!         TxOptions { from: Some(me), ..TxOptions::default() },
//!     )?;
//!     tx.send().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod abi;
pub mod adapter;
pub mod contract;
pub mod error;
pub mod events;
pub mod hooks;
pub mod overload;
pub mod params;
pub mod transaction;
pub mod value;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export main types for convenience
pub use abi::{AbiOverrides, AbiParam, ContractAbi, EventDef, FunctionDef};
pub use adapter::{
    Adapter, ContractData, RawEventLog, RawTransaction, SubscribeOptions, SubscriptionEvent,
    TxEvent, TxParams, TxReceipt,
};
pub use contract::Contract;
pub use error::{Error, OverloadAttempt, Result};
pub use events::{DecodedEvent, Event};
pub use hooks::HookManager;
pub use overload::{FunctionCall, FunctionParams};
pub use params::{CallArgs, ParamSpec, ParamType, ParamsSpec};
pub use transaction::multisig::{
    MultiSigConfig, MultiSigTransaction, SignerEntry, SigningMode,
};
pub use transaction::{Transaction, TransactionState, TxOptions, TxPayload};
pub use value::Value;
pub use wallet::Wallet;
