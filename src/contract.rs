//! Contract accessor layer
//!
//! Builds typed constant/method/event accessors from a parsed ABI. Calls
//! resolve across overloads through the conversion engine; every
//! transaction produced here shares this contract's hook manager as its
//! parent.

use crate::abi::ContractAbi;
use crate::adapter::{Adapter, ContractData};
use crate::error::{Error, Result};
use crate::events::{DecodedEvent, Event};
use crate::hooks::HookManager;
use crate::overload::FunctionParams;
use crate::params::{CallArgs, ParamsSpec};
use crate::transaction::{Transaction, TxOptions};
use crate::value::Value;
use alloy::primitives::Address;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;

struct FunctionEntry {
    params: FunctionParams,
    outputs: BTreeMap<String, ParamsSpec>,
    constant: bool,
}

/// A deployed contract with typed accessors.
pub struct Contract<A: Adapter> {
    adapter: Arc<A>,
    address: Address,
    hooks: Arc<HookManager>,
    functions: BTreeMap<String, FunctionEntry>,
    events: Arc<BTreeMap<String, Event>>,
}

impl<A: Adapter> Contract<A> {
    /// Bind to a deployed contract and build its accessor tables.
    pub async fn new(adapter: Arc<A>, address: Address, abi: ContractAbi) -> Result<Self> {
        let data = ContractData {
            address,
            abi: abi.clone(),
        };
        adapter.initialize(&data).await?;

        let mut functions: BTreeMap<String, FunctionEntry> = BTreeMap::new();
        for def in abi.constants.iter().chain(abi.methods.iter()) {
            let signature = def.signature();
            let entry = functions
                .entry(def.name.clone())
                .or_insert_with(|| FunctionEntry {
                    params: FunctionParams::new(),
                    outputs: BTreeMap::new(),
                    constant: def.constant,
                });
            entry.params.insert(signature.clone(), def.input_params()?);
            entry.outputs.insert(signature, def.output_params()?);
        }

        let mut events = BTreeMap::new();
        for def in &abi.events {
            events.insert(def.name.clone(), Event::from_def(def)?);
        }

        Ok(Self {
            adapter,
            address,
            hooks: Arc::new(HookManager::new()),
            functions,
            events: Arc::new(events),
        })
    }

    /// The bound contract address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The hook manager shared as parent by this contract's transactions.
    pub fn hooks(&self) -> &Arc<HookManager> {
        &self.hooks
    }

    /// The overload set of one logical function name.
    pub fn function(&self, name: &str) -> Result<&FunctionParams> {
        Ok(&self.entry(name)?.params)
    }

    fn entry(&self, name: &str) -> Result<&FunctionEntry> {
        self.functions
            .get(name)
            .ok_or_else(|| Error::state(format!("unknown function \"{name}\"")))
    }

    fn entry_for_signature(&self, signature: &str) -> Result<&FunctionEntry> {
        let name = signature
            .split('(')
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::state(format!("malformed signature \"{signature}\"")))?;
        self.entry(name)
    }

    // ========== Read-only calls ==========

    /// Invoke a function read-only, resolving the signature from the
    /// arguments.
    pub async fn call(&self, name: &str, args: CallArgs) -> Result<BTreeMap<String, Value>> {
        let entry = self.entry(name)?;
        let call = entry.params.resolve(&args)?;
        let raw = self.adapter.call(&call).await?;
        Ok(entry
            .outputs
            .get(&call.signature)
            .map(|outputs| outputs.convert_output(&raw))
            .unwrap_or_default())
    }

    /// Invoke one pinned signature read-only, bypassing resolution.
    pub async fn call_signature(
        &self,
        signature: &str,
        args: CallArgs,
    ) -> Result<BTreeMap<String, Value>> {
        let entry = self.entry_for_signature(signature)?;
        let call = entry.params.convert_for(signature, &args)?;
        let raw = self.adapter.call(&call).await?;
        Ok(entry
            .outputs
            .get(signature)
            .map(|outputs| outputs.convert_output(&raw))
            .unwrap_or_default())
    }

    // ========== Transactions ==========

    /// Build a transaction for a method, resolving the signature from the
    /// arguments.
    pub fn transaction(
        &self,
        name: &str,
        args: CallArgs,
        options: TxOptions,
    ) -> Result<Transaction<A>> {
        let entry = self.entry(name)?;
        if entry.constant {
            return Err(Error::state(format!(
                "\"{name}\" is a constant and cannot be transacted"
            )));
        }
        let call = entry.params.resolve(&args)?;
        Transaction::contract_call(
            self.adapter.clone(),
            self.address,
            self.events.clone(),
            call,
            options,
            Some(self.hooks.clone()),
        )
    }

    /// Build a transaction for one pinned signature, bypassing resolution.
    pub fn transaction_for_signature(
        &self,
        signature: &str,
        args: CallArgs,
        options: TxOptions,
    ) -> Result<Transaction<A>> {
        let entry = self.entry_for_signature(signature)?;
        let call = entry.params.convert_for(signature, &args)?;
        Transaction::contract_call(
            self.adapter.clone(),
            self.address,
            self.events.clone(),
            call,
            options,
            Some(self.hooks.clone()),
        )
    }

    // ========== Events ==========

    /// Look up an event descriptor.
    pub fn event(&self, name: &str) -> Result<&Event> {
        self.events
            .get(name)
            .ok_or_else(|| Error::state(format!("unknown event \"{name}\"")))
    }

    /// The full event table, shared with transactions for receipt
    /// decoding.
    pub fn events(&self) -> &Arc<BTreeMap<String, Event>> {
        &self.events
    }

    /// Open a live decoded subscription for one event.
    pub async fn subscribe(&self, name: &str) -> Result<mpsc::Receiver<Result<DecodedEvent>>> {
        self.event(name)?.subscribe(&*self.adapter, self.address).await
    }
}
