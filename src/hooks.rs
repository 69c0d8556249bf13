//! Extension-point hook chains
//!
//! A transaction exposes two named extension points: `send` (runs over the
//! transaction state before broadcast, e.g. to inject signing) and
//! `receipt` (runs over the decoded receipt). Hooks transform the value in
//! place and never alter control flow. A manager may delegate to a parent
//! manager shared by every transaction of one factory; parent hooks run
//! before own hooks, each chain in registration order.

use crate::adapter::TxReceipt;
use crate::error::Result;
use crate::transaction::TransactionState;
use std::sync::{Arc, RwLock};

/// Hook over the transaction state at the `send` extension point.
pub type SendHook = Arc<dyn Fn(&mut TransactionState) -> Result<()> + Send + Sync>;

/// Hook over the decoded receipt at the `receipt` extension point.
pub type ReceiptHook = Arc<dyn Fn(&mut TxReceipt) -> Result<()> + Send + Sync>;

/// Named hook chains with optional parent delegation.
#[derive(Default)]
pub struct HookManager {
    parent: Option<Arc<HookManager>>,
    send: RwLock<Vec<SendHook>>,
    receipt: RwLock<Vec<ReceiptHook>>,
}

impl HookManager {
    /// A manager with no parent.
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager delegating to `parent` (parent hooks run first).
    pub fn with_parent(parent: Arc<HookManager>) -> Self {
        Self {
            parent: Some(parent),
            ..Self::default()
        }
    }

    /// Register a `send` hook.
    pub fn on_send<F>(&self, hook: F)
    where
        F: Fn(&mut TransactionState) -> Result<()> + Send + Sync + 'static,
    {
        self.send.write().expect("hook registry poisoned").push(Arc::new(hook));
    }

    /// Register a `receipt` hook.
    pub fn on_receipt<F>(&self, hook: F)
    where
        F: Fn(&mut TxReceipt) -> Result<()> + Send + Sync + 'static,
    {
        self.receipt
            .write()
            .expect("hook registry poisoned")
            .push(Arc::new(hook));
    }

    /// Run the `send` chain over the transaction state, parent first.
    pub fn run_send(&self, state: &mut TransactionState) -> Result<()> {
        if let Some(parent) = &self.parent {
            parent.run_send(state)?;
        }
        let hooks = self.send.read().expect("hook registry poisoned").clone();
        for hook in hooks {
            hook(state)?;
        }
        Ok(())
    }

    /// Run the `receipt` chain over a receipt, parent first.
    pub fn run_receipt(&self, receipt: &mut TxReceipt) -> Result<()> {
        if let Some(parent) = &self.parent {
            parent.run_receipt(receipt)?;
        }
        let hooks = self.receipt.read().expect("hook registry poisoned").clone();
        for hook in hooks {
            hook(receipt)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TxPayload;
    use alloy::primitives::U256;

    #[test]
    fn test_parent_hooks_run_before_child_hooks() {
        let parent = Arc::new(HookManager::new());
        let child = HookManager::with_parent(parent.clone());

        // Each hook appends a digit to the gas value; the final value
        // records execution order.
        parent.on_send(|state| {
            state.gas = Some(U256::from(1u64));
            Ok(())
        });
        child.on_send(|state| {
            let gas = state.gas.unwrap_or_default();
            state.gas = Some(gas * U256::from(10u64) + U256::from(2u64));
            Ok(())
        });

        let mut state = TransactionState::new(TxPayload::Raw);
        child.run_send(&mut state).unwrap();
        assert_eq!(state.gas, Some(U256::from(12u64)));
    }

    #[test]
    fn test_hooks_run_in_registration_order() {
        let hooks = HookManager::new();
        hooks.on_send(|state| {
            state.gas = Some(U256::from(7u64));
            Ok(())
        });
        hooks.on_send(|state| {
            let gas = state.gas.unwrap_or_default();
            state.gas = Some(gas + U256::from(1u64));
            Ok(())
        });
        let mut state = TransactionState::new(TxPayload::Raw);
        hooks.run_send(&mut state).unwrap();
        assert_eq!(state.gas, Some(U256::from(8u64)));
    }
}
