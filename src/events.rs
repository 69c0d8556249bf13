//! Event descriptors and log decoding

use crate::abi::{self, EventDef};
use crate::adapter::{Adapter, RawEventLog, SubscribeOptions, SubscriptionEvent};
use crate::error::{Error, Result};
use crate::params::ParamsSpec;
use crate::value::Value;
use alloy::primitives::{Address, B256};
use std::collections::BTreeMap;
use tokio::sync::mpsc;

/// A decoded event entry attached to a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    /// Logical event name from the descriptor.
    pub event: String,
    /// Signature topic hash.
    pub signature: B256,
    /// Converted event data, keyed by parameter name.
    pub data: BTreeMap<String, Value>,
    /// Event name as reported by the client log.
    pub name: String,
}

/// One event of a contract: canonical signature, topic hash, and the
/// parameter spec used to convert decoded log values.
#[derive(Debug, Clone)]
pub struct Event {
    /// Logical event name.
    pub name: String,
    /// Canonical signature string.
    pub signature: String,
    /// Signature hash used for topic lookup.
    pub topic: B256,
    /// Parameter spec in log order.
    pub params: ParamsSpec,
    anonymous: bool,
}

impl Event {
    /// Build an event descriptor from its ABI definition.
    pub fn from_def(def: &EventDef) -> Result<Self> {
        let signature = def.signature();
        Ok(Self {
            name: def.name.clone(),
            topic: abi::signature_hash(&signature),
            params: abi::params_spec(&def.inputs)?,
            signature,
            anonymous: def.anonymous,
        })
    }

    /// Decode one raw log against this descriptor.
    ///
    /// The log's signature topic, when present, must match this event's
    /// hash; field values convert through the parameter spec.
    pub fn decode(&self, log: &RawEventLog) -> Result<DecodedEvent> {
        if !self.anonymous {
            if let Some(signature) = log.signature {
                if signature != self.topic {
                    return Err(Error::state(format!(
                        "log signature does not match event \"{}\"",
                        self.name
                    )));
                }
            }
        }
        Ok(DecodedEvent {
            event: self.name.clone(),
            signature: self.topic,
            data: self.params.convert_output(&log.values),
            name: log.name.clone(),
        })
    }

    /// Open a live subscription for this event on a contract, decoding
    /// each arriving log.
    pub async fn subscribe<A: Adapter>(
        &self,
        adapter: &A,
        contract: Address,
    ) -> Result<mpsc::Receiver<Result<DecodedEvent>>> {
        let options = SubscribeOptions {
            address: Some(contract),
            topics: if self.anonymous { Vec::new() } else { vec![self.topic] },
        };
        let mut raw = adapter.subscribe(&options).await?;
        let (tx, rx) = mpsc::channel(16);
        let event = self.clone();
        tokio::spawn(async move {
            while let Some(signal) = raw.recv().await {
                let item = match signal {
                    SubscriptionEvent::Data(log) => event.decode(&log),
                    SubscriptionEvent::Error(err) => Err(err),
                };
                if tx.send(item).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}
