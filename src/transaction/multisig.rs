//! Multi-signature transaction coordination
//!
//! Wraps a contract-call transaction in a threshold-signature protocol:
//! the target call is hashed together with the sender, recipient, value
//! and a dedicated multi-sig nonce; each signer contributes a signature
//! over that hash (with its message-digest convention detected per
//! signer); and broadcast goes through the contract's designated
//! multi-sig function carrying the address-sorted signature arrays
//! instead of the target call directly.
//!
//! The multi-sig nonce binds every collected signature: when a refresh
//! observes a different nonce, all collected signatures are dropped.

use crate::adapter::Adapter;
use crate::error::{Error, Result};
use crate::events::Event;
use crate::hooks::HookManager;
use crate::overload::FunctionCall;
use crate::transaction::{Transaction, TxOptions, TxPayload};
use crate::wallet::Wallet;
use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{hex, keccak256, Address, Bytes, Signature, B256, U256};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

/// Which message-digest convention a signature was produced under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningMode {
    /// The standard Ethereum signed-message digest.
    Standard,
    /// The hardware-wallet digest variant (length as a raw byte).
    Trezor,
}

impl SigningMode {
    /// Wire representation passed to the multi-sig contract.
    pub fn as_u8(self) -> u8 {
        match self {
            SigningMode::Standard => 0,
            SigningMode::Trezor => 1,
        }
    }

    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(SigningMode::Standard),
            1 => Some(SigningMode::Trezor),
            _ => None,
        }
    }

    fn digest(self, payload: &[u8]) -> B256 {
        match self {
            SigningMode::Standard => standard_message_digest(payload),
            SigningMode::Trezor => trezor_message_digest(payload),
        }
    }
}

/// The standard Ethereum signed-message digest
/// (`\x19Ethereum Signed Message:\n<len>` with the length in ASCII).
pub fn standard_message_digest(payload: &[u8]) -> B256 {
    let mut buf = Vec::with_capacity(payload.len() + 34);
    buf.extend_from_slice(b"\x19Ethereum Signed Message:\n");
    buf.extend_from_slice(payload.len().to_string().as_bytes());
    buf.extend_from_slice(payload);
    keccak256(&buf)
}

/// The hardware-wallet digest variant: the payload length is a single raw
/// byte rather than ASCII digits.
pub fn trezor_message_digest(payload: &[u8]) -> B256 {
    let mut buf = Vec::with_capacity(payload.len() + 28);
    buf.extend_from_slice(b"\x19Ethereum Signed Message:\n");
    buf.push(payload.len() as u8);
    buf.extend_from_slice(payload);
    keccak256(&buf)
}

/// One collected signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerEntry {
    /// Signature `r` component.
    pub sig_r: B256,
    /// Signature `s` component.
    pub sig_s: B256,
    /// Recovery byte (27 or 28).
    pub sig_v: u8,
    /// Detected digest convention.
    pub mode: SigningMode,
}

type NonceProvider = Box<dyn Fn() -> BoxFuture<'static, Result<u64>> + Send + Sync>;
type RequiredSignersProvider = Box<dyn Fn() -> BoxFuture<'static, Result<Vec<Address>>> + Send + Sync>;
type ResetCallback = Box<dyn Fn() + Send + Sync>;

const DEFAULT_EXECUTE_SIGNATURE: &str = "execute(uint8[],bytes32[],bytes32[],uint8[],uint256,bytes)";

/// Configuration of the multi-sig protocol: the external nonce and
/// required-signer providers, and the designated contract function that
/// accepts the combined signatures.
pub struct MultiSigConfig {
    execute_signature: String,
    nonce_provider: NonceProvider,
    required_signers_provider: RequiredSignersProvider,
    reset_callback: Option<ResetCallback>,
}

impl MultiSigConfig {
    /// Build a configuration from the two external providers.
    pub fn new<NF, NFut, SF, SFut>(nonce_provider: NF, required_signers_provider: SF) -> Self
    where
        NF: Fn() -> NFut + Send + Sync + 'static,
        NFut: Future<Output = Result<u64>> + Send + 'static,
        SF: Fn() -> SFut + Send + Sync + 'static,
        SFut: Future<Output = Result<Vec<Address>>> + Send + 'static,
    {
        Self {
            execute_signature: DEFAULT_EXECUTE_SIGNATURE.to_owned(),
            nonce_provider: Box::new(move || Box::pin(nonce_provider())),
            required_signers_provider: Box::new(move || Box::pin(required_signers_provider())),
            reset_callback: None,
        }
    }

    /// Override the designated multi-sig function signature.
    pub fn with_execute_signature(mut self, signature: impl Into<String>) -> Self {
        self.execute_signature = signature.into();
        self
    }

    /// Register a callback fired whenever a nonce change drops the
    /// collected signatures.
    pub fn with_reset_callback(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.reset_callback = Some(Box::new(callback));
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignerEntryJson {
    sig_r: String,
    sig_s: String,
    sig_v: u8,
    mode: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignersPayload {
    data: String,
    to: String,
    from: String,
    value: String,
    #[serde(default)]
    signers: BTreeMap<String, SignerEntryJson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedMultiSig {
    data: String,
    to: String,
    from: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    gas: Option<String>,
    #[serde(default)]
    gas_price: Option<String>,
    #[serde(default)]
    nonce: Option<u64>,
    #[serde(default)]
    chain_id: Option<u64>,
    #[serde(default)]
    multi_sig_nonce: Option<u64>,
    #[serde(default)]
    signers: BTreeMap<String, SignerEntryJson>,
}

/// A contract-call transaction requiring threshold signatures before
/// broadcast.
pub struct MultiSigTransaction<A: Adapter> {
    inner: Transaction<A>,
    original_call: FunctionCall,
    original_data: Bytes,
    config: MultiSigConfig,
    nonce: Option<u64>,
    required_signers: Vec<Address>,
    signers: BTreeMap<Address, SignerEntry>,
    message_hash: Option<B256>,
}

impl<A: Adapter> MultiSigTransaction<A> {
    /// Build a multi-sig transaction around a resolved target call.
    pub fn new(
        adapter: Arc<A>,
        contract_address: Address,
        events: Arc<BTreeMap<String, Event>>,
        call: FunctionCall,
        options: TxOptions,
        parent_hooks: Option<Arc<HookManager>>,
        config: MultiSigConfig,
    ) -> Result<Self> {
        let inner = Transaction::contract_call(
            adapter,
            contract_address,
            events,
            call.clone(),
            options,
            parent_hooks,
        )?;
        let original_data = inner.state().data.clone();
        Ok(Self {
            inner,
            original_call: call,
            original_data,
            config,
            nonce: None,
            required_signers: Vec::new(),
            signers: BTreeMap::new(),
            message_hash: None,
        })
    }

    /// The wrapped base transaction.
    pub fn inner(&self) -> &Transaction<A> {
        &self.inner
    }

    /// Mutable access to the wrapped base transaction (field setters,
    /// observers).
    pub fn inner_mut(&mut self) -> &mut Transaction<A> {
        &mut self.inner
    }

    /// The target call the signatures authorize.
    pub fn function_call(&self) -> &FunctionCall {
        &self.original_call
    }

    /// The collected signatures, keyed by signer address.
    pub fn signers(&self) -> &BTreeMap<Address, SignerEntry> {
        &self.signers
    }

    /// The current required-signer list.
    pub fn required_signers(&self) -> &[Address] {
        &self.required_signers
    }

    /// The cached multi-sig nonce.
    pub fn multisig_nonce(&self) -> Option<u64> {
        self.nonce
    }

    /// The current message hash signers commit to.
    pub fn message_hash(&self) -> Option<B256> {
        self.message_hash
    }

    /// Refresh the nonce, required-signer list and message hash.
    ///
    /// A nonce change invalidates every collected signature and fires the
    /// configured reset callback.
    pub async fn refresh(&mut self) -> Result<()> {
        let nonce = (self.config.nonce_provider)().await?;
        if self.nonce != Some(nonce) {
            if self.nonce.is_some() {
                self.signers.clear();
                tracing::debug!(nonce, "multi-sig nonce changed; collected signatures dropped");
                if let Some(callback) = &self.config.reset_callback {
                    callback();
                }
            }
            self.nonce = Some(nonce);
        }
        self.required_signers = (self.config.required_signers_provider)().await?;
        self.message_hash = Some(self.compute_message_hash()?);
        Ok(())
    }

    fn compute_message_hash(&self) -> Result<B256> {
        let state = self.inner.state();
        let from = state.from.ok_or_else(|| {
            Error::state("\"from\" address is required for the multi-sig message hash")
        })?;
        let to = state
            .to
            .ok_or_else(|| Error::state("\"to\" address is required for the multi-sig message hash"))?;
        let nonce = self
            .nonce
            .ok_or_else(|| Error::state("multi-sig nonce has not been fetched"))?;
        Ok(multisig_message_hash(
            from,
            to,
            state.value.unwrap_or_default(),
            &self.original_data,
            nonce,
        ))
    }

    /// Record a signature for `signer`, detecting its digest convention.
    ///
    /// Each known digest variant is tried in turn; the first one whose
    /// recovered address matches the signer wins. Fails when no variant
    /// matches.
    pub fn add_signature(
        &mut self,
        signer: Address,
        sig_r: B256,
        sig_s: B256,
        sig_v: u8,
    ) -> Result<()> {
        let mode = self.detect_mode(signer, sig_r, sig_s, sig_v)?;
        self.signers.insert(
            signer,
            SignerEntry {
                sig_r,
                sig_s,
                sig_v: normalize_v(sig_v),
                mode,
            },
        );
        Ok(())
    }

    fn detect_mode(
        &self,
        signer: Address,
        sig_r: B256,
        sig_s: B256,
        sig_v: u8,
    ) -> Result<SigningMode> {
        let hash = self.message_hash.ok_or_else(|| {
            Error::state("multi-sig message hash has not been computed; call refresh first")
        })?;
        let parity = match sig_v {
            0 | 27 => false,
            1 | 28 => true,
            other => {
                return Err(Error::signature(format!(
                    "invalid signature v value {other}"
                )))
            }
        };
        let signature = Signature::new(
            U256::from_be_bytes(sig_r.0),
            U256::from_be_bytes(sig_s.0),
            parity,
        );
        for mode in [SigningMode::Standard, SigningMode::Trezor] {
            let digest = mode.digest(hash.as_slice());
            if let Ok(recovered) = signature.recover_address_from_prehash(&digest) {
                if recovered == signer {
                    return Ok(mode);
                }
            }
        }
        Err(Error::signature(format!(
            "unable to determine signing mode for {signer}"
        )))
    }

    /// Refresh, then collect this wallet's signature over the message
    /// hash.
    pub async fn sign<W: Wallet>(&mut self, wallet: &W) -> Result<()> {
        self.refresh().await?;
        let hash = self.message_hash.expect("message hash set by refresh");
        let signature = wallet.sign_message(hash.as_slice()).await?;
        let (sig_r, sig_s, sig_v) = split_signature(&signature)?;
        self.add_signature(wallet.address(), sig_r, sig_s, sig_v)
    }

    /// Required signers that have not signed yet.
    pub fn missing_signers(&self) -> Vec<Address> {
        self.required_signers
            .iter()
            .filter(|address| !self.signers.contains_key(*address))
            .copied()
            .collect()
    }

    fn validate_required_signers(&self) -> Result<()> {
        let missing = self.missing_signers();
        if missing.is_empty() {
            return Ok(());
        }
        let list = missing
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Err(Error::signature(format!(
            "Missing signatures (from addresses {list})"
        )))
    }

    /// Deterministic combined-argument arrays `(sigV, sigR, sigS, mode)`,
    /// ordered by signer address.
    fn combine_signatures(&self) -> Vec<DynSolValue> {
        let mut sig_v = Vec::with_capacity(self.signers.len());
        let mut sig_r = Vec::with_capacity(self.signers.len());
        let mut sig_s = Vec::with_capacity(self.signers.len());
        let mut mode = Vec::with_capacity(self.signers.len());
        for entry in self.signers.values() {
            sig_v.push(DynSolValue::Uint(U256::from(entry.sig_v), 8));
            sig_r.push(DynSolValue::FixedBytes(entry.sig_r, 32));
            sig_s.push(DynSolValue::FixedBytes(entry.sig_s, 32));
            mode.push(DynSolValue::Uint(U256::from(entry.mode.as_u8()), 8));
        }
        vec![
            DynSolValue::Array(sig_v),
            DynSolValue::Array(sig_r),
            DynSolValue::Array(sig_s),
            DynSolValue::Array(mode),
        ]
    }

    /// Refresh, validate the required signers, and broadcast through the
    /// designated multi-sig function.
    ///
    /// The raw transaction invokes the multi-sig wrapper carrying the
    /// combined signature arrays and the original call's value and data,
    /// not the target function directly.
    pub async fn send(&mut self) -> Result<()> {
        self.refresh().await?;
        self.validate_required_signers()?;

        let value = self.inner.state().value.unwrap_or_default();
        let mut args = self.combine_signatures();
        args.push(DynSolValue::Uint(value, 256));
        args.push(DynSolValue::Bytes(self.original_data.to_vec()));
        let wrapped = FunctionCall {
            signature: self.config.execute_signature.clone(),
            args,
        };
        let data = self.inner.adapter().encode_function_call(&wrapped)?;
        {
            let state = self.inner.state_mut();
            state.payload = TxPayload::Call(wrapped);
            state.data = data;
        }
        self.inner.send().await
    }

    // ========== Persistence ==========

    fn signers_json(&self) -> serde_json::Value {
        let entries: BTreeMap<String, SignerEntryJson> = self
            .signers
            .iter()
            .map(|(address, entry)| {
                (
                    address.to_string(),
                    SignerEntryJson {
                        sig_r: entry.sig_r.to_string(),
                        sig_s: entry.sig_s.to_string(),
                        sig_v: entry.sig_v,
                        mode: entry.mode.as_u8(),
                    },
                )
            })
            .collect();
        serde_json::to_value(entries).expect("signer entries serialize")
    }

    /// Serialize the full state, including the multi-sig extension.
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = self.inner.to_json();
        let map = obj.as_object_mut().expect("transaction state is an object");
        if let Some(nonce) = self.nonce {
            map.insert("multiSigNonce".into(), json!(nonce));
        }
        map.insert(
            "requiredSigners".into(),
            json!(self
                .required_signers
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()),
        );
        map.insert("signers".into(), self.signers_json());
        obj
    }

    /// The signer-exchange payload: the transaction identity fields plus
    /// the collected signatures.
    pub fn signers_to_json(&self) -> serde_json::Value {
        let state = self.inner.state();
        json!({
            "data": format!("0x{}", hex::encode(&self.original_data)),
            "to": state.to.unwrap_or(Address::ZERO).to_string(),
            "from": state.from.unwrap_or(Address::ZERO).to_string(),
            "value": state.value.unwrap_or_default().to_string(),
            "signers": self.signers_json(),
        })
    }

    /// Merge externally-collected signatures.
    ///
    /// The payload's `data`, `to`, `from` and `value` must be identical to
    /// this transaction's; a mismatch rejects the whole payload so a
    /// signature can never be injected against a different transaction.
    pub fn add_signers_from_json(&mut self, json: &serde_json::Value) -> Result<()> {
        let payload: SignersPayload = serde_json::from_value(json.clone())
            .map_err(|e| Error::signature(format!("malformed signer payload: {e}")))?;

        let state = self.inner.state();
        let local_data = format!("0x{}", hex::encode(&self.original_data));
        if !payload.data.eq_ignore_ascii_case(&local_data) {
            return Err(payload_mismatch("data"));
        }
        let to = parse_address(&payload.to)?;
        if to != state.to.unwrap_or(Address::ZERO) {
            return Err(payload_mismatch("to"));
        }
        let from = parse_address(&payload.from)?;
        if from != state.from.unwrap_or(Address::ZERO) {
            return Err(payload_mismatch("from"));
        }
        let value = parse_u256(&payload.value)?;
        if value != state.value.unwrap_or_default() {
            return Err(payload_mismatch("value"));
        }

        for (address, entry) in payload.signers {
            let signer = parse_address(&address)?;
            let mode = SigningMode::from_u8(entry.mode)
                .ok_or_else(|| Error::signature(format!("unknown signing mode {}", entry.mode)))?;
            self.signers.insert(
                signer,
                SignerEntry {
                    sig_r: parse_b256(&entry.sig_r)?,
                    sig_s: parse_b256(&entry.sig_s)?,
                    sig_v: normalize_v(entry.sig_v),
                    mode,
                },
            );
        }
        Ok(())
    }

    /// Reconstruct a multi-sig transaction from its [`to_json`] shape.
    pub fn restore(
        adapter: Arc<A>,
        events: Arc<BTreeMap<String, Event>>,
        config: MultiSigConfig,
        json: &serde_json::Value,
    ) -> Result<Self> {
        let persisted: PersistedMultiSig = serde_json::from_value(json.clone())
            .map_err(|e| Error::state(format!("malformed persisted transaction: {e}")))?;

        let data = parse_hex_data(&persisted.data)?;
        let call = adapter.decode_function_call_data(&data)?;
        let to = parse_address(&persisted.to)?;
        let options = TxOptions {
            from: Some(parse_address(&persisted.from)?),
            to: Some(to),
            value: persisted.value.as_deref().map(parse_u256).transpose()?,
            gas: persisted.gas.as_deref().map(parse_u256).transpose()?,
            gas_price: persisted.gas_price.as_deref().map(parse_u256).transpose()?,
            nonce: persisted.nonce,
            chain_id: persisted.chain_id,
        };

        let mut tx = Self::new(adapter, to, events, call, options, None, config)?;
        tx.nonce = persisted.multi_sig_nonce;
        if tx.nonce.is_some() {
            tx.message_hash = Some(tx.compute_message_hash()?);
        }
        for (address, entry) in persisted.signers {
            let signer = parse_address(&address)?;
            let mode = SigningMode::from_u8(entry.mode)
                .ok_or_else(|| Error::signature(format!("unknown signing mode {}", entry.mode)))?;
            tx.signers.insert(
                signer,
                SignerEntry {
                    sig_r: parse_b256(&entry.sig_r)?,
                    sig_s: parse_b256(&entry.sig_s)?,
                    sig_v: normalize_v(entry.sig_v),
                    mode,
                },
            );
        }
        Ok(tx)
    }
}

/// The message hash signers commit to: an ERC-191 style concatenation of
/// the sender, recipient, 32-byte left-padded value, calldata and 32-byte
/// left-padded multi-sig nonce.
pub fn multisig_message_hash(
    from: Address,
    to: Address,
    value: U256,
    data: &[u8],
    nonce: u64,
) -> B256 {
    let mut buf = Vec::with_capacity(2 + 20 + 20 + 32 + data.len() + 32);
    buf.extend_from_slice(&[0x19, 0x00]);
    buf.extend_from_slice(from.as_slice());
    buf.extend_from_slice(to.as_slice());
    buf.extend_from_slice(&value.to_be_bytes::<32>());
    buf.extend_from_slice(data);
    buf.extend_from_slice(&U256::from(nonce).to_be_bytes::<32>());
    keccak256(&buf)
}

fn normalize_v(v: u8) -> u8 {
    match v {
        0 => 27,
        1 => 28,
        other => other,
    }
}

fn split_signature(signature: &[u8]) -> Result<(B256, B256, u8)> {
    if signature.len() != 65 {
        return Err(Error::signature(format!(
            "signature must be 65 bytes, got {}",
            signature.len()
        )));
    }
    Ok((
        B256::from_slice(&signature[..32]),
        B256::from_slice(&signature[32..64]),
        signature[64],
    ))
}

fn payload_mismatch(field: &str) -> Error {
    Error::signature(format!(
        "signer payload does not match transaction: field \"{field}\" differs"
    ))
}

fn parse_address(s: &str) -> Result<Address> {
    s.parse::<Address>()
        .map_err(|_| Error::signature(format!("invalid address \"{s}\"")))
}

fn parse_b256(s: &str) -> Result<B256> {
    s.parse::<B256>()
        .map_err(|_| Error::signature(format!("invalid 32-byte hex value \"{s}\"")))
}

fn parse_u256(s: &str) -> Result<U256> {
    U256::from_str_radix(s.trim(), 10)
        .map_err(|_| Error::signature(format!("invalid integer \"{s}\"")))
}

fn parse_hex_data(s: &str) -> Result<Bytes> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(stripped)
        .map(Bytes::from)
        .map_err(|_| Error::state(format!("invalid calldata hex \"{s}\"")))
}
