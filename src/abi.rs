//! Contract ABI model
//!
//! Deserializable function/event definitions, canonical signature strings,
//! and typed override structures merged per kind (constants, methods,
//! events). Overrides win only for fields they carry; parameter arrays are
//! merged index-wise.

use crate::error::Result;
use crate::params::{ParamSpec, ParamType, ParamsSpec};
use alloy::primitives::{keccak256, B256};
use serde::Deserialize;
use std::collections::BTreeMap;

/// One ABI parameter description.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AbiParam {
    /// Parameter name.
    #[serde(default)]
    pub name: String,
    /// ABI type name (e.g. `uint256`, `tuple`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Component list for `tuple` parameters.
    #[serde(default)]
    pub components: Vec<AbiParam>,
}

impl AbiParam {
    /// Create a parameter description.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            components: Vec::new(),
        }
    }
}

/// A function definition (constant or method).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionDef {
    /// Function name.
    pub name: String,
    /// Input parameters.
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    /// Output parameters.
    #[serde(default)]
    pub outputs: Vec<AbiParam>,
    /// Read-only flag; constants never produce transactions.
    #[serde(default)]
    pub constant: bool,
    /// Whether the function accepts a value transfer.
    #[serde(default)]
    pub payable: bool,
}

impl FunctionDef {
    /// Canonical signature string, e.g. `transfer(address,uint256)`.
    pub fn signature(&self) -> String {
        signature(&self.name, &self.inputs)
    }

    /// Build the input parameter spec for this definition.
    pub fn input_params(&self) -> Result<ParamsSpec> {
        params_spec(&self.inputs)
    }

    /// Build the output parameter spec for this definition.
    pub fn output_params(&self) -> Result<ParamsSpec> {
        params_spec(&self.outputs)
    }
}

/// An event definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventDef {
    /// Event name.
    pub name: String,
    /// Event parameters in log order.
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    /// Anonymous events carry no signature topic.
    #[serde(default)]
    pub anonymous: bool,
}

impl EventDef {
    /// Canonical signature string, e.g. `Transfer(address,address,uint256)`.
    pub fn signature(&self) -> String {
        signature(&self.name, &self.inputs)
    }
}

/// Parsed contract ABI, split by accessor kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractAbi {
    /// Read-only functions.
    pub constants: Vec<FunctionDef>,
    /// State-changing functions.
    pub methods: Vec<FunctionDef>,
    /// Events.
    pub events: Vec<EventDef>,
    /// Constructor definition, when the ABI declares one.
    pub constructor: Option<FunctionDef>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "type")]
    kind: String,
    name: Option<String>,
    #[serde(default)]
    inputs: Vec<AbiParam>,
    #[serde(default)]
    outputs: Vec<AbiParam>,
    #[serde(default)]
    constant: bool,
    #[serde(default)]
    payable: bool,
    #[serde(default)]
    anonymous: bool,
}

impl ContractAbi {
    /// Parse a standard JSON ABI array.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<RawEntry> = serde_json::from_str(json)
            .map_err(|e| crate::error::Error::state(format!("invalid ABI JSON: {e}")))?;
        let mut abi = ContractAbi::default();
        for entry in entries {
            match entry.kind.as_str() {
                "function" => {
                    let def = FunctionDef {
                        name: entry.name.unwrap_or_default(),
                        inputs: entry.inputs,
                        outputs: entry.outputs,
                        constant: entry.constant,
                        payable: entry.payable,
                    };
                    if def.constant {
                        abi.constants.push(def);
                    } else {
                        abi.methods.push(def);
                    }
                }
                "event" => abi.events.push(EventDef {
                    name: entry.name.unwrap_or_default(),
                    inputs: entry.inputs,
                    anonymous: entry.anonymous,
                }),
                "constructor" => {
                    abi.constructor = Some(FunctionDef {
                        name: String::new(),
                        inputs: entry.inputs,
                        outputs: Vec::new(),
                        constant: false,
                        payable: entry.payable,
                    });
                }
                // fallback and receive entries carry no callable surface
                _ => {}
            }
        }
        Ok(abi)
    }

    /// Apply typed overrides, kind by kind.
    pub fn apply_overrides(&mut self, overrides: &AbiOverrides) {
        for def in &mut self.constants {
            if let Some(over) = overrides.constants.get(&def.name) {
                apply_function_override(def, over);
            }
        }
        for def in &mut self.methods {
            if let Some(over) = overrides.methods.get(&def.name) {
                apply_function_override(def, over);
            }
        }
        for def in &mut self.events {
            if let Some(over) = overrides.events.get(&def.name) {
                if let Some(inputs) = &over.inputs {
                    merge_params(&mut def.inputs, inputs);
                }
                if let Some(anonymous) = over.anonymous {
                    def.anonymous = anonymous;
                }
            }
        }
    }
}

/// Partial parameter patch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParamOverride {
    /// Replacement name, when present.
    pub name: Option<String>,
    /// Replacement ABI type, when present.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Partial function patch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionOverride {
    /// Input patches, merged index-wise.
    pub inputs: Option<Vec<ParamOverride>>,
    /// Output patches, merged index-wise.
    pub outputs: Option<Vec<ParamOverride>>,
    /// Replacement constant flag.
    pub constant: Option<bool>,
    /// Replacement payable flag.
    pub payable: Option<bool>,
}

/// Partial event patch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventOverride {
    /// Input patches, merged index-wise.
    pub inputs: Option<Vec<ParamOverride>>,
    /// Replacement anonymous flag.
    pub anonymous: Option<bool>,
}

/// Overrides for one contract, keyed by logical name within each kind.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AbiOverrides {
    /// Constant overrides.
    #[serde(default)]
    pub constants: BTreeMap<String, FunctionOverride>,
    /// Method overrides.
    #[serde(default)]
    pub methods: BTreeMap<String, FunctionOverride>,
    /// Event overrides.
    #[serde(default)]
    pub events: BTreeMap<String, EventOverride>,
}

fn apply_function_override(def: &mut FunctionDef, over: &FunctionOverride) {
    if let Some(inputs) = &over.inputs {
        merge_params(&mut def.inputs, inputs);
    }
    if let Some(outputs) = &over.outputs {
        merge_params(&mut def.outputs, outputs);
    }
    if let Some(constant) = over.constant {
        def.constant = constant;
    }
    if let Some(payable) = over.payable {
        def.payable = payable;
    }
}

fn merge_params(base: &mut Vec<AbiParam>, overrides: &[ParamOverride]) {
    for (index, over) in overrides.iter().enumerate() {
        if let Some(param) = base.get_mut(index) {
            if let Some(name) = &over.name {
                param.name = name.clone();
            }
            if let Some(kind) = &over.kind {
                param.kind = kind.clone();
            }
        } else if let (Some(name), Some(kind)) = (&over.name, &over.kind) {
            base.push(AbiParam::new(name.clone(), kind.clone()));
        }
    }
}

/// Canonical ABI type string for a parameter (tuples expand to component
/// lists).
pub fn canonical_type(param: &AbiParam) -> String {
    if param.kind == "tuple" {
        let inner: Vec<String> = param.components.iter().map(canonical_type).collect();
        format!("({})", inner.join(","))
    } else {
        param.kind.clone()
    }
}

/// Canonical signature string for a name and input list.
pub fn signature(name: &str, inputs: &[AbiParam]) -> String {
    let types: Vec<String> = inputs.iter().map(canonical_type).collect();
    format!("{}({})", name, types.join(","))
}

/// Signature hash (event topic / selector source).
pub fn signature_hash(sig: &str) -> B256 {
    keccak256(sig.as_bytes())
}

/// Build a [`ParamsSpec`] from ABI parameters, resolving each type through
/// the registry (tuple components recurse).
pub fn params_spec(params: &[AbiParam]) -> Result<ParamsSpec> {
    params
        .iter()
        .map(|param| {
            let components = if param.kind == "tuple" {
                params_spec(&param.components)?.iter().cloned().collect()
            } else {
                Vec::new()
            };
            let ty = ParamType::from_abi(&param.kind, components)?;
            Ok(ParamSpec::new(param.name.clone(), ty))
        })
        .collect()
}
