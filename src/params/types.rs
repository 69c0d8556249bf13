//! Parameter type registry
//!
//! Each type embodies a bidirectional contract: `validate` fails with a
//! descriptive reason on bad input, `convert_input` produces the ABI wire
//! value, `convert_output` maps a decoded wire value back to a native
//! [`Value`]. The set of types is fixed; tuple types are built per ABI
//! component list.

use super::ParamSpec;
use crate::error::{Error, Result};
use crate::value::Value;
use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{hex, Address, Bytes, I256, U256};
use std::collections::BTreeMap;

/// Largest integer width mapped to the machine-word integer type; wider
/// widths use the big-integer type.
const NATIVE_INT_BITS: usize = 48;

/// A parameter type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    /// EVM account address. Empty markers (`""`, `"0x"`, `"0x0"`) validate
    /// as the zero address; output conversion never fails.
    Address,
    /// Boolean flag.
    Boolean,
    /// Machine-word-sized integer.
    Integer,
    /// 256-bit integer.
    BigInteger,
    /// Dynamic or fixed-size byte string.
    Bytes,
    /// UTF-8 string.
    String,
    /// Point in time, carried as unix seconds on the wire.
    Date,
    /// Structured type with named, typed components.
    Tuple(Vec<ParamSpec>),
}

fn i256_from_i64(i: i64) -> I256 {
    if i >= 0 {
        I256::from_raw(U256::from(i as u64))
    } else {
        -I256::from_raw(U256::from(i.unsigned_abs()))
    }
}

fn is_empty_address_marker(s: &str) -> bool {
    matches!(s, "" | "0x" | "0x0")
}

impl ParamType {
    /// Resolve a type descriptor from an ABI type name.
    ///
    /// `components` is consulted only for `tuple`; callers build the
    /// component specs recursively.
    pub fn from_abi(kind: &str, components: Vec<ParamSpec>) -> Result<ParamType> {
        if kind == "tuple" {
            return Ok(ParamType::Tuple(components));
        }
        let ty = match kind {
            "address" => ParamType::Address,
            "bool" => ParamType::Boolean,
            "string" => ParamType::String,
            "date" => ParamType::Date,
            _ if kind.starts_with("bytes") => ParamType::Bytes,
            _ if kind.starts_with("uint") || kind.starts_with("int") => {
                let digits = kind.trim_start_matches(|c: char| c.is_ascii_alphabetic());
                let bits: usize = if digits.is_empty() {
                    256
                } else {
                    digits
                        .parse()
                        .map_err(|_| Error::state(format!("unsupported parameter type \"{kind}\"")))?
                };
                if bits <= NATIVE_INT_BITS {
                    ParamType::Integer
                } else {
                    ParamType::BigInteger
                }
            }
            _ => return Err(Error::state(format!("unsupported parameter type \"{kind}\""))),
        };
        Ok(ty)
    }

    /// Human-readable type name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            ParamType::Address => "address",
            ParamType::Boolean => "boolean",
            ParamType::Integer => "integer",
            ParamType::BigInteger => "big integer",
            ParamType::Bytes => "bytes",
            ParamType::String => "string",
            ParamType::Date => "date",
            ParamType::Tuple(_) => "tuple",
        }
    }

    /// Check a native value against this type.
    ///
    /// Returns the failure reason; the conversion engine attaches the field
    /// name.
    pub fn validate(&self, value: &Value) -> std::result::Result<(), String> {
        match self {
            ParamType::Address => match value {
                Value::Address(_) => Ok(()),
                Value::String(s) if is_empty_address_marker(s) => Ok(()),
                Value::String(s) if s.parse::<Address>().is_ok() => Ok(()),
                _ => Err("must be a valid address".into()),
            },
            ParamType::Boolean => match value {
                Value::Bool(_) => Ok(()),
                _ => Err("must be a boolean value".into()),
            },
            ParamType::Integer | ParamType::BigInteger => match value {
                Value::Int(_) | Value::Uint(_) | Value::BigInt(_) => Ok(()),
                _ => Err("must be a valid integer or big integer".into()),
            },
            ParamType::Bytes => match value {
                Value::Bytes(_) => Ok(()),
                Value::String(s) => {
                    let stripped = s.strip_prefix("0x").unwrap_or(s);
                    if hex::decode(stripped).is_ok() {
                        Ok(())
                    } else {
                        Err("must be a hex string or byte array".into())
                    }
                }
                _ => Err("must be a hex string or byte array".into()),
            },
            ParamType::String => match value {
                Value::String(_) => Ok(()),
                _ => Err("must be a string".into()),
            },
            ParamType::Date => match value {
                Value::Date(d) if d.timestamp() >= 0 => Ok(()),
                Value::Int(i) if *i >= 0 => Ok(()),
                Value::Uint(u) if *u <= U256::from(u64::MAX) => Ok(()),
                _ => Err("must be a date or unix timestamp".into()),
            },
            ParamType::Tuple(components) => {
                let fields = match value {
                    Value::Record(fields) => fields,
                    _ => return Err("must be an object".into()),
                };
                for spec in components {
                    let field = fields.get(&spec.name).unwrap_or(&Value::Null);
                    spec.ty
                        .validate(field)
                        .map_err(|reason| format!("field \"{}\": {}", spec.name, reason))?;
                }
                Ok(())
            }
        }
    }

    /// Convert a validated native value to its wire representation.
    pub fn convert_input(&self, value: &Value) -> std::result::Result<DynSolValue, String> {
        match self {
            ParamType::Address => match value {
                Value::Address(a) => Ok(DynSolValue::Address(*a)),
                Value::String(s) if is_empty_address_marker(s) => {
                    Ok(DynSolValue::Address(Address::ZERO))
                }
                Value::String(s) => s
                    .parse::<Address>()
                    .map(DynSolValue::Address)
                    .map_err(|_| "must be a valid address".to_string()),
                _ => Err("must be a valid address".into()),
            },
            ParamType::Boolean => match value {
                Value::Bool(b) => Ok(DynSolValue::Bool(*b)),
                _ => Err("must be a boolean value".into()),
            },
            ParamType::Integer | ParamType::BigInteger => match value {
                Value::Int(i) if *i < 0 => Ok(DynSolValue::Int(i256_from_i64(*i), 256)),
                Value::Int(i) => Ok(DynSolValue::Uint(U256::from(*i as u64), 256)),
                Value::Uint(u) => Ok(DynSolValue::Uint(*u, 256)),
                Value::BigInt(b) if b.is_negative() => Ok(DynSolValue::Int(*b, 256)),
                Value::BigInt(b) => Ok(DynSolValue::Uint(b.unsigned_abs(), 256)),
                _ => Err("must be a valid integer or big integer".into()),
            },
            ParamType::Bytes => match value {
                Value::Bytes(b) => Ok(DynSolValue::Bytes(b.to_vec())),
                Value::String(s) => {
                    let stripped = s.strip_prefix("0x").unwrap_or(s);
                    hex::decode(stripped)
                        .map(DynSolValue::Bytes)
                        .map_err(|_| "must be a hex string or byte array".to_string())
                }
                _ => Err("must be a hex string or byte array".into()),
            },
            ParamType::String => match value {
                Value::String(s) => Ok(DynSolValue::String(s.clone())),
                _ => Err("must be a string".into()),
            },
            ParamType::Date => {
                let seconds = match value {
                    Value::Date(d) => d.timestamp().max(0) as u64,
                    Value::Int(i) if *i >= 0 => *i as u64,
                    Value::Uint(u) if *u <= U256::from(u64::MAX) => u.to::<u64>(),
                    _ => return Err("must be a date or unix timestamp".into()),
                };
                Ok(DynSolValue::Uint(U256::from(seconds), 256))
            }
            ParamType::Tuple(components) => {
                let fields = match value {
                    Value::Record(fields) => fields,
                    _ => return Err("must be an object".into()),
                };
                let mut converted = Vec::with_capacity(components.len());
                for spec in components {
                    let field = fields.get(&spec.name).unwrap_or(&Value::Null);
                    let wire = spec
                        .ty
                        .convert_input(field)
                        .map_err(|reason| format!("field \"{}\": {}", spec.name, reason))?;
                    converted.push(wire);
                }
                Ok(DynSolValue::Tuple(converted))
            }
        }
    }

    /// Convert a decoded wire value back to a native value.
    ///
    /// Never fails: values that do not match the expected shape fall back
    /// to the generic mapping, and unrecognizable addresses become
    /// [`Value::Null`].
    pub fn convert_output(&self, value: &DynSolValue) -> Value {
        match self {
            ParamType::Address => match value {
                DynSolValue::Address(a) => Value::Address(*a),
                _ => Value::Null,
            },
            ParamType::Integer => match value {
                DynSolValue::Uint(u, _) if *u <= U256::from(i64::MAX as u64) => {
                    Value::Int(u.to::<u64>() as i64)
                }
                DynSolValue::Uint(u, _) => Value::Uint(*u),
                DynSolValue::Int(i, _) => {
                    let abs = i.unsigned_abs();
                    if abs <= U256::from(i64::MAX as u64) {
                        let magnitude = abs.to::<u64>() as i64;
                        Value::Int(if i.is_negative() { -magnitude } else { magnitude })
                    } else {
                        Value::BigInt(*i)
                    }
                }
                other => Value::from_wire(other),
            },
            ParamType::BigInteger => match value {
                DynSolValue::Uint(u, _) => Value::Uint(*u),
                DynSolValue::Int(i, _) => Value::BigInt(*i),
                other => Value::from_wire(other),
            },
            ParamType::Date => match value {
                DynSolValue::Uint(u, _) if *u <= U256::from(i64::MAX as u64) => {
                    Value::date_from_seconds(u.to::<u64>() as i64).unwrap_or(Value::Null)
                }
                other => Value::from_wire(other),
            },
            ParamType::Bytes => match value {
                DynSolValue::Bytes(b) => Value::Bytes(Bytes::copy_from_slice(b)),
                DynSolValue::FixedBytes(word, size) => {
                    Value::Bytes(Bytes::copy_from_slice(&word.as_slice()[..*size]))
                }
                other => Value::from_wire(other),
            },
            ParamType::Tuple(components) => match value {
                DynSolValue::Tuple(items) => {
                    let mut fields = BTreeMap::new();
                    for (i, spec) in components.iter().enumerate() {
                        let converted = items
                            .get(i)
                            .map(|item| spec.ty.convert_output(item))
                            .unwrap_or(Value::Null);
                        fields.insert(spec.name.clone(), converted);
                    }
                    Value::Record(fields)
                }
                other => Value::from_wire(other),
            },
            ParamType::Boolean | ParamType::String => Value::from_wire(value),
        }
    }
}
