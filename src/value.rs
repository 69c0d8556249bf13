//! Native value model bridging caller inputs and ABI wire values

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{hex, Address, Bytes, I256, U256};
use chrono::{DateTime, TimeZone, Utc};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// A dynamically-typed native value.
///
/// Callers hand these to the conversion engine, and decoded call results
/// come back as them. `Null` models an absent or undecodable value (the
/// address type decodes unrecognizable output to `Null` rather than
/// failing).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent / undecodable value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Machine-word integer.
    Int(i64),
    /// Unsigned 256-bit integer.
    Uint(U256),
    /// Signed 256-bit integer.
    BigInt(I256),
    /// UTF-8 string.
    String(String),
    /// Raw byte string.
    Bytes(Bytes),
    /// EVM account address.
    Address(Address),
    /// Point in time, second precision on the wire.
    Date(DateTime<Utc>),
    /// Ordered collection (decoded ABI arrays).
    Array(Vec<Value>),
    /// Named-field record (tuple inputs and outputs).
    Record(BTreeMap<String, Value>),
}

impl Value {
    /// Human-readable name of the value's shape, used in validation reasons.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Uint(_) => "unsigned integer",
            Value::BigInt(_) => "big integer",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Address(_) => "address",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Record(_) => "object",
        }
    }

    /// True for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Normalize to an unsigned 256-bit integer.
    ///
    /// Accepts non-negative integers of any representation and decimal or
    /// `0x`-prefixed hex strings. Returns `None` for anything else.
    pub fn as_u256(&self) -> Option<U256> {
        match self {
            Value::Int(i) if *i >= 0 => Some(U256::from(*i as u64)),
            Value::Uint(u) => Some(*u),
            Value::BigInt(b) if !b.is_negative() => Some(b.unsigned_abs()),
            Value::String(s) => {
                let s = s.trim();
                if let Some(hex_part) = s.strip_prefix("0x") {
                    U256::from_str_radix(hex_part, 16).ok()
                } else {
                    U256::from_str_radix(s, 10).ok()
                }
            }
            _ => None,
        }
    }

    /// Normalize to a `u64`, when the value fits.
    pub fn as_u64(&self) -> Option<u64> {
        let v = self.as_u256()?;
        if v <= U256::from(u64::MAX) {
            Some(v.to::<u64>())
        } else {
            None
        }
    }

    /// Generic wire-to-native mapping, used where a parameter type does not
    /// declare its own output conversion.
    pub fn from_wire(value: &DynSolValue) -> Value {
        match value {
            DynSolValue::Bool(b) => Value::Bool(*b),
            DynSolValue::Uint(u, _) => Value::Uint(*u),
            DynSolValue::Int(i, _) => Value::BigInt(*i),
            DynSolValue::Address(a) => Value::Address(*a),
            DynSolValue::FixedBytes(word, size) => {
                Value::Bytes(Bytes::copy_from_slice(&word.as_slice()[..*size]))
            }
            DynSolValue::Bytes(b) => Value::Bytes(Bytes::copy_from_slice(b)),
            DynSolValue::String(s) => Value::String(s.clone()),
            DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
                Value::Array(items.iter().map(Value::from_wire).collect())
            }
            DynSolValue::Tuple(items) => Value::Array(items.iter().map(Value::from_wire).collect()),
            _ => Value::Null,
        }
    }

    /// Build a date value from unix seconds.
    pub fn date_from_seconds(secs: i64) -> Option<Value> {
        Utc.timestamp_opt(secs, 0).single().map(Value::Date)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(U256::from(v))
    }
}

impl From<U256> for Value {
    fn from(v: U256) -> Self {
        Value::Uint(v)
    }
}

impl From<I256> for Value {
    fn from(v: I256) -> Self {
        Value::BigInt(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Address> for Value {
    fn from(v: Address) -> Self {
        Value::Address(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Bytes(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Date(v)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Uint(u) => serializer.serialize_str(&u.to_string()),
            Value::BigInt(b) => serializer.serialize_str(&b.to_string()),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_str(&format!("0x{}", hex::encode(b))),
            Value::Address(a) => serializer.serialize_str(&a.to_string()),
            Value::Date(d) => serializer.serialize_i64(d.timestamp()),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Record(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }
    }
}
