//! Parameter conversion engine
//!
//! Converts a caller's positional-or-named arguments into a validated,
//! ordered wire-argument list per a parameter specification, and converts
//! raw call results back into named-field result maps. Validation of every
//! argument happens before any conversion runs; a failure never produces a
//! partially-converted list.

mod types;

pub use types::ParamType;

use crate::error::{Error, Result};
use crate::value::Value;
use alloy::dyn_abi::DynSolValue;
use std::collections::BTreeMap;

/// One formal parameter of a function signature.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Parameter name, used for named-argument resolution and result maps.
    pub name: String,
    /// Parameter type.
    pub ty: ParamType,
    /// Value used when the caller supplies none.
    pub default_value: Option<Value>,
}

impl ParamSpec {
    /// Create a parameter spec without a default value.
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            default_value: None,
        }
    }

    /// Attach a default value.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// Ordered parameter list describing one signature's inputs or outputs.
///
/// The declared length is authoritative for positional argument mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamsSpec {
    params: Vec<ParamSpec>,
}

/// Caller arguments, either positional or named.
///
/// Named input is resolved by field name, never by position; its effective
/// length is the key count.
#[derive(Debug, Clone)]
pub enum CallArgs {
    /// Arguments matched to parameters by index.
    Positional(Vec<Value>),
    /// Arguments matched to parameters by name.
    Named(BTreeMap<String, Value>),
}

impl CallArgs {
    /// No arguments.
    pub fn none() -> Self {
        CallArgs::Positional(Vec::new())
    }

    /// Build named arguments from `(name, value)` pairs.
    pub fn named<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        CallArgs::Named(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Effective input length: argument count for positional input, key
    /// count for named input.
    pub fn len(&self) -> usize {
        match self {
            CallArgs::Positional(values) => values.len(),
            CallArgs::Named(fields) => fields.len(),
        }
    }

    /// True when no arguments were supplied.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resolve(&self, name: &str, index: usize) -> Option<&Value> {
        match self {
            CallArgs::Positional(values) => values.get(index),
            CallArgs::Named(fields) => fields.get(name),
        }
    }
}

impl From<Vec<Value>> for CallArgs {
    fn from(values: Vec<Value>) -> Self {
        CallArgs::Positional(values)
    }
}

impl ParamsSpec {
    /// Build a spec from an ordered parameter list.
    pub fn new(params: Vec<ParamSpec>) -> Self {
        Self { params }
    }

    /// Number of declared parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// True when the signature takes no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate the declared parameters in order.
    pub fn iter(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter()
    }

    /// Convert caller arguments into the ordered wire-argument list.
    ///
    /// Each parameter resolves its raw value by name (named input) or
    /// position (positional input), falling back to the declared default.
    /// Every resolved value is validated before any conversion runs.
    pub fn convert_input(&self, args: &CallArgs) -> Result<Vec<DynSolValue>> {
        let mut resolved: Vec<Value> = Vec::with_capacity(self.params.len());
        for (index, spec) in self.params.iter().enumerate() {
            let value = args
                .resolve(&spec.name, index)
                .cloned()
                .or_else(|| spec.default_value.clone())
                .unwrap_or(Value::Null);
            resolved.push(value);
        }

        for (spec, value) in self.params.iter().zip(&resolved) {
            spec.ty.validate(value).map_err(|reason| Error::Validation {
                field: spec.name.clone(),
                reason,
            })?;
        }

        self.params
            .iter()
            .zip(&resolved)
            .map(|(spec, value)| {
                spec.ty
                    .convert_input(value)
                    .map_err(|reason| Error::Validation {
                        field: spec.name.clone(),
                        reason,
                    })
            })
            .collect()
    }

    /// Convert raw positional output values into a named-field result map.
    ///
    /// Extra output values are ignored; declared fields beyond the output
    /// length map to [`Value::Null`].
    pub fn convert_output(&self, values: &[DynSolValue]) -> BTreeMap<String, Value> {
        self.params
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let converted = values
                    .get(index)
                    .map(|value| spec.ty.convert_output(value))
                    .unwrap_or(Value::Null);
                (spec.name.clone(), converted)
            })
            .collect()
    }

    /// [`convert_output`](Self::convert_output) over a sparse positional
    /// sequence, as produced by [`normalize_result`].
    pub fn convert_output_sparse(
        &self,
        values: &[Option<DynSolValue>],
    ) -> BTreeMap<String, Value> {
        self.params
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let converted = values
                    .get(index)
                    .and_then(|slot| slot.as_ref())
                    .map(|value| spec.ty.convert_output(value))
                    .unwrap_or(Value::Null);
                (spec.name.clone(), converted)
            })
            .collect()
    }
}

impl FromIterator<ParamSpec> for ParamsSpec {
    fn from_iter<I: IntoIterator<Item = ParamSpec>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}

/// Normalize a sparse, index-keyed raw result container into a dense
/// positional sequence of the given length.
///
/// Client libraries return hybrid array/object result shapes; slots with no
/// entry stay empty and surface as [`Value::Null`] after output conversion.
pub fn normalize_result(
    len: usize,
    obj: &BTreeMap<String, DynSolValue>,
) -> Vec<Option<DynSolValue>> {
    (0..len).map(|i| obj.get(&i.to_string()).cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    fn single_int_spec() -> ParamsSpec {
        ParamsSpec::new(vec![ParamSpec::new("a", ParamType::Integer)])
    }

    #[test]
    fn test_convert_input_named() {
        let spec = single_int_spec();
        let args = CallArgs::named([("a", Value::Int(3))]);
        let wire = spec.convert_input(&args).unwrap();
        assert_eq!(wire, vec![DynSolValue::Uint(U256::from(3u64), 256)]);
    }

    #[test]
    fn test_convert_input_positional() {
        let spec = single_int_spec();
        let wire = spec
            .convert_input(&CallArgs::from(vec![Value::Int(3)]))
            .unwrap();
        assert_eq!(wire, vec![DynSolValue::Uint(U256::from(3u64), 256)]);
    }

    #[test]
    fn test_convert_input_missing_argument_fails_with_field_name() {
        let spec = single_int_spec();
        let err = spec.convert_input(&CallArgs::none()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation for field \"a\" failed: must be a valid integer or big integer"
        );
    }

    #[test]
    fn test_convert_input_uses_default_value() {
        let spec = ParamsSpec::new(vec![
            ParamSpec::new("a", ParamType::Integer),
            ParamSpec::new("flag", ParamType::Boolean).with_default(Value::Bool(false)),
        ]);
        let wire = spec
            .convert_input(&CallArgs::from(vec![Value::Int(1)]))
            .unwrap();
        assert_eq!(wire[1], DynSolValue::Bool(false));
    }

    #[test]
    fn test_validation_precedes_conversion() {
        // The second field is invalid; the call must fail as a whole even
        // though the first field converts cleanly.
        let spec = ParamsSpec::new(vec![
            ParamSpec::new("a", ParamType::Integer),
            ParamSpec::new("b", ParamType::Boolean),
        ]);
        let err = spec
            .convert_input(&CallArgs::from(vec![Value::Int(1), Value::Int(2)]))
            .unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "b"));
    }

    #[test]
    fn test_convert_output_ignores_extras_and_nulls_missing() {
        let spec = ParamsSpec::new(vec![
            ParamSpec::new("x", ParamType::Integer),
            ParamSpec::new("y", ParamType::Boolean),
        ]);
        let out = spec.convert_output(&[DynSolValue::Uint(U256::from(9u64), 256)]);
        assert_eq!(out["x"], Value::Int(9));
        assert_eq!(out["y"], Value::Null);

        let out = spec.convert_output(&[
            DynSolValue::Uint(U256::from(9u64), 256),
            DynSolValue::Bool(true),
            DynSolValue::Bool(false), // extra, ignored
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out["y"], Value::Bool(true));
    }

    #[test]
    fn test_normalize_result_densifies_index_keys() {
        let mut obj = BTreeMap::new();
        obj.insert("0".to_string(), DynSolValue::Bool(true));
        obj.insert("2".to_string(), DynSolValue::Bool(false));
        let dense = normalize_result(3, &obj);
        assert_eq!(dense[0], Some(DynSolValue::Bool(true)));
        assert_eq!(dense[1], None);
        assert_eq!(dense[2], Some(DynSolValue::Bool(false)));

        let spec = ParamsSpec::new(vec![
            ParamSpec::new("a", ParamType::Boolean),
            ParamSpec::new("b", ParamType::Boolean),
            ParamSpec::new("c", ParamType::Boolean),
        ]);
        let out = spec.convert_output_sparse(&dense);
        assert_eq!(out["b"], Value::Null);
    }
}
