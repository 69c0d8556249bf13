//! Overload resolution
//!
//! Matches ambiguous caller input against the parameter specs of every
//! signature sharing one logical name: arity filtering first, then
//! sequential conversion trials, with an aggregate error naming each
//! attempted signature on total failure.

use crate::error::{Error, OverloadAttempt, Result};
use crate::params::{CallArgs, ParamsSpec};
use alloy::dyn_abi::DynSolValue;
use std::collections::BTreeMap;

/// A resolved, ready-to-encode function call.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// Canonical signature the input resolved to.
    pub signature: String,
    /// Ordered, converted wire arguments.
    pub args: Vec<DynSolValue>,
}

/// All overloads of one logical function name, keyed by canonical
/// signature.
///
/// Iteration order (and thus trial order among same-arity candidates) is
/// the map's lexicographic signature order, making resolution
/// deterministic across instances.
#[derive(Debug, Clone, Default)]
pub struct FunctionParams {
    specs: BTreeMap<String, ParamsSpec>,
}

impl FunctionParams {
    /// Empty overload set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a signature's parameter spec.
    pub fn insert(&mut self, signature: impl Into<String>, spec: ParamsSpec) {
        self.specs.insert(signature.into(), spec);
    }

    /// Look up one signature's parameter spec.
    pub fn get(&self, signature: &str) -> Option<&ParamsSpec> {
        self.specs.get(signature)
    }

    /// Number of registered signatures.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// True when no signatures are registered.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Iterate `(signature, spec)` pairs in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamsSpec)> {
        self.specs.iter()
    }

    /// Convert input against one pinned signature, bypassing resolution.
    pub fn convert_for(&self, signature: &str, args: &CallArgs) -> Result<FunctionCall> {
        let spec = self
            .specs
            .get(signature)
            .ok_or_else(|| Error::state(format!("unknown signature \"{signature}\"")))?;
        Ok(FunctionCall {
            signature: signature.to_owned(),
            args: spec.convert_input(args)?,
        })
    }

    /// Resolve caller input across all signatures.
    ///
    /// A single registered signature converts directly (not an overload
    /// scenario — its validation error surfaces unwrapped). Otherwise
    /// candidates are filtered to those whose parameter count matches the
    /// effective input length, falling back to the signature(s) tied for
    /// the maximum parameter count when none match, and tried in order
    /// until one converts.
    pub fn resolve(&self, args: &CallArgs) -> Result<FunctionCall> {
        if self.specs.is_empty() {
            return Err(Error::state("no signatures registered"));
        }
        if self.specs.len() == 1 {
            let (signature, spec) = self.specs.iter().next().expect("len checked");
            return Ok(FunctionCall {
                signature: signature.clone(),
                args: spec.convert_input(args)?,
            });
        }

        let input_len = args.len();
        let mut candidates: Vec<(&String, &ParamsSpec)> = self
            .specs
            .iter()
            .filter(|(_, spec)| spec.len() == input_len)
            .collect();
        if candidates.is_empty() {
            // The caller may have omitted ignored trailing arguments; fall
            // back to the widest signature(s).
            let max_len = self.specs.values().map(ParamsSpec::len).max().unwrap_or(0);
            candidates = self
                .specs
                .iter()
                .filter(|(_, spec)| spec.len() == max_len)
                .collect();
        }

        let mut attempts = Vec::with_capacity(candidates.len());
        for (signature, spec) in candidates {
            match spec.convert_input(args) {
                Ok(converted) => {
                    return Ok(FunctionCall {
                        signature: signature.clone(),
                        args: converted,
                    })
                }
                Err(err) => attempts.push(OverloadAttempt {
                    signature: signature.clone(),
                    reason: err.to_string(),
                }),
            }
        }
        Err(Error::Overload(attempts))
    }
}

impl FromIterator<(String, ParamsSpec)> for FunctionParams {
    fn from_iter<I: IntoIterator<Item = (String, ParamsSpec)>>(iter: I) -> Self {
        Self {
            specs: iter.into_iter().collect(),
        }
    }
}
