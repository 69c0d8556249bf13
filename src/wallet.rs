//! Wallet collaborator abstraction
//!
//! Signing is always external: a wallet produces transaction signatures
//! and message signatures, and can verify a message signature against its
//! own address. The SDK never holds key material.

use crate::adapter::RawTransaction;
use crate::error::Result;
use alloy::primitives::{Address, Bytes};
use std::future::Future;

/// The external signing collaborator.
pub trait Wallet: Send + Sync {
    /// The wallet's account address.
    fn address(&self) -> Address;

    /// Sign an unsigned transaction, returning the signed raw bytes.
    fn sign(&self, tx: &RawTransaction) -> impl Future<Output = Result<Bytes>> + Send;

    /// Sign an arbitrary message payload, returning the 65-byte r‖s‖v
    /// signature.
    fn sign_message(&self, payload: &[u8]) -> impl Future<Output = Result<Bytes>> + Send;

    /// Verify that a message signature was produced by this wallet.
    fn verify_message(
        &self,
        message: &[u8],
        signature: &[u8],
    ) -> impl Future<Output = Result<bool>> + Send;
}
