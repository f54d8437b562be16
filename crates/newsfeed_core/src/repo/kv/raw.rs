//! Free-form KV access for values that are not records.

use super::builders::{decode, encode};
use super::store::KvStore;
use crate::ctx::Context;
use crate::error::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Untyped accessor over arbitrary keys.
#[derive(Clone, Copy)]
pub struct RawKv<'c> {
    kv: &'c dyn KvStore,
}

impl<'c> RawKv<'c> {
    pub fn new(kv: &'c dyn KvStore) -> Self {
        Self { kv }
    }

    /// # Errors
    /// - `NotFound` when the key is absent or expired.
    pub fn get(&self, ctx: &Context, key: &str) -> StoreResult<String> {
        self.kv
            .get(ctx, key)?
            .ok_or_else(|| StoreError::not_found(key))
    }

    pub fn get_struct<T: DeserializeOwned>(&self, ctx: &Context, key: &str) -> StoreResult<T> {
        let text = self.get(ctx, key)?;
        decode(key, &text)
    }

    /// Writes `value` verbatim; `None` keeps it until removed.
    pub fn set_value(
        &self,
        ctx: &Context,
        key: &str,
        value: &str,
        expiration: Option<Duration>,
    ) -> StoreResult<()> {
        self.kv.set(ctx, key, value, expiration)
    }

    /// Writes `value` as JSON.
    pub fn set_struct<T: Serialize>(
        &self,
        ctx: &Context,
        key: &str,
        value: &T,
        expiration: Option<Duration>,
    ) -> StoreResult<()> {
        let body = encode(key, value)?;
        self.kv.set(ctx, key, &body, expiration)
    }

    /// Idempotent delete.
    pub fn remove(&self, ctx: &Context, key: &str) -> StoreResult<()> {
        self.kv.remove(ctx, key)?;
        Ok(())
    }
}
