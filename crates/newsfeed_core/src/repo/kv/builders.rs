//! Typed KV builders: records addressed by key, stored as JSON envelopes.
//!
//! # Invariants
//! - The default key of `T` is its namespace; every write to it replaces the
//!   previous value.
//! - Batch writes use unique keys so entries never collide.
//! - Removal is idempotent.

use super::store::KvStore;
use crate::ctx::Context;
use crate::error::{StoreError, StoreResult};
use crate::model::record::{record_key, KvRecord};
use std::marker::PhantomData;
use std::time::Duration;

fn entity<T: KvRecord>() -> &'static str {
    T::schema().target
}

pub(crate) fn encode<T: serde::Serialize>(entity: &str, value: &T) -> StoreResult<String> {
    serde_json::to_string(value).map_err(|source| StoreError::Serialization {
        entity: entity.to_string(),
        source,
    })
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(entity: &str, text: &str) -> StoreResult<T> {
    serde_json::from_str(text).map_err(|source| StoreError::Serialization {
        entity: entity.to_string(),
        source,
    })
}

/// Reads one record of `T` by key.
pub struct KvGetter<'c, T> {
    kv: &'c dyn KvStore,
    key: String,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for KvGetter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            kv: self.kv,
            key: self.key.clone(),
            _record: PhantomData,
        }
    }
}

impl<'c, T: KvRecord> KvGetter<'c, T> {
    /// Getter on the namespace key of `T`.
    pub fn new(kv: &'c dyn KvStore) -> Self {
        Self {
            kv,
            key: record_key::<T>(false),
            _record: PhantomData,
        }
    }

    pub fn by_key(&self, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..self.clone()
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// # Errors
    /// - `NotFound` when the key is absent or expired.
    pub fn get(&self, ctx: &Context) -> StoreResult<T> {
        match self.kv.get(ctx, &self.key)? {
            Some(text) => decode(entity::<T>(), &text),
            None => Err(StoreError::not_found(entity::<T>())),
        }
    }
}

/// Writes records of `T`.
pub struct KvInserter<'c, T> {
    kv: &'c dyn KvStore,
    ttl: Option<Duration>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for KvInserter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            kv: self.kv,
            ttl: self.ttl,
            _record: PhantomData,
        }
    }
}

impl<'c, T: KvRecord> KvInserter<'c, T> {
    pub fn new(kv: &'c dyn KvStore) -> Self {
        Self {
            kv,
            ttl: None,
            _record: PhantomData,
        }
    }

    /// Expires written entries after `ttl`.
    pub fn with_ttl(&self, ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..self.clone()
        }
    }

    /// Stores `record` under the namespace key of `T`.
    pub fn insert(&self, ctx: &Context, record: T) -> StoreResult<T> {
        let body = encode(entity::<T>(), &record)?;
        self.kv.set(ctx, &record_key::<T>(false), &body, self.ttl)?;
        Ok(record)
    }

    /// Stores every record under a fresh unique key; returns the keys in
    /// input order.
    pub fn insert_batch(&self, ctx: &Context, records: &[T]) -> StoreResult<Vec<String>> {
        let entries = records
            .iter()
            .map(|record| Ok((record_key::<T>(true), encode(entity::<T>(), record)?)))
            .collect::<StoreResult<Vec<_>>>()?;
        self.kv.set_many(ctx, &entries, self.ttl)?;
        Ok(entries.into_iter().map(|(key, _)| key).collect())
    }
}

/// Deletes a record of `T` by key.
pub struct KvRemover<'c, T> {
    kv: &'c dyn KvStore,
    key: String,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for KvRemover<'_, T> {
    fn clone(&self) -> Self {
        Self {
            kv: self.kv,
            key: self.key.clone(),
            _record: PhantomData,
        }
    }
}

impl<'c, T: KvRecord> KvRemover<'c, T> {
    pub fn new(kv: &'c dyn KvStore) -> Self {
        Self {
            kv,
            key: record_key::<T>(false),
            _record: PhantomData,
        }
    }

    pub fn by_key(&self, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..self.clone()
        }
    }

    /// Succeeds whether or not the key existed.
    pub fn remove(&self, ctx: &Context) -> StoreResult<()> {
        self.kv.remove(ctx, &self.key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{KvGetter, KvInserter, KvRemover};
    use crate::ctx::Context;
    use crate::db::open_kv_db_in_memory;
    use crate::error::StoreError;
    use crate::model::authorization_keys::AuthorizationKeys;
    use crate::repo::kv::{KvStore, SqliteKvStore};

    fn keys(token: &str) -> AuthorizationKeys {
        AuthorizationKeys {
            authorization_token: token.to_string(),
            refresh_token: format!("{token}-refresh"),
            authorization_expires_at: 1_000,
            refresh_expires_at: 2_000,
        }
    }

    #[test]
    fn namespace_key_holds_latest_insert() {
        let store = SqliteKvStore::new(open_kv_db_in_memory().unwrap());
        let ctx = Context::background();
        let inserter = KvInserter::<AuthorizationKeys>::new(&store);
        inserter.insert(&ctx, keys("first")).unwrap();
        inserter.insert(&ctx, keys("second")).unwrap();

        let getter = KvGetter::<AuthorizationKeys>::new(&store);
        assert_eq!(getter.key(), "model/authorization_keys");
        assert_eq!(getter.get(&ctx).unwrap(), keys("second"));
    }

    #[test]
    fn missing_key_is_not_found() {
        let store = SqliteKvStore::new(open_kv_db_in_memory().unwrap());
        let err = KvGetter::<AuthorizationKeys>::new(&store)
            .get(&Context::background())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn batch_keys_are_unique_and_readable() {
        let store = SqliteKvStore::new(open_kv_db_in_memory().unwrap());
        let ctx = Context::background();
        let written = KvInserter::<AuthorizationKeys>::new(&store)
            .insert_batch(&ctx, &[keys("a"), keys("b")])
            .unwrap();

        assert_eq!(written.len(), 2);
        assert_ne!(written[0], written[1]);
        let getter = KvGetter::<AuthorizationKeys>::new(&store);
        assert_eq!(getter.by_key(&written[1]).get(&ctx).unwrap(), keys("b"));
    }

    #[test]
    fn corrupt_value_is_serialization_error() {
        let store = SqliteKvStore::new(open_kv_db_in_memory().unwrap());
        let ctx = Context::background();
        store
            .set(&ctx, "model/authorization_keys", "not json", None)
            .unwrap();
        let err = KvGetter::<AuthorizationKeys>::new(&store)
            .get(&ctx)
            .unwrap_err();
        assert!(matches!(err, StoreError::Serialization { .. }));
    }

    #[test]
    fn remove_is_idempotent() {
        let store = SqliteKvStore::new(open_kv_db_in_memory().unwrap());
        let ctx = Context::background();
        KvInserter::<AuthorizationKeys>::new(&store)
            .insert(&ctx, keys("x"))
            .unwrap();
        let remover = KvRemover::<AuthorizationKeys>::new(&store);
        remover.remove(&ctx).unwrap();
        remover.remove(&ctx).unwrap();
        assert!(KvGetter::<AuthorizationKeys>::new(&store)
            .get(&ctx)
            .unwrap_err()
            .is_not_found());
    }
}
