//! Entry point for services: entity capability sets and transaction scope.
//!
//! # Responsibility
//! - Hand out one capability set per entity, bound to a fixed connection.
//! - Run units of work inside a single IMMEDIATE transaction.
//!
//! # Invariants
//! - A provider captures its connection at construction; every builder it
//!   hands out runs on that connection.
//! - A transaction opened by [`Provider::in_tx`] is committed or rolled back
//!   before `in_tx` returns, including on panic.
//! - Once the backend rolls back a transaction on its own (an interrupted
//!   write), the transaction-bound provider refuses every further statement
//!   and `in_tx` never commits.
//! - KV writes are never part of a relational transaction.
//!
//! # Threading
//! A [`Store`] owns its connections and may move to another thread, but it
//! is not shared between threads: providers and builders borrow a single
//! SQLite connection. Each worker opens its own `Store` on the same database
//! files; SQLite locking and the configured busy timeout serialize writers.

mod accounts;
mod catalog;
mod crawl;
mod news;

pub use accounts::{AuthorizationKeysProvider, UsersProvider, WhitelistProvider};
pub use catalog::{ChannelsProvider, CoinsProvider, PreferencesProvider};
pub use crawl::{RawNewsProvider, RawNewsWebpagesProvider, TitlesProvider};
pub use news::{NewsChannelsProvider, NewsCoinsProvider, NewsProvider};

use crate::config::StoreConfig;
use crate::ctx::Context;
use crate::db::{open_db, open_db_in_memory, open_kv_db, open_kv_db_in_memory};
use crate::error::{Operation, StoreError, StoreResult};
use crate::model::validate_registry;
use crate::repo::kv::{KvStore, RawKv, SqliteKvStore};
use crate::repo::Binding;
use log::debug;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Instant;

/// Capability-set factory bound to one relational connection and one KV
/// store.
#[derive(Clone, Copy)]
pub struct Provider<'c> {
    conn: Binding<'c>,
    kv: &'c dyn KvStore,
}

impl<'c> Provider<'c> {
    pub fn new(conn: &'c Connection, kv: &'c dyn KvStore) -> Self {
        Self {
            conn: Binding::new(conn),
            kv,
        }
    }

    /// Whether this provider runs inside an open transaction.
    pub fn in_transaction(&self) -> bool {
        !self.conn.connection().is_autocommit()
    }

    pub fn news(&self) -> NewsProvider<'c> {
        NewsProvider::new(self.conn)
    }

    pub fn coins(&self) -> CoinsProvider<'c> {
        CoinsProvider::new(self.conn)
    }

    pub fn channels(&self) -> ChannelsProvider<'c> {
        ChannelsProvider::new(self.conn)
    }

    pub fn news_coins(&self) -> NewsCoinsProvider<'c> {
        NewsCoinsProvider::new(self.conn)
    }

    pub fn news_channels(&self) -> NewsChannelsProvider<'c> {
        NewsChannelsProvider::new(self.conn)
    }

    pub fn preferences(&self) -> PreferencesProvider<'c> {
        PreferencesProvider::new(self.conn)
    }

    pub fn users(&self) -> UsersProvider<'c> {
        UsersProvider::new(self.conn)
    }

    pub fn whitelist(&self) -> WhitelistProvider<'c> {
        WhitelistProvider::new(self.conn)
    }

    pub fn titles(&self) -> TitlesProvider<'c> {
        TitlesProvider::new(self.conn)
    }

    pub fn raw_news(&self) -> RawNewsProvider<'c> {
        RawNewsProvider::new(self.conn)
    }

    pub fn raw_news_webpages(&self) -> RawNewsWebpagesProvider<'c> {
        RawNewsWebpagesProvider::new(self.conn)
    }

    pub fn authorization_keys(&self) -> AuthorizationKeysProvider<'c> {
        AuthorizationKeysProvider::new(self.kv)
    }

    pub fn raw_kv(&self) -> RawKv<'c> {
        RawKv::new(self.kv)
    }

    /// Runs `f` with a transaction-bound provider and commits when it
    /// returns `Ok`.
    ///
    /// On an already transaction-bound provider `f` joins the open
    /// transaction and the outer scope decides the outcome.
    ///
    /// # Errors
    /// - `f`'s error unchanged; nothing is committed.
    /// - `StoreError::TransactionAborted` when `f` returns `Ok` but the
    ///   backend rolled the transaction back underneath it, or when this
    ///   provider's own transaction is already gone.
    /// - `StoreError::Transaction` when begin or commit fails.
    /// - `StoreError::Cancelled` when `ctx` is done before begin or commit.
    pub fn in_tx<T, E, F>(&self, ctx: &Context, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&Provider<'_>) -> Result<T, E>,
    {
        check_context(ctx)?;
        if self.conn.is_transaction_lost() {
            return Err(aborted().into());
        }
        if self.in_transaction() {
            debug!("event=tx_join module=provider status=ok");
            return f(self);
        }

        let started_at = Instant::now();
        let tx = Transaction::new_unchecked(self.conn.connection(), TransactionBehavior::Immediate)
            .map_err(|source| StoreError::Transaction {
                stage: "begin",
                source,
            })?;

        let bound = Provider {
            conn: Binding::new(&tx),
            kv: self.kv,
        };
        let outcome = f(&bound);
        if bound.conn.is_transaction_lost() {
            debug!(
                "event=tx_rollback module=provider status=error reason=aborted duration_ms={}",
                started_at.elapsed().as_millis()
            );
            return match outcome {
                Ok(_) => Err(aborted().into()),
                Err(err) => Err(err),
            };
        }
        let value = match outcome {
            Ok(value) => value,
            Err(err) => {
                debug!(
                    "event=tx_rollback module=provider status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                return Err(err);
            }
        };

        check_context(ctx)?;
        tx.commit().map_err(|source| StoreError::Transaction {
            stage: "commit",
            source,
        })?;
        debug!(
            "event=tx_commit module=provider status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(value)
    }
}

fn aborted() -> StoreError {
    StoreError::transaction_aborted(Operation::Transaction, "provider", None)
}

fn check_context(ctx: &Context) -> StoreResult<()> {
    match ctx.err() {
        Some(reason) => Err(StoreError::cancelled(
            Operation::Transaction,
            "provider",
            reason,
        )),
        None => Ok(()),
    }
}

/// Owns both backend connections for the lifetime of a service.
pub struct Store {
    conn: Connection,
    kv: SqliteKvStore,
}

impl Store {
    /// Validates the record registry, opens both backends and applies
    /// migrations.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        validate_registry()?;
        let options = config.open_options();
        let conn = match &config.database.path {
            Some(path) => open_db(path, options)?,
            None => open_db_in_memory()?,
        };
        let kv = match &config.kv_store.path {
            Some(path) => open_kv_db(path, options)?,
            None => open_kv_db_in_memory()?,
        };
        Ok(Self {
            conn,
            kv: SqliteKvStore::new(kv),
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open(&StoreConfig::default())
    }

    pub fn provider(&self) -> Provider<'_> {
        Provider::new(&self.conn, &self.kv)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn kv(&self) -> &SqliteKvStore {
        &self.kv
    }
}

#[cfg(test)]
mod tests {
    use super::Store;
    use crate::ctx::Context;
    use crate::error::StoreError;
    use crate::model::coin::Coin;

    #[test]
    fn in_tx_commits_on_ok() {
        let store = Store::open_in_memory().unwrap();
        let ctx = Context::background();
        let provider = store.provider();
        provider
            .in_tx(&ctx, |tx| {
                assert!(tx.in_transaction());
                tx.coins().insert(&ctx, Coin::new("BTC", "Bitcoin", "bitcoin"))
            })
            .unwrap();

        assert!(!provider.in_transaction());
        assert_eq!(provider.coins().select(&ctx).unwrap().len(), 1);
    }

    #[test]
    fn nested_in_tx_joins_outer_transaction() {
        let store = Store::open_in_memory().unwrap();
        let ctx = Context::background();
        let result: Result<(), StoreError> = store.provider().in_tx(&ctx, |tx| {
            tx.in_tx(&ctx, |inner| {
                inner
                    .coins()
                    .insert(&ctx, Coin::new("ETH", "Ethereum", "ethereum"))
            })?;
            Err(StoreError::not_found("coins"))
        });

        assert!(result.unwrap_err().is_not_found());
        assert!(store.provider().coins().select(&ctx).unwrap_err().is_not_found());
    }

    #[test]
    fn done_context_never_begins() {
        let store = Store::open_in_memory().unwrap();
        let ctx = Context::background();
        ctx.cancel();
        let result: Result<(), StoreError> = store.provider().in_tx(&ctx, |_| Ok(()));
        assert!(matches!(result, Err(StoreError::Cancelled { .. })));
    }
}
