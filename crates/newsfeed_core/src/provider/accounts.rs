//! Bot users, the access whitelist and platform session keys.

use crate::ctx::Context;
use crate::error::StoreResult;
use crate::model::authorization_keys::AuthorizationKeys;
use crate::model::user::User;
use crate::model::whitelist::Whitelist;
use crate::query::Predicate;
use crate::repo::kv::{KvGetter, KvInserter, KvRemover, KvStore};
use crate::repo::sql::{Getter, Inserter, Remover, Selector};
use crate::repo::Binding;
use std::time::Duration;
use uuid::Uuid;

/// Capability set over `users`.
#[derive(Clone)]
pub struct UsersProvider<'c> {
    expr: Predicate,
    inserter: Inserter<'c, User>,
    getter: Getter<'c, User>,
    selector: Selector<'c, User>,
}

impl<'c> UsersProvider<'c> {
    pub fn new(conn: Binding<'c>) -> Self {
        Self {
            expr: Predicate::always(),
            inserter: Inserter::new(conn),
            getter: Getter::new(conn),
            selector: Selector::new(conn),
        }
    }

    pub fn by_username(&self, username: &str) -> Self {
        Self {
            expr: self.expr.and(Predicate::equals("users.username", username)),
            ..self.clone()
        }
    }

    pub fn insert(&self, ctx: &Context, user: User) -> StoreResult<User> {
        self.inserter.insert(ctx, user)
    }

    pub fn get(&self, ctx: &Context) -> StoreResult<Option<User>> {
        self.getter.with_expr(self.expr.clone()).get(ctx)
    }

    pub fn select(&self, ctx: &Context) -> StoreResult<Vec<User>> {
        self.selector.with_expr(self.expr.clone()).select(ctx)
    }
}

/// Capability set over `whitelist`.
#[derive(Clone)]
pub struct WhitelistProvider<'c> {
    expr: Predicate,
    inserter: Inserter<'c, Whitelist>,
    getter: Getter<'c, Whitelist>,
    remover: Remover<'c, Whitelist>,
}

impl<'c> WhitelistProvider<'c> {
    pub fn new(conn: Binding<'c>) -> Self {
        Self {
            expr: Predicate::always(),
            inserter: Inserter::new(conn),
            getter: Getter::new(conn),
            remover: Remover::new(conn),
        }
    }

    pub fn by_username(&self, username: &str) -> Self {
        Self {
            expr: self
                .expr
                .and(Predicate::equals("whitelist.username", username)),
            ..self.clone()
        }
    }

    pub fn insert(&self, ctx: &Context, entry: Whitelist) -> StoreResult<Whitelist> {
        self.inserter.insert(ctx, entry)
    }

    pub fn get(&self, ctx: &Context) -> StoreResult<Option<Whitelist>> {
        self.getter.with_expr(self.expr.clone()).get(ctx)
    }

    pub fn remove(&self, ctx: &Context) -> StoreResult<usize> {
        self.remover.with_expr(self.expr.clone()).remove(ctx)
    }

    /// Consumes an invitation token: deletes the matching entry.
    ///
    /// # Errors
    /// - `NotFound` when no entry carries `token` under the current filter.
    pub fn extract_token(&self, ctx: &Context, token: Uuid) -> StoreResult<()> {
        self.remover
            .with_expr(self.expr.and(Predicate::equals("whitelist.token", token)))
            .remove(ctx)?;
        Ok(())
    }
}

/// KV capability set over the single session-key record.
#[derive(Clone)]
pub struct AuthorizationKeysProvider<'c> {
    getter: KvGetter<'c, AuthorizationKeys>,
    inserter: KvInserter<'c, AuthorizationKeys>,
    remover: KvRemover<'c, AuthorizationKeys>,
}

impl<'c> AuthorizationKeysProvider<'c> {
    pub fn new(kv: &'c dyn KvStore) -> Self {
        Self {
            getter: KvGetter::new(kv),
            inserter: KvInserter::new(kv),
            remover: KvRemover::new(kv),
        }
    }

    pub fn by_key(&self, key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            getter: self.getter.by_key(key.clone()),
            remover: self.remover.by_key(key),
            ..self.clone()
        }
    }

    /// Expires stored keys after `ttl`.
    pub fn with_ttl(&self, ttl: Duration) -> Self {
        Self {
            inserter: self.inserter.with_ttl(ttl),
            ..self.clone()
        }
    }

    pub fn get(&self, ctx: &Context) -> StoreResult<AuthorizationKeys> {
        self.getter.get(ctx)
    }

    pub fn insert(&self, ctx: &Context, keys: AuthorizationKeys) -> StoreResult<AuthorizationKeys> {
        self.inserter.insert(ctx, keys)
    }

    pub fn remove(&self, ctx: &Context) -> StoreResult<()> {
        self.remover.remove(ctx)
    }
}
