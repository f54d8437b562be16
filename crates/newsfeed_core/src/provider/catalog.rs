//! Coins, distribution channels and per-channel coin preferences.

use crate::ctx::Context;
use crate::error::StoreResult;
use crate::model::channel::Channel;
use crate::model::coin::Coin;
use crate::model::links::{PreferencesChannelCoin, NEWS_COINS};
use crate::query::{Join, Predicate};
use crate::repo::sql::{Inserter, Remover, Selector};
use crate::repo::Binding;
use uuid::Uuid;

/// Capability set over `coins`.
#[derive(Clone)]
pub struct CoinsProvider<'c> {
    inserter: Inserter<'c, Coin>,
    selector: Selector<'c, Coin>,
}

impl<'c> CoinsProvider<'c> {
    pub fn new(conn: Binding<'c>) -> Self {
        Self {
            inserter: Inserter::new(conn),
            selector: Selector::new(conn),
        }
    }

    /// Coins linked to the content item `news_id`.
    pub fn by_news_id(&self, news_id: Uuid) -> Self {
        let join = Join::inner(NEWS_COINS, "news_coins.code", "coins.code")
            .filtered(Predicate::equals("news_coins.news_id", news_id));
        Self {
            selector: self.selector.join(join),
            ..self.clone()
        }
    }

    pub fn by_codes<I, S>(&self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selector: self.selector.filter(Predicate::equals_any(
                "coins.code",
                codes.into_iter().map(Into::into),
            )),
            ..self.clone()
        }
    }

    pub fn insert(&self, ctx: &Context, coin: Coin) -> StoreResult<Coin> {
        self.inserter.insert(ctx, coin)
    }

    pub fn select(&self, ctx: &Context) -> StoreResult<Vec<Coin>> {
        self.selector.select(ctx)
    }

    /// Inserts `coin` or overwrites the title and slug of the coin with the
    /// same code.
    pub fn upsert(&self, ctx: &Context, coin: Coin) -> StoreResult<Coin> {
        self.inserter.on_conflict_update(["code"]).insert(ctx, coin)
    }

    pub fn upsert_batch(&self, ctx: &Context, coins: &mut [Coin]) -> StoreResult<usize> {
        self.inserter
            .on_conflict_update(["code"])
            .insert_batch(ctx, coins)
    }
}

/// Capability set over `channels`.
#[derive(Clone)]
pub struct ChannelsProvider<'c> {
    inserter: Inserter<'c, Channel>,
    selector: Selector<'c, Channel>,
}

impl<'c> ChannelsProvider<'c> {
    pub fn new(conn: Binding<'c>) -> Self {
        Self {
            inserter: Inserter::new(conn),
            selector: Selector::new(conn),
        }
    }

    pub fn by_ids(&self, channel_ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            selector: self
                .selector
                .filter(Predicate::equals_any("channels.channel_id", channel_ids)),
            ..self.clone()
        }
    }

    pub fn insert(&self, ctx: &Context, channel: Channel) -> StoreResult<Channel> {
        self.inserter.insert(ctx, channel)
    }

    pub fn insert_batch(&self, ctx: &Context, channels: &mut [Channel]) -> StoreResult<usize> {
        self.inserter.insert_batch(ctx, channels)
    }

    pub fn select(&self, ctx: &Context) -> StoreResult<Vec<Channel>> {
        self.selector.select(ctx)
    }
}

/// Capability set over `preferences_channel_coins`.
#[derive(Clone)]
pub struct PreferencesProvider<'c> {
    expr: Predicate,
    inserter: Inserter<'c, PreferencesChannelCoin>,
    selector: Selector<'c, PreferencesChannelCoin>,
    remover: Remover<'c, PreferencesChannelCoin>,
}

impl<'c> PreferencesProvider<'c> {
    pub fn new(conn: Binding<'c>) -> Self {
        Self {
            expr: Predicate::always(),
            inserter: Inserter::new(conn),
            selector: Selector::new(conn),
            remover: Remover::new(conn),
        }
    }

    pub fn by_channel(&self, channel_id: i64) -> Self {
        Self {
            expr: self.expr.and(Predicate::equals(
                "preferences_channel_coins.channel_id",
                channel_id,
            )),
            ..self.clone()
        }
    }

    pub fn insert(
        &self,
        ctx: &Context,
        preference: PreferencesChannelCoin,
    ) -> StoreResult<PreferencesChannelCoin> {
        self.inserter.insert(ctx, preference)
    }

    pub fn insert_batch(
        &self,
        ctx: &Context,
        preferences: &mut [PreferencesChannelCoin],
    ) -> StoreResult<usize> {
        self.inserter.insert_batch(ctx, preferences)
    }

    pub fn select(&self, ctx: &Context) -> StoreResult<Vec<PreferencesChannelCoin>> {
        self.selector.with_expr(self.expr.clone()).select(ctx)
    }

    pub fn remove(&self, ctx: &Context) -> StoreResult<usize> {
        self.remover.with_expr(self.expr.clone()).remove(ctx)
    }
}
