//! Content items and their coin/channel links.

use crate::ctx::Context;
use crate::error::StoreResult;
use crate::model::channel::CHANNELS;
use crate::model::current_timestamp_ms;
use crate::model::links::{NewsChannel, NewsCoin, NEWS_COINS};
use crate::model::news::{News, UpdateNewsParams, NEWS};
use crate::model::status::Status;
use crate::query::{Direction, Join, Predicate};
use crate::repo::sql::{Getter, Inserter, Remover, Selector, Updater};
use crate::repo::Binding;
use uuid::Uuid;

/// Capability set over `news`.
///
/// Filters accumulate into one expression applied at execution time.
#[derive(Clone)]
pub struct NewsProvider<'c> {
    expr: Predicate,
    inserter: Inserter<'c, News>,
    getter: Getter<'c, News>,
    selector: Selector<'c, News>,
    updater: Updater<'c, UpdateNewsParams, News>,
}

impl<'c> NewsProvider<'c> {
    pub fn new(conn: Binding<'c>) -> Self {
        Self {
            expr: Predicate::always(),
            inserter: Inserter::new(conn),
            getter: Getter::new(conn),
            selector: Selector::new(conn),
            updater: Updater::new(conn),
        }
    }

    fn narrowed(&self, expr: Predicate) -> Self {
        Self {
            expr: self.expr.and(expr),
            ..self.clone()
        }
    }

    pub fn by_status(&self, statuses: impl IntoIterator<Item = Status>) -> Self {
        self.narrowed(Predicate::equals_any("news.status", statuses))
    }

    pub fn by_sources<I, S>(&self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.narrowed(Predicate::equals_any(
            "news.source",
            sources.into_iter().map(Into::into),
        ))
    }

    pub fn by_ids(&self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.narrowed(Predicate::equals_any("news.id", ids))
    }

    /// Keeps items linked to any of `codes`; each item appears once.
    pub fn by_coins<I, S>(&self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.narrowed(Predicate::in_select(
            "news.id",
            NEWS_COINS,
            "news_coins.news_id",
            Predicate::equals_any("news_coins.code", codes.into_iter().map(Into::into)),
        ))
    }

    fn selector(&self) -> Selector<'c, News> {
        self.selector.with_expr(self.expr.clone())
    }

    fn getter(&self) -> Getter<'c, News> {
        self.getter.with_expr(self.expr.clone())
    }

    pub fn insert(&self, ctx: &Context, news: News) -> StoreResult<News> {
        self.inserter.insert(ctx, news)
    }

    pub fn insert_batch(&self, ctx: &Context, news: &mut [News]) -> StoreResult<usize> {
        self.inserter.insert_batch(ctx, news)
    }

    pub fn get(&self, ctx: &Context) -> StoreResult<Option<News>> {
        self.getter().get(ctx)
    }

    /// Most recently published matching item.
    pub fn get_latest(&self, ctx: &Context) -> StoreResult<Option<News>> {
        self.getter()
            .order("news.published_at", Direction::Desc)
            .first(ctx)
    }

    pub fn select(&self, ctx: &Context) -> StoreResult<Vec<News>> {
        self.selector().select(ctx)
    }

    pub fn count(&self, ctx: &Context) -> StoreResult<u64> {
        self.selector().count(ctx)
    }

    /// Applies `params` to every matching item, stamping `updated_at`.
    pub fn update(&self, ctx: &Context, mut params: UpdateNewsParams) -> StoreResult<Vec<News>> {
        params.updated_at = Some(current_timestamp_ms());
        self.updater.with_expr(self.expr.clone()).update(ctx, params)
    }
}

/// Capability set over `news_coins`.
#[derive(Clone)]
pub struct NewsCoinsProvider<'c> {
    inserter: Inserter<'c, NewsCoin>,
}

impl<'c> NewsCoinsProvider<'c> {
    pub fn new(conn: Binding<'c>) -> Self {
        Self {
            inserter: Inserter::new(conn),
        }
    }

    pub fn insert(&self, ctx: &Context, link: NewsCoin) -> StoreResult<NewsCoin> {
        self.inserter.insert(ctx, link)
    }

    pub fn insert_batch(&self, ctx: &Context, links: &mut [NewsCoin]) -> StoreResult<usize> {
        self.inserter.insert_batch(ctx, links)
    }
}

/// Capability set over `news_channels`.
#[derive(Clone)]
pub struct NewsChannelsProvider<'c> {
    expr: Predicate,
    joins: Vec<Join>,
    ordered: bool,
    inserter: Inserter<'c, NewsChannel>,
    selector: Selector<'c, NewsChannel>,
    remover: Remover<'c, NewsChannel>,
}

impl<'c> NewsChannelsProvider<'c> {
    pub fn new(conn: Binding<'c>) -> Self {
        Self {
            expr: Predicate::always(),
            joins: Vec::new(),
            ordered: false,
            inserter: Inserter::new(conn),
            selector: Selector::new(conn),
            remover: Remover::new(conn),
        }
    }

    fn with_join(&self, join: Join) -> Self {
        let mut next = self.clone();
        if !next.joins.iter().any(|known| known.table() == join.table()) {
            next.joins.push(join);
        }
        next
    }

    /// Orders selections by channel priority, lowest first.
    pub fn ordered(&self) -> Self {
        let next = self.with_join(Join::inner(
            CHANNELS,
            "channels.channel_id",
            "news_channels.channel_id",
        ));
        Self {
            ordered: true,
            ..next
        }
    }

    /// Keeps links whose item came from one of `sources`.
    pub fn by_sources<I, S>(&self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let next = self.with_join(Join::inner(NEWS, "news.id", "news_channels.news_id"));
        Self {
            expr: next.expr.and(Predicate::equals_any(
                "news.source",
                sources.into_iter().map(Into::into),
            )),
            ..next
        }
    }

    pub fn by_ids(&self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            expr: self.expr.and(Predicate::equals_any("news_channels.id", ids)),
            ..self.clone()
        }
    }

    pub fn insert(&self, ctx: &Context, link: NewsChannel) -> StoreResult<NewsChannel> {
        self.inserter.insert(ctx, link)
    }

    pub fn insert_batch(&self, ctx: &Context, links: &mut [NewsChannel]) -> StoreResult<usize> {
        self.inserter.insert_batch(ctx, links)
    }

    pub fn select(&self, ctx: &Context) -> StoreResult<Vec<NewsChannel>> {
        let mut selector = self.selector.with_expr(self.expr.clone());
        for join in &self.joins {
            selector = selector.join(join.clone());
        }
        if self.ordered {
            selector = selector.order("channels.priority", Direction::Asc);
        }
        selector.select(ctx)
    }

    /// Removes matching links; `NotFound` when none matched.
    pub fn remove(&self, ctx: &Context) -> StoreResult<usize> {
        let mut remover = self.remover.with_expr(self.expr.clone());
        for join in &self.joins {
            remover = remover.join(join.clone());
        }
        remover.remove(ctx)
    }
}
