//! Crawler-side entities: headlines and fetched raw bodies.

use crate::ctx::Context;
use crate::error::StoreResult;
use crate::model::current_timestamp_ms;
use crate::model::raw_news::{RawNews, RawNewsWebpage};
use crate::model::status::Status;
use crate::model::title::{Title, UpdateTitleParams};
use crate::query::{Direction, Predicate};
use crate::repo::sql::{Inserter, Remover, Selector, Updater};
use crate::repo::Binding;
use uuid::Uuid;

/// Capability set over `titles`.
#[derive(Clone)]
pub struct TitlesProvider<'c> {
    expr: Predicate,
    inserter: Inserter<'c, Title>,
    selector: Selector<'c, Title>,
    updater: Updater<'c, UpdateTitleParams, Title>,
}

impl<'c> TitlesProvider<'c> {
    pub fn new(conn: Binding<'c>) -> Self {
        Self {
            expr: Predicate::always(),
            inserter: Inserter::new(conn),
            selector: Selector::new(conn),
            updater: Updater::new(conn),
        }
    }

    pub fn by_ids(&self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            expr: self.expr.and(Predicate::equals_any("titles.id", ids)),
            ..self.clone()
        }
    }

    pub fn by_status(&self, statuses: impl IntoIterator<Item = Status>) -> Self {
        Self {
            expr: self
                .expr
                .and(Predicate::equals_any("titles.status", statuses)),
            ..self.clone()
        }
    }

    pub fn insert(&self, ctx: &Context, title: Title) -> StoreResult<Title> {
        self.inserter.insert(ctx, title)
    }

    pub fn insert_batch(&self, ctx: &Context, titles: &mut [Title]) -> StoreResult<usize> {
        self.inserter.insert_batch(ctx, titles)
    }

    /// Inserts titles whose hash is not stored yet.
    ///
    /// Stored titles are rehydrated in place; skipped ones are left as given.
    /// Returns the number of titles stored.
    pub fn insert_unique_batch(&self, ctx: &Context, titles: &mut [Title]) -> StoreResult<usize> {
        self.inserter
            .on_conflict_ignore(["hash"])
            .insert_batch(ctx, titles)
    }

    pub fn select(&self, ctx: &Context) -> StoreResult<Vec<Title>> {
        self.selector.with_expr(self.expr.clone()).select(ctx)
    }

    pub fn count(&self, ctx: &Context) -> StoreResult<u64> {
        self.selector.with_expr(self.expr.clone()).count(ctx)
    }

    /// Applies `params` to every matching title, stamping `updated_at`.
    pub fn update(
        &self,
        ctx: &Context,
        mut params: UpdateTitleParams,
    ) -> StoreResult<Vec<Title>> {
        params.updated_at = Some(current_timestamp_ms());
        self.updater.with_expr(self.expr.clone()).update(ctx, params)
    }
}

/// Capability set over `raw_news`.
#[derive(Clone)]
pub struct RawNewsProvider<'c> {
    expr: Predicate,
    inserter: Inserter<'c, RawNews>,
    selector: Selector<'c, RawNews>,
    remover: Remover<'c, RawNews>,
}

impl<'c> RawNewsProvider<'c> {
    pub fn new(conn: Binding<'c>) -> Self {
        Self {
            expr: Predicate::always(),
            inserter: Inserter::new(conn),
            selector: Selector::new(conn),
            remover: Remover::new(conn),
        }
    }

    pub fn by_ids(&self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            expr: self.expr.and(Predicate::equals_any("raw_news.id", ids)),
            ..self.clone()
        }
    }

    pub fn limit(&self, limit: u32) -> Self {
        Self {
            selector: self.selector.limit(limit),
            ..self.clone()
        }
    }

    pub fn offset(&self, offset: u32) -> Self {
        Self {
            selector: self.selector.offset(offset),
            ..self.clone()
        }
    }

    pub fn order(&self, field: impl Into<String>, direction: Direction) -> Self {
        Self {
            selector: self.selector.order(field, direction),
            ..self.clone()
        }
    }

    pub fn insert(&self, ctx: &Context, raw: RawNews) -> StoreResult<RawNews> {
        self.inserter.insert(ctx, raw)
    }

    pub fn insert_batch(&self, ctx: &Context, raw: &mut [RawNews]) -> StoreResult<usize> {
        self.inserter.insert_batch(ctx, raw)
    }

    pub fn select(&self, ctx: &Context) -> StoreResult<Vec<RawNews>> {
        self.selector.with_expr(self.expr.clone()).select(ctx)
    }

    /// Number of matching rows; paging and ordering do not apply.
    pub fn count(&self, ctx: &Context) -> StoreResult<u64> {
        self.selector.with_expr(self.expr.clone()).count(ctx)
    }

    pub fn remove(&self, ctx: &Context) -> StoreResult<usize> {
        self.remover.with_expr(self.expr.clone()).remove(ctx)
    }
}

/// Capability set over `raw_news_webpages`.
#[derive(Clone)]
pub struct RawNewsWebpagesProvider<'c> {
    expr: Predicate,
    inserter: Inserter<'c, RawNewsWebpage>,
    selector: Selector<'c, RawNewsWebpage>,
    remover: Remover<'c, RawNewsWebpage>,
}

impl<'c> RawNewsWebpagesProvider<'c> {
    pub fn new(conn: Binding<'c>) -> Self {
        Self {
            expr: Predicate::always(),
            inserter: Inserter::new(conn),
            selector: Selector::new(conn),
            remover: Remover::new(conn),
        }
    }

    pub fn by_ids(&self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            expr: self
                .expr
                .and(Predicate::equals_any("raw_news_webpages.id", ids)),
            ..self.clone()
        }
    }

    pub fn insert(&self, ctx: &Context, page: RawNewsWebpage) -> StoreResult<RawNewsWebpage> {
        self.inserter.insert(ctx, page)
    }

    pub fn select(&self, ctx: &Context) -> StoreResult<Vec<RawNewsWebpage>> {
        self.selector.with_expr(self.expr.clone()).select(ctx)
    }

    pub fn remove(&self, ctx: &Context) -> StoreResult<usize> {
        self.remover.with_expr(self.expr.clone()).remove(ctx)
    }
}
