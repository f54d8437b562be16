//! Raw crawled bodies: per-title articles and standalone web pages.

use super::record::{sealed, FieldMeta, Record, RecordSchema, SqlRecord};
use super::value::{uuid_column, FieldValue, ToFieldValue};
use crate::error::StoreResult;
use rusqlite::Row;
use uuid::Uuid;

pub const RAW_NEWS: &str = "raw_news";
pub const RAW_NEWS_WEBPAGES: &str = "raw_news_webpages";

static RAW_NEWS_SCHEMA: RecordSchema = RecordSchema {
    target: RAW_NEWS,
    fields: &[
        FieldMeta::column("id").omit_if_default(),
        FieldMeta::column("created_at").omit_if_default(),
        FieldMeta::column("title_id"),
        FieldMeta::column("body"),
    ],
};

static RAW_NEWS_WEBPAGE_SCHEMA: RecordSchema = RecordSchema {
    target: RAW_NEWS_WEBPAGES,
    fields: &[
        FieldMeta::column("id").omit_if_default(),
        FieldMeta::column("created_at").omit_if_default(),
        FieldMeta::column("body"),
    ],
};

/// Article body fetched for a [`crate::model::title::Title`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawNews {
    pub id: Uuid,
    pub created_at: i64,
    pub title_id: Uuid,
    pub body: Option<String>,
}

impl sealed::Sealed for RawNews {}

impl Record for RawNews {
    fn schema() -> &'static RecordSchema {
        &RAW_NEWS_SCHEMA
    }

    fn field_value(&self, field: &str) -> StoreResult<Option<FieldValue>> {
        Ok(match field {
            "id" => Some(self.id.to_field_value()),
            "created_at" => Some(self.created_at.to_field_value()),
            "title_id" => Some(self.title_id.to_field_value()),
            "body" => Some(self.body.to_field_value()),
            _ => None,
        })
    }
}

impl SqlRecord for RawNews {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            created_at: row.get("created_at")?,
            title_id: uuid_column(row, "title_id")?,
            body: row.get("body")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawNewsWebpage {
    pub id: Uuid,
    pub created_at: i64,
    pub body: Option<String>,
}

impl sealed::Sealed for RawNewsWebpage {}

impl Record for RawNewsWebpage {
    fn schema() -> &'static RecordSchema {
        &RAW_NEWS_WEBPAGE_SCHEMA
    }

    fn field_value(&self, field: &str) -> StoreResult<Option<FieldValue>> {
        Ok(match field {
            "id" => Some(self.id.to_field_value()),
            "created_at" => Some(self.created_at.to_field_value()),
            "body" => Some(self.body.to_field_value()),
            _ => None,
        })
    }
}

impl SqlRecord for RawNewsWebpage {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            created_at: row.get("created_at")?,
            body: row.get("body")?,
        })
    }
}
