//! News item model.
//!
//! # Responsibility
//! - Define the digest item distributed to channels and its partial update.
//!
//! # Invariants
//! - `id` and `created_at` are generated by the store when left default.
//! - `coins` is loaded through `news_coins` and never written with the row.

use super::coin::Coin;
use super::record::{sealed, FieldMeta, Record, RecordSchema, SqlRecord};
use super::status::Status;
use super::value::{uuid_column, FieldValue, ToFieldValue, Value};
use crate::error::{StoreError, StoreResult};
use rusqlite::types::Type;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const NEWS: &str = "news";

static NEWS_SCHEMA: RecordSchema = RecordSchema {
    target: NEWS,
    fields: &[
        FieldMeta::column("id").omit_if_default(),
        FieldMeta::column("created_at").omit_if_default(),
        FieldMeta::column("updated_at"),
        FieldMeta::column("published_at"),
        FieldMeta::column("url"),
        FieldMeta::column("media"),
        FieldMeta::column("source"),
        FieldMeta::column("original_source"),
        FieldMeta::column("status"),
        FieldMeta::column("coins").omit_always(),
    ],
};

static UPDATE_NEWS_SCHEMA: RecordSchema = RecordSchema {
    target: NEWS,
    fields: &[
        FieldMeta::column("status").omit_if_default(),
        FieldMeta::column("updated_at").omit_if_default(),
    ],
};

/// Free-form media payload, stored as a JSON column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsMedia {
    pub title: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub resources: Vec<NewsMediaResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsMediaResource {
    /// Resource kind, e.g. `source`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub meta: serde_json::Value,
}

/// One generated digest item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct News {
    pub id: Uuid,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub published_at: Option<i64>,
    pub url: Option<String>,
    pub media: Option<NewsMedia>,
    pub source: Option<String>,
    pub original_source: Option<String>,
    pub status: Option<Status>,
    /// Related coins; filled by callers from `news_coins`.
    pub coins: Vec<Coin>,
}

impl News {
    /// Creates a pending item for `source`.
    pub fn pending(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            status: Some(Status::Pending),
            ..Self::default()
        }
    }

    fn media_value(&self) -> StoreResult<FieldValue> {
        match &self.media {
            Some(media) => {
                let text =
                    serde_json::to_string(media).map_err(|source| StoreError::Serialization {
                        entity: NEWS.to_string(),
                        source,
                    })?;
                Ok(FieldValue::new(text, false))
            }
            None => Ok(FieldValue::new(Value::Null, true)),
        }
    }
}

impl sealed::Sealed for News {}

impl Record for News {
    fn schema() -> &'static RecordSchema {
        &NEWS_SCHEMA
    }

    fn field_value(&self, field: &str) -> StoreResult<Option<FieldValue>> {
        Ok(match field {
            "id" => Some(self.id.to_field_value()),
            "created_at" => Some(self.created_at.to_field_value()),
            "updated_at" => Some(self.updated_at.to_field_value()),
            "published_at" => Some(self.published_at.to_field_value()),
            "url" => Some(self.url.to_field_value()),
            "media" => Some(self.media_value()?),
            "source" => Some(self.source.to_field_value()),
            "original_source" => Some(self.original_source.to_field_value()),
            "status" => Some(self.status.to_field_value()),
            "coins" => Some(FieldValue::new(Value::Null, self.coins.is_empty())),
            _ => None,
        })
    }
}

impl SqlRecord for News {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let media = match row.get::<_, Option<String>>("media")? {
            Some(text) => Some(serde_json::from_str(&text).map_err(|err| {
                let index = row.as_ref().column_index("media").unwrap_or_default();
                rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
            })?),
            None => None,
        };

        Ok(Self {
            id: uuid_column(row, "id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            published_at: row.get("published_at")?,
            url: row.get("url")?,
            media,
            source: row.get("source")?,
            original_source: row.get("original_source")?,
            status: row.get("status")?,
            coins: Vec::new(),
        })
    }

    /// Keeps caller-attached `coins` across the write.
    fn rehydrate(&mut self, stored: Self) {
        let coins = std::mem::take(&mut self.coins);
        *self = Self { coins, ..stored };
    }
}

/// Partial update of a news item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateNewsParams {
    pub status: Option<Status>,
    pub updated_at: Option<i64>,
}

impl UpdateNewsParams {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            updated_at: None,
        }
    }
}

impl sealed::Sealed for UpdateNewsParams {}

impl Record for UpdateNewsParams {
    fn schema() -> &'static RecordSchema {
        &UPDATE_NEWS_SCHEMA
    }

    fn field_value(&self, field: &str) -> StoreResult<Option<FieldValue>> {
        Ok(match field {
            "status" => Some(self.status.to_field_value()),
            "updated_at" => Some(self.updated_at.to_field_value()),
            _ => None,
        })
    }
}
