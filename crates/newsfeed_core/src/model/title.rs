//! Crawled headline model.
//!
//! # Invariants
//! - `hash` is the dedup key; the store rejects a second title with the same
//!   hash.

use super::record::{sealed, FieldMeta, Record, RecordSchema, SqlRecord};
use super::status::Status;
use super::value::{uuid_column, FieldValue, ToFieldValue};
use crate::error::StoreResult;
use rusqlite::Row;
use uuid::Uuid;

pub const TITLES: &str = "titles";

static TITLE_SCHEMA: RecordSchema = RecordSchema {
    target: TITLES,
    fields: &[
        FieldMeta::column("id").omit_if_default(),
        FieldMeta::column("created_at").omit_if_default(),
        FieldMeta::column("updated_at"),
        FieldMeta::column("title"),
        FieldMeta::column("summary"),
        FieldMeta::column("hash"),
        FieldMeta::column("url"),
        FieldMeta::column("status"),
        FieldMeta::column("release_date"),
    ],
};

static UPDATE_TITLE_SCHEMA: RecordSchema = RecordSchema {
    target: TITLES,
    fields: &[
        FieldMeta::column("updated_at").omit_if_default(),
        FieldMeta::column("status").omit_if_default(),
    ],
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Title {
    pub id: Uuid,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub hash: Option<String>,
    pub url: Option<String>,
    pub status: Option<Status>,
    /// Publication time reported by the source, epoch milliseconds.
    pub release_date: Option<i64>,
}

impl Title {
    /// Creates a pending title deduplicated by `hash`.
    pub fn pending(title: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            hash: Some(hash.into()),
            status: Some(Status::Pending),
            ..Self::default()
        }
    }
}

impl sealed::Sealed for Title {}

impl Record for Title {
    fn schema() -> &'static RecordSchema {
        &TITLE_SCHEMA
    }

    fn field_value(&self, field: &str) -> StoreResult<Option<FieldValue>> {
        Ok(match field {
            "id" => Some(self.id.to_field_value()),
            "created_at" => Some(self.created_at.to_field_value()),
            "updated_at" => Some(self.updated_at.to_field_value()),
            "title" => Some(self.title.to_field_value()),
            "summary" => Some(self.summary.to_field_value()),
            "hash" => Some(self.hash.to_field_value()),
            "url" => Some(self.url.to_field_value()),
            "status" => Some(self.status.to_field_value()),
            "release_date" => Some(self.release_date.to_field_value()),
            _ => None,
        })
    }
}

impl SqlRecord for Title {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            title: row.get("title")?,
            summary: row.get("summary")?,
            hash: row.get("hash")?,
            url: row.get("url")?,
            status: row.get("status")?,
            release_date: row.get("release_date")?,
        })
    }
}

/// Partial update of a title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTitleParams {
    pub updated_at: Option<i64>,
    pub status: Option<Status>,
}

impl UpdateTitleParams {
    pub fn status(status: Status) -> Self {
        Self {
            updated_at: None,
            status: Some(status),
        }
    }
}

impl sealed::Sealed for UpdateTitleParams {}

impl Record for UpdateTitleParams {
    fn schema() -> &'static RecordSchema {
        &UPDATE_TITLE_SCHEMA
    }

    fn field_value(&self, field: &str) -> StoreResult<Option<FieldValue>> {
        Ok(match field {
            "updated_at" => Some(self.updated_at.to_field_value()),
            "status" => Some(self.status.to_field_value()),
            _ => None,
        })
    }
}
