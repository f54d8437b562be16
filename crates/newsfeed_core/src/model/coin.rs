//! Coin reference data.

use super::record::{sealed, FieldMeta, Record, RecordSchema, SqlRecord};
use super::value::{FieldValue, ToFieldValue};
use crate::error::StoreResult;
use rusqlite::Row;

pub const COINS: &str = "coins";

static COIN_SCHEMA: RecordSchema = RecordSchema {
    target: COINS,
    fields: &[
        FieldMeta::column("code"),
        FieldMeta::column("title"),
        FieldMeta::column("slug"),
    ],
};

/// A tracked coin, keyed by its ticker `code`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coin {
    pub code: String,
    pub title: String,
    pub slug: String,
}

impl Coin {
    pub fn new(code: impl Into<String>, title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            slug: slug.into(),
        }
    }
}

impl sealed::Sealed for Coin {}

impl Record for Coin {
    fn schema() -> &'static RecordSchema {
        &COIN_SCHEMA
    }

    fn field_value(&self, field: &str) -> StoreResult<Option<FieldValue>> {
        Ok(match field {
            "code" => Some(self.code.to_field_value()),
            "title" => Some(self.title.to_field_value()),
            "slug" => Some(self.slug.to_field_value()),
            _ => None,
        })
    }
}

impl SqlRecord for Coin {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            code: row.get("code")?,
            title: row.get("title")?,
            slug: row.get("slug")?,
        })
    }
}
