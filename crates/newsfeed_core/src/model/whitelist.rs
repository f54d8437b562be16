//! Invitation whitelist model.
//!
//! A whitelist entry grants access either by username or by a one-time
//! token that is consumed on first use.

use super::record::{sealed, FieldMeta, Record, RecordSchema, SqlRecord};
use super::value::{opt_uuid_column, uuid_column, FieldValue, ToFieldValue};
use crate::error::StoreResult;
use rusqlite::Row;
use uuid::Uuid;

pub const WHITELIST: &str = "whitelist";

static WHITELIST_SCHEMA: RecordSchema = RecordSchema {
    target: WHITELIST,
    fields: &[
        FieldMeta::column("id").omit_if_default(),
        FieldMeta::column("username"),
        FieldMeta::column("token"),
    ],
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    pub id: Uuid,
    pub username: Option<String>,
    pub token: Option<Uuid>,
}

impl sealed::Sealed for Whitelist {}

impl Record for Whitelist {
    fn schema() -> &'static RecordSchema {
        &WHITELIST_SCHEMA
    }

    fn field_value(&self, field: &str) -> StoreResult<Option<FieldValue>> {
        Ok(match field {
            "id" => Some(self.id.to_field_value()),
            "username" => Some(self.username.to_field_value()),
            "token" => Some(self.token.to_field_value()),
            _ => None,
        })
    }
}

impl SqlRecord for Whitelist {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            username: row.get("username")?,
            token: opt_uuid_column(row, "token")?,
        })
    }
}
