//! Bot user model.

use super::record::{sealed, FieldMeta, Record, RecordSchema, SqlRecord};
use super::value::{uuid_column, FieldValue, ToFieldValue};
use crate::error::StoreResult;
use rusqlite::Row;
use uuid::Uuid;

pub const USERS: &str = "users";

static USER_SCHEMA: RecordSchema = RecordSchema {
    target: USERS,
    fields: &[
        FieldMeta::column("id").omit_if_default(),
        FieldMeta::column("created_at").omit_if_default(),
        FieldMeta::column("updated_at"),
        FieldMeta::column("username"),
        FieldMeta::column("first_name"),
        FieldMeta::column("last_name"),
        FieldMeta::column("platform"),
    ],
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub platform: Option<String>,
}

impl sealed::Sealed for User {}

impl Record for User {
    fn schema() -> &'static RecordSchema {
        &USER_SCHEMA
    }

    fn field_value(&self, field: &str) -> StoreResult<Option<FieldValue>> {
        Ok(match field {
            "id" => Some(self.id.to_field_value()),
            "created_at" => Some(self.created_at.to_field_value()),
            "updated_at" => Some(self.updated_at.to_field_value()),
            "username" => Some(self.username.to_field_value()),
            "first_name" => Some(self.first_name.to_field_value()),
            "last_name" => Some(self.last_name.to_field_value()),
            "platform" => Some(self.platform.to_field_value()),
            _ => None,
        })
    }
}

impl SqlRecord for User {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            username: row.get("username")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            platform: row.get("platform")?,
        })
    }
}
