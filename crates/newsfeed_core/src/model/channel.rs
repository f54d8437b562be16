//! Distribution channel model.

use super::record::{sealed, FieldMeta, Record, RecordSchema, SqlRecord};
use super::value::{FieldValue, ToFieldValue};
use crate::error::StoreResult;
use rusqlite::Row;

pub const CHANNELS: &str = "channels";

static CHANNEL_SCHEMA: RecordSchema = RecordSchema {
    target: CHANNELS,
    fields: &[
        FieldMeta::column("channel_id"),
        FieldMeta::column("created_at").omit_if_default(),
        FieldMeta::column("platform"),
        FieldMeta::column("priority").omit_if_default(),
    ],
};

/// A chat channel news is posted to. `channel_id` is platform-assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Channel {
    pub channel_id: i64,
    pub created_at: i64,
    pub platform: Option<String>,
    /// Lower values are served first.
    pub priority: i32,
}

impl Channel {
    pub fn new(channel_id: i64, platform: impl Into<String>) -> Self {
        Self {
            channel_id,
            platform: Some(platform.into()),
            ..Self::default()
        }
    }
}

impl sealed::Sealed for Channel {}

impl Record for Channel {
    fn schema() -> &'static RecordSchema {
        &CHANNEL_SCHEMA
    }

    fn field_value(&self, field: &str) -> StoreResult<Option<FieldValue>> {
        Ok(match field {
            "channel_id" => Some(self.channel_id.to_field_value()),
            "created_at" => Some(self.created_at.to_field_value()),
            "platform" => Some(self.platform.to_field_value()),
            "priority" => Some(self.priority.to_field_value()),
            _ => None,
        })
    }
}

impl SqlRecord for Channel {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            channel_id: row.get("channel_id")?,
            created_at: row.get("created_at")?,
            platform: row.get("platform")?,
            priority: row.get("priority")?,
        })
    }
}
