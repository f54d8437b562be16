//! Association records between news, coins and channels.

use super::record::{sealed, FieldMeta, Record, RecordSchema, SqlRecord};
use super::value::{uuid_column, FieldValue, ToFieldValue};
use crate::error::StoreResult;
use rusqlite::Row;
use uuid::Uuid;

pub const NEWS_COINS: &str = "news_coins";
pub const NEWS_CHANNELS: &str = "news_channels";
pub const PREFERENCES_CHANNEL_COINS: &str = "preferences_channel_coins";

static NEWS_COIN_SCHEMA: RecordSchema = RecordSchema {
    target: NEWS_COINS,
    fields: &[
        FieldMeta::column("id").omit_if_default(),
        FieldMeta::column("code"),
        FieldMeta::column("news_id").omit_if_default(),
    ],
};

static NEWS_CHANNEL_SCHEMA: RecordSchema = RecordSchema {
    target: NEWS_CHANNELS,
    fields: &[
        FieldMeta::column("id").omit_if_default(),
        FieldMeta::column("channel_id").omit_if_default(),
        FieldMeta::column("news_id").omit_if_default(),
    ],
};

static PREFERENCE_SCHEMA: RecordSchema = RecordSchema {
    target: PREFERENCES_CHANNEL_COINS,
    fields: &[
        FieldMeta::column("channel_id"),
        FieldMeta::column("coin_code"),
    ],
};

/// Coin mentioned by a news item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsCoin {
    pub id: Uuid,
    pub code: String,
    pub news_id: Uuid,
}

impl NewsCoin {
    pub fn new(news_id: Uuid, code: impl Into<String>) -> Self {
        Self {
            id: Uuid::nil(),
            code: code.into(),
            news_id,
        }
    }
}

impl sealed::Sealed for NewsCoin {}

impl Record for NewsCoin {
    fn schema() -> &'static RecordSchema {
        &NEWS_COIN_SCHEMA
    }

    fn field_value(&self, field: &str) -> StoreResult<Option<FieldValue>> {
        Ok(match field {
            "id" => Some(self.id.to_field_value()),
            "code" => Some(self.code.to_field_value()),
            "news_id" => Some(self.news_id.to_field_value()),
            _ => None,
        })
    }
}

impl SqlRecord for NewsCoin {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            code: row.get("code")?,
            news_id: uuid_column(row, "news_id")?,
        })
    }
}

/// Pending delivery of a news item to a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsChannel {
    pub id: Uuid,
    pub channel_id: i64,
    pub news_id: Uuid,
}

impl NewsChannel {
    pub fn new(channel_id: i64, news_id: Uuid) -> Self {
        Self {
            id: Uuid::nil(),
            channel_id,
            news_id,
        }
    }
}

impl sealed::Sealed for NewsChannel {}

impl Record for NewsChannel {
    fn schema() -> &'static RecordSchema {
        &NEWS_CHANNEL_SCHEMA
    }

    fn field_value(&self, field: &str) -> StoreResult<Option<FieldValue>> {
        Ok(match field {
            "id" => Some(self.id.to_field_value()),
            "channel_id" => Some(self.channel_id.to_field_value()),
            "news_id" => Some(self.news_id.to_field_value()),
            _ => None,
        })
    }
}

impl SqlRecord for NewsChannel {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            channel_id: row.get("channel_id")?,
            news_id: uuid_column(row, "news_id")?,
        })
    }
}

/// Coin a channel subscribes to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesChannelCoin {
    pub channel_id: i64,
    pub coin_code: String,
}

impl PreferencesChannelCoin {
    pub fn new(channel_id: i64, coin_code: impl Into<String>) -> Self {
        Self {
            channel_id,
            coin_code: coin_code.into(),
        }
    }
}

impl sealed::Sealed for PreferencesChannelCoin {}

impl Record for PreferencesChannelCoin {
    fn schema() -> &'static RecordSchema {
        &PREFERENCE_SCHEMA
    }

    fn field_value(&self, field: &str) -> StoreResult<Option<FieldValue>> {
        Ok(match field {
            "channel_id" => Some(self.channel_id.to_field_value()),
            "coin_code" => Some(self.coin_code.to_field_value()),
            _ => None,
        })
    }
}

impl SqlRecord for PreferencesChannelCoin {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            channel_id: row.get("channel_id")?,
            coin_code: row.get("coin_code")?,
        })
    }
}
