//! Chat-platform session keys, kept only in the KV store.

use super::record::{sealed, FieldMeta, KvRecord, Record, RecordSchema};
use super::value::{FieldValue, ToFieldValue};
use crate::error::StoreResult;
use serde::{Deserialize, Serialize};

pub const AUTHORIZATION_KEYS: &str = "authorization_keys";

static AUTHORIZATION_KEYS_SCHEMA: RecordSchema = RecordSchema {
    target: AUTHORIZATION_KEYS,
    fields: &[
        FieldMeta::column("authorization_token"),
        FieldMeta::column("refresh_token"),
        FieldMeta::column("authorization_expires_at"),
        FieldMeta::column("refresh_expires_at"),
    ],
};

/// Access and refresh tokens with their expiry, epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationKeys {
    pub authorization_token: String,
    pub refresh_token: String,
    pub authorization_expires_at: i64,
    pub refresh_expires_at: i64,
}

impl AuthorizationKeys {
    /// Whether the access token is still usable at `now_ms`.
    pub fn is_authorization_valid(&self, now_ms: i64) -> bool {
        !self.authorization_token.is_empty() && self.authorization_expires_at > now_ms
    }
}

impl sealed::Sealed for AuthorizationKeys {}

impl Record for AuthorizationKeys {
    fn schema() -> &'static RecordSchema {
        &AUTHORIZATION_KEYS_SCHEMA
    }

    fn field_value(&self, field: &str) -> StoreResult<Option<FieldValue>> {
        Ok(match field {
            "authorization_token" => Some(self.authorization_token.to_field_value()),
            "refresh_token" => Some(self.refresh_token.to_field_value()),
            "authorization_expires_at" => Some(self.authorization_expires_at.to_field_value()),
            "refresh_expires_at" => Some(self.refresh_expires_at.to_field_value()),
            _ => None,
        })
    }
}

impl KvRecord for AuthorizationKeys {}
