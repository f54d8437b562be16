//! Record types of the news pipeline and their storage metadata.
//!
//! # Responsibility
//! - Define the closed set of storable records.
//! - Validate every record schema once per process.
//!
//! # Invariants
//! - Schema targets and field targets are valid SQL identifiers.
//! - Field names and field targets are unique within one schema.

pub mod authorization_keys;
pub mod channel;
pub mod coin;
pub mod links;
pub mod news;
pub mod raw_news;
pub mod record;
pub mod status;
pub mod title;
pub mod user;
pub mod value;
pub mod whitelist;

use crate::error::{StoreError, StoreResult};
use crate::query::clause::is_valid_identifier;
use once_cell::sync::Lazy;
use record::{Record, RecordSchema};
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in epoch milliseconds, the unit of every
/// timestamp field.
pub fn current_timestamp_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

/// Every record schema known to this crate.
pub fn registry() -> Vec<&'static RecordSchema> {
    vec![
        news::News::schema(),
        news::UpdateNewsParams::schema(),
        coin::Coin::schema(),
        channel::Channel::schema(),
        links::NewsCoin::schema(),
        links::NewsChannel::schema(),
        links::PreferencesChannelCoin::schema(),
        user::User::schema(),
        whitelist::Whitelist::schema(),
        title::Title::schema(),
        title::UpdateTitleParams::schema(),
        raw_news::RawNews::schema(),
        raw_news::RawNewsWebpage::schema(),
        authorization_keys::AuthorizationKeys::schema(),
    ]
}

static REGISTRY_CHECK: Lazy<Result<(), (String, String)>> = Lazy::new(|| {
    registry().into_iter().try_for_each(|schema| {
        check_schema(schema).map_err(|reason| (schema.target.to_string(), reason))
    })
});

/// Validates all record schemas; the work runs once per process.
pub fn validate_registry() -> StoreResult<()> {
    match &*REGISTRY_CHECK {
        Ok(()) => Ok(()),
        Err((target, reason)) => Err(StoreError::invalid_shape(
            target.as_str(),
            reason.as_str(),
        )),
    }
}

fn check_schema(schema: &RecordSchema) -> Result<(), String> {
    if !is_valid_identifier(schema.target) {
        return Err(format!("invalid target name `{}`", schema.target));
    }
    if schema.fields.is_empty() {
        return Err("schema declares no fields".to_string());
    }

    let mut fields = HashSet::new();
    let mut targets = HashSet::new();
    for meta in schema.fields {
        if !fields.insert(meta.field) {
            return Err(format!("field `{}` declared twice", meta.field));
        }
        if !is_valid_identifier(meta.target) || meta.target.contains('.') {
            return Err(format!("invalid target `{}` for `{}`", meta.target, meta.field));
        }
        if !meta.omit_always && !targets.insert(meta.target) {
            return Err(format!("target `{}` mapped twice", meta.target));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::record::{FieldMeta, RecordSchema};
    use super::{check_schema, registry, validate_registry};

    #[test]
    fn shipped_registry_is_valid() {
        assert!(validate_registry().is_ok());
        assert!(registry().iter().all(|schema| check_schema(schema).is_ok()));
    }

    #[test]
    fn duplicate_targets_are_rejected() {
        static DUPLICATED: RecordSchema = RecordSchema {
            target: "dupes",
            fields: &[
                FieldMeta::column("code"),
                FieldMeta::renamed("alias", "code"),
            ],
        };
        assert!(check_schema(&DUPLICATED).is_err());
    }

    #[test]
    fn malformed_identifiers_are_rejected() {
        static MALFORMED: RecordSchema = RecordSchema {
            target: "bad table",
            fields: &[FieldMeta::column("id")],
        };
        assert!(check_schema(&MALFORMED).is_err());
    }
}
