//! Record metadata and the field extractor.
//!
//! # Responsibility
//! - Describe every storable type with a static, hand-written schema.
//! - Map a record value to an ordered `target -> value` mapping.
//! - Derive KV keys from a record's namespace.
//!
//! # Invariants
//! - Exactly one `FieldMeta` per stored or derived field, in declaration order.
//! - `omit_always` fields never take part in read or write mapping.
//! - `Record` is sealed; only the types in `crate::model` implement it.

use crate::error::{StoreError, StoreResult};
use crate::model::value::{FieldValue, Value};
use rusqlite::Row;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// Prefix of every KV key derived from a record namespace.
pub const KV_NAMESPACE_PREFIX: &str = "model";

/// Storage metadata of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMeta {
    /// Rust field name.
    pub field: &'static str,
    /// Column (relational) or JSON key (KV).
    pub target: &'static str,
    /// Derived or join-loaded; never read or written.
    pub omit_always: bool,
    /// Skipped on write when holding its default value.
    pub omit_if_default: bool,
}

impl FieldMeta {
    /// Field stored under its own name.
    pub const fn column(name: &'static str) -> Self {
        Self::renamed(name, name)
    }

    pub const fn renamed(field: &'static str, target: &'static str) -> Self {
        Self {
            field,
            target,
            omit_always: false,
            omit_if_default: false,
        }
    }

    /// Marks the field as left to the store when defaulted.
    pub const fn omit_if_default(self) -> Self {
        Self {
            omit_if_default: true,
            ..self
        }
    }

    /// Marks the field as not stored at all.
    pub const fn omit_always(self) -> Self {
        Self {
            omit_always: true,
            ..self
        }
    }
}

/// Static schema of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSchema {
    /// Table name or KV namespace.
    pub target: &'static str,
    pub fields: &'static [FieldMeta],
}

impl RecordSchema {
    /// Fields that take part in storage mapping.
    pub fn stored_fields(&self) -> impl Iterator<Item = &'static FieldMeta> {
        self.fields.iter().filter(|meta| !meta.omit_always)
    }

    /// Stored column names in declaration order.
    pub fn columns(&self) -> Vec<&'static str> {
        self.stored_fields().map(|meta| meta.target).collect()
    }

    /// Stored column names qualified with the target name.
    pub fn qualified_columns(&self) -> Vec<String> {
        self.stored_fields()
            .map(|meta| format!("{}.{}", self.target, meta.target))
            .collect()
    }
}

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// A storable value type with static metadata.
pub trait Record: sealed::Sealed {
    fn schema() -> &'static RecordSchema;

    /// Value of the field named `field`, or `None` when the record has no
    /// accessor for it.
    fn field_value(&self, field: &str) -> StoreResult<Option<FieldValue>>;
}

/// A record stored as a relational row.
pub trait SqlRecord: Record + Sized {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Replaces `self` with the row the store returned after a write.
    fn rehydrate(&mut self, stored: Self) {
        *self = stored;
    }
}

/// A record stored as a JSON envelope under a key.
pub trait KvRecord: Record + Serialize + DeserializeOwned {}

/// Ordered `target -> value` mapping produced by [`extract`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<(&'static str, Value)>,
}

impl Mapping {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, target: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| *name == target)
            .map(|(_, value)| value)
    }

    pub fn targets(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, Value)> {
        self.entries.iter()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.entries.into_iter().map(|(_, value)| value).collect()
    }
}

/// Maps `record` to its storage representation.
///
/// With `skip_defaulted`, fields flagged `omit_if_default` that hold their
/// default value are left out so the store can populate them.
///
/// # Errors
/// - `InvalidRecordShape` when the schema names a field the record cannot
///   produce.
pub fn extract<R: Record>(record: &R, skip_defaulted: bool) -> StoreResult<Mapping> {
    let schema = R::schema();
    let mut entries = Vec::with_capacity(schema.fields.len());

    for meta in schema.stored_fields() {
        let field = record.field_value(meta.field)?.ok_or_else(|| {
            StoreError::invalid_shape(
                schema.target,
                format!("no accessor for field `{}`", meta.field),
            )
        })?;

        if skip_defaulted && meta.omit_if_default && field.is_default {
            continue;
        }
        entries.push((meta.target, field.value));
    }

    Ok(Mapping { entries })
}

/// KV key for `R`: the namespace alone, or with a fresh random suffix.
pub fn record_key<R: Record>(unique: bool) -> String {
    let namespace = format!("{KV_NAMESPACE_PREFIX}/{}", R::schema().target);
    if unique {
        format!("{namespace}/{}", Uuid::new_v4().hyphenated())
    } else {
        namespace
    }
}

#[cfg(test)]
mod tests {
    use super::{
        extract, record_key, sealed, FieldMeta, Record, RecordSchema, KV_NAMESPACE_PREFIX,
    };
    use crate::error::{StoreError, StoreResult};
    use crate::model::value::{FieldValue, ToFieldValue, Value};

    struct Gadget {
        id: i64,
        label: Option<String>,
        note: String,
        cached: i64,
    }

    static GADGET_SCHEMA: RecordSchema = RecordSchema {
        target: "gadgets",
        fields: &[
            FieldMeta::column("id").omit_if_default(),
            FieldMeta::column("label").omit_if_default(),
            FieldMeta::renamed("note", "note_text"),
            FieldMeta::column("cached").omit_always(),
        ],
    };

    impl sealed::Sealed for Gadget {}

    impl Record for Gadget {
        fn schema() -> &'static RecordSchema {
            &GADGET_SCHEMA
        }

        fn field_value(&self, field: &str) -> StoreResult<Option<FieldValue>> {
            Ok(match field {
                "id" => Some(self.id.to_field_value()),
                "label" => Some(self.label.to_field_value()),
                "note" => Some(self.note.to_field_value()),
                "cached" => Some(self.cached.to_field_value()),
                _ => None,
            })
        }
    }

    struct Broken;

    static BROKEN_SCHEMA: RecordSchema = RecordSchema {
        target: "broken",
        fields: &[FieldMeta::column("missing")],
    };

    impl sealed::Sealed for Broken {}

    impl Record for Broken {
        fn schema() -> &'static RecordSchema {
            &BROKEN_SCHEMA
        }

        fn field_value(&self, _field: &str) -> StoreResult<Option<FieldValue>> {
            Ok(None)
        }
    }

    #[test]
    fn skip_defaulted_drops_only_flagged_default_fields() {
        let gadget = Gadget {
            id: 0,
            label: None,
            note: String::new(),
            cached: 9,
        };

        let skipped = extract(&gadget, true).unwrap();
        assert_eq!(skipped.targets().collect::<Vec<_>>(), vec!["note_text"]);

        let full = extract(&gadget, false).unwrap();
        assert_eq!(
            full.targets().collect::<Vec<_>>(),
            vec!["id", "label", "note_text"]
        );
        assert_eq!(full.get("label"), Some(&Value::Null));
    }

    #[test]
    fn explicitly_set_empty_option_is_kept() {
        let gadget = Gadget {
            id: 4,
            label: Some(String::new()),
            note: "n".to_string(),
            cached: 0,
        };

        let mapping = extract(&gadget, true).unwrap();
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping.get("label"), Some(&Value::Text(String::new())));
    }

    #[test]
    fn missing_accessor_is_invalid_shape() {
        let err = extract(&Broken, false).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecordShape { .. }));
    }

    #[test]
    fn keys_derive_from_namespace() {
        let stable = record_key::<Gadget>(false);
        assert_eq!(stable, format!("{KV_NAMESPACE_PREFIX}/gadgets"));
        assert_eq!(stable, record_key::<Gadget>(false));

        let first = record_key::<Gadget>(true);
        let second = record_key::<Gadget>(true);
        assert!(first.starts_with(&format!("{stable}/")));
        assert_ne!(first, second);
    }

    #[test]
    fn qualified_columns_skip_derived_fields() {
        assert_eq!(
            GADGET_SCHEMA.qualified_columns(),
            vec!["gadgets.id", "gadgets.label", "gadgets.note_text"]
        );
    }
}
