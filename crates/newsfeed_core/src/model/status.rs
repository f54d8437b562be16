//! Processing status shared by news items and titles.

use super::value::{invalid_text, FieldValue, ToFieldValue, Value};
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Pipeline stage of a news item or a crawled title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Waiting for the next pipeline step.
    Pending,
    Processed,
    /// Gave up; kept for inspection.
    Failed,
}

impl Status {
    pub const ALL: [Status; 3] = [Self::Pending, Self::Processed, Self::Failed];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "processed" => Ok(Self::Processed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown status `{other}`")),
        }
    }
}

impl From<Status> for Value {
    fn from(value: Status) -> Self {
        Value::Text(value.as_str().to_string())
    }
}

impl ToFieldValue for Status {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::new(*self, false)
    }
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(ValueRef::Text(
            self.as_str().as_bytes(),
        )))
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse().map_err(|_| invalid_text(text, "status"))
    }
}

#[cfg(test)]
mod tests {
    use super::Status;

    #[test]
    fn status_text_round_trips() {
        for status in Status::ALL {
            assert_eq!(status.as_str().parse::<Status>(), Ok(status));
        }
        assert!("archived".parse::<Status>().is_err());
    }
}
