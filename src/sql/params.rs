//! Convert serde_json::Value to values sqlx can bind. Everything travels as text and is
//! cast in SQL (`$n::jsonb`, `col::text = $n`), so one parameter type covers every column.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Text(String),
    Json(Value),
}

impl PgBindValue {
    /// Scalar comparison value: strings as-is, numbers and booleans by their JSON text.
    pub fn text(v: &Value) -> Self {
        match v {
            Value::Null => PgBindValue::Null,
            Value::String(s) => PgBindValue::Text(s.clone()),
            other => PgBindValue::Text(other.to_string()),
        }
    }

    /// Whole document, cast to jsonb by the statement.
    pub fn json(v: &Value) -> Self {
        PgBindValue::Json(v.clone())
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            PgBindValue::Null => <Option<&str> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            PgBindValue::Text(s) => <&str as Encode<Postgres>>::encode_by_ref(&s.as_str(), buf)?,
            PgBindValue::Json(v) => {
                let doc = v.to_string();
                <&str as Encode<Postgres>>::encode_by_ref(&doc.as_str(), buf)?
            }
        })
    }
}

impl sqlx::Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}
