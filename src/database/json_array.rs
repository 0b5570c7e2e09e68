//! JSON-array column codec.
//!
//! Ordered lists (ingredients, directions) live in a single TEXT column as a
//! serialized JSON array. `None` maps to SQL `NULL`, so "never set" and
//! "empty list" stay distinguishable: an empty list is stored as `[]`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{Sqlite, SqliteTypeInfo};
use sqlx::{Database, Decode, Encode, Type, TypeInfo, ValueRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonArray<T>(Option<Vec<T>>);

impl<T> JsonArray<T> {
    pub fn new(items: Vec<T>) -> Self {
        JsonArray(Some(items))
    }

    pub fn null() -> Self {
        JsonArray(None)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    pub fn as_deref(&self) -> Option<&[T]> {
        self.0.as_deref()
    }

    pub fn into_inner(self) -> Option<Vec<T>> {
        self.0
    }
}

impl<T> Default for JsonArray<T> {
    fn default() -> Self {
        JsonArray(None)
    }
}

impl<T> From<Vec<T>> for JsonArray<T> {
    fn from(items: Vec<T>) -> Self {
        JsonArray::new(items)
    }
}

impl<T> From<Option<Vec<T>>> for JsonArray<T> {
    fn from(items: Option<Vec<T>>) -> Self {
        JsonArray(items)
    }
}

impl<T: Serialize> JsonArray<T> {
    /// Serialized column value, `None` for SQL `NULL`.
    pub fn to_json(&self) -> Result<Option<String>, serde_json::Error> {
        self.0.as_ref().map(serde_json::to_string).transpose()
    }
}

impl<T: DeserializeOwned> JsonArray<T> {
    /// Inverse of [`JsonArray::to_json`]. Malformed content is an error, never an empty list.
    pub fn from_json(raw: Option<&[u8]>) -> Result<Self, serde_json::Error> {
        match raw {
            None => Ok(JsonArray(None)),
            Some(bytes) => serde_json::from_slice(bytes).map(|items| JsonArray(Some(items))),
        }
    }
}

impl<T> Type<Sqlite> for JsonArray<T> {
    fn type_info() -> SqliteTypeInfo {
        <str as Type<Sqlite>>::type_info()
    }

    // Storage class is checked in `decode` so the codec reports the failure itself.
    fn compatible(_ty: &SqliteTypeInfo) -> bool {
        true
    }
}

impl<'q, T: Serialize> Encode<'q, Sqlite> for JsonArray<T> {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, BoxDynError> {
        match self.to_json()? {
            Some(json) => <String as Encode<'q, Sqlite>>::encode(json, buf),
            None => Ok(IsNull::Yes),
        }
    }
}

impl<'r, T: DeserializeOwned> Decode<'r, Sqlite> for JsonArray<T> {
    fn decode(value: <Sqlite as Database>::ValueRef<'r>) -> Result<Self, BoxDynError> {
        if value.is_null() {
            return Ok(JsonArray(None));
        }

        let is_text = match value.type_info().name() {
            "TEXT" => true,
            "BLOB" => false,
            other => {
                return Err(format!("cannot decode {} value into a JSON array", other).into())
            }
        };

        let parsed = if is_text {
            let text = <&str as Decode<'r, Sqlite>>::decode(value)?;
            JsonArray::from_json(Some(text.as_bytes()))?
        } else {
            let bytes = <&[u8] as Decode<'r, Sqlite>>::decode(value)?;
            JsonArray::from_json(Some(bytes))?
        };

        Ok(parsed)
    }
}
