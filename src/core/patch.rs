//! Purpose: Explicit three-state value for partial updates.
//! Exports: `Field`.
//! Role: Lets update payloads tell "key omitted" apart from "key set to null".
//! Invariants: A missing JSON key deserializes to `Unchanged` (via `#[serde(default)]`).
//! Invariants: JSON `null` deserializes to `Null`; any other value to `Value`.
//! Invariants: `Unchanged` fields are skipped when serializing; `Null` is sent as null.
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Field<T> {
    Unchanged,
    Null,
    Value(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Unchanged
    }
}

impl<T> Field<T> {
    /// `Some(v)` becomes `Value(v)`, `None` becomes an explicit `Null`.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(value) => Field::Value(value),
            None => Field::Null,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Field::Unchanged)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Field::Unchanged => Field::Unchanged,
            Field::Null => Field::Null,
            Field::Value(value) => Field::Value(f(value)),
        }
    }

    /// Outer `None` means unchanged; `Some(None)` means cleared.
    pub fn into_option(self) -> Option<Option<T>> {
        match self {
            Field::Unchanged => None,
            Field::Null => Some(None),
            Field::Value(value) => Some(Some(value)),
        }
    }
}

impl<'de, T> Deserialize<'de> for Field<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Field::from_option)
    }
}

impl<T> Serialize for Field<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Field::Value(value) => serializer.serialize_some(value),
            Field::Unchanged | Field::Null => serializer.serialize_none(),
        }
    }
}
