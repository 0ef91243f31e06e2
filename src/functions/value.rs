use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Number, Value as JsonValue};

/// JSON-like value exchanged with a callable Cloud Function.
///
/// Unlike `serde_json::Value`, 32-bit and 64-bit integers are distinct variants so that a `Long`
/// argument keeps its width through the wire encoding (see [`crate::functions::serializer`]).
#[derive(Clone, Debug, PartialEq, Default)]
pub enum CallableValue {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    Array(Vec<CallableValue>),
    Map(BTreeMap<String, CallableValue>),
}

impl CallableValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CallableValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CallableValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            CallableValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the integer payload of either integer variant.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CallableValue::Int(value) => Some(i64::from(*value)),
            CallableValue::Long(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CallableValue::Int(value) => Some(f64::from(*value)),
            CallableValue::Long(value) => Some(*value as f64),
            CallableValue::Double(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CallableValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[CallableValue]> {
        match self {
            CallableValue::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, CallableValue>> {
        match self {
            CallableValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Looks up a key when the value is a map.
    pub fn get(&self, key: &str) -> Option<&CallableValue> {
        self.as_map().and_then(|entries| entries.get(key))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            CallableValue::Null => "null",
            CallableValue::Bool(_) => "bool",
            CallableValue::Int(_) => "int",
            CallableValue::Long(_) => "long",
            CallableValue::Double(_) => "double",
            CallableValue::String(_) => "string",
            CallableValue::Array(_) => "array",
            CallableValue::Map(_) => "map",
        }
    }

    /// Builds a map value from `(key, value)` pairs.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CallableValue>,
    {
        CallableValue::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Lossy view as plain JSON; `Long` becomes a JSON number.
    ///
    /// Used to hand values to serde for typed responses. The wire encoding lives in the
    /// serializer module.
    pub fn to_json(&self) -> JsonValue {
        match self {
            CallableValue::Null => JsonValue::Null,
            CallableValue::Bool(value) => JsonValue::Bool(*value),
            CallableValue::Int(value) => JsonValue::from(*value),
            CallableValue::Long(value) => JsonValue::from(*value),
            CallableValue::Double(value) => Number::from_f64(*value)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            CallableValue::String(value) => JsonValue::String(value.clone()),
            CallableValue::Array(values) => {
                JsonValue::Array(values.iter().map(CallableValue::to_json).collect())
            }
            CallableValue::Map(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for CallableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Plain JSON integers narrow to `Int` when they fit in 32 bits.
impl From<JsonValue> for CallableValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => CallableValue::Null,
            JsonValue::Bool(flag) => CallableValue::Bool(flag),
            JsonValue::Number(number) => number_to_value(&number),
            JsonValue::String(text) => CallableValue::String(text),
            JsonValue::Array(values) => {
                CallableValue::Array(values.into_iter().map(CallableValue::from).collect())
            }
            JsonValue::Object(entries) => CallableValue::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, CallableValue::from(value)))
                    .collect(),
            ),
        }
    }
}

pub(crate) fn number_to_value(number: &Number) -> CallableValue {
    if let Some(value) = number.as_i64() {
        return match i32::try_from(value) {
            Ok(narrow) => CallableValue::Int(narrow),
            Err(_) => CallableValue::Long(value),
        };
    }
    if let Some(value) = number.as_u64() {
        if let Ok(value) = i64::try_from(value) {
            return CallableValue::Long(value);
        }
    }
    CallableValue::Double(number.as_f64().unwrap_or(f64::NAN))
}

impl From<bool> for CallableValue {
    fn from(value: bool) -> Self {
        CallableValue::Bool(value)
    }
}

impl From<i32> for CallableValue {
    fn from(value: i32) -> Self {
        CallableValue::Int(value)
    }
}

impl From<i64> for CallableValue {
    fn from(value: i64) -> Self {
        CallableValue::Long(value)
    }
}

impl From<f64> for CallableValue {
    fn from(value: f64) -> Self {
        CallableValue::Double(value)
    }
}

impl From<&str> for CallableValue {
    fn from(value: &str) -> Self {
        CallableValue::String(value.to_owned())
    }
}

impl From<String> for CallableValue {
    fn from(value: String) -> Self {
        CallableValue::String(value)
    }
}

impl<T> From<Option<T>> for CallableValue
where
    T: Into<CallableValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CallableValue::Null)
    }
}

impl<T> From<Vec<T>> for CallableValue
where
    T: Into<CallableValue>,
{
    fn from(values: Vec<T>) -> Self {
        CallableValue::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<V> From<BTreeMap<String, V>> for CallableValue
where
    V: Into<CallableValue>,
{
    fn from(entries: BTreeMap<String, V>) -> Self {
        CallableValue::map(entries)
    }
}

impl From<()> for CallableValue {
    fn from(_: ()) -> Self {
        CallableValue::Null
    }
}
