//! Wire encoding for callable payloads.
//!
//! Values travel as plain JSON except 64-bit integers, which are wrapped in the protobuf
//! `Int64Value` envelope so that their magnitude survives JSON number handling on either side.

use serde_json::{Map, Number, Value as JsonValue};

use crate::functions::error::{decoding_error, invalid_argument, FunctionsResult};
use crate::functions::value::{number_to_value, CallableValue};

pub(crate) const LONG_TYPE: &str = "type.googleapis.com/google.protobuf.Int64Value";
pub(crate) const UNSIGNED_LONG_TYPE: &str = "type.googleapis.com/google.protobuf.UInt64Value";

const TYPE_KEY: &str = "@type";
const VALUE_KEY: &str = "value";

/// Encodes a value into its JSON wire form.
///
/// Non-finite doubles have no JSON representation and are rejected.
pub fn encode(value: &CallableValue) -> FunctionsResult<JsonValue> {
    let encoded = match value {
        CallableValue::Null => JsonValue::Null,
        CallableValue::Bool(flag) => JsonValue::Bool(*flag),
        CallableValue::Int(number) => JsonValue::from(*number),
        CallableValue::Long(number) => {
            let mut wrapper = Map::new();
            wrapper.insert(TYPE_KEY.into(), JsonValue::String(LONG_TYPE.into()));
            wrapper.insert(VALUE_KEY.into(), JsonValue::String(number.to_string()));
            JsonValue::Object(wrapper)
        }
        CallableValue::Double(number) => Number::from_f64(*number)
            .map(JsonValue::Number)
            .ok_or_else(|| {
                invalid_argument(format!("Cannot encode non-finite number {number}"))
            })?,
        CallableValue::String(text) => JsonValue::String(text.clone()),
        CallableValue::Array(values) => JsonValue::Array(
            values
                .iter()
                .map(encode)
                .collect::<FunctionsResult<Vec<_>>>()?,
        ),
        CallableValue::Map(entries) => {
            let mut object = Map::with_capacity(entries.len());
            for (key, entry) in entries {
                object.insert(key.clone(), encode(entry)?);
            }
            JsonValue::Object(object)
        }
    };
    Ok(encoded)
}

/// Decodes the JSON wire form back into a [`CallableValue`].
///
/// Objects carrying a known `@type` wrapper decode to `Long`; objects with any other `@type` are
/// kept as ordinary maps.
pub fn decode(json: &JsonValue) -> FunctionsResult<CallableValue> {
    let decoded = match json {
        JsonValue::Null => CallableValue::Null,
        JsonValue::Bool(flag) => CallableValue::Bool(*flag),
        JsonValue::Number(number) => number_to_value(number),
        JsonValue::String(text) => CallableValue::String(text.clone()),
        JsonValue::Array(values) => CallableValue::Array(
            values
                .iter()
                .map(decode)
                .collect::<FunctionsResult<Vec<_>>>()?,
        ),
        JsonValue::Object(object) => {
            if let Some(long) = decode_wrapped_long(object)? {
                return Ok(long);
            }
            let mut entries = std::collections::BTreeMap::new();
            for (key, entry) in object {
                entries.insert(key.clone(), decode(entry)?);
            }
            CallableValue::Map(entries)
        }
    };
    Ok(decoded)
}

fn decode_wrapped_long(object: &Map<String, JsonValue>) -> FunctionsResult<Option<CallableValue>> {
    let Some(JsonValue::String(type_name)) = object.get(TYPE_KEY) else {
        return Ok(None);
    };
    if type_name != LONG_TYPE && type_name != UNSIGNED_LONG_TYPE {
        return Ok(None);
    }

    let raw = match object.get(VALUE_KEY) {
        Some(JsonValue::String(raw)) => raw,
        _ => {
            return Err(decoding_error(format!(
                "Data cannot be decoded from JSON: {type_name} wrapper without a string value"
            )))
        }
    };

    if type_name == LONG_TYPE {
        raw.parse::<i64>()
            .map(|value| Some(CallableValue::Long(value)))
            .map_err(|err| decoding_error(format!("Invalid Int64Value `{raw}`: {err}")))
    } else {
        let unsigned = raw
            .parse::<u64>()
            .map_err(|err| decoding_error(format!("Invalid UInt64Value `{raw}`: {err}")))?;
        i64::try_from(unsigned)
            .map(|value| Some(CallableValue::Long(value)))
            .map_err(|_| decoding_error(format!("UInt64Value `{raw}` does not fit in a long")))
    }
}
