use serde_json::{Map, Value};

use super::api::ServerError;

/// Typed access to the fields of a JSON object. Every accessor fails with a
/// parse error naming the field; `null` counts as absent.
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(field: &str, expected: &str, found: &Value) -> ServerError {
    ServerError::parse(field, format!("expected {}, found {}", expected, kind(found)))
}

fn missing(field: &str) -> ServerError {
    ServerError::parse(field, "missing field")
}

impl<'a> Fields<'a> {
    pub fn of(json: &'a Value) -> Result<Fields<'a>, ServerError> {
        match json {
            Value::Object(map) => Ok(Fields { map }),
            other => Err(mismatch("", "object", other)),
        }
    }

    fn get(&self, field: &str) -> Option<&'a Value> {
        self.map.get(field).filter(|v| !v.is_null())
    }

    pub fn value(&self, field: &str) -> Result<&'a Value, ServerError> {
        self.get(field).ok_or_else(|| missing(field))
    }

    pub fn str(&self, field: &str) -> Result<&'a str, ServerError> {
        self.opt_str(field)?.ok_or_else(|| missing(field))
    }

    pub fn opt_str(&self, field: &str) -> Result<Option<&'a str>, ServerError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(mismatch(field, "string", other)),
        }
    }

    pub fn u64(&self, field: &str) -> Result<u64, ServerError> {
        self.opt_u64(field)?.ok_or_else(|| missing(field))
    }

    pub fn opt_u64(&self, field: &str) -> Result<Option<u64>, ServerError> {
        match self.get(field) {
            None => Ok(None),
            Some(v @ Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| mismatch(field, "non-negative integer", v)),
            Some(other) => Err(mismatch(field, "non-negative integer", other)),
        }
    }

    pub fn bool(&self, field: &str) -> Result<bool, ServerError> {
        match self.get(field) {
            None => Err(missing(field)),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(mismatch(field, "boolean", other)),
        }
    }

    pub fn array(&self, field: &str) -> Result<&'a [Value], ServerError> {
        self.opt_array(field)?.ok_or_else(|| missing(field))
    }

    pub fn opt_array(&self, field: &str) -> Result<Option<&'a [Value]>, ServerError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::Array(a)) => Ok(Some(a.as_slice())),
            Some(other) => Err(mismatch(field, "array", other)),
        }
    }
}

/// Parses every element of `items`, failing on the first bad one with its
/// index in the error path.
pub fn parse_each<T>(
    field: &str,
    items: &[Value],
    parse: impl Fn(&Value) -> Result<T, ServerError>,
) -> Result<Vec<T>, ServerError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse(item).map_err(|e| e.within(&format!("{}[{}]", field, i))))
        .collect()
}

pub fn as_array<'a>(json: &'a Value) -> Result<&'a [Value], ServerError> {
    match json {
        Value::Array(a) => Ok(a.as_slice()),
        other => Err(mismatch("", "array", other)),
    }
}
