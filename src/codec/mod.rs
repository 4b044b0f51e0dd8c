//! Value Codecs - canonical string forms for value ports
//!
//! Every value port travels between tasks as a string. The codec table fixes
//! one canonical form per built-in type, resolved at component registration
//! time rather than dispatched on runtime value shape:
//!
//! | type      | canonical string form                 |
//! |-----------|---------------------------------------|
//! | `string`  | the text itself (no quoting)          |
//! | `integer` | decimal digits, optional leading `-`  |
//! | `float`   | JSON number                           |
//! | `boolean` | `"true"` / `"false"`                  |
//! | `list`    | compact JSON array                    |
//! | `mapping` | compact JSON object                   |
//!
//! Opaque type tags have no built-in codec; a value port with an opaque type
//! is an authoring error unless the author registers a custom codec here.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::component::DataType;
use crate::error::{ConveyorError, Result};

/// Encode/decode between typed JSON values and canonical strings.
///
/// Implementations must be pure: the same value always encodes to the same
/// string, and `decode(encode(v)) == v` for values of the declared type.
pub trait ValueCodec: Send + Sync {
    fn encode(&self, value: &Value) -> Result<String>;
    fn decode(&self, raw: &str) -> Result<Value>;
}

/// Static codec table: data type → codec (lock-free)
///
/// `with_builtins()` pre-registers the six built-in types; pipeline authors
/// add codecs for opaque tags via `register`.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: Arc<DashMap<DataType, Arc<dyn ValueCodec>>>,
}

impl CodecRegistry {
    /// Empty registry (no codecs at all, not even built-ins)
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with all built-in codecs pre-registered
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(DataType::String, Arc::new(StringCodec));
        registry.register(DataType::Integer, Arc::new(IntegerCodec));
        registry.register(DataType::Float, Arc::new(FloatCodec));
        registry.register(DataType::Boolean, Arc::new(BooleanCodec));
        registry.register(DataType::List, Arc::new(JsonCodec::list()));
        registry.register(DataType::Mapping, Arc::new(JsonCodec::mapping()));
        registry
    }

    /// Register (or replace) a codec for a data type
    pub fn register(&self, data_type: DataType, codec: Arc<dyn ValueCodec>) {
        self.codecs.insert(data_type, codec);
    }

    /// Look up the codec for a data type
    pub fn get(&self, data_type: &DataType) -> Option<Arc<dyn ValueCodec>> {
        self.codecs.get(data_type).map(|c| Arc::clone(c.value()))
    }

    /// Check whether a codec exists for a data type
    pub fn contains(&self, data_type: &DataType) -> bool {
        self.codecs.contains_key(data_type)
    }

    /// Encode a value with the codec registered for `data_type`
    pub fn encode(&self, data_type: &DataType, value: &Value) -> Result<String> {
        self.get(data_type)
            .ok_or_else(|| missing(data_type))?
            .encode(value)
    }

    /// Decode a canonical string with the codec registered for `data_type`
    pub fn decode(&self, data_type: &DataType, raw: &str) -> Result<Value> {
        self.get(data_type)
            .ok_or_else(|| missing(data_type))?
            .decode(raw)
    }
}

fn missing(data_type: &DataType) -> ConveyorError {
    ConveyorError::Serialization {
        data_type: data_type.tag().to_string(),
        reason: "no codec registered".to_string(),
    }
}

fn bad_value(data_type: &DataType, value: &Value) -> ConveyorError {
    ConveyorError::Serialization {
        data_type: data_type.tag().to_string(),
        reason: format!("value {} does not match the declared type", value),
    }
}

fn bad_raw(data_type: &DataType, raw: &str, detail: impl std::fmt::Display) -> ConveyorError {
    ConveyorError::Serialization {
        data_type: data_type.tag().to_string(),
        reason: format!("cannot decode {:?}: {}", raw, detail),
    }
}

// ═══════════════════════════════════════════════════════════════
// BUILT-IN CODECS
// ═══════════════════════════════════════════════════════════════

/// `string`: the text itself, no quoting
struct StringCodec;

impl ValueCodec for StringCodec {
    fn encode(&self, value: &Value) -> Result<String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(bad_value(&DataType::String, other)),
        }
    }

    fn decode(&self, raw: &str) -> Result<Value> {
        Ok(Value::String(raw.to_string()))
    }
}

/// `integer`: decimal digits
struct IntegerCodec;

impl ValueCodec for IntegerCodec {
    fn encode(&self, value: &Value) -> Result<String> {
        match value.as_i64() {
            Some(n) => Ok(n.to_string()),
            None => Err(bad_value(&DataType::Integer, value)),
        }
    }

    fn decode(&self, raw: &str) -> Result<Value> {
        raw.trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| bad_raw(&DataType::Integer, raw, e))
    }
}

/// `float`: JSON number
struct FloatCodec;

impl ValueCodec for FloatCodec {
    fn encode(&self, value: &Value) -> Result<String> {
        match value.as_f64() {
            Some(_) => Ok(value.to_string()),
            None => Err(bad_value(&DataType::Float, value)),
        }
    }

    fn decode(&self, raw: &str) -> Result<Value> {
        let parsed = raw
            .trim()
            .parse::<f64>()
            .map_err(|e| bad_raw(&DataType::Float, raw, e))?;
        serde_json::Number::from_f64(parsed)
            .map(Value::Number)
            .ok_or_else(|| bad_raw(&DataType::Float, raw, "not a finite number"))
    }
}

/// `boolean`: "true" / "false"
struct BooleanCodec;

impl ValueCodec for BooleanCodec {
    fn encode(&self, value: &Value) -> Result<String> {
        match value {
            Value::Bool(true) => Ok("true".to_string()),
            Value::Bool(false) => Ok("false".to_string()),
            other => Err(bad_value(&DataType::Boolean, other)),
        }
    }

    fn decode(&self, raw: &str) -> Result<Value> {
        match raw.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(bad_raw(&DataType::Boolean, raw, "expected 'true' or 'false'")),
        }
    }
}

/// `list` / `mapping`: compact JSON
struct JsonCodec {
    data_type: DataType,
}

impl JsonCodec {
    fn list() -> Self {
        Self {
            data_type: DataType::List,
        }
    }

    fn mapping() -> Self {
        Self {
            data_type: DataType::Mapping,
        }
    }

    fn shape_ok(&self, value: &Value) -> bool {
        match self.data_type {
            DataType::List => value.is_array(),
            DataType::Mapping => value.is_object(),
            _ => false,
        }
    }
}

impl ValueCodec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<String> {
        if !self.shape_ok(value) {
            return Err(bad_value(&self.data_type, value));
        }
        serde_json::to_string(value).map_err(|e| bad_raw(&self.data_type, "<value>", e))
    }

    fn decode(&self, raw: &str) -> Result<Value> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| bad_raw(&self.data_type, raw, e))?;
        if !self.shape_ok(&value) {
            return Err(bad_raw(&self.data_type, raw, "wrong JSON shape"));
        }
        Ok(value)
    }
}
