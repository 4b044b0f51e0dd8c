//! Port Types - typed input/output declarations
//!
//! A port is either a *value* (small, passed inline as a canonical string)
//! or an *artifact* (file-backed, passed by path). The `data_type` tag is
//! what producer/consumer compatibility is checked against: built-ins must
//! match exactly, opaque tags compare by string equality.

use std::fmt;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// How data crosses the port boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    /// Small inline data, exchanged as a canonical string
    Value,
    /// File-backed data, exchanged by path
    Artifact,
}

/// Declared data type of a port
///
/// Built-ins carry a canonical codec; anything else is an opaque tag used
/// only for producer/consumer compatibility checks (e.g. a model format).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Integer,
    Float,
    Boolean,
    List,
    Mapping,
    Opaque(String),
}

impl DataType {
    /// The type tag string used for compatibility checks and manifests
    pub fn tag(&self) -> &str {
        match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::Boolean => "boolean",
            DataType::List => "list",
            DataType::Mapping => "mapping",
            DataType::Opaque(tag) => tag,
        }
    }

    /// Parse a type tag: recognized built-ins map to their variant,
    /// anything else becomes an opaque tag.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "string" => DataType::String,
            "integer" => DataType::Integer,
            "float" => DataType::Float,
            "boolean" => DataType::Boolean,
            "list" => DataType::List,
            "mapping" => DataType::Mapping,
            other => DataType::Opaque(other.to_string()),
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, DataType::Opaque(_))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(DataType::from_tag(&tag))
    }
}

/// A single declared input or output of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub kind: PortKind,
    pub data_type: DataType,
    /// Optional inputs may be left unbound even without a default
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    /// Default in canonical string form, used when the input is unbound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Port {
    /// Declare a value port
    pub fn value(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            kind: PortKind::Value,
            data_type,
            optional: false,
            default: None,
        }
    }

    /// Declare an artifact port
    pub fn artifact(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            kind: PortKind::Artifact,
            data_type,
            optional: false,
            default: None,
        }
    }

    /// Attach a default (canonical string form); a defaulted port is not required
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Mark the port optional (may stay unbound without a default)
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Name shown to pipeline authors: a trailing `_path`/`_file` suffix is
    /// stripped (`numbers_path` surfaces as `numbers`). Presentation only -
    /// the raw name stays the identity used for dependency resolution and
    /// inside the unit's own argument maps.
    pub fn display_name(&self) -> &str {
        for suffix in ["_path", "_file"] {
            if let Some(stripped) = self.name.strip_suffix(suffix) {
                if !stripped.is_empty() {
                    return stripped;
                }
            }
        }
        &self.name
    }

    /// Match an author-facing name against this port (raw or display name)
    pub fn matches_name(&self, name: &str) -> bool {
        name == self.name || name == self.display_name()
    }

    /// A port must be bound unless it is optional or carries a default
    pub fn required(&self) -> bool {
        !self.optional && self.default.is_none()
    }
}
