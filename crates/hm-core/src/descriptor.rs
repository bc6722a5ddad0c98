//! Parameter descriptors as returned by `getParamsetDescription`

use crate::value::ParamValue;
use bitflags::bitflags;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Float value the controller uses as a "disabled / not set" marker for
/// time-like FLOAT parameters. It lies above the declared maximum of those
/// parameters but is still a legal value to write.
pub const DISABLED_SENTINEL: f64 = 16383000.0;

/// Descriptor table of one paramset, keyed by parameter name
pub type ParamsetDescription = BTreeMap<String, ParameterDescriptor>;

bitflags! {
    /// `OPERATIONS` field of a parameter description
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Operations: u32 {
        const READ = 0x01;
        const WRITE = 0x02;
        const EVENT = 0x04;
    }
}

bitflags! {
    /// `FLAGS` field of a parameter description
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ParameterFlags: u32 {
        const VISIBLE = 0x01;
        const INTERNAL = 0x02;
        /// Writes change the device's behavior in a way the controller
        /// cannot reproduce; never write these.
        const TRANSFORM = 0x04;
        const SERVICE = 0x08;
        const STICKY = 0x10;
    }
}

/// Declared type of a parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParameterType {
    Enum,
    Float,
    Integer,
    Bool,
    String,
    Action,
    Other(String),
}

impl ParameterType {
    /// FLOAT, INTEGER and BOOL parameters are range-checked against MIN/MAX
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ParameterType::Float | ParameterType::Integer | ParameterType::Bool
        )
    }
}

impl From<String> for ParameterType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ENUM" => ParameterType::Enum,
            "FLOAT" => ParameterType::Float,
            "INTEGER" => ParameterType::Integer,
            "BOOL" => ParameterType::Bool,
            "STRING" => ParameterType::String,
            "ACTION" => ParameterType::Action,
            _ => ParameterType::Other(s),
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterType::Enum => f.write_str("ENUM"),
            ParameterType::Float => f.write_str("FLOAT"),
            ParameterType::Integer => f.write_str("INTEGER"),
            ParameterType::Bool => f.write_str("BOOL"),
            ParameterType::String => f.write_str("STRING"),
            ParameterType::Action => f.write_str("ACTION"),
            ParameterType::Other(other) => f.write_str(other),
        }
    }
}

/// Metadata of a single parameter within a paramset
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawDescriptor")]
pub struct ParameterDescriptor {
    pub operations: Operations,
    pub flags: ParameterFlags,
    pub param_type: ParameterType,
    pub min: Option<ParamValue>,
    pub max: Option<ParamValue>,
    /// For ENUM parameters: the list index is the wire value, the entry is
    /// the display value.
    pub value_list: Vec<String>,
    pub default: Option<ParamValue>,
    pub unit: Option<String>,
}

impl ParameterDescriptor {
    /// Create a readable and writable descriptor of the given type
    pub fn new(param_type: ParameterType) -> Self {
        Self {
            operations: Operations::READ | Operations::WRITE,
            flags: ParameterFlags::VISIBLE,
            param_type,
            min: None,
            max: None,
            value_list: Vec::new(),
            default: None,
            unit: None,
        }
    }

    pub fn with_operations(mut self, operations: Operations) -> Self {
        self.operations = operations;
        self
    }

    pub fn with_flags(mut self, flags: ParameterFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_range(mut self, min: impl Into<ParamValue>, max: impl Into<ParamValue>) -> Self {
        self.min = Some(min.into());
        self.max = Some(max.into());
        self
    }

    pub fn with_value_list<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.value_list = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_writable(&self) -> bool {
        self.operations.contains(Operations::WRITE)
    }

    pub fn has_transform_flag(&self) -> bool {
        self.flags.contains(ParameterFlags::TRANSFORM)
    }

    /// Display value of an ENUM wire value
    pub fn enum_label(&self, value: &ParamValue) -> Option<&str> {
        value
            .as_index()
            .and_then(|idx| self.value_list.get(idx))
            .map(String::as_str)
    }
}

/// Shape of the description struct on the wire
#[derive(Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RawDescriptor {
    #[serde(default)]
    operations: u32,
    #[serde(default)]
    flags: u32,
    #[serde(rename = "TYPE")]
    param_type: String,
    #[serde(default)]
    min: Option<ParamValue>,
    #[serde(default)]
    max: Option<ParamValue>,
    #[serde(default)]
    value_list: Vec<String>,
    #[serde(default)]
    default: Option<ParamValue>,
    #[serde(default)]
    unit: Option<String>,
}

impl From<RawDescriptor> for ParameterDescriptor {
    fn from(raw: RawDescriptor) -> Self {
        Self {
            operations: Operations::from_bits_retain(raw.operations),
            flags: ParameterFlags::from_bits_retain(raw.flags),
            param_type: raw.param_type.into(),
            min: raw.min,
            max: raw.max,
            value_list: raw.value_list,
            default: raw.default,
            unit: raw.unit,
        }
    }
}
