use crate::host_world::ObjectId;

/// A live field value read from or written to a host object.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),
    Enum(String),
    Time(f64),
    /// Member values in declaration order.
    Struct(Vec<(String, FieldValue)>),
    Array(Vec<FieldValue>),
    Map(Vec<(FieldValue, FieldValue)>),
    Object(Option<ObjectId>),
    SoftObject(String),
}

impl FieldValue {
    pub fn member(&self, name: &str) -> Option<&FieldValue> {
        match self {
            FieldValue::Struct(members) => members.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Replace (or append) a struct member.
    pub fn set_member(&mut self, name: &str, value: FieldValue) {
        if let FieldValue::Struct(members) = self {
            match members.iter_mut().find(|(n, _)| n == name) {
                Some((_, slot)) => *slot = value,
                None => members.push((name.to_string(), value)),
            }
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) | FieldValue::Time(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            FieldValue::Object(id) => *id,
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Name of the variant, for log messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Str(_) => "string",
            FieldValue::Name(_) => "name",
            FieldValue::Enum(_) => "enum",
            FieldValue::Time(_) => "time",
            FieldValue::Struct(_) => "struct",
            FieldValue::Array(_) => "array",
            FieldValue::Map(_) => "map",
            FieldValue::Object(_) => "object",
            FieldValue::SoftObject(_) => "soft object",
        }
    }
}
