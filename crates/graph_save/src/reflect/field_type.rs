use super::FieldValue;

/// The reflected type of a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Bool,
    Int,
    Float,
    Str,
    Name,
    Enum { name: String, variants: Vec<String> },
    /// Absolute game time, saved relative to the elapsed-time baseline.
    Time,
    Struct(StructSchema),
    Array(Box<FieldType>),
    /// C-style `field[N]`: same wire form as `Array`, decoded positionally.
    FixedArray(Box<FieldType>, usize),
    Map(Box<FieldType>, Box<FieldType>),
    /// Hard reference to another object of (a subclass of) `class`.
    Object { class: String },
    /// Deferred asset reference stored as a path.
    SoftObject { class: String },
}

impl FieldType {
    pub fn array(elem: FieldType) -> Self {
        FieldType::Array(Box::new(elem))
    }

    pub fn fixed_array(elem: FieldType, len: usize) -> Self {
        FieldType::FixedArray(Box::new(elem), len)
    }

    pub fn map(key: FieldType, value: FieldType) -> Self {
        FieldType::Map(Box::new(key), Box::new(value))
    }

    pub fn object(class: impl Into<String>) -> Self {
        FieldType::Object {
            class: class.into(),
        }
    }

    pub fn soft_object(class: impl Into<String>) -> Self {
        FieldType::SoftObject {
            class: class.into(),
        }
    }

    pub fn enumeration(name: impl Into<String>, variants: &[&str]) -> Self {
        FieldType::Enum {
            name: name.into(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Plain data that never takes part in the object-graph reference system.
    ///
    /// Soft references count as simple: they are stored as asset paths.
    pub fn is_simple(&self) -> bool {
        match self {
            FieldType::Object { .. } => false,
            FieldType::Struct(schema) => schema.fields.iter().all(|f| f.ty.is_simple()),
            FieldType::Array(elem) | FieldType::FixedArray(elem, _) => elem.is_simple(),
            FieldType::Map(k, v) => k.is_simple() && v.is_simple(),
            _ => true,
        }
    }

    /// Strings and names are quoted when nested inside struct or container text.
    pub(crate) fn is_textual(&self) -> bool {
        matches!(self, FieldType::Str | FieldType::Name)
    }

    /// Short name used in log messages.
    pub fn describe(&self) -> String {
        match self {
            FieldType::Bool => "bool".into(),
            FieldType::Int => "int".into(),
            FieldType::Float => "float".into(),
            FieldType::Str => "string".into(),
            FieldType::Name => "name".into(),
            FieldType::Enum { name, .. } => format!("enum {name}"),
            FieldType::Time => "time".into(),
            FieldType::Struct(s) => format!("struct {}", s.name),
            FieldType::Array(e) => format!("array<{}>", e.describe()),
            FieldType::FixedArray(e, n) => format!("{}[{n}]", e.describe()),
            FieldType::Map(k, v) => format!("map<{}, {}>", k.describe(), v.describe()),
            FieldType::Object { class } => format!("object {class}"),
            FieldType::SoftObject { class } => format!("soft object {class}"),
        }
    }

    /// The value a freshly constructed field of this type holds.
    pub fn default_value(&self) -> FieldValue {
        match self {
            FieldType::Bool => FieldValue::Bool(false),
            FieldType::Int => FieldValue::Int(0),
            FieldType::Float => FieldValue::Float(0.0),
            FieldType::Str => FieldValue::Str(String::new()),
            FieldType::Name => FieldValue::Name(String::new()),
            FieldType::Enum { variants, .. } => {
                FieldValue::Enum(variants.first().cloned().unwrap_or_default())
            }
            FieldType::Time => FieldValue::Time(0.0),
            FieldType::Struct(schema) => schema.default_value(),
            FieldType::Array(_) => FieldValue::Array(Vec::new()),
            FieldType::FixedArray(elem, n) => {
                FieldValue::Array((0..*n).map(|_| elem.default_value()).collect())
            }
            FieldType::Map(_, _) => FieldValue::Map(Vec::new()),
            FieldType::Object { .. } => FieldValue::Object(None),
            FieldType::SoftObject { .. } => FieldValue::SoftObject(String::new()),
        }
    }
}

/// Field table of a reflected struct type.
#[derive(Debug, Clone, PartialEq)]
pub struct StructSchema {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl StructSchema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Fields written into struct text. A struct with no save-flagged
    /// fields saves every field.
    pub fn saved_fields(&self) -> Vec<&FieldDescriptor> {
        let flagged: Vec<&FieldDescriptor> = self.fields.iter().filter(|f| f.save_game).collect();
        if flagged.is_empty() {
            self.fields.iter().collect()
        } else {
            flagged
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn default_value(&self) -> FieldValue {
        FieldValue::Struct(
            self.fields
                .iter()
                .map(|f| (f.name.clone(), f.ty.default_value()))
                .collect(),
        )
    }
}

/// One reflected field of a class or struct.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: FieldType,
    /// Opt-in save flag. Only flagged class fields are captured.
    pub save_game: bool,
    /// Declared by an engine-native class rather than game content.
    pub native: bool,
}

impl FieldDescriptor {
    /// A save-eligible field.
    pub fn saved(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            save_game: true,
            native: false,
        }
    }

    /// A field that exists on the type but is not captured.
    pub fn transient(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            save_game: false,
            native: false,
        }
    }

    pub fn native(mut self) -> Self {
        self.native = true;
        self
    }
}
