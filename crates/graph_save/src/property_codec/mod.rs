// ---------------------------------------------------------------------------
// Property Codec: one reflected field <-> its textual encoding
// ---------------------------------------------------------------------------
//
// ## Wire forms
//
// ```text
//   scalar        42 | 3.14 | True | Hello | EnumVariant
//   time          delta from the elapsed clock (0 = never set)
//   struct        (field1=value1,field2=(inner=1),name="a, b")
//   nested array  (e1,e2,e3)
//   nested map    ((k1,v1),(k2,v2))
//   object        ![Global]:<i> | !<level>:<i> | <native path> | None
//   soft object   ![SoftObject]:<path> | None
// ```
//
// Top-level arrays and maps are not encoded here: `custom_capture` stores
// them element by element so their delimiters never collide.
//
// Decode failures are `FieldIssue`s. Callers log them and leave the field at
// its previous value; they never abort a restore.

mod native_text;
mod reference_token;
mod saved_time;
mod struct_text;

use std::fmt;

use bevy::prelude::*;

use crate::host_world::{HostWorld, ObjectId};
use crate::reflect::{FieldType, FieldValue, StructSchema};

pub use native_text::NONE_TEXT;
pub use reference_token::{RefToken, TokenError, GLOBAL_PREFIX, SOFT_OBJECT_PREFIX};
pub use saved_time::{decode_time, encode_time};

use native_text::*;
use struct_text::*;

// ---------------------------------------------------------------------------
// Field issues
// ---------------------------------------------------------------------------

/// A recoverable problem with a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldIssue {
    /// The live object has no property with the saved name.
    MissingProperty(String),
    Unparsable { text: String, expected: String },
    /// A reference token points past the end of (or at a hole in) an index list.
    IndexOutOfRange { index: u32, global: bool },
    TypeMismatch { expected: String, found: String },
    UnknownEnumVariant { ty: String, variant: String },
    /// A local reference saved in another level.
    ForeignLevel(String),
    FixedArraySize { expected: usize, found: usize },
    UnresolvedPath(String),
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldIssue::MissingProperty(name) => write!(f, "no property \"{name}\""),
            FieldIssue::Unparsable { text, expected } => {
                write!(f, "cannot read \"{text}\" as {expected}")
            }
            FieldIssue::IndexOutOfRange { index, global } => write!(
                f,
                "no object at {} index {index}",
                if *global { "global" } else { "local" }
            ),
            FieldIssue::TypeMismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            FieldIssue::UnknownEnumVariant { ty, variant } => {
                write!(f, "\"{variant}\" is not a variant of {ty}")
            }
            FieldIssue::ForeignLevel(token) => {
                write!(f, "reference \"{token}\" belongs to another level")
            }
            FieldIssue::FixedArraySize { expected, found } => {
                write!(f, "saved {found} elements for an array of {expected}")
            }
            FieldIssue::UnresolvedPath(path) => write!(f, "no object at path \"{path}\""),
        }
    }
}

// ---------------------------------------------------------------------------
// Contexts
// ---------------------------------------------------------------------------

/// Turns a live object into a reference token, registering it in the save
/// graph when it is eligible. `None` falls back to native path text.
pub trait ReferenceEncoder {
    fn encode_reference(&mut self, world: &dyn HostWorld, object: ObjectId) -> Option<RefToken>;
}

/// Resolves an index from a reference token against the lists being rebuilt.
pub trait ReferenceDecoder {
    fn resolve(&self, index: u32, global: bool) -> Option<ObjectId>;
}

pub struct EncodeContext<'a> {
    /// Elapsed-time clock at save.
    pub elapsed: f64,
    /// Absent in simple-properties mode.
    pub refs: Option<&'a mut dyn ReferenceEncoder>,
}

impl<'a> EncodeContext<'a> {
    pub fn simple(elapsed: f64) -> Self {
        Self {
            elapsed,
            refs: None,
        }
    }

    pub fn with_refs(elapsed: f64, refs: &'a mut dyn ReferenceEncoder) -> Self {
        Self {
            elapsed,
            refs: Some(refs),
        }
    }
}

pub struct DecodeContext<'a> {
    /// Elapsed-time clock at restore.
    pub elapsed: f64,
    /// Level whose local references are accepted.
    pub level_name: &'a str,
    pub refs: Option<&'a dyn ReferenceDecoder>,
}

impl<'a> DecodeContext<'a> {
    pub fn simple(elapsed: f64) -> Self {
        Self {
            elapsed,
            level_name: "",
            refs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encode a single top-level value.
pub fn encode_value(
    world: &dyn HostWorld,
    ty: &FieldType,
    value: &FieldValue,
    cx: &mut EncodeContext<'_>,
) -> Result<String, FieldIssue> {
    encode_text(world, ty, value, cx, false)
}

fn encode_text(
    world: &dyn HostWorld,
    ty: &FieldType,
    value: &FieldValue,
    cx: &mut EncodeContext<'_>,
    nested: bool,
) -> Result<String, FieldIssue> {
    match (ty, value) {
        (FieldType::Bool, FieldValue::Bool(b)) => Ok(export_bool(*b).to_string()),
        (FieldType::Int, FieldValue::Int(i)) => Ok(export_int(*i)),
        (FieldType::Float, FieldValue::Float(v)) => Ok(export_float(*v)),
        (FieldType::Str, FieldValue::Str(s)) | (FieldType::Name, FieldValue::Name(s)) => {
            if nested && ty.is_textual() {
                Ok(quote(s))
            } else {
                Ok(s.clone())
            }
        }
        (FieldType::Enum { .. }, FieldValue::Enum(variant)) => Ok(variant.clone()),
        (FieldType::Time, FieldValue::Time(t)) => Ok(export_float(encode_time(*t, cx.elapsed))),
        (FieldType::Struct(schema), FieldValue::Struct(_)) => {
            encode_struct(world, schema, value, cx)
        }
        (
            FieldType::Array(elem) | FieldType::FixedArray(elem, _),
            FieldValue::Array(items),
        ) => {
            let parts = items
                .iter()
                .map(|item| encode_text(world, elem, item, cx, true))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(wrap_parens(parts))
        }
        (FieldType::Map(key_ty, value_ty), FieldValue::Map(entries)) => {
            let mut parts = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                let k = encode_text(world, key_ty, k, cx, true)?;
                let v = encode_text(world, value_ty, v, cx, true)?;
                parts.push(wrap_parens([k, v]));
            }
            Ok(wrap_parens(parts))
        }
        (FieldType::Object { .. }, FieldValue::Object(None)) => Ok(NONE_TEXT.to_string()),
        (FieldType::Object { .. }, FieldValue::Object(Some(id))) => {
            Ok(encode_object(world, *id, cx))
        }
        (FieldType::SoftObject { .. }, FieldValue::SoftObject(path)) => {
            if path.is_empty() {
                Ok(NONE_TEXT.to_string())
            } else {
                Ok(RefToken::Soft(path.clone()).to_string())
            }
        }
        _ => Err(FieldIssue::TypeMismatch {
            expected: ty.describe(),
            found: value.kind_name().to_string(),
        }),
    }
}

fn encode_struct(
    world: &dyn HostWorld,
    schema: &StructSchema,
    value: &FieldValue,
    cx: &mut EncodeContext<'_>,
) -> Result<String, FieldIssue> {
    let mut parts = Vec::new();
    for field in schema.saved_fields() {
        let Some(member) = value.member(&field.name) else {
            continue;
        };
        let text = encode_text(world, &field.ty, member, cx, true)?;
        parts.push(format!("{}={}", field.name, text));
    }
    Ok(wrap_parens(parts))
}

fn encode_object(world: &dyn HostWorld, id: ObjectId, cx: &mut EncodeContext<'_>) -> String {
    if let Some(refs) = cx.refs.as_deref_mut() {
        if let Some(token) = refs.encode_reference(world, id) {
            return token.to_string();
        }
    }
    world.object_path(id)
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decode a single top-level value. `base` is the live value, used to keep
/// struct members the text does not mention.
pub fn decode_value(
    world: &dyn HostWorld,
    ty: &FieldType,
    text: &str,
    base: Option<&FieldValue>,
    cx: &DecodeContext<'_>,
) -> Result<FieldValue, FieldIssue> {
    decode_text(world, ty, text, base, cx, false)
}

fn decode_text(
    world: &dyn HostWorld,
    ty: &FieldType,
    text: &str,
    base: Option<&FieldValue>,
    cx: &DecodeContext<'_>,
    nested: bool,
) -> Result<FieldValue, FieldIssue> {
    let unparsable = || FieldIssue::Unparsable {
        text: text.to_string(),
        expected: ty.describe(),
    };
    match ty {
        FieldType::Bool => import_bool(text).map(FieldValue::Bool).ok_or_else(unparsable),
        FieldType::Int => import_int(text).map(FieldValue::Int).ok_or_else(unparsable),
        FieldType::Float => import_float(text).map(FieldValue::Float).ok_or_else(unparsable),
        FieldType::Str | FieldType::Name => {
            let s = if nested {
                unquote(text)
            } else {
                text.to_string()
            };
            Ok(match ty {
                FieldType::Name => FieldValue::Name(s),
                _ => FieldValue::Str(s),
            })
        }
        FieldType::Enum { name, variants } => {
            let variant = text.trim();
            if variants.iter().any(|v| v == variant) {
                Ok(FieldValue::Enum(variant.to_string()))
            } else {
                Err(FieldIssue::UnknownEnumVariant {
                    ty: name.clone(),
                    variant: variant.to_string(),
                })
            }
        }
        FieldType::Time => import_float(text)
            .map(|delta| FieldValue::Time(decode_time(delta, cx.elapsed)))
            .ok_or_else(unparsable),
        FieldType::Struct(schema) => decode_struct(world, schema, text, base, cx),
        FieldType::Array(elem) => {
            let inner = unwrap_parens(text).ok_or_else(unparsable)?;
            decode_elements(world, elem, inner, cx).map(FieldValue::Array)
        }
        FieldType::FixedArray(elem, len) => {
            let inner = unwrap_parens(text).ok_or_else(unparsable)?;
            let items = decode_elements(world, elem, inner, cx)?;
            if items.len() != *len {
                return Err(FieldIssue::FixedArraySize {
                    expected: *len,
                    found: items.len(),
                });
            }
            Ok(FieldValue::Array(items))
        }
        FieldType::Map(key_ty, value_ty) => {
            let inner = unwrap_parens(text).ok_or_else(unparsable)?;
            let mut entries = Vec::new();
            for pair in split_top_level(inner) {
                let pair_inner = unwrap_parens(pair).ok_or_else(unparsable)?;
                let halves = split_top_level(pair_inner);
                let [k, v] = halves.as_slice() else {
                    return Err(unparsable());
                };
                entries.push((
                    decode_text(world, key_ty, k, None, cx, true)?,
                    decode_text(world, value_ty, v, None, cx, true)?,
                ));
            }
            Ok(FieldValue::Map(entries))
        }
        FieldType::Object { class } => decode_object(world, class, text, cx),
        FieldType::SoftObject { .. } => decode_soft_object(text, cx),
    }
}

fn decode_elements(
    world: &dyn HostWorld,
    elem: &FieldType,
    inner: &str,
    cx: &DecodeContext<'_>,
) -> Result<Vec<FieldValue>, FieldIssue> {
    split_top_level(inner)
        .into_iter()
        .map(|part| decode_text(world, elem, part, None, cx, true))
        .collect()
}

fn decode_struct(
    world: &dyn HostWorld,
    schema: &StructSchema,
    text: &str,
    base: Option<&FieldValue>,
    cx: &DecodeContext<'_>,
) -> Result<FieldValue, FieldIssue> {
    let entries = parse_struct(text).ok_or_else(|| FieldIssue::Unparsable {
        text: text.to_string(),
        expected: format!("struct {}", schema.name),
    })?;

    let mut result = match base {
        Some(value @ FieldValue::Struct(_)) => value.clone(),
        _ => schema.default_value(),
    };

    for (key, member_text) in entries {
        let Some(field) = schema.field(key) else {
            warn!(
                "Failing to restore key \"{}\" value \"{}\" in struct \"{}\"",
                key, member_text, schema.name
            );
            continue;
        };
        let decoded = decode_text(world, &field.ty, member_text, result.member(key), cx, true);
        match decoded {
            Ok(value) => result.set_member(key, value),
            Err(issue) => warn!(
                "Struct \"{}\" member \"{}\" skipped: {}",
                schema.name, key, issue
            ),
        }
    }
    Ok(result)
}

fn resolve_index(
    world: &dyn HostWorld,
    index: u32,
    global: bool,
    cx: &DecodeContext<'_>,
) -> Result<ObjectId, FieldIssue> {
    cx.refs
        .and_then(|refs| refs.resolve(index, global))
        .filter(|id| world.is_valid(*id))
        .ok_or(FieldIssue::IndexOutOfRange { index, global })
}

fn decode_object(
    world: &dyn HostWorld,
    class: &str,
    text: &str,
    cx: &DecodeContext<'_>,
) -> Result<FieldValue, FieldIssue> {
    let text = text.trim();
    if text.is_empty() || text == NONE_TEXT {
        return Ok(FieldValue::Object(None));
    }

    let id = match RefToken::parse(text, cx.level_name) {
        Ok(Some(RefToken::Global(index))) => resolve_index(world, index, true, cx)?,
        Ok(Some(RefToken::Local { index, .. })) => resolve_index(world, index, false, cx)?,
        Ok(Some(RefToken::Soft(path))) => world
            .find_by_path(&path)
            .ok_or(FieldIssue::UnresolvedPath(path))?,
        Ok(None) => world
            .find_by_path(text)
            .ok_or_else(|| FieldIssue::UnresolvedPath(text.to_string()))?,
        Err(TokenError::ForeignLevel(token)) => return Err(FieldIssue::ForeignLevel(token)),
        Err(TokenError::BadIndex(_)) => {
            return Err(FieldIssue::Unparsable {
                text: text.to_string(),
                expected: format!("object {class}"),
            })
        }
    };

    let found = world.class_of(id).unwrap_or_default();
    if !world.schema().is_a(&found, class) {
        return Err(FieldIssue::TypeMismatch {
            expected: class.to_string(),
            found,
        });
    }
    Ok(FieldValue::Object(Some(id)))
}

fn decode_soft_object(text: &str, cx: &DecodeContext<'_>) -> Result<FieldValue, FieldIssue> {
    let text = text.trim();
    if text.is_empty() || text == NONE_TEXT {
        return Ok(FieldValue::SoftObject(String::new()));
    }
    match RefToken::parse(text, cx.level_name) {
        Ok(Some(RefToken::Soft(path))) => Ok(FieldValue::SoftObject(path)),
        Ok(None) => Ok(FieldValue::SoftObject(text.to_string())),
        Ok(Some(other)) => Err(FieldIssue::TypeMismatch {
            expected: "soft object path".to_string(),
            found: other.to_string(),
        }),
        Err(_) => Err(FieldIssue::Unparsable {
            text: text.to_string(),
            expected: "soft object path".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests_codec;
