// ---------------------------------------------------------------------------
// Custom Data Capture: an object's save-flagged fields <-> PropertyMaps
// ---------------------------------------------------------------------------
//
// Capture walks `SchemaRegistry::save_eligible_fields` (opt-in), encodes each
// live value with the property codec and files it under singles, arrays or
// maps. Apply is the inverse. A field that cannot be restored is logged and
// left at its live value; nothing here ever fails the whole object.
//
// With a save-graph reference encoder in the context, encoding an object
// field may register the referenced object into the graph being built.

use bevy::prelude::*;

use crate::host_world::{HostWorld, ObjectId};
use crate::property_codec::{
    decode_value, encode_value, DecodeContext, EncodeContext, FieldIssue,
};
use crate::reflect::{ClassKind, FieldDescriptor, FieldType, FieldValue};
use crate::save_types::PropertyMaps;

/// Which save-flagged fields take part in a capture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureOptions {
    /// Field names to skip.
    pub exclude: Vec<String>,
    /// Plain data only: scalars, structs of scalars, arrays, maps, soft
    /// references and data-asset references. No graph references.
    pub simple_only: bool,
    /// Skip fields declared by engine-native classes.
    pub ignore_native: bool,
}

impl CaptureOptions {
    pub fn simple() -> Self {
        Self {
            simple_only: true,
            ..Default::default()
        }
    }

    fn accepts(&self, world: &dyn HostWorld, field: &FieldDescriptor) -> bool {
        if self.exclude.iter().any(|name| *name == field.name) {
            return false;
        }
        if self.ignore_native && field.native {
            return false;
        }
        if self.simple_only && !field.ty.is_simple() {
            return is_data_asset_reference(world, &field.ty);
        }
        true
    }
}

fn is_data_asset_reference(world: &dyn HostWorld, ty: &FieldType) -> bool {
    match ty {
        FieldType::Object { class } => world.schema().kind_of(class) == ClassKind::DataAsset,
        _ => false,
    }
}

/// Outcome of applying one object's properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub skipped: usize,
}

/// Capture with the object's save hooks around it.
pub fn capture(
    world: &mut dyn HostWorld,
    object: ObjectId,
    opts: &CaptureOptions,
    cx: &mut EncodeContext<'_>,
) -> PropertyMaps {
    world.pre_save(object);
    let props = capture_fields(&*world, object, opts, cx);
    world.post_save(object);
    props
}

/// Encode every accepted save-flagged field of `object`.
pub fn capture_fields(
    world: &dyn HostWorld,
    object: ObjectId,
    opts: &CaptureOptions,
    cx: &mut EncodeContext<'_>,
) -> PropertyMaps {
    let mut props = PropertyMaps::default();
    let Some(class) = world.class_of(object) else {
        warn!("Cannot capture {}: object has no class", object);
        return props;
    };

    let fields: Vec<FieldDescriptor> = world
        .schema()
        .save_eligible_fields(&class)
        .into_iter()
        .filter(|f| opts.accepts(world, f))
        .cloned()
        .collect();

    for field in &fields {
        let Some(value) = world.get_field(object, &field.name) else {
            warn!(
                "Cannot save property {} in object {}: not readable",
                field.name,
                world.name_of(object)
            );
            continue;
        };
        if let Err(issue) = capture_field(world, field, &value, &mut props, cx) {
            warn!(
                "Cannot save property {} in object {}: {}",
                field.name,
                world.name_of(object),
                issue
            );
        }
    }
    props
}

fn capture_field(
    world: &dyn HostWorld,
    field: &FieldDescriptor,
    value: &FieldValue,
    props: &mut PropertyMaps,
    cx: &mut EncodeContext<'_>,
) -> Result<(), FieldIssue> {
    match (&field.ty, value) {
        (FieldType::Array(elem) | FieldType::FixedArray(elem, _), FieldValue::Array(items)) => {
            let encoded = items
                .iter()
                .map(|item| encode_value(world, elem, item, cx))
                .collect::<Result<Vec<_>, _>>()?;
            props.arrays.insert(field.name.clone(), encoded);
        }
        (FieldType::Map(key_ty, value_ty), FieldValue::Map(entries)) => {
            let mut encoded = std::collections::BTreeMap::new();
            for (k, v) in entries {
                encoded.insert(
                    encode_value(world, key_ty, k, cx)?,
                    encode_value(world, value_ty, v, cx)?,
                );
            }
            props.maps.insert(field.name.clone(), encoded);
        }
        (FieldType::Array(_) | FieldType::FixedArray(..) | FieldType::Map(..), other) => {
            return Err(FieldIssue::TypeMismatch {
                expected: field.ty.describe(),
                found: other.kind_name().to_string(),
            });
        }
        _ => {
            let text = encode_value(world, &field.ty, value, cx)?;
            props.singles.insert(field.name.clone(), text);
        }
    }
    Ok(())
}

/// Restore `props` onto `object`: singles, then maps (replaced wholesale),
/// then arrays.
pub fn apply(
    world: &mut dyn HostWorld,
    object: ObjectId,
    props: &PropertyMaps,
    cx: &DecodeContext<'_>,
) -> ApplyReport {
    world.pre_restore(object);

    let mut report = ApplyReport::default();
    let Some(class) = world.class_of(object) else {
        warn!("Cannot restore {}: object has no class", object);
        report.skipped = props.singles.len() + props.arrays.len() + props.maps.len();
        return report;
    };

    for (name, text) in &props.singles {
        let outcome = field_type(&*world, &class, name).and_then(|ty| {
            let current = world.get_field(object, name);
            decode_value(&*world, &ty, text, current.as_ref(), cx)
        });
        store(world, object, name, outcome, &mut report);
    }

    for (name, entries) in &props.maps {
        let outcome = field_type(&*world, &class, name)
            .and_then(|ty| decode_map(&*world, object, name, &ty, entries, cx));
        store(world, object, name, outcome, &mut report);
    }

    for (name, items) in &props.arrays {
        let outcome = field_type(&*world, &class, name)
            .and_then(|ty| decode_array(&*world, object, name, &ty, items, cx));
        store(world, object, name, outcome, &mut report);
    }

    report
}

fn field_type(world: &dyn HostWorld, class: &str, name: &str) -> Result<FieldType, FieldIssue> {
    world
        .schema()
        .find_field(class, name)
        .map(|f| f.ty.clone())
        .ok_or_else(|| FieldIssue::MissingProperty(name.to_string()))
}

fn store(
    world: &mut dyn HostWorld,
    object: ObjectId,
    name: &str,
    outcome: Result<FieldValue, FieldIssue>,
    report: &mut ApplyReport,
) {
    let result = outcome.and_then(|value| {
        if world.set_field(object, name, value) {
            Ok(())
        } else {
            Err(FieldIssue::MissingProperty(name.to_string()))
        }
    });
    match result {
        Ok(()) => report.applied += 1,
        Err(issue) => {
            warn!(
                "Failed to restore property \"{}\" on object \"{}\": {}",
                name,
                world.name_of(object),
                issue
            );
            report.skipped += 1;
        }
    }
}

fn decode_map(
    world: &dyn HostWorld,
    object: ObjectId,
    name: &str,
    ty: &FieldType,
    entries: &std::collections::BTreeMap<String, String>,
    cx: &DecodeContext<'_>,
) -> Result<FieldValue, FieldIssue> {
    let FieldType::Map(key_ty, value_ty) = ty else {
        return Err(FieldIssue::TypeMismatch {
            expected: "map".to_string(),
            found: ty.describe(),
        });
    };
    let mut decoded = Vec::with_capacity(entries.len());
    for (key_text, value_text) in entries {
        let entry = decode_value(world, key_ty, key_text, None, cx).and_then(|k| {
            decode_value(world, value_ty, value_text, None, cx).map(|v| (k, v))
        });
        match entry {
            Ok(pair) => decoded.push(pair),
            Err(issue) => warn!(
                "Map {} on {}: entry \"{}\" skipped: {}",
                name,
                world.name_of(object),
                key_text,
                issue
            ),
        }
    }
    Ok(FieldValue::Map(decoded))
}

fn decode_array(
    world: &dyn HostWorld,
    object: ObjectId,
    name: &str,
    ty: &FieldType,
    items: &[String],
    cx: &DecodeContext<'_>,
) -> Result<FieldValue, FieldIssue> {
    match ty {
        FieldType::Array(elem) => {
            let decoded = items
                .iter()
                .map(|text| {
                    decode_value(world, elem, text, None, cx).unwrap_or_else(|issue| {
                        warn!(
                            "Array {} on {}: element \"{}\" reset: {}",
                            name,
                            world.name_of(object),
                            text,
                            issue
                        );
                        elem.default_value()
                    })
                })
                .collect();
            Ok(FieldValue::Array(decoded))
        }
        FieldType::FixedArray(elem, len) => {
            if items.len() != *len {
                return Err(FieldIssue::FixedArraySize {
                    expected: *len,
                    found: items.len(),
                });
            }
            let live = world.get_field(object, name);
            let live_items = live.as_ref().and_then(FieldValue::as_array).unwrap_or(&[]);
            let decoded = items
                .iter()
                .enumerate()
                .map(|(i, text)| {
                    let base = live_items.get(i);
                    decode_value(world, elem, text, base, cx).unwrap_or_else(|issue| {
                        warn!("Array {}[{}] on {} kept: {}", name, i, world.name_of(object), issue);
                        base.cloned().unwrap_or_else(|| elem.default_value())
                    })
                })
                .collect();
            Ok(FieldValue::Array(decoded))
        }
        other => Err(FieldIssue::TypeMismatch {
            expected: "array".to_string(),
            found: other.describe(),
        }),
    }
}
