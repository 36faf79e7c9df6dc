use super::*;
use crate::memory_world::MemoryWorld;
use crate::reflect::{ClassSchema, FieldDescriptor, SchemaRegistry};
use crate::save_types::SavedTransform;

const LEVEL: &str = "Town";

/// Index lists a restore would rebuild, keyed by position.
struct IndexLists {
    global: Vec<Option<ObjectId>>,
    local: Vec<Option<ObjectId>>,
}

impl ReferenceDecoder for IndexLists {
    fn resolve(&self, index: u32, global: bool) -> Option<ObjectId> {
        let list = if global { &self.global } else { &self.local };
        list.get(index as usize).copied().flatten()
    }
}

/// Tracks objects on first sight, like the save graph does.
#[derive(Default)]
struct Tracker {
    tracked: Vec<ObjectId>,
    eligible: Vec<ObjectId>,
}

impl ReferenceEncoder for Tracker {
    fn encode_reference(&mut self, _world: &dyn HostWorld, object: ObjectId) -> Option<RefToken> {
        if !self.eligible.contains(&object) {
            return None;
        }
        let index = match self.tracked.iter().position(|t| *t == object) {
            Some(i) => i,
            None => {
                self.tracked.push(object);
                self.tracked.len() - 1
            }
        };
        Some(RefToken::Global(index as u32))
    }
}

struct Town {
    world: MemoryWorld,
    sword: ObjectId,
    item: ObjectId,
    lamp: ObjectId,
}

fn town() -> Town {
    let mut schema = SchemaRegistry::new();
    schema.register(ClassSchema::object("Item"));
    schema.register(ClassSchema::object("Sword").with_parent("Item"));
    schema.register(ClassSchema::actor("Lamp"));
    let mut world = MemoryWorld::new(schema, LEVEL);
    let sword = world.add_object("Sword", "Sword_1", None);
    let item = world.add_object("Item", "Item_1", None);
    let lamp = world.add_actor("Lamp", "Lamp_1", SavedTransform::IDENTITY);
    Town {
        world,
        sword,
        item,
        lamp,
    }
}

fn decode_cx<'a>(refs: &'a IndexLists) -> DecodeContext<'a> {
    DecodeContext {
        elapsed: 0.0,
        level_name: LEVEL,
        refs: Some(refs),
    }
}

fn tags_struct() -> StructSchema {
    StructSchema::new(
        "Tags",
        vec![
            FieldDescriptor::saved("Label", FieldType::Str),
            FieldDescriptor::saved("Rank", FieldType::Int),
            FieldDescriptor::transient("Cache", FieldType::Int),
        ],
    )
}

fn encode_simple(world: &MemoryWorld, ty: FieldType, value: FieldValue) -> String {
    encode_value(world, &ty, &value, &mut EncodeContext::simple(0.0)).unwrap()
}

#[test]
fn test_scalars_encode_as_plain_text() {
    let t = town();
    let w = &t.world;
    assert_eq!(encode_simple(w, FieldType::Bool, FieldValue::Bool(false)), "False");
    assert_eq!(encode_simple(w, FieldType::Int, FieldValue::Int(-4)), "-4");
    assert_eq!(encode_simple(w, FieldType::Float, FieldValue::Float(0.25)), "0.25");
    assert_eq!(
        encode_simple(w, FieldType::Str, FieldValue::Str("a, \"b\"".into())),
        "a, \"b\""
    );
    assert_eq!(
        encode_simple(
            w,
            FieldType::enumeration("Mood", &["Calm", "Angry"]),
            FieldValue::Enum("Angry".into())
        ),
        "Angry"
    );
}

#[test]
fn test_time_is_stored_relative_to_the_clock() {
    let t = town();
    let mut cx = EncodeContext::simple(100.0);
    let stored = encode_value(&t.world, &FieldType::Time, &FieldValue::Time(130.0), &mut cx).unwrap();
    assert_eq!(stored, "30");
    let unset = encode_value(&t.world, &FieldType::Time, &FieldValue::Time(0.0), &mut cx).unwrap();
    assert_eq!(unset, "0");

    let cx = DecodeContext::simple(7.0);
    assert_eq!(
        decode_value(&t.world, &FieldType::Time, &stored, None, &cx),
        Ok(FieldValue::Time(37.0))
    );
    assert_eq!(
        decode_value(&t.world, &FieldType::Time, "0", None, &cx),
        Ok(FieldValue::Time(0.0))
    );
}

#[test]
fn test_mismatched_value_is_refused() {
    let t = town();
    let err = encode_value(
        &t.world,
        &FieldType::Int,
        &FieldValue::Str("x".into()),
        &mut EncodeContext::simple(0.0),
    )
    .unwrap_err();
    assert!(matches!(err, FieldIssue::TypeMismatch { .. }));
}

#[test]
fn test_unknown_enum_variant() {
    let t = town();
    let ty = FieldType::enumeration("Mood", &["Calm", "Angry"]);
    let cx = DecodeContext::simple(0.0);
    assert_eq!(
        decode_value(&t.world, &ty, "Calm", None, &cx),
        Ok(FieldValue::Enum("Calm".into()))
    );
    assert_eq!(
        decode_value(&t.world, &ty, "Sleepy", None, &cx),
        Err(FieldIssue::UnknownEnumVariant {
            ty: "Mood".into(),
            variant: "Sleepy".into()
        })
    );
}

#[test]
fn test_fixed_array_length_is_checked() {
    let t = town();
    let ty = FieldType::fixed_array(FieldType::Int, 3);
    let cx = DecodeContext::simple(0.0);
    assert_eq!(
        decode_value(&t.world, &ty, "(1,2,3)", None, &cx),
        Ok(FieldValue::Array(vec![
            FieldValue::Int(1),
            FieldValue::Int(2),
            FieldValue::Int(3)
        ]))
    );
    assert_eq!(
        decode_value(&t.world, &ty, "(1,2)", None, &cx),
        Err(FieldIssue::FixedArraySize {
            expected: 3,
            found: 2
        })
    );
    assert!(matches!(
        decode_value(&t.world, &ty, "1,2,3", None, &cx),
        Err(FieldIssue::Unparsable { .. })
    ));
}

#[test]
fn test_nested_containers_decode() {
    let t = town();
    let cx = DecodeContext::simple(0.0);

    let map = FieldType::map(FieldType::Name, FieldType::array(FieldType::Float));
    assert_eq!(
        decode_value(&t.world, &map, "((\"a,b\",(1,2.5)),(c,()))", None, &cx),
        Ok(FieldValue::Map(vec![
            (
                FieldValue::Name("a,b".into()),
                FieldValue::Array(vec![FieldValue::Float(1.0), FieldValue::Float(2.5)])
            ),
            (FieldValue::Name("c".into()), FieldValue::Array(Vec::new())),
        ]))
    );
    assert!(matches!(
        decode_value(&t.world, &map, "((a,(1),extra))", None, &cx),
        Err(FieldIssue::Unparsable { .. })
    ));
}

#[test]
fn test_struct_text_quotes_strings_and_keeps_unmentioned_members() {
    let t = town();
    let ty = FieldType::Struct(tags_struct());
    let value = FieldValue::Struct(vec![
        ("Label".into(), FieldValue::Str("x=1, (y)".into())),
        ("Rank".into(), FieldValue::Int(2)),
        ("Cache".into(), FieldValue::Int(9)),
    ]);
    let text = encode_value(&t.world, &ty, &value, &mut EncodeContext::simple(0.0)).unwrap();
    assert_eq!(text, "(Label=\"x=1, (y)\",Rank=2)");

    let cx = DecodeContext::simple(0.0);
    let base = FieldValue::Struct(vec![
        ("Label".into(), FieldValue::Str("old".into())),
        ("Rank".into(), FieldValue::Int(0)),
        ("Cache".into(), FieldValue::Int(5)),
    ]);
    let decoded = decode_value(&t.world, &ty, &text, Some(&base), &cx).unwrap();
    assert_eq!(decoded.member("Label"), Some(&FieldValue::Str("x=1, (y)".into())));
    assert_eq!(decoded.member("Rank"), Some(&FieldValue::Int(2)));
    assert_eq!(decoded.member("Cache"), Some(&FieldValue::Int(5)));

    // Unknown keys and bad members are skipped, not fatal.
    let partial = decode_value(&t.world, &ty, "(Rank=oops,Gone=1)", Some(&base), &cx).unwrap();
    assert_eq!(partial, base);
}

#[test]
fn test_object_reference_tokens_resolve() {
    let t = town();
    let lists = IndexLists {
        global: vec![Some(t.item), None],
        local: vec![Some(t.sword)],
    };
    let cx = decode_cx(&lists);
    let ty = FieldType::object("Item");
    let decode = |text: &str| decode_value(&t.world, &ty, text, None, &cx);

    assert_eq!(decode("![Global]:0"), Ok(FieldValue::Object(Some(t.item))));
    assert_eq!(decode("!Town:0"), Ok(FieldValue::Object(Some(t.sword))));
    assert_eq!(decode("None"), Ok(FieldValue::Object(None)));
    assert_eq!(decode(""), Ok(FieldValue::Object(None)));
    assert_eq!(
        decode("/Game/Maps/Town.Sword_1"),
        Ok(FieldValue::Object(Some(t.sword)))
    );

    assert_eq!(
        decode("![Global]:1"),
        Err(FieldIssue::IndexOutOfRange {
            index: 1,
            global: true
        })
    );
    assert_eq!(
        decode("!Town:4"),
        Err(FieldIssue::IndexOutOfRange {
            index: 4,
            global: false
        })
    );
    assert_eq!(decode("!Cave:0"), Err(FieldIssue::ForeignLevel("!Cave:0".into())));
    assert_eq!(
        decode("/Game/Maps/Town.Nowhere"),
        Err(FieldIssue::UnresolvedPath("/Game/Maps/Town.Nowhere".into()))
    );
    assert!(matches!(decode("![Global]:x"), Err(FieldIssue::Unparsable { .. })));
}

#[test]
fn test_object_of_wrong_class_is_rejected() {
    let t = town();
    let lists = IndexLists {
        global: vec![Some(t.lamp)],
        local: Vec::new(),
    };
    let cx = decode_cx(&lists);
    assert_eq!(
        decode_value(&t.world, &FieldType::object("Item"), "![Global]:0", None, &cx),
        Err(FieldIssue::TypeMismatch {
            expected: "Item".into(),
            found: "Lamp".into()
        })
    );
}

#[test]
fn test_simple_decode_has_no_index_lists() {
    let t = town();
    let cx = DecodeContext::simple(0.0);
    assert!(matches!(
        decode_value(&t.world, &FieldType::object("Item"), "![Global]:0", None, &cx),
        Err(FieldIssue::IndexOutOfRange { .. })
    ));
}

#[test]
fn test_object_encoding_prefers_tokens() {
    let t = town();
    let mut tracker = Tracker {
        eligible: vec![t.sword, t.item],
        ..Default::default()
    };
    let ty = FieldType::array(FieldType::object("Item"));
    let value = FieldValue::Array(vec![
        FieldValue::Object(Some(t.item)),
        FieldValue::Object(None),
        FieldValue::Object(Some(t.item)),
        FieldValue::Object(Some(t.lamp)),
    ]);
    let mut cx = EncodeContext::with_refs(0.0, &mut tracker);
    let text = encode_value(&t.world, &ty, &value, &mut cx).unwrap();
    assert_eq!(
        text,
        "(![Global]:0,None,![Global]:0,/Game/Maps/Town.Lamp_1)"
    );
    assert_eq!(tracker.tracked, vec![t.item]);

    let plain = encode_value(
        &t.world,
        &FieldType::object("Item"),
        &FieldValue::Object(Some(t.sword)),
        &mut EncodeContext::simple(0.0),
    )
    .unwrap();
    assert_eq!(plain, "/Game/Maps/Town.Sword_1");
}

#[test]
fn test_soft_object_paths() {
    let t = town();
    let ty = FieldType::soft_object("Texture");
    let path = "/Game/Textures/Portrait.Portrait";
    let text = encode_value(
        &t.world,
        &ty,
        &FieldValue::SoftObject(path.into()),
        &mut EncodeContext::simple(0.0),
    )
    .unwrap();
    assert_eq!(text, format!("{SOFT_OBJECT_PREFIX}{path}"));

    let cx = DecodeContext::simple(0.0);
    assert_eq!(
        decode_value(&t.world, &ty, &text, None, &cx),
        Ok(FieldValue::SoftObject(path.into()))
    );
    assert_eq!(
        decode_value(&t.world, &ty, path, None, &cx),
        Ok(FieldValue::SoftObject(path.into()))
    );
    assert_eq!(
        decode_value(&t.world, &ty, NONE_TEXT, None, &cx),
        Ok(FieldValue::SoftObject(String::new()))
    );
    assert!(matches!(
        decode_value(&t.world, &ty, &format!("{GLOBAL_PREFIX}3"), None, &cx),
        Err(FieldIssue::TypeMismatch { .. })
    ));
}

#[test]
fn test_issue_messages_name_the_problem() {
    assert_eq!(
        FieldIssue::FixedArraySize {
            expected: 3,
            found: 2
        }
        .to_string(),
        "saved 2 elements for an array of 3"
    );
    assert_eq!(
        FieldIssue::IndexOutOfRange {
            index: 5,
            global: false
        }
        .to_string(),
        "no object at local index 5"
    );
}
