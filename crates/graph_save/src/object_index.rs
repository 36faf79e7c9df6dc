// ---------------------------------------------------------------------------
// Object Index Registry: stable integer ids for live objects within a pass
// ---------------------------------------------------------------------------
//
// Two ordered lists. Index `i` of the global (or local) list is `object_index
// == i` of the matching record. An object lives in at most one list. During
// restore, `place` pads a list with `None` placeholders that are filled once the
// object is recreated.

use std::collections::HashMap;

use crate::host_world::ObjectId;
use crate::property_codec::ReferenceDecoder;

/// Position of an object in one of the two lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexRef {
    pub index: u32,
    pub global: bool,
}

impl IndexRef {
    pub fn global(index: u32) -> Self {
        Self {
            index,
            global: true,
        }
    }

    pub fn local(index: u32) -> Self {
        Self {
            index,
            global: false,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ObjectIndexRegistry {
    global: Vec<Option<ObjectId>>,
    local: Vec<Option<ObjectId>>,
    lookup: HashMap<ObjectId, IndexRef>,
}

impl ObjectIndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn list(&self, global: bool) -> &Vec<Option<ObjectId>> {
        if global {
            &self.global
        } else {
            &self.local
        }
    }

    fn list_mut(&mut self, global: bool) -> &mut Vec<Option<ObjectId>> {
        if global {
            &mut self.global
        } else {
            &mut self.local
        }
    }

    /// Append `object` to a list. Idempotent: an object already tracked in
    /// either list keeps its existing index.
    pub fn register(&mut self, object: ObjectId, global: bool) -> IndexRef {
        if let Some(existing) = self.lookup.get(&object) {
            return *existing;
        }
        let list = self.list_mut(global);
        let at = IndexRef {
            index: list.len() as u32,
            global,
        };
        list.push(Some(object));
        self.lookup.insert(object, at);
        at
    }

    /// Put `object` at a known index, growing the list with placeholders.
    ///
    /// Returns false (and changes nothing) when the object is already tracked
    /// elsewhere or the slot holds a different object.
    pub fn place(&mut self, object: ObjectId, at: IndexRef) -> bool {
        if let Some(existing) = self.lookup.get(&object) {
            return *existing == at;
        }
        let slot = at.index as usize;
        let list = self.list_mut(at.global);
        if slot >= list.len() {
            list.resize(slot + 1, None);
        }
        if list[slot].is_some() {
            return false;
        }
        list[slot] = Some(object);
        self.lookup.insert(object, at);
        true
    }

    pub fn resolve(&self, index: u32, global: bool) -> Option<ObjectId> {
        self.list(global).get(index as usize).copied().flatten()
    }

    pub fn find(&self, object: ObjectId) -> Option<IndexRef> {
        self.lookup.get(&object).copied()
    }

    pub fn contains(&self, object: ObjectId) -> bool {
        self.lookup.contains_key(&object)
    }

    pub fn len(&self, global: bool) -> usize {
        self.list(global).len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.local.is_empty()
    }

    /// Occupied slots of one list, in index order.
    pub fn iter(&self, global: bool) -> impl Iterator<Item = (u32, ObjectId)> + '_ {
        self.list(global)
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|id| (i as u32, id)))
    }

    pub fn clear(&mut self) {
        self.global.clear();
        self.local.clear();
        self.lookup.clear();
    }
}

impl ReferenceDecoder for ObjectIndexRegistry {
    fn resolve(&self, index: u32, global: bool) -> Option<ObjectId> {
        ObjectIndexRegistry::resolve(self, index, global)
    }
}
