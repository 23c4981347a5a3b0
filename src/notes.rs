//! Notes passed between keywords during validation.
//!
//! A note has a name, normally the keyword that produced it, and a value.
//! Notes let validation of one keyword depend on information gathered
//! while validating another: `unevaluatedItems` imposes requirements only
//! on elements that `prefixItems`, `items` and `contains` did not already
//! evaluate, `then` consults the outcome recorded by `if`, and so on.
//!
//! The part ordering produced by [`finalize`](crate::Schema::finalize)
//! guarantees that every producer runs before its consumers.

use ahash::AHashMap;

use crate::schema::NodeId;

/// A property evaluated by `properties`, `patternProperties`,
/// `additionalProperties` or `unevaluatedProperties`: the field name and
/// the schema node whose keyword evaluated it.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyNote {
    pub field: String,
    pub node: NodeId,
}

/// The reach of a `prefixItems` keyword: how many leading elements it
/// covers, and the node it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrefixNote {
    pub len: usize,
    pub node: NodeId,
}

/// The reach of a pre-2020 `items` keyword. `all` is set when every
/// element was evaluated; otherwise `len` leading elements were.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemsNote {
    pub all: bool,
    pub len: usize,
    pub node: NodeId,
}

/// A note value: a scalar flag or a homogeneous sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteValue {
    /// Scalar, e.g. the `if` outcome or the 2020-12 `items` marker.
    Flag(bool),
    /// Element indexes matched by `contains`.
    Indexes(Vec<usize>),
    /// Properties evaluated by the object keywords.
    Properties(Vec<PropertyNote>),
    /// `prefixItems` coverage.
    Prefixes(Vec<PrefixNote>),
    /// Pre-2020 `items`/`additionalItems` coverage.
    Items(Vec<ItemsNote>),
}

/// A bag of notes. The zero value is directly usable.
///
/// Notes are not JSON Schema annotations: they are transient, internal to
/// one validation call, and never surfaced in output.
#[derive(Debug, Clone, Default)]
pub struct Notes {
    map: AHashMap<&'static str, NoteValue>,
}

impl Notes {
    /// Sets a note, replacing any existing value under the same name.
    pub fn set(&mut self, name: &'static str, value: NoteValue) {
        self.map.insert(name, value);
    }

    /// Retrieves a note.
    pub fn get(&self, name: &str) -> Option<&NoteValue> {
        self.map.get(name)
    }

    /// Retrieves a scalar flag note.
    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.map.get(name) {
            Some(NoteValue::Flag(b)) => Some(*b),
            _ => None,
        }
    }

    /// Appends indexes to a sequence note.
    pub fn append_indexes(&mut self, name: &'static str, indexes: impl IntoIterator<Item = usize>) {
        match self.map.entry(name).or_insert_with(|| NoteValue::Indexes(Vec::new())) {
            NoteValue::Indexes(v) => v.extend(indexes),
            other => *other = NoteValue::Indexes(indexes.into_iter().collect()),
        }
    }

    /// Appends a property note to a sequence note.
    pub fn append_property(&mut self, name: &'static str, note: PropertyNote) {
        match self
            .map
            .entry(name)
            .or_insert_with(|| NoteValue::Properties(Vec::new()))
        {
            NoteValue::Properties(v) => v.push(note),
            other => *other = NoteValue::Properties(vec![note]),
        }
    }

    /// Appends a `prefixItems` note to a sequence note.
    pub fn append_prefix(&mut self, name: &'static str, note: PrefixNote) {
        match self
            .map
            .entry(name)
            .or_insert_with(|| NoteValue::Prefixes(Vec::new()))
        {
            NoteValue::Prefixes(v) => v.push(note),
            other => *other = NoteValue::Prefixes(vec![note]),
        }
    }

    /// Appends a pre-2020 items note to a sequence note.
    pub fn append_items(&mut self, name: &'static str, note: ItemsNote) {
        match self
            .map
            .entry(name)
            .or_insert_with(|| NoteValue::Items(Vec::new()))
        {
            NoteValue::Items(v) => v.push(note),
            other => *other = NoteValue::Items(vec![note]),
        }
    }

    /// Merges the notes of `others` into `self`. Sequences append
    /// element-wise; scalars replace. A note keeps its kind: merging a
    /// different kind under the same name replaces the old value.
    pub fn add_notes(&mut self, others: impl IntoIterator<Item = Notes>) {
        for other in others {
            for (name, value) in other.map {
                match (self.map.get_mut(name), value) {
                    (Some(NoteValue::Indexes(a)), NoteValue::Indexes(b)) => a.extend(b),
                    (Some(NoteValue::Properties(a)), NoteValue::Properties(b)) => a.extend(b),
                    (Some(NoteValue::Prefixes(a)), NoteValue::Prefixes(b)) => a.extend(b),
                    (Some(NoteValue::Items(a)), NoteValue::Items(b)) => a.extend(b),
                    (_, value) => {
                        self.map.insert(name, value);
                    }
                }
            }
        }
    }

    /// Discards all notes.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Reports whether there are no notes.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_append_and_scalars_replace() {
        let mut a = Notes::default();
        a.append_indexes("contains", [0, 2]);
        a.set("if", NoteValue::Flag(false));

        let mut b = Notes::default();
        b.append_indexes("contains", [3]);
        b.set("if", NoteValue::Flag(true));

        a.add_notes([b]);
        assert_eq!(a.get("contains"), Some(&NoteValue::Indexes(vec![0, 2, 3])));
        assert_eq!(a.flag("if"), Some(true));
    }

    #[test]
    fn property_notes_track_their_node() {
        let mut n = Notes::default();
        n.append_property(
            "properties",
            PropertyNote {
                field: "a".into(),
                node: NodeId::ROOT,
            },
        );
        match n.get("properties") {
            Some(NoteValue::Properties(v)) => {
                assert_eq!(v.len(), 1);
                assert_eq!(v[0].field, "a");
            }
            other => panic!("unexpected note {other:?}"),
        }
    }
}
