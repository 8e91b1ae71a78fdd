//! NBT (Named Binary Tag) support
//!
//! Player save files (`playerdata/{uuid}.dat`) are a gzip-compressed NBT
//! tree: a named root compound holding typed scalars, strings, arrays,
//! lists and nested compounds. Every element is preceded by an 8-bit type
//! id; all numbers are big-endian.
//!
//! ## Usage
//!
//! ```no_run
//! use worldstats::nbt;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("world/playerdata/player.dat")?;
//! let root = nbt::decode_gzip(&bytes)?;
//! let level = root.compound.get("XpLevel").and_then(|t| t.as_i64());
//! # let _ = level;
//! # Ok(())
//! # }
//! ```

pub mod decode;
pub mod encode;

pub use decode::{decode, decode_gzip};
pub use encode::{to_bytes, to_gzip_bytes};

use serde::ser::{Serialize, SerializeMap, Serializer};

pub const TAG_END: u8 = 0;
pub const TAG_BYTE: u8 = 1;
pub const TAG_SHORT: u8 = 2;
pub const TAG_INT: u8 = 3;
pub const TAG_LONG: u8 = 4;
pub const TAG_FLOAT: u8 = 5;
pub const TAG_DOUBLE: u8 = 6;
pub const TAG_BYTE_ARRAY: u8 = 7;
pub const TAG_STRING: u8 = 8;
pub const TAG_LIST: u8 = 9;
pub const TAG_COMPOUND: u8 = 10;
pub const TAG_INT_ARRAY: u8 = 11;
pub const TAG_LONG_ARRAY: u8 = 12;

/// A decoded NBT value
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(NbtList),
    Compound(Compound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    /// Wire type id of this tag
    pub fn type_id(&self) -> u8 {
        match self {
            Tag::Byte(_) => TAG_BYTE,
            Tag::Short(_) => TAG_SHORT,
            Tag::Int(_) => TAG_INT,
            Tag::Long(_) => TAG_LONG,
            Tag::Float(_) => TAG_FLOAT,
            Tag::Double(_) => TAG_DOUBLE,
            Tag::ByteArray(_) => TAG_BYTE_ARRAY,
            Tag::String(_) => TAG_STRING,
            Tag::List(_) => TAG_LIST,
            Tag::Compound(_) => TAG_COMPOUND,
            Tag::IntArray(_) => TAG_INT_ARRAY,
            Tag::LongArray(_) => TAG_LONG_ARRAY,
        }
    }

    /// Coerce a numeric tag to an integer.
    ///
    /// Integer tags convert directly, float tags truncate toward zero and
    /// numeric strings are parsed as floats then truncated. Anything else
    /// (including NaN/infinite floats) is `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Tag::Byte(v) => Some(*v as i64),
            Tag::Short(v) => Some(*v as i64),
            Tag::Int(v) => Some(*v as i64),
            Tag::Long(v) => Some(*v),
            Tag::Float(v) => truncate_float(*v as f64),
            Tag::Double(v) => truncate_float(*v),
            Tag::String(s) => s.trim().parse::<f64>().ok().and_then(truncate_float),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Tag::Compound(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&NbtList> {
        match self {
            Tag::List(l) => Some(l),
            _ => None,
        }
    }
}

fn truncate_float(v: f64) -> Option<i64> {
    if v.is_finite() {
        Some(v.trunc() as i64)
    } else {
        None
    }
}

/// Homogeneous list; keeps the declared element type so empty lists
/// re-encode exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct NbtList {
    pub element_type: u8,
    pub items: Vec<Tag>,
}

impl NbtList {
    pub fn new(element_type: u8, items: Vec<Tag>) -> Self {
        Self {
            element_type,
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.items.iter()
    }
}

impl Serialize for NbtList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

/// Named entries in source order.
///
/// Lookups are linear; order matters for first-match scans. Inserting an
/// existing key replaces the value in place (the decoder dedups with a
/// side index instead of going through `insert`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    entries: Vec<(String, Tag)>,
}

impl Compound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, tag)| tag)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Wrap entries whose names are already distinct, keeping their order
    pub(crate) fn from_unique_entries(entries: Vec<(String, Tag)>) -> Self {
        Self { entries }
    }

    pub fn insert(&mut self, key: impl Into<String>, tag: Tag) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(name, _)| *name == key) {
            slot.1 = tag;
        } else {
            self.entries.push((key, tag));
        }
    }

    /// Builder-style insert, handy for fixtures
    pub fn with(mut self, key: impl Into<String>, tag: Tag) -> Self {
        self.insert(key, tag);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tag)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn values(&self) -> impl Iterator<Item = &Tag> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Compound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// The root of an NBT file: a compound plus its (usually empty) name
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTag {
    pub name: String,
    pub compound: Compound,
}

impl NamedTag {
    pub fn new(name: impl Into<String>, compound: Compound) -> Self {
        Self {
            name: name.into(),
            compound,
        }
    }
}
