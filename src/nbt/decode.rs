//! NBT decoding
//!
//! `decode_gzip` inflates then hands the plain stream to `decode`. All
//! length fields are checked against the bytes that remain before anything
//! is allocated, so a corrupt length cannot trigger a huge allocation.

use super::{
    Compound, NamedTag, NbtList, Tag, TAG_BYTE, TAG_BYTE_ARRAY, TAG_COMPOUND, TAG_DOUBLE, TAG_END,
    TAG_FLOAT, TAG_INT, TAG_INT_ARRAY, TAG_LIST, TAG_LONG, TAG_LONG_ARRAY, TAG_SHORT, TAG_STRING,
};
use crate::error::{DecodeError, DecodeErrorKind};
use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::io::Read;

/// Compounds/lists nested deeper than this are rejected
pub const MAX_DEPTH: usize = 512;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decompress a gzip stream and decode the NBT tree inside it.
///
/// # Returns
/// * `Ok(NamedTag)` - root compound and its name
/// * `Err(DecodeError)` - bad gzip header (offset into the compressed
///   bytes), inflate failure (offset = bytes inflated before the failure),
///   or any structural error from [`decode`]
pub fn decode_gzip(bytes: &[u8]) -> Result<NamedTag, DecodeError> {
    if bytes.len() < GZIP_MAGIC.len() {
        return Err(DecodeError::new(0, DecodeErrorKind::InvalidGzipHeader));
    }
    if let Some(pos) = bytes.iter().zip(GZIP_MAGIC.iter()).position(|(a, b)| a != b) {
        return Err(DecodeError::new(pos, DecodeErrorKind::InvalidGzipHeader));
    }

    let mut decoder = GzDecoder::new(bytes);
    let mut raw = Vec::with_capacity(bytes.len() * 4);
    if let Err(e) = decoder.read_to_end(&mut raw) {
        return Err(DecodeError::new(
            raw.len(),
            DecodeErrorKind::Decompress(e.to_string()),
        ));
    }

    decode(&raw)
}

/// Decode an uncompressed NBT stream whose root is a named compound.
///
/// Bytes after the root compound's end tag are ignored.
pub fn decode(bytes: &[u8]) -> Result<NamedTag, DecodeError> {
    let mut reader = TagReader::new(bytes);

    let root_offset = reader.offset();
    let root_type = reader.read_u8()?;
    if root_type != TAG_COMPOUND {
        return Err(DecodeError::new(
            root_offset,
            DecodeErrorKind::RootNotCompound(root_type),
        ));
    }

    let name = reader.read_string()?;
    let compound = reader.read_compound(1)?;

    Ok(NamedTag { name, compound })
}

/// Cursor over a byte slice that tracks the offset for error reporting
struct TagReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> TagReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn offset(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::new(
                self.pos,
                DecodeErrorKind::UnexpectedEof {
                    needed: n,
                    remaining: self.remaining(),
                },
            ));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take_array::<1>()?[0])
    }

    fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.read_u8()? as i8)
    }

    fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_be_bytes(self.take_array()?))
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_be_bytes(self.take_array()?))
    }

    fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_be_bytes(self.take_array()?))
    }

    /// Read an i32 element count and check that `count * element_size`
    /// bytes are still available.
    fn read_length(&mut self, element_size: usize) -> Result<usize, DecodeError> {
        let len_offset = self.pos;
        let len = self.read_i32()?;
        if len < 0 {
            return Err(DecodeError::new(
                len_offset,
                DecodeErrorKind::NegativeLength(len),
            ));
        }
        let len = len as usize;
        if len.saturating_mul(element_size) > self.remaining() {
            return Err(DecodeError::new(
                len_offset,
                DecodeErrorKind::LengthExceedsBuffer {
                    length: len,
                    remaining: self.remaining(),
                },
            ));
        }
        Ok(len)
    }

    fn read_string(&mut self) -> Result<String, DecodeError> {
        let len_offset = self.pos;
        let len = self.read_u16()? as usize;
        if len > self.remaining() {
            return Err(DecodeError::new(
                len_offset,
                DecodeErrorKind::LengthExceedsBuffer {
                    length: len,
                    remaining: self.remaining(),
                },
            ));
        }
        let bytes = self.take(len)?;
        // Java writes modified UTF-8; only NUL and astral characters differ
        // from plain UTF-8, and those are rare in save data.
        Ok(match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        })
    }

    fn read_compound(&mut self, depth: usize) -> Result<Compound, DecodeError> {
        self.check_depth(depth)?;
        let mut entries: Vec<(String, Tag)> = Vec::new();
        // name -> position in `entries`, so a repeated name replaces in place
        let mut index: HashMap<String, usize> = HashMap::new();
        loop {
            let type_offset = self.pos;
            let type_id = self.read_u8()?;
            if type_id == TAG_END {
                return Ok(Compound::from_unique_entries(entries));
            }
            if type_id > TAG_LONG_ARRAY {
                return Err(DecodeError::new(
                    type_offset,
                    DecodeErrorKind::UnknownTag(type_id),
                ));
            }
            let name = self.read_string()?;
            let tag = self.read_payload(type_id, type_offset, depth)?;
            match index.get(&name) {
                Some(&slot) => entries[slot].1 = tag,
                None => {
                    index.insert(name.clone(), entries.len());
                    entries.push((name, tag));
                }
            }
        }
    }

    fn read_list(&mut self, depth: usize) -> Result<NbtList, DecodeError> {
        self.check_depth(depth)?;
        let type_offset = self.pos;
        let element_type = self.read_u8()?;
        if element_type > TAG_LONG_ARRAY {
            return Err(DecodeError::new(
                type_offset,
                DecodeErrorKind::UnknownTag(element_type),
            ));
        }

        let len_offset = self.pos;
        // Every element takes at least one byte except End, which carries none
        let len = self.read_length(min_payload_size(element_type))?;
        if element_type == TAG_END {
            if len > 0 {
                return Err(DecodeError::new(
                    len_offset,
                    DecodeErrorKind::NonEmptyEndList(len as i32),
                ));
            }
            return Ok(NbtList::new(TAG_END, Vec::new()));
        }

        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(self.read_payload(element_type, type_offset, depth)?);
        }
        Ok(NbtList::new(element_type, items))
    }

    fn read_payload(
        &mut self,
        type_id: u8,
        type_offset: usize,
        depth: usize,
    ) -> Result<Tag, DecodeError> {
        let tag = match type_id {
            TAG_BYTE => Tag::Byte(self.read_i8()?),
            TAG_SHORT => Tag::Short(self.read_i16()?),
            TAG_INT => Tag::Int(self.read_i32()?),
            TAG_LONG => Tag::Long(self.read_i64()?),
            TAG_FLOAT => Tag::Float(self.read_f32()?),
            TAG_DOUBLE => Tag::Double(self.read_f64()?),
            TAG_BYTE_ARRAY => {
                let len = self.read_length(1)?;
                Tag::ByteArray(self.take(len)?.iter().map(|b| *b as i8).collect())
            }
            TAG_STRING => Tag::String(self.read_string()?),
            TAG_LIST => Tag::List(self.read_list(depth + 1)?),
            TAG_COMPOUND => Tag::Compound(self.read_compound(depth + 1)?),
            TAG_INT_ARRAY => {
                let len = self.read_length(4)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(self.read_i32()?);
                }
                Tag::IntArray(values)
            }
            TAG_LONG_ARRAY => {
                let len = self.read_length(8)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(self.read_i64()?);
                }
                Tag::LongArray(values)
            }
            other => {
                return Err(DecodeError::new(
                    type_offset,
                    DecodeErrorKind::UnknownTag(other),
                ))
            }
        };
        Ok(tag)
    }

    fn check_depth(&self, depth: usize) -> Result<(), DecodeError> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::new(
                self.pos,
                DecodeErrorKind::DepthLimitExceeded(MAX_DEPTH),
            ));
        }
        Ok(())
    }
}

/// Smallest number of bytes one payload of this type can occupy
fn min_payload_size(type_id: u8) -> usize {
    match type_id {
        TAG_END => 0,
        TAG_BYTE => 1,
        TAG_SHORT | TAG_STRING => 2,
        TAG_INT | TAG_FLOAT | TAG_BYTE_ARRAY | TAG_INT_ARRAY | TAG_LONG_ARRAY => 4,
        TAG_LONG | TAG_DOUBLE => 8,
        TAG_LIST => 5,
        TAG_COMPOUND => 1,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nbt::encode::{to_bytes, to_gzip_bytes};

    fn sample_tree() -> NamedTag {
        let stats = Compound::new()
            .with("level", Tag::Int(42))
            .with("exp", Tag::Long(9_000_000_000))
            .with("hp", Tag::Float(187.6));
        let root = Compound::new()
            .with("DataVersion", Tag::Int(3465))
            .with("Health", Tag::Float(20.0))
            .with("XpLevel", Tag::Short(7))
            .with("OnGround", Tag::Byte(1))
            .with("Seed", Tag::Long(-1234567890123))
            .with("Dimension", Tag::String("minecraft:overworld".to_string()))
            .with(
                "Pos",
                Tag::List(NbtList::new(
                    TAG_DOUBLE,
                    vec![Tag::Double(10.5), Tag::Double(64.0), Tag::Double(-3.25)],
                )),
            )
            .with("UUID", Tag::IntArray(vec![1, -2, 3, -4]))
            .with("Flags", Tag::ByteArray(vec![0, -1, 127]))
            .with("Times", Tag::LongArray(vec![i64::MIN, 0, i64::MAX]))
            .with("Empty", Tag::List(NbtList::new(TAG_END, vec![])))
            .with(
                "ForgeCaps",
                Tag::Compound(Compound::new().with("mmorpg:entity_data", Tag::Compound(stats))),
            );
        NamedTag::new("", root)
    }

    #[test]
    fn test_gzip_round_trip_recovers_values() {
        let tree = sample_tree();
        let bytes = to_gzip_bytes(&tree).unwrap();
        assert_eq!(&bytes[..2], &GZIP_MAGIC);

        let decoded = decode_gzip(&bytes).unwrap();
        assert_eq!(decoded, tree);

        let caps = decoded.compound.get("ForgeCaps").and_then(Tag::as_compound).unwrap();
        let data = caps.get("mmorpg:entity_data").and_then(Tag::as_compound).unwrap();
        assert_eq!(data.get("exp").and_then(Tag::as_i64), Some(9_000_000_000));
        assert_eq!(data.get("hp").and_then(Tag::as_i64), Some(187));
    }

    #[test]
    fn test_root_name_is_kept() {
        let tree = NamedTag::new("player", Compound::new().with("a", Tag::Byte(1)));
        let decoded = decode(&to_bytes(&tree).unwrap()).unwrap();
        assert_eq!(decoded.name, "player");
    }

    #[test]
    fn test_list_of_compounds_keeps_order() {
        let entries: Vec<Tag> = ["health", "energy", "mana"]
            .iter()
            .map(|id| Tag::Compound(Compound::new().with("i", Tag::String(id.to_string()))))
            .collect();
        let tree = NamedTag::new(
            "",
            Compound::new().with("units", Tag::List(NbtList::new(TAG_COMPOUND, entries))),
        );
        let decoded = decode(&to_bytes(&tree).unwrap()).unwrap();
        let ids: Vec<&str> = decoded
            .compound
            .get("units")
            .and_then(Tag::as_list)
            .unwrap()
            .iter()
            .filter_map(|t| t.as_compound()?.get("i")?.as_str())
            .collect();
        assert_eq!(ids, vec!["health", "energy", "mana"]);
    }

    #[test]
    fn test_rejects_bad_gzip_header() {
        let err = decode_gzip(&[0x1f, 0x00, 0x08]).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::InvalidGzipHeader);
        assert_eq!(err.offset, 1);

        let err = decode_gzip(&[0x1f]).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::InvalidGzipHeader);
    }

    #[test]
    fn test_rejects_truncated_gzip() {
        let bytes = to_gzip_bytes(&sample_tree()).unwrap();
        let err = decode_gzip(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(
            err.kind,
            DecodeErrorKind::Decompress(_) | DecodeErrorKind::UnexpectedEof { .. }
        ));
    }

    #[test]
    fn test_truncated_stream_reports_offset() {
        let bytes = to_bytes(&sample_tree()).unwrap();
        let cut = bytes.len() - 5;
        let err = decode(&bytes[..cut]).unwrap_err();
        assert!(matches!(err.kind, DecodeErrorKind::UnexpectedEof { .. }));
        assert!(err.offset <= cut);
    }

    #[test]
    fn test_unknown_tag_type() {
        // root compound "", then an entry with type id 13
        let bytes = [TAG_COMPOUND, 0, 0, 13, 0, 1, b'x', 0];
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::UnknownTag(13));
        assert_eq!(err.offset, 3);
    }

    #[test]
    fn test_root_must_be_compound() {
        let err = decode(&[TAG_INT, 0, 0, 0, 0, 0, 1]).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::RootNotCompound(TAG_INT));
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn test_array_length_exceeding_buffer() {
        // root { "a": IntArray(len = 1000) } with no payload
        let bytes = [TAG_COMPOUND, 0, 0, TAG_INT_ARRAY, 0, 1, b'a', 0, 0, 0x03, 0xe8, 0];
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(
            err.kind,
            DecodeErrorKind::LengthExceedsBuffer { length: 1000, .. }
        ));
        assert_eq!(err.offset, 7);
    }

    #[test]
    fn test_negative_list_length() {
        let bytes = [
            TAG_COMPOUND, 0, 0, TAG_LIST, 0, 1, b'l', TAG_INT, 0xff, 0xff, 0xff, 0xfe, 0,
        ];
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::NegativeLength(-2));
    }

    #[test]
    fn test_string_length_exceeding_buffer() {
        let bytes = [TAG_COMPOUND, 0, 0, TAG_STRING, 0, 1, b's', 0x00, 0x40, b'a'];
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(
            err.kind,
            DecodeErrorKind::LengthExceedsBuffer { length: 64, remaining: 1 }
        ));
    }

    #[test]
    fn test_repeated_name_replaces_in_place() {
        let mut bytes = vec![TAG_COMPOUND, 0, 0];
        for (name, value) in [(b'a', 1i32), (b'b', 2), (b'a', 3)] {
            bytes.extend_from_slice(&[TAG_INT, 0, 1, name]);
            bytes.extend_from_slice(&value.to_be_bytes());
        }
        bytes.push(TAG_END);

        let root = decode(&bytes).unwrap().compound;
        let entries: Vec<(&str, &Tag)> = root.iter().collect();
        assert_eq!(entries, vec![("a", &Tag::Int(3)), ("b", &Tag::Int(2))]);
    }

    #[test]
    fn test_wide_compound() {
        let wide = Compound::from_unique_entries(
            (0..50_000).map(|i| (format!("k{}", i), Tag::Int(i))).collect(),
        );
        let bytes = to_bytes(&NamedTag::new("", wide)).unwrap();

        let root = decode(&bytes).unwrap().compound;
        assert_eq!(root.len(), 50_000);
        assert_eq!(root.get("k49999"), Some(&Tag::Int(49_999)));
        assert_eq!(root.iter().next().map(|(k, _)| k), Some("k0"));
    }

    #[test]
    fn test_depth_limit() {
        let mut tag = Tag::Compound(Compound::new());
        for _ in 0..(MAX_DEPTH + 5) {
            tag = Tag::Compound(Compound::new().with("n", tag));
        }
        let tree = NamedTag::new("", Compound::new().with("deep", tag));
        let err = decode(&to_bytes(&tree).unwrap()).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::DepthLimitExceeded(MAX_DEPTH));
    }
}
