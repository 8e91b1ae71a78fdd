//! NBT encoding
//!
//! Inverse of [`super::decode`]. Used to build playerdata fixtures and by
//! tooling that rewrites trees for inspection.

use super::{Compound, NamedTag, NbtList, Tag, TAG_COMPOUND, TAG_END};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Write};

/// Encode a tree as uncompressed NBT
pub fn to_bytes(tree: &NamedTag) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    write_named_root(&mut out, tree)?;
    Ok(out)
}

/// Encode a tree as gzip-compressed NBT, the on-disk playerdata format
pub fn to_gzip_bytes(tree: &NamedTag) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    write_named_root(&mut encoder, tree)?;
    encoder.finish()
}

fn write_named_root<W: Write>(out: &mut W, tree: &NamedTag) -> io::Result<()> {
    out.write_all(&[TAG_COMPOUND])?;
    write_string(out, &tree.name)?;
    write_compound(out, &tree.compound)
}

fn write_string<W: Write>(out: &mut W, s: &str) -> io::Result<()> {
    let len = u16::try_from(s.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("string of {} bytes does not fit a u16 length", s.len()),
        )
    })?;
    out.write_all(&len.to_be_bytes())?;
    out.write_all(s.as_bytes())
}

fn write_len<W: Write>(out: &mut W, len: usize) -> io::Result<()> {
    let len = i32::try_from(len).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "array longer than i32::MAX")
    })?;
    out.write_all(&len.to_be_bytes())
}

fn write_compound<W: Write>(out: &mut W, compound: &Compound) -> io::Result<()> {
    for (name, tag) in compound.iter() {
        out.write_all(&[tag.type_id()])?;
        write_string(out, name)?;
        write_payload(out, tag)?;
    }
    out.write_all(&[TAG_END])
}

fn write_list<W: Write>(out: &mut W, list: &NbtList) -> io::Result<()> {
    if let Some(bad) = list.iter().find(|t| t.type_id() != list.element_type) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "list declared as type {} holds a type {} element",
                list.element_type,
                bad.type_id()
            ),
        ));
    }
    out.write_all(&[list.element_type])?;
    write_len(out, list.len())?;
    for item in list.iter() {
        write_payload(out, item)?;
    }
    Ok(())
}

fn write_payload<W: Write>(out: &mut W, tag: &Tag) -> io::Result<()> {
    match tag {
        Tag::Byte(v) => out.write_all(&v.to_be_bytes()),
        Tag::Short(v) => out.write_all(&v.to_be_bytes()),
        Tag::Int(v) => out.write_all(&v.to_be_bytes()),
        Tag::Long(v) => out.write_all(&v.to_be_bytes()),
        Tag::Float(v) => out.write_all(&v.to_be_bytes()),
        Tag::Double(v) => out.write_all(&v.to_be_bytes()),
        Tag::ByteArray(values) => {
            write_len(out, values.len())?;
            let bytes: Vec<u8> = values.iter().map(|b| *b as u8).collect();
            out.write_all(&bytes)
        }
        Tag::String(s) => write_string(out, s),
        Tag::List(list) => write_list(out, list),
        Tag::Compound(c) => write_compound(out, c),
        Tag::IntArray(values) => {
            write_len(out, values.len())?;
            for v in values {
                out.write_all(&v.to_be_bytes())?;
            }
            Ok(())
        }
        Tag::LongArray(values) => {
            write_len(out, values.len())?;
            for v in values {
                out.write_all(&v.to_be_bytes())?;
            }
            Ok(())
        }
    }
}
