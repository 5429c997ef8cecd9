//! `MAT` material container decoding.
//!
//! A MAT file is a little-endian container holding a directory of texture
//! records followed by raw 8-bit pixel grids. Only mip level 0 of each
//! texture is materialized; the byte count of the remaining levels is
//! computed and the cursor skipped past them. Decoding runs as three schema
//! passes over progressively narrower slices: container header, texture
//! directory, pixel payloads.

use crate::schema::{Record, Schema, Value};
use crate::DecodeError;

/// Container tag, including the trailing space.
pub const MAT_TAG: &str = "MAT ";
/// The only container version this reader understands.
pub const MAT_VERSION: u32 = 0x32;
/// Bit pattern of `1.0f32`; appears four times in every directory entry.
const FLOAT_ONE_BITS: u32 = 0x3f80_0000;

/// A decoded material container. `entries` and `textures` are index-aligned:
/// `textures[i]` is the pixel data for `entries[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatFile {
    pub material_type: i32,
    pub entries: Vec<MatEntry>,
    pub textures: Vec<MatTexture>,
}

/// Directory record describing one texture slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatEntry {
    pub texture_type: i32,
    pub color_count: i32,
    pub texture_index: i32,
}

/// One texture, mip level 0 only. `pixels` always holds exactly
/// `size_x * size_y` colormap-indexed samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatTexture {
    pub size_x: i32,
    pub size_y: i32,
    pub mipmap_count: i32,
    pub pixels: Vec<u8>,
}

fn header_schema() -> Schema {
    Schema::le()
        .str("tag", 4)
        .expect_str(MAT_TAG)
        .u32("version")
        .expect_u32(MAT_VERSION)
        .i32("material_type")
        .i32("texture_count")
        .i32("texture_count2")
        .u32("zero")
        .expect_u32(0)
        .u32("eight")
        .expect_u32(8)
        .skip(48) // 12 undocumented words
        .remaining("payload")
}

fn entry_schema() -> Schema {
    Schema::le()
        .i32("texture_type")
        .i32("color_count")
        .u32("one0")
        .expect_u32(FLOAT_ONE_BITS)
        .u32("one1")
        .expect_u32(FLOAT_ONE_BITS)
        .u32("one2")
        .expect_u32(FLOAT_ONE_BITS)
        .u32("one3")
        .expect_u32(FLOAT_ONE_BITS)
        // two undocumented words, then a tag the community format notes give
        // as 0xBFF78482; shipping files contradict that, so it goes unchecked
        .skip(12)
        .i32("texture_index")
}

fn directory_schema(count: usize) -> Schema {
    Schema::le()
        .array("entries", entry_schema(), count)
        .remaining("payload")
}

fn texture_schema() -> Schema {
    Schema::le()
        .i32("size_x")
        .i32("size_y")
        .skip(12) // transparency and padding words
        .i32("mipmap_count")
        .bytes_with("pixels", |r| Ok(r.int("size_x")? * r.int("size_y")?))
        // level 0 is the grid decoded above; each further level halves in
        // byte count and is measured out without being kept
        .skip_with(|r| {
            let base = r.int("size_x")? * r.int("size_y")?;
            let mut total = 0;
            for level in 1..r.int("mipmap_count")? {
                let bytes = base >> level;
                if bytes == 0 {
                    break;
                }
                total += bytes;
            }
            Ok(total)
        })
}

/// Decodes a complete MAT container. Any validation or bounds failure
/// anywhere aborts the import; no partial containers are returned.
pub fn read_mat(buf: &[u8]) -> Result<MatFile, DecodeError> {
    let header = header_schema().decode(buf)?;

    let declared = header.int("texture_count")?;
    let count = usize::try_from(declared).map_err(|_| DecodeError::InvalidLength {
        field: "texture_count".into(),
        length: declared,
    })?;

    let directory = directory_schema(count).decode(header.bytes("payload")?)?;
    let entries = directory
        .list("entries")?
        .iter()
        .map(entry_from)
        .collect::<Result<Vec<_>, _>>()?;

    let payloads = Schema::le()
        .array("textures", texture_schema(), count)
        .decode(directory.bytes("payload")?)?;
    let textures = payloads
        .list("textures")?
        .iter()
        .map(texture_from)
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!("MAT import: {} textures", textures.len());
    Ok(MatFile {
        material_type: header.int("material_type")? as i32,
        entries,
        textures,
    })
}

fn entry_from(value: &Value) -> Result<MatEntry, DecodeError> {
    let record = item_record(value)?;
    Ok(MatEntry {
        texture_type: record.int("texture_type")? as i32,
        color_count: record.int("color_count")? as i32,
        texture_index: record.int("texture_index")? as i32,
    })
}

fn texture_from(value: &Value) -> Result<MatTexture, DecodeError> {
    let record = item_record(value)?;
    Ok(MatTexture {
        size_x: record.int("size_x")? as i32,
        size_y: record.int("size_y")? as i32,
        mipmap_count: record.int("mipmap_count")? as i32,
        pixels: record.bytes("pixels")?.to_vec(),
    })
}

fn item_record(value: &Value) -> Result<&Record, DecodeError> {
    value.as_record().ok_or(DecodeError::TypeMismatch {
        field: "array item".into(),
        expected: "a record",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{WriteBytesExt, LE};

    fn header(material_type: i32, count: i32) -> Vec<u8> {
        let mut buf = vec![];
        buf.extend_from_slice(b"MAT ");
        buf.write_u32::<LE>(MAT_VERSION).unwrap();
        buf.write_i32::<LE>(material_type).unwrap();
        buf.write_i32::<LE>(count).unwrap();
        buf.write_i32::<LE>(count).unwrap();
        buf.write_u32::<LE>(0).unwrap();
        buf.write_u32::<LE>(8).unwrap();
        buf.extend_from_slice(&[0u8; 48]);
        buf
    }

    fn entry(texture_index: i32) -> Vec<u8> {
        let mut buf = vec![];
        buf.write_i32::<LE>(0).unwrap(); // texture type
        buf.write_i32::<LE>(64).unwrap(); // color count
        for _ in 0..4 {
            buf.write_u32::<LE>(0x3f80_0000).unwrap();
        }
        buf.extend_from_slice(&[0u8; 12]);
        buf.write_i32::<LE>(texture_index).unwrap();
        buf
    }

    fn texture(size: i32, mipmap_count: i32, fill: u8) -> Vec<u8> {
        let mut buf = vec![];
        buf.write_i32::<LE>(size).unwrap();
        buf.write_i32::<LE>(size).unwrap();
        buf.extend_from_slice(&[0u8; 12]);
        buf.write_i32::<LE>(mipmap_count).unwrap();
        buf.extend(std::iter::repeat(fill).take((size * size) as usize));
        for level in 1..mipmap_count {
            let bytes = ((size * size) >> level) as usize;
            buf.extend(std::iter::repeat(0xEE).take(bytes));
        }
        buf
    }

    fn container(textures: &[(i32, i32, u8)]) -> Vec<u8> {
        let mut buf = header(2, textures.len() as i32);
        for (index, _) in textures.iter().enumerate() {
            buf.extend(entry(index as i32));
        }
        for &(size, mipmap_count, fill) in textures {
            buf.extend(texture(size, mipmap_count, fill));
        }
        buf
    }

    #[test]
    fn directory_and_textures_stay_index_aligned() {
        let buf = container(&[(4, 3, 0x11), (2, 1, 0x22)]);
        let mat = read_mat(&buf).unwrap();

        assert_eq!(mat.material_type, 2);
        assert_eq!(mat.entries.len(), 2);
        assert_eq!(mat.textures.len(), 2);
        assert_eq!(mat.entries[0].texture_index, 0);
        assert_eq!(mat.entries[1].texture_index, 1);

        // pixel buffers hold exactly size_x * size_y samples, mips excluded
        assert_eq!(mat.textures[0].pixels, vec![0x11; 16]);
        assert_eq!(mat.textures[1].pixels, vec![0x22; 4]);
        assert_eq!(mat.textures[0].mipmap_count, 3);
    }

    #[test]
    fn mipmap_skip_for_4x4_with_3_levels_is_12_bytes() {
        // 16/2 + 16/4 = 12 trailing mip bytes; the second texture only
        // decodes correctly if the skip consumed exactly that many
        let buf = container(&[(4, 3, 0x11), (2, 1, 0x22)]);
        let with_mips = texture(4, 3, 0);
        let without_mips = texture(4, 1, 0);
        assert_eq!(with_mips.len() - without_mips.len(), 12);

        let mat = read_mat(&buf).unwrap();
        assert_eq!(mat.textures[1].pixels, vec![0x22; 4]);
    }

    #[test]
    fn short_mipmap_tail_is_an_invalid_length() {
        let mut buf = container(&[(4, 3, 0x11)]);
        buf.truncate(buf.len() - 1); // 11 of the 12 mip bytes remain
        let err = read_mat(&buf).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidLength { .. }));
    }

    #[test]
    fn corrupt_magic_float_fails_validation_with_no_textures() {
        let mut buf = container(&[(4, 1, 0x11)]);
        // second magic float of the first entry, 8 bytes into the directory
        let offset = header(2, 1).len() + 12;
        buf[offset] = 0x01;
        match read_mat(&buf).unwrap_err() {
            DecodeError::ValidationFailed { field, .. } => assert_eq!(field, "one1"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unsupported_version_fails_validation() {
        let mut buf = container(&[(2, 1, 0x33)]);
        buf[4] = 0x31;
        match read_mat(&buf).unwrap_err() {
            DecodeError::ValidationFailed { field, .. } => assert_eq!(field, "version"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn wrong_tag_fails_validation() {
        let mut buf = container(&[(2, 1, 0x33)]);
        buf[0] = b'X';
        assert!(matches!(
            read_mat(&buf).unwrap_err(),
            DecodeError::ValidationFailed { .. }
        ));
    }

    #[test]
    fn truncated_pixels_are_reported() {
        let mut buf = container(&[(4, 1, 0x11)]);
        buf.truncate(buf.len() - 3);
        assert!(matches!(
            read_mat(&buf).unwrap_err(),
            DecodeError::InvalidLength { .. } | DecodeError::TruncatedInput { .. }
        ));
    }

    #[test]
    fn negative_texture_count_is_invalid() {
        let buf = header(2, -1);
        assert!(matches!(
            read_mat(&buf).unwrap_err(),
            DecodeError::InvalidLength { length: -1, .. }
        ));
    }
}
