//! NumPy `.npy` array blobs.
//!
//! Blobs are version 1.0 files whose header is padded so the payload starts
//! on a 64-byte boundary. That keeps a memory-mapped payload aligned for
//! both `f32` and `f64`, so cache hits can be served without copying.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use memmap2::Mmap;

use crate::error::BlobError;
use crate::raster::{DType, Raster};

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const PAYLOAD_ALIGN: usize = 64;

/// Parsed `.npy` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NpyHeader {
    pub dtype: DType,
    pub rows: usize,
    pub cols: usize,
    /// Byte offset of the payload from the start of the file.
    pub data_offset: usize,
}

impl NpyHeader {
    /// Payload size the header describes, `None` if it overflows `usize`.
    pub fn payload_len(&self) -> Option<usize> {
        self.rows
            .checked_mul(self.cols)?
            .checked_mul(self.dtype.size())
    }
}

/// Encode the header for a `rows x cols` array of `dtype`.
pub fn encode_header(dtype: DType, rows: usize, cols: usize) -> Vec<u8> {
    let dict = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': ({}, {}), }}",
        dtype.descr(),
        rows,
        cols
    );

    // magic + version + u16 length, then the dict and a terminating newline
    let preamble = MAGIC.len() + 2 + 2;
    let total = (preamble + dict.len() + 1).div_ceil(PAYLOAD_ALIGN) * PAYLOAD_ALIGN;
    let header_len = total - preamble;

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header_len as u16).to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out.resize(total - 1, b' ');
    out.push(b'\n');
    out
}

/// Write `raster` as a complete `.npy` blob.
pub fn write_to<W: Write>(raster: &Raster, writer: &mut W) -> Result<(), BlobError> {
    writer.write_all(&encode_header(raster.dtype(), raster.rows(), raster.cols()))?;

    if cfg!(target_endian = "little") {
        writer.write_all(raster.as_bytes())?;
    } else if let Some(values) = raster.as_f32() {
        for v in values {
            writer.write_all(&v.to_le_bytes())?;
        }
    } else if let Some(values) = raster.as_f64() {
        for v in values {
            writer.write_all(&v.to_le_bytes())?;
        }
    }
    Ok(())
}

/// Parse the header at the start of `bytes`.
pub fn parse_header(bytes: &[u8]) -> Result<NpyHeader, BlobError> {
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err(BlobError::invalid("missing npy magic"));
    }

    let (header_len, text_start) = match bytes[6] {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(BlobError::invalid("truncated preamble"));
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
            (len as usize, 12)
        }
        major => return Err(BlobError::unsupported(format!("format version {major}"))),
    };

    let data_offset = text_start + header_len;
    let text = bytes
        .get(text_start..data_offset)
        .ok_or_else(|| BlobError::invalid("truncated header"))?;
    let text = std::str::from_utf8(text).map_err(|_| BlobError::invalid("header is not text"))?;

    let descr = dict_value(text, "descr")
        .and_then(quoted)
        .ok_or_else(|| BlobError::invalid("header has no descr"))?;
    let dtype = DType::from_descr(descr)
        .ok_or_else(|| BlobError::unsupported(format!("dtype {descr}")))?;

    let fortran_order = dict_value(text, "fortran_order")
        .ok_or_else(|| BlobError::invalid("header has no fortran_order"))?;
    if fortran_order.starts_with("True") {
        return Err(BlobError::unsupported("fortran-ordered array"));
    } else if !fortran_order.starts_with("False") {
        return Err(BlobError::invalid("malformed fortran_order"));
    }

    let shape = dict_value(text, "shape")
        .and_then(parse_shape)
        .ok_or_else(|| BlobError::invalid("malformed shape"))?;
    let (rows, cols) = match shape.as_slice() {
        [rows, cols] => (*rows, *cols),
        other => {
            return Err(BlobError::unsupported(format!(
                "{}-dimensional array",
                other.len()
            )))
        }
    };

    let header = NpyHeader {
        dtype,
        rows,
        cols,
        data_offset,
    };
    if header.payload_len().is_none() {
        return Err(BlobError::invalid(format!("shape ({rows}, {cols}) overflows")));
    }
    Ok(header)
}

/// Read only the header of the blob at `path`.
pub fn read_header(path: &Path) -> Result<NpyHeader, BlobError> {
    let map = map_file(path)?;
    parse_header(&map)
}

/// Open the blob at `path` as a read-only raster.
///
/// The payload is memory-mapped when it is aligned and the host is
/// little-endian; otherwise it is decoded into an owned buffer.
pub fn load(path: &Path) -> Result<Raster, BlobError> {
    let map = map_file(path)?;
    let header = parse_header(&map)?;

    let expected = header
        .payload_len()
        .ok_or_else(|| BlobError::invalid("shape overflows"))?;
    let available = map.len().saturating_sub(header.data_offset);
    if available != expected {
        return Err(BlobError::invalid(format!(
            "payload is {available} bytes, header describes {expected}"
        )));
    }

    if cfg!(target_endian = "little") && header.data_offset % header.dtype.size() == 0 {
        return Ok(Raster::from_mapped(
            header.rows,
            header.cols,
            header.dtype,
            map,
            header.data_offset,
        ));
    }

    let payload = &map[header.data_offset..];
    let raster = match header.dtype {
        DType::F32 => Raster::from_f32(
            header.rows,
            header.cols,
            payload
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        ),
        DType::F64 => Raster::from_f64(
            header.rows,
            header.cols,
            payload
                .chunks_exact(8)
                .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
                .collect(),
        ),
    };
    raster.map_err(|e| BlobError::invalid(e.to_string()))
}

fn map_file(path: &Path) -> Result<Mmap, BlobError> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(BlobError::invalid("empty file"));
    }
    // SAFETY: cache files are written once under a temporary name and renamed
    // into place; nothing writes to a file after it becomes visible.
    let map = unsafe { Mmap::map(&file)? };
    Ok(map)
}

/// Text following `'key':` in a header dict, leading whitespace trimmed.
fn dict_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let single = format!("'{key}':");
    let double = format!("\"{key}\":");
    let (pos, len) = text
        .find(&single)
        .map(|p| (p, single.len()))
        .or_else(|| text.find(&double).map(|p| (p, double.len())))?;
    Some(text[pos + len..].trim_start())
}

fn quoted(value: &str) -> Option<&str> {
    let quote = value.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let rest = &value[1..];
    rest.find(quote).map(|end| &rest[..end])
}

fn parse_shape(value: &str) -> Option<Vec<usize>> {
    let inner = value.strip_prefix('(')?;
    let inner = &inner[..inner.find(')')?];
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_is_aligned() {
        for (rows, cols) in [(1, 1), (600, 1440), (75, 180), (123_456, 7)] {
            let header = encode_header(DType::F32, rows, cols);
            assert_eq!(header.len() % PAYLOAD_ALIGN, 0);
            assert_eq!(*header.last().unwrap(), b'\n');

            let parsed = parse_header(&header).unwrap();
            assert_eq!((parsed.rows, parsed.cols), (rows, cols));
            assert_eq!(parsed.data_offset, header.len());
        }
    }

    #[test]
    fn test_header_text_matches_numpy_layout() {
        let header = encode_header(DType::F64, 2, 3);
        let text = std::str::from_utf8(&header[10..]).unwrap();
        assert!(text.starts_with("{'descr': '<f8', 'fortran_order': False, 'shape': (2, 3), }"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_header(b"not a numpy file"),
            Err(BlobError::Invalid(_))
        ));
        let mut header = encode_header(DType::F32, 2, 2);
        header.truncate(20);
        assert!(matches!(parse_header(&header), Err(BlobError::Invalid(_))));
    }

    #[test]
    fn test_parse_rejects_unsupported_layouts() {
        let mut one_d = Vec::new();
        one_d.extend_from_slice(MAGIC);
        one_d.extend_from_slice(&[1, 0]);
        let dict = b"{'descr': '<f4', 'fortran_order': False, 'shape': (4,), }\n";
        one_d.extend_from_slice(&(dict.len() as u16).to_le_bytes());
        one_d.extend_from_slice(dict);
        assert!(matches!(parse_header(&one_d), Err(BlobError::Unsupported(_))));

        let fortran = String::from_utf8(encode_header(DType::F32, 2, 2)[10..].to_vec())
            .unwrap()
            .replace("False", "True ");
        let mut blob = encode_header(DType::F32, 2, 2)[..10].to_vec();
        blob.extend_from_slice(fortran.as_bytes());
        assert!(matches!(parse_header(&blob), Err(BlobError::Unsupported(_))));

        let ints = String::from_utf8(encode_header(DType::F32, 2, 2)[10..].to_vec())
            .unwrap()
            .replace("<f4", "<i4");
        let mut blob = encode_header(DType::F32, 2, 2)[..10].to_vec();
        blob.extend_from_slice(ints.as_bytes());
        assert!(matches!(parse_header(&blob), Err(BlobError::Unsupported(_))));
    }

    fn raw_header(dict: &str) -> Vec<u8> {
        let mut blob = Vec::new();
        blob.extend_from_slice(MAGIC);
        blob.extend_from_slice(&[1, 0]);
        blob.extend_from_slice(&(dict.len() as u16).to_le_bytes());
        blob.extend_from_slice(dict.as_bytes());
        blob
    }

    #[test]
    fn test_parse_rejects_overflowing_shape() {
        let blob = raw_header(
            "{'descr': '<f4', 'fortran_order': False, 'shape': (1099511627776, 1099511627776), }\n",
        );
        assert!(matches!(parse_header(&blob), Err(BlobError::Invalid(_))));

        let header = NpyHeader {
            dtype: DType::F64,
            rows: usize::MAX / 2,
            cols: 3,
            data_offset: 128,
        };
        assert_eq!(header.payload_len(), None);
        assert_eq!(
            NpyHeader { rows: 2, ..header }.payload_len(),
            Some(48)
        );
    }

    #[test]
    fn test_write_then_load_is_memory_mapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slice.npy");
        let raster = Raster::from_f32(2, 3, vec![1.0, 2.0, f32::NAN, 4.0, 5.0, 6.0]).unwrap();

        let mut file = File::create(&path).unwrap();
        write_to(&raster, &mut file).unwrap();
        drop(file);

        let loaded = load(&path).unwrap();
        assert!(loaded.is_memory_mapped());
        assert_eq!(loaded, raster);
        assert_eq!(loaded.value(1, 2), Some(6.0));
    }

    #[test]
    fn test_load_rejects_truncated_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.npy");
        let raster = Raster::from_f64(4, 4, vec![0.5; 16]).unwrap();

        let mut bytes = Vec::new();
        write_to(&raster, &mut bytes).unwrap();
        bytes.truncate(bytes.len() - 8);
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(load(&path), Err(BlobError::Invalid(_))));
    }

    #[test]
    fn test_load_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.npy");
        std::fs::write(&path, b"").unwrap();
        assert!(matches!(load(&path), Err(BlobError::Invalid(_))));
    }
}
