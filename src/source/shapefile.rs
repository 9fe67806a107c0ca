//! Reader for ESRI shapefiles: `.shp` geometry paired with `.dbf` attributes.
//!
//! The shape file has big-endian file and record headers and little-endian
//! record content. Attribute records are fixed-width dBASE III rows and are
//! paired with shapes by position.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use geo::Coord;
use tracing::{debug, info};

use super::{open_ring, VertexSource};
use crate::error::SourceError;
use crate::models::{Ring, ShapeType, SourceRecord};

const FILE_CODE: i32 = 9994;
const SHP_HEADER_LEN: usize = 100;
const RECORD_HEADER_LEN: u64 = 8;
/// Shape type, bounding box, part count, point count
const POLYGON_FIXED_LEN: usize = 44;
const POINT_LEN: usize = 16;

const DBF_HEADER_LEN: usize = 32;
const DBF_FIELD_LEN: usize = 32;
const DBF_FIELD_TERMINATOR: u8 = 0x0D;

/// Shapefile-backed vertex source
pub struct ShapefileSource<S = BufReader<File>, D = BufReader<File>> {
    label: String,
    shp: S,
    dbf: DbfReader<D>,
    /// Bytes of shape records not yet read
    remaining: u64,
    index: usize,
}

impl ShapefileSource {
    /// Open `<dir>/<base_name>.shp` and its `.dbf`.
    ///
    /// Names come from `name_field`, or the first attribute field when `None`.
    pub fn open(
        dir: &Path,
        base_name: &str,
        name_field: Option<&str>,
    ) -> Result<Self, SourceError> {
        if !dir.is_dir() {
            return Err(SourceError::MissingDirectory(dir.to_path_buf()));
        }

        let shp_path = dir.join(format!("{}.shp", base_name));
        let dbf_path = dir.join(format!("{}.dbf", base_name));
        for path in [&shp_path, &dbf_path] {
            if !path.is_file() {
                return Err(SourceError::MissingFile(path.clone()));
            }
        }

        info!("Opening shapefile {}", shp_path.display());
        let shp = BufReader::new(File::open(&shp_path)?);
        let dbf = BufReader::new(File::open(&dbf_path)?);
        Self::from_readers(shp_path.display().to_string(), shp, dbf, name_field)
    }
}

impl<S: Read, D: Read> ShapefileSource<S, D> {
    pub fn from_readers(
        label: impl Into<String>,
        mut shp: S,
        dbf: D,
        name_field: Option<&str>,
    ) -> Result<Self, SourceError> {
        let mut header = [0u8; SHP_HEADER_LEN];
        read_exact(&mut shp, &mut header, "shape file header")?;

        let code = be_i32(&header, 0);
        if code != FILE_CODE {
            return Err(SourceError::BadFileCode(code));
        }

        // Lengths are counted in 16-bit words
        let file_len = be_u32(&header, 24) as u64 * 2;
        debug!(
            "Shape file is {} bytes, declared shape type {}",
            file_len,
            ShapeType::from_code(le_i32(&header, 32))
        );

        let dbf = DbfReader::new(dbf, name_field)?;

        Ok(Self {
            label: label.into(),
            shp,
            dbf,
            remaining: file_len.saturating_sub(SHP_HEADER_LEN as u64),
            index: 0,
        })
    }

    fn read_shape(&mut self) -> Result<Option<(ShapeType, Vec<Ring>)>, SourceError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        if self.remaining < RECORD_HEADER_LEN {
            return Err(SourceError::Truncated("record header"));
        }

        let mut header = [0u8; RECORD_HEADER_LEN as usize];
        read_exact(&mut self.shp, &mut header, "record header")?;

        let content_len = be_u32(&header, 4) as u64 * 2;
        if RECORD_HEADER_LEN + content_len > self.remaining {
            return Err(SourceError::MalformedRecord {
                index: self.index,
                reason: format!("content length {} runs past end of file", content_len),
            });
        }
        self.remaining -= RECORD_HEADER_LEN + content_len;

        let mut content = vec![0u8; content_len as usize];
        read_exact(&mut self.shp, &mut content, "record content")?;

        parse_shape(self.index, &content).map(Some)
    }
}

impl<S: Read, D: Read> VertexSource for ShapefileSource<S, D> {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.dbf.record_count)
    }

    fn next_record(&mut self) -> Result<Option<SourceRecord>, SourceError> {
        let shape = self.read_shape()?;
        let name = self.dbf.next_name()?;

        match (shape, name) {
            (Some((shape_type, rings)), Some(name)) => {
                let record = SourceRecord {
                    index: self.index,
                    name,
                    shape_type,
                    rings,
                };
                self.index += 1;
                Ok(Some(record))
            }
            (None, None) => Ok(None),
            (Some(_), None) => Err(SourceError::RecordCountMismatch {
                shapes: self.index + 1,
                attributes: self.dbf.record_count,
            }),
            (None, Some(_)) => Err(SourceError::RecordCountMismatch {
                shapes: self.index,
                attributes: self.dbf.record_count,
            }),
        }
    }
}

/// Decode one shape record's content. Non-polygon shapes carry no rings.
fn parse_shape(index: usize, content: &[u8]) -> Result<(ShapeType, Vec<Ring>), SourceError> {
    let malformed = |reason: String| SourceError::MalformedRecord { index, reason };

    if content.len() < 4 {
        return Err(malformed("missing shape type".to_string()));
    }

    let shape_type = ShapeType::from_code(le_i32(content, 0));
    if shape_type != ShapeType::Polygon {
        return Ok((shape_type, Vec::new()));
    }

    if content.len() < POLYGON_FIXED_LEN {
        return Err(malformed(format!(
            "polygon record is only {} bytes",
            content.len()
        )));
    }

    let num_parts = le_i32(content, 36);
    let num_points = le_i32(content, 40);
    if num_parts < 0 || num_points < 0 {
        return Err(malformed(format!(
            "negative counts: {} parts, {} points",
            num_parts, num_points
        )));
    }
    let (num_parts, num_points) = (num_parts as usize, num_points as usize);

    let points_at = POLYGON_FIXED_LEN + 4 * num_parts;
    let needed = points_at + POINT_LEN * num_points;
    if content.len() < needed {
        return Err(malformed(format!(
            "needs {} bytes, record has {}",
            needed,
            content.len()
        )));
    }

    let mut parts = Vec::with_capacity(num_parts);
    for i in 0..num_parts {
        let start = le_i32(content, POLYGON_FIXED_LEN + 4 * i);
        let prev = parts.last().copied().unwrap_or(0);
        if start < 0 || start as usize > num_points || (start as usize) < prev {
            return Err(malformed(format!("part {} starts at {}", i, start)));
        }
        parts.push(start as usize);
    }

    let point = |i: usize| {
        let at = points_at + POINT_LEN * i;
        Coord {
            x: le_f64(content, at),
            y: le_f64(content, at + 8),
        }
    };

    let rings = parts
        .iter()
        .enumerate()
        .map(|(p, &start)| {
            let end = parts.get(p + 1).copied().unwrap_or(num_points);
            open_ring((start..end).map(point).collect())
        })
        .collect();

    Ok((ShapeType::Polygon, rings))
}

struct DbfField {
    name: String,
    /// Offset inside a record, after the deletion flag
    offset: usize,
    len: usize,
}

/// Reads one text field from each dBASE record
struct DbfReader<R> {
    reader: R,
    record_count: usize,
    field: DbfField,
    read: usize,
    buf: Vec<u8>,
}

impl<R: Read> DbfReader<R> {
    fn new(mut reader: R, name_field: Option<&str>) -> Result<Self, SourceError> {
        let mut header = [0u8; DBF_HEADER_LEN];
        read_exact(&mut reader, &mut header, "attribute table header")?;

        let record_count = le_u32(&header, 4) as usize;
        let header_len = u16::from_le_bytes([header[8], header[9]]) as usize;
        let record_len = u16::from_le_bytes([header[10], header[11]]) as usize;
        if header_len <= DBF_HEADER_LEN {
            return Err(SourceError::Truncated("attribute field descriptors"));
        }

        let mut descriptors = vec![0u8; header_len - DBF_HEADER_LEN];
        read_exact(&mut reader, &mut descriptors, "attribute field descriptors")?;

        let mut fields = Vec::new();
        let mut offset = 1;
        for chunk in descriptors.chunks(DBF_FIELD_LEN) {
            if chunk[0] == DBF_FIELD_TERMINATOR || chunk.len() < DBF_FIELD_LEN {
                break;
            }
            let name_end = chunk[..11].iter().position(|b| *b == 0).unwrap_or(11);
            let len = chunk[16] as usize;
            fields.push(DbfField {
                name: String::from_utf8_lossy(&chunk[..name_end]).trim().to_string(),
                offset,
                len,
            });
            offset += len;
        }

        let field = match name_field {
            Some(wanted) => fields
                .into_iter()
                .find(|f| f.name.eq_ignore_ascii_case(wanted))
                .ok_or_else(|| SourceError::MissingField(wanted.to_string()))?,
            None => fields
                .into_iter()
                .next()
                .ok_or_else(|| SourceError::MissingField("<first field>".to_string()))?,
        };
        if field.offset + field.len > record_len {
            return Err(SourceError::Truncated("attribute record"));
        }
        debug!(
            "Reading {} names from attribute field {}",
            record_count, field.name
        );

        Ok(Self {
            reader,
            record_count,
            field,
            read: 0,
            buf: vec![0; record_len],
        })
    }

    fn next_name(&mut self) -> Result<Option<String>, SourceError> {
        if self.read >= self.record_count {
            return Ok(None);
        }
        read_exact(&mut self.reader, &mut self.buf, "attribute record")?;
        self.read += 1;

        let raw = &self.buf[self.field.offset..self.field.offset + self.field.len];
        Ok(Some(String::from_utf8_lossy(raw).trim().to_string()))
    }
}

fn read_exact<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    what: &'static str,
) -> Result<(), SourceError> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            SourceError::Truncated(what)
        } else {
            SourceError::Io(e)
        }
    })
}

fn be_i32(b: &[u8], at: usize) -> i32 {
    i32::from_be_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

fn be_u32(b: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

fn le_i32(b: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

fn le_u32(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

fn le_f64(b: &[u8], at: usize) -> f64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&b[at..at + 8]);
    f64::from_le_bytes(bytes)
}
