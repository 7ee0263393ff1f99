//! GeoTIFF encoding and decoding.
//!
//! Writes classic little-endian TIFF with IEEE float32 samples, pixel
//! interleaving and a single strip, carrying GeoTIFF keys for the CRS,
//! the affine transform tags and the GDAL band-description and nodata
//! tags. The decoder handles the subset of TIFF needed to inspect our
//! own output and fetched products: little-endian, chunky planar
//! configuration, uncompressed or deflate strips, float32 or unsigned
//! 8/16 bit samples.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::io::{Read, Write};

use eo_common::{Dataset, EoError, EoResult};

// TIFF field types
const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_DOUBLE: u16 = 12;

// Baseline tags, ascending order as required in an IFD
const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;
const TAG_BITS_PER_SAMPLE: u16 = 258;
const TAG_COMPRESSION: u16 = 259;
const TAG_PHOTOMETRIC: u16 = 262;
const TAG_STRIP_OFFSETS: u16 = 273;
const TAG_SAMPLES_PER_PIXEL: u16 = 277;
const TAG_ROWS_PER_STRIP: u16 = 278;
const TAG_STRIP_BYTE_COUNTS: u16 = 279;
const TAG_PLANAR_CONFIG: u16 = 284;
const TAG_SAMPLE_FORMAT: u16 = 339;

// GeoTIFF and GDAL tags
const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_METADATA: u16 = 42112;
const TAG_GDAL_NODATA: u16 = 42113;

const COMPRESSION_NONE: u16 = 1;
const COMPRESSION_DEFLATE: u16 = 8;
const PHOTOMETRIC_MIN_IS_BLACK: u16 = 1;
const PLANAR_CHUNKY: u16 = 1;
const SAMPLE_FORMAT_UINT: u16 = 1;
const SAMPLE_FORMAT_IEEE_FLOAT: u16 = 3;

// GeoTIFF keys
const KEY_MODEL_TYPE: u16 = 1024;
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;
const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Options for GeoTIFF encoding.
#[derive(Debug, Clone)]
pub struct GeoTiffOptions {
    /// Deflate-compress the pixel strip.
    pub compress: bool,
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self { compress: true }
    }
}

enum TagValue {
    Shorts(Vec<u16>),
    Longs(Vec<u32>),
    Doubles(Vec<f64>),
    Ascii(String),
}

impl TagValue {
    fn field_type(&self) -> u16 {
        match self {
            TagValue::Shorts(_) => TYPE_SHORT,
            TagValue::Longs(_) => TYPE_LONG,
            TagValue::Doubles(_) => TYPE_DOUBLE,
            TagValue::Ascii(_) => TYPE_ASCII,
        }
    }

    fn count(&self) -> u32 {
        match self {
            TagValue::Shorts(v) => v.len() as u32,
            TagValue::Longs(v) => v.len() as u32,
            TagValue::Doubles(v) => v.len() as u32,
            // ASCII counts the trailing NUL
            TagValue::Ascii(s) => s.len() as u32 + 1,
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        match self {
            TagValue::Shorts(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            TagValue::Longs(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            TagValue::Doubles(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            TagValue::Ascii(s) => {
                let mut bytes = s.as_bytes().to_vec();
                bytes.push(0);
                bytes
            }
        }
    }
}

/// Encode a dataset as a multiband GeoTIFF.
///
/// The trailing two dimensions map to rows and columns; every variable
/// contributes one band per leading index, variable-major. Requires a
/// spatial reference with an EPSG code representable in GeoTIFF keys.
pub fn encode(dataset: &Dataset, options: &GeoTiffOptions) -> EoResult<Vec<u8>> {
    if dataset.is_empty() {
        return Err(EoError::encoding("The dataset is empty and cannot be stored"));
    }
    let georef = dataset
        .georef()
        .ok_or_else(|| EoError::encoding("Dataset has no spatial reference"))?;
    let (height, width) = dataset.spatial_shape()?;
    let leading = dataset.leading_count();
    let bands = dataset.band_count();
    let epsg = georef.crs.epsg();
    if epsg > u16::MAX as u32 {
        return Err(EoError::encoding(format!(
            "EPSG code {} does not fit GeoTIFF keys",
            epsg
        )));
    }

    // Pixel-interleaved strip, bands ordered variable-major then
    // leading index.
    let plane = height * width;
    let variables = dataset.variables();
    let mut raw = Vec::with_capacity(plane * bands * 4);
    for y in 0..height {
        for x in 0..width {
            for b in 0..bands {
                let vi = b / leading;
                let li = b % leading;
                let value = variables[vi].values[li * plane + y * width + x];
                raw.extend_from_slice(&value.to_le_bytes());
            }
        }
    }

    let (strip, compression) = if options.compress {
        (deflate(&raw)?, COMPRESSION_DEFLATE)
    } else {
        (raw, COMPRESSION_NONE)
    };

    let transform = georef.transform;
    let model_type = if georef.crs.is_geographic() {
        MODEL_TYPE_GEOGRAPHIC
    } else {
        MODEL_TYPE_PROJECTED
    };
    let code_key = if georef.crs.is_geographic() {
        KEY_GEOGRAPHIC_TYPE
    } else {
        KEY_PROJECTED_CS_TYPE
    };
    // Directory header (version, revision, minor, key count), then one
    // (key, location, count, value) quadruple per key.
    let geo_directory = vec![
        1,
        1,
        0,
        3,
        KEY_MODEL_TYPE,
        0,
        1,
        model_type,
        KEY_RASTER_TYPE,
        0,
        1,
        RASTER_PIXEL_IS_AREA,
        code_key,
        0,
        1,
        epsg as u16,
    ];

    let descriptions = band_descriptions(dataset);
    let tags = vec![
        (TAG_IMAGE_WIDTH, TagValue::Longs(vec![width as u32])),
        (TAG_IMAGE_LENGTH, TagValue::Longs(vec![height as u32])),
        (TAG_BITS_PER_SAMPLE, TagValue::Shorts(vec![32; bands])),
        (TAG_COMPRESSION, TagValue::Shorts(vec![compression])),
        (
            TAG_PHOTOMETRIC,
            TagValue::Shorts(vec![PHOTOMETRIC_MIN_IS_BLACK]),
        ),
        // Offset patched once the layout is known
        (TAG_STRIP_OFFSETS, TagValue::Longs(vec![0])),
        (TAG_SAMPLES_PER_PIXEL, TagValue::Shorts(vec![bands as u16])),
        (TAG_ROWS_PER_STRIP, TagValue::Longs(vec![height as u32])),
        (
            TAG_STRIP_BYTE_COUNTS,
            TagValue::Longs(vec![strip.len() as u32]),
        ),
        (TAG_PLANAR_CONFIG, TagValue::Shorts(vec![PLANAR_CHUNKY])),
        (
            TAG_SAMPLE_FORMAT,
            TagValue::Shorts(vec![SAMPLE_FORMAT_IEEE_FLOAT; bands]),
        ),
        (
            TAG_MODEL_PIXEL_SCALE,
            TagValue::Doubles(vec![
                transform.pixel_width,
                transform.pixel_height.abs(),
                0.0,
            ]),
        ),
        (
            TAG_MODEL_TIEPOINT,
            TagValue::Doubles(vec![
                0.0,
                0.0,
                0.0,
                transform.origin_x,
                transform.origin_y,
                0.0,
            ]),
        ),
        (TAG_GEO_KEY_DIRECTORY, TagValue::Shorts(geo_directory)),
        (
            TAG_GDAL_METADATA,
            TagValue::Ascii(gdal_metadata_xml(&descriptions)),
        ),
        (TAG_GDAL_NODATA, TagValue::Ascii("nan".to_string())),
    ];

    let entry_count = tags.len();
    let ifd_len = 2 + entry_count * 12 + 4;
    let data_start = 8 + ifd_len;

    // Out-of-line values land after the IFD, kept at even offsets.
    let mut aux: Vec<u8> = Vec::new();
    let mut encoded: Vec<(u16, u16, u32, [u8; 4])> = Vec::with_capacity(entry_count);
    for (tag, value) in &tags {
        let payload = value.to_bytes();
        let field = if payload.len() <= 4 {
            let mut buf = [0u8; 4];
            buf[..payload.len()].copy_from_slice(&payload);
            buf
        } else {
            let offset = (data_start + aux.len()) as u32;
            aux.extend_from_slice(&payload);
            if aux.len() % 2 == 1 {
                aux.push(0);
            }
            offset.to_le_bytes()
        };
        encoded.push((*tag, value.field_type(), value.count(), field));
    }

    let strip_offset = (data_start + aux.len()) as u32;
    for entry in &mut encoded {
        if entry.0 == TAG_STRIP_OFFSETS {
            entry.3 = strip_offset.to_le_bytes();
        }
    }

    let mut out = Vec::with_capacity(data_start + aux.len() + strip.len());
    out.extend_from_slice(&[0x49, 0x49, 0x2A, 0x00]);
    out.extend_from_slice(&8u32.to_le_bytes());
    out.extend_from_slice(&(entry_count as u16).to_le_bytes());
    for (tag, field_type, count, field) in &encoded {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&field_type.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(field);
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&aux);
    out.extend_from_slice(&strip);
    Ok(out)
}

fn band_descriptions(dataset: &Dataset) -> Vec<String> {
    let leading = dataset.leading_count();
    let mut names = Vec::with_capacity(dataset.band_count());
    for var in dataset.variables() {
        if leading == 1 {
            names.push(var.name.clone());
        } else {
            for li in 0..leading {
                names.push(format!("{}_{}", var.name, li));
            }
        }
    }
    names
}

fn gdal_metadata_xml(descriptions: &[String]) -> String {
    let mut xml = String::from("<GDALMetadata>\n");
    for (i, name) in descriptions.iter().enumerate() {
        xml.push_str(&format!(
            "  <Item name=\"DESCRIPTION\" sample=\"{}\" role=\"description\">{}</Item>\n",
            i,
            escape_xml(name)
        ));
    }
    xml.push_str("</GDALMetadata>");
    xml
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn deflate(data: &[u8]) -> EoResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
    encoder
        .write_all(data)
        .map_err(|e| EoError::encoding(format!("Deflate failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| EoError::encoding(format!("Deflate failed: {}", e)))
}

/// GeoTIFF decoded into f32 samples.
#[derive(Debug, Clone)]
pub struct DecodedGeoTiff {
    pub width: usize,
    pub height: usize,
    pub bands: usize,
    /// Interleaved by pixel: `(y * width + x) * bands + b`.
    pub samples: Vec<f32>,
    pub epsg: Option<u32>,
    /// ModelPixelScale doubles `[sx, sy, sz]`.
    pub pixel_scale: Option<[f64; 3]>,
    /// First ModelTiepoint `[i, j, k, x, y, z]`.
    pub tiepoint: Option<[f64; 6]>,
    /// One entry per band when GDAL metadata is present, else empty.
    pub band_descriptions: Vec<String>,
    pub nodata: Option<String>,
}

impl DecodedGeoTiff {
    pub fn sample(&self, band: usize, y: usize, x: usize) -> f32 {
        self.samples[(y * self.width + x) * self.bands + band]
    }

    /// All samples of one band in row-major order.
    pub fn band_values(&self, band: usize) -> Vec<f32> {
        (0..self.height * self.width)
            .map(|i| self.samples[i * self.bands + band])
            .collect()
    }
}

type IfdEntry = (u16, u32, usize);

/// Decode a GeoTIFF produced by [`encode`] or a fetched product.
pub fn decode(bytes: &[u8]) -> EoResult<DecodedGeoTiff> {
    if bytes.len() < 8 {
        return Err(EoError::encoding("Truncated TIFF header"));
    }
    if &bytes[0..2] != b"II" {
        return Err(EoError::encoding("Only little-endian TIFF is supported"));
    }
    if u16_at(bytes, 2)? != 42 {
        return Err(EoError::encoding("Not a TIFF file"));
    }

    let ifd_offset = u32_at(bytes, 4)? as usize;
    let entry_count = u16_at(bytes, ifd_offset)? as usize;
    let mut entries: HashMap<u16, IfdEntry> = HashMap::with_capacity(entry_count);
    for i in 0..entry_count {
        let base = ifd_offset + 2 + i * 12;
        let tag = u16_at(bytes, base)?;
        let field_type = u16_at(bytes, base + 2)?;
        let count = u32_at(bytes, base + 4)?;
        entries.insert(tag, (field_type, count, base + 8));
    }

    let width = require_u32(bytes, &entries, TAG_IMAGE_WIDTH)? as usize;
    let height = require_u32(bytes, &entries, TAG_IMAGE_LENGTH)? as usize;
    let bands = match entries.get(&TAG_SAMPLES_PER_PIXEL) {
        Some(entry) => read_u32s(bytes, entry)?[0] as usize,
        None => 1,
    };
    let bits = match entries.get(&TAG_BITS_PER_SAMPLE) {
        Some(entry) => uniform(read_shorts(bytes, entry)?, "BitsPerSample")?,
        None => return Err(EoError::encoding("Missing BitsPerSample")),
    };
    let sample_format = match entries.get(&TAG_SAMPLE_FORMAT) {
        Some(entry) => uniform(read_shorts(bytes, entry)?, "SampleFormat")?,
        None => SAMPLE_FORMAT_UINT,
    };
    let compression = match entries.get(&TAG_COMPRESSION) {
        Some(entry) => read_shorts(bytes, entry)?[0],
        None => COMPRESSION_NONE,
    };
    if let Some(entry) = entries.get(&TAG_PLANAR_CONFIG) {
        let planar = read_shorts(bytes, entry)?[0];
        if planar != PLANAR_CHUNKY {
            return Err(EoError::encoding(format!(
                "Unsupported planar configuration: {}",
                planar
            )));
        }
    }

    let offsets = entries
        .get(&TAG_STRIP_OFFSETS)
        .ok_or_else(|| EoError::encoding("Missing StripOffsets"))
        .and_then(|e| read_u32s(bytes, e))?;
    let counts = entries
        .get(&TAG_STRIP_BYTE_COUNTS)
        .ok_or_else(|| EoError::encoding("Missing StripByteCounts"))
        .and_then(|e| read_u32s(bytes, e))?;
    if offsets.len() != counts.len() {
        return Err(EoError::encoding("StripOffsets/StripByteCounts mismatch"));
    }

    let mut raw = Vec::with_capacity(width * height * bands * (bits as usize / 8));
    for (&offset, &count) in offsets.iter().zip(counts.iter()) {
        let strip = bytes
            .get(offset as usize..offset as usize + count as usize)
            .ok_or_else(|| EoError::encoding("Strip out of bounds"))?;
        match compression {
            COMPRESSION_NONE => raw.extend_from_slice(strip),
            COMPRESSION_DEFLATE => {
                let mut decoder = flate2::read::ZlibDecoder::new(strip);
                decoder
                    .read_to_end(&mut raw)
                    .map_err(|e| EoError::encoding(format!("Inflate failed: {}", e)))?;
            }
            other => {
                return Err(EoError::encoding(format!(
                    "Unsupported compression: {}",
                    other
                )))
            }
        }
    }

    let expected = width * height * bands;
    let samples = match (bits, sample_format) {
        (32, SAMPLE_FORMAT_IEEE_FLOAT) => raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect::<Vec<f32>>(),
        (16, SAMPLE_FORMAT_UINT) => raw
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]) as f32)
            .collect::<Vec<f32>>(),
        (8, SAMPLE_FORMAT_UINT) => raw.iter().map(|&b| b as f32).collect::<Vec<f32>>(),
        (bits, format) => {
            return Err(EoError::encoding(format!(
                "Unsupported sample type: {} bits, format {}",
                bits, format
            )))
        }
    };
    if samples.len() != expected {
        return Err(EoError::encoding(format!(
            "Expected {} samples, strip data holds {}",
            expected,
            samples.len()
        )));
    }

    let epsg = match entries.get(&TAG_GEO_KEY_DIRECTORY) {
        Some(entry) => parse_epsg(&read_shorts(bytes, entry)?),
        None => None,
    };
    let pixel_scale = match entries.get(&TAG_MODEL_PIXEL_SCALE) {
        Some(entry) => {
            let doubles = read_doubles(bytes, entry)?;
            doubles.try_into().ok()
        }
        None => None,
    };
    let tiepoint = match entries.get(&TAG_MODEL_TIEPOINT) {
        Some(entry) => {
            let doubles = read_doubles(bytes, entry)?;
            if doubles.len() >= 6 {
                Some([
                    doubles[0], doubles[1], doubles[2], doubles[3], doubles[4], doubles[5],
                ])
            } else {
                None
            }
        }
        None => None,
    };
    let band_descriptions = match entries.get(&TAG_GDAL_METADATA) {
        Some(entry) => parse_band_descriptions(&read_ascii(bytes, entry)?, bands),
        None => Vec::new(),
    };
    let nodata = match entries.get(&TAG_GDAL_NODATA) {
        Some(entry) => Some(read_ascii(bytes, entry)?.trim().to_string()),
        None => None,
    };

    Ok(DecodedGeoTiff {
        width,
        height,
        bands,
        samples,
        epsg,
        pixel_scale,
        tiepoint,
        band_descriptions,
        nodata,
    })
}

fn u16_at(bytes: &[u8], offset: usize) -> EoResult<u16> {
    bytes
        .get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| EoError::encoding("Truncated TIFF"))
}

fn u32_at(bytes: &[u8], offset: usize) -> EoResult<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| EoError::encoding("Truncated TIFF"))
}

fn type_size(field_type: u16) -> EoResult<usize> {
    match field_type {
        1 | TYPE_ASCII => Ok(1),
        TYPE_SHORT => Ok(2),
        TYPE_LONG | 11 => Ok(4),
        TYPE_DOUBLE => Ok(8),
        other => Err(EoError::encoding(format!(
            "Unsupported TIFF field type: {}",
            other
        ))),
    }
}

/// Inline when the value fits in 4 bytes, otherwise behind an offset.
fn value_bytes<'a>(bytes: &'a [u8], entry: &IfdEntry) -> EoResult<&'a [u8]> {
    let (field_type, count, field_offset) = *entry;
    let size = type_size(field_type)? * count as usize;
    let start = if size <= 4 {
        field_offset
    } else {
        u32_at(bytes, field_offset)? as usize
    };
    bytes
        .get(start..start + size)
        .ok_or_else(|| EoError::encoding("TIFF value out of bounds"))
}

fn read_shorts(bytes: &[u8], entry: &IfdEntry) -> EoResult<Vec<u16>> {
    if entry.0 != TYPE_SHORT {
        return Err(EoError::encoding(format!(
            "Expected SHORT value, got type {}",
            entry.0
        )));
    }
    let value = value_bytes(bytes, entry)?;
    Ok(value
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect())
}

/// SHORT or LONG, widened to u32.
fn read_u32s(bytes: &[u8], entry: &IfdEntry) -> EoResult<Vec<u32>> {
    match entry.0 {
        TYPE_SHORT => Ok(read_shorts(bytes, entry)?.iter().map(|&v| v as u32).collect()),
        TYPE_LONG => {
            let value = value_bytes(bytes, entry)?;
            Ok(value
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect())
        }
        other => Err(EoError::encoding(format!(
            "Expected SHORT or LONG value, got type {}",
            other
        ))),
    }
}

fn read_doubles(bytes: &[u8], entry: &IfdEntry) -> EoResult<Vec<f64>> {
    if entry.0 != TYPE_DOUBLE {
        return Err(EoError::encoding(format!(
            "Expected DOUBLE value, got type {}",
            entry.0
        )));
    }
    let value = value_bytes(bytes, entry)?;
    Ok(value
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect())
}

fn read_ascii(bytes: &[u8], entry: &IfdEntry) -> EoResult<String> {
    let value = value_bytes(bytes, entry)?;
    let end = value.iter().position(|&b| b == 0).unwrap_or(value.len());
    Ok(String::from_utf8_lossy(&value[..end]).into_owned())
}

fn require_u32(bytes: &[u8], entries: &HashMap<u16, IfdEntry>, tag: u16) -> EoResult<u32> {
    let entry = entries
        .get(&tag)
        .ok_or_else(|| EoError::encoding(format!("Missing required TIFF tag {}", tag)))?;
    let values = read_u32s(bytes, entry)?;
    values
        .first()
        .copied()
        .ok_or_else(|| EoError::encoding(format!("Empty TIFF tag {}", tag)))
}

fn uniform(values: Vec<u16>, tag: &str) -> EoResult<u16> {
    let first = *values
        .first()
        .ok_or_else(|| EoError::encoding(format!("Empty {}", tag)))?;
    if values.iter().any(|&v| v != first) {
        return Err(EoError::encoding(format!("Mixed per-band {}", tag)));
    }
    Ok(first)
}

fn parse_epsg(directory: &[u16]) -> Option<u32> {
    // Skip the 4-short header, then scan key quadruples.
    for quad in directory[4.min(directory.len())..].chunks_exact(4) {
        let (key, location, value) = (quad[0], quad[1], quad[3]);
        if location == 0 && (key == KEY_GEOGRAPHIC_TYPE || key == KEY_PROJECTED_CS_TYPE) {
            return Some(value as u32);
        }
    }
    None
}

/// Extract `role="description"` items from GDAL metadata XML.
fn parse_band_descriptions(xml: &str, bands: usize) -> Vec<String> {
    let mut descriptions = vec![String::new(); bands];
    let mut rest = xml;
    while let Some(start) = rest.find("<Item ") {
        let tail = &rest[start..];
        let Some(open_end) = tail.find('>') else { break };
        let attrs = &tail[..open_end];
        let Some(close) = tail.find("</Item>") else { break };
        let text = &tail[open_end + 1..close];
        if attrs.contains("role=\"description\"") {
            if let Some(sample) = attr_value(attrs, "sample") {
                if let Ok(index) = sample.parse::<usize>() {
                    if index < bands {
                        descriptions[index] = unescape_xml(text);
                    }
                }
            }
        }
        rest = &tail[close + "</Item>".len()..];
    }
    descriptions
}

fn attr_value<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let marker = format!("{}=\"", name);
    let start = attrs.find(&marker)? + marker.len();
    let end = attrs[start..].find('"')?;
    Some(&attrs[start..start + end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use eo_common::{BoundingBox, Crs, Dataset, Dimension, GeoReference, GeoTransform};

    fn sample_dataset() -> Dataset {
        let mut ds = Dataset::new(vec![
            Dimension::new("time", 1),
            Dimension::new("y", 2),
            Dimension::new("x", 3),
        ]);
        ds.set_coord("time", vec![1_650_000_000.0]).unwrap();
        ds.add_variable("ndvi", vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0])
            .unwrap();
        let bbox = BoundingBox::new(-6.21, 53.23, -6.14, 53.27);
        ds.set_georef(GeoReference {
            crs: Crs::WGS84,
            transform: GeoTransform::from_bbox(&bbox, 3, 2),
        });
        ds
    }

    #[test]
    fn test_round_trip_uncompressed() {
        let ds = sample_dataset();
        let bytes = encode(&ds, &GeoTiffOptions { compress: false }).unwrap();
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded.width, 3);
        assert_eq!(decoded.height, 2);
        assert_eq!(decoded.bands, 1);
        assert_eq!(decoded.samples, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(decoded.epsg, Some(4326));
        assert_eq!(decoded.band_descriptions, vec!["ndvi"]);
        assert_eq!(decoded.nodata.as_deref(), Some("nan"));

        let scale = decoded.pixel_scale.unwrap();
        assert!((scale[0] - 0.07 / 3.0).abs() < 1e-12);
        assert!((scale[1] - 0.04 / 2.0).abs() < 1e-9);
        let tiepoint = decoded.tiepoint.unwrap();
        assert_eq!(tiepoint[3], -6.21);
        assert_eq!(tiepoint[4], 53.27);
    }

    #[test]
    fn test_round_trip_deflate() {
        let ds = sample_dataset();
        let bytes = encode(&ds, &GeoTiffOptions { compress: true }).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.samples, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_multiband_with_leading_time() {
        let mut ds = Dataset::new(vec![
            Dimension::new("time", 2),
            Dimension::new("y", 2),
            Dimension::new("x", 2),
        ]);
        ds.add_variable("red", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0])
            .unwrap();
        ds.add_variable("nir", vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0])
            .unwrap();
        ds.set_georef(GeoReference {
            crs: Crs::from_epsg(32629),
            transform: GeoTransform::new(500_000.0, 4_500_000.0, 10.0, -10.0),
        });

        let bytes = encode(&ds, &GeoTiffOptions::default()).unwrap();
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded.bands, 4);
        assert_eq!(
            decoded.band_descriptions,
            vec!["red_0", "red_1", "nir_0", "nir_1"]
        );
        assert_eq!(decoded.epsg, Some(32629));
        // band 0 = red at time 0, band 1 = red at time 1
        assert_eq!(decoded.sample(0, 0, 0), 1.0);
        assert_eq!(decoded.sample(1, 0, 0), 5.0);
        assert_eq!(decoded.sample(2, 1, 1), 40.0);
        assert_eq!(decoded.sample(3, 1, 1), 80.0);
    }

    #[test]
    fn test_nan_survives() {
        let mut ds = Dataset::new(vec![Dimension::new("y", 1), Dimension::new("x", 2)]);
        ds.add_variable("v", vec![f32::NAN, 7.5]).unwrap();
        ds.set_georef(GeoReference {
            crs: Crs::WGS84,
            transform: GeoTransform::new(0.0, 1.0, 1.0, -1.0),
        });

        let decoded = decode(&encode(&ds, &GeoTiffOptions::default()).unwrap()).unwrap();
        assert!(decoded.samples[0].is_nan());
        assert_eq!(decoded.samples[1], 7.5);
    }

    #[test]
    fn test_missing_georef_is_an_error() {
        let mut ds = Dataset::new(vec![Dimension::new("y", 1), Dimension::new("x", 1)]);
        ds.add_variable("v", vec![1.0]).unwrap();
        let err = encode(&ds, &GeoTiffOptions::default()).unwrap_err();
        assert!(matches!(err, EoError::Encoding(_)));
    }

    #[test]
    fn test_empty_dataset_is_an_error() {
        let ds = Dataset::new(vec![Dimension::new("y", 2), Dimension::new("x", 2)]);
        assert!(encode(&ds, &GeoTiffOptions::default()).is_err());
    }

    #[test]
    fn test_decode_rejects_big_endian() {
        let mut bytes = encode(&sample_dataset(), &GeoTiffOptions::default()).unwrap();
        bytes[0] = b'M';
        bytes[1] = b'M';
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn test_decode_uint8() {
        // Hand-built 2x2 single-band 8-bit grayscale TIFF.
        let mut bytes: Vec<u8> = Vec::new();
        bytes.extend_from_slice(&[0x49, 0x49, 0x2A, 0x00]);
        bytes.extend_from_slice(&8u32.to_le_bytes());
        let entries: [(u16, u16, u32, u32); 8] = [
            (TAG_IMAGE_WIDTH, TYPE_SHORT, 1, 2),
            (TAG_IMAGE_LENGTH, TYPE_SHORT, 1, 2),
            (TAG_BITS_PER_SAMPLE, TYPE_SHORT, 1, 8),
            (TAG_COMPRESSION, TYPE_SHORT, 1, 1),
            (TAG_PHOTOMETRIC, TYPE_SHORT, 1, 1),
            (TAG_STRIP_OFFSETS, TYPE_LONG, 1, 110),
            (TAG_ROWS_PER_STRIP, TYPE_SHORT, 1, 2),
            (TAG_STRIP_BYTE_COUNTS, TYPE_LONG, 1, 4),
        ];
        bytes.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (tag, field_type, count, value) in entries {
            bytes.extend_from_slice(&tag.to_le_bytes());
            bytes.extend_from_slice(&field_type.to_le_bytes());
            bytes.extend_from_slice(&count.to_le_bytes());
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(bytes.len(), 110);
        bytes.extend_from_slice(&[10, 20, 30, 255]);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.width, 2);
        assert_eq!(decoded.bands, 1);
        assert_eq!(decoded.samples, vec![10.0, 20.0, 30.0, 255.0]);
        assert_eq!(decoded.epsg, None);
    }

    #[test]
    fn test_band_description_roundtrip_with_escapes() {
        let xml = gdal_metadata_xml(&["a<b".to_string(), "c&d".to_string()]);
        let parsed = parse_band_descriptions(&xml, 2);
        assert_eq!(parsed, vec!["a<b", "c&d"]);
    }
}
