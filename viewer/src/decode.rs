//! Byte-exact decoding of rows.
//!
//! A row holds one [`Cell`] per display column: vectors spread their
//! components over consecutive scalar cells, matrices produce one column
//! array per matrix column. Anything that can't be read (no such buffer,
//! short buffer) becomes [`Cell::Missing`] for that element only; sibling
//! elements in the same row still decode.
//!
//! All multi-byte values are little-endian.

use meshview_core::mesh::{CompType, ComponentValue, FormatElement, ResourceFormat, SpecialFormat};

use crate::bounds::BoundsAccumulator;
use crate::dataset::Dataset;
use crate::index::{ResolvedIndex, element_index, resolve};

/// One display column of a decoded row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Value could not be read. Displayed as `-`.
    Missing,
    Scalar(ComponentValue),
    /// One column of a matrix element.
    Column(Vec<ComponentValue>),
}

/// A fully decoded row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub index: ResolvedIndex,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn row(&self) -> usize {
        self.index.row
    }
}

/// Decodes `row` of `dataset`.
pub fn decode_row(dataset: &Dataset, row: usize) -> Row {
    decode_row_with_bounds(dataset, row, None)
}

/// Decodes `row`, folding every in-range element value into `bounds`.
pub fn decode_row_with_bounds(
    dataset: &Dataset,
    row: usize,
    mut bounds: Option<&mut BoundsAccumulator>,
) -> Row {
    let index = resolve(dataset, row);
    let layout = &dataset.layout;
    let columns = layout.elements.iter().map(FormatElement::column_count).sum();
    let mut cells = Vec::with_capacity(columns);

    for (el_idx, element) in layout.elements.iter().enumerate() {
        let columns = element.column_count();

        if let Some(generic) = layout.generic(el_idx) {
            cells.extend(generic.iter().take(columns).copied().map(Cell::Scalar));
            cells.extend((generic.len()..columns).map(|_| Cell::Missing));
            continue;
        }

        let Some(bytes) = element_bytes(dataset, element, index.data_index) else {
            cells.extend((0..columns).map(|_| Cell::Missing));
            continue;
        };

        let values = read_element(bytes, element);
        if let Some(acc) = bounds.as_deref_mut() {
            acc.include(el_idx, &values);
        }

        if element.is_matrix() {
            cells.extend(
                reshape_matrix(values, columns, element.rows() as usize, element.row_major)
                    .into_iter()
                    .map(Cell::Column),
            );
        } else {
            let decoded = values.len();
            cells.extend(values.into_iter().map(Cell::Scalar));
            cells.extend((decoded..columns).map(|_| Cell::Missing));
        }
    }

    Row { index, cells }
}

/// The bytes of `element` for a row, or `None` if they aren't all present.
fn element_bytes<'a>(
    dataset: &'a Dataset,
    element: &FormatElement,
    data_index: u32,
) -> Option<&'a [u8]> {
    let buffer = dataset.buffers.get(element.buffer)?;
    let record = element_index(element, data_index, dataset.instance) as u64;
    let start = (dataset.stride(element.buffer) as u64)
        .checked_mul(record)?
        .checked_add(element.offset as u64)?
        .checked_add(dataset.byte_offset)?;
    let end = start.checked_add(element.byte_size() as u64)?;
    if end > buffer.len() as u64 {
        return None;
    }
    buffer.get(start as usize..end as usize)
}

/// Reads every value of an element (all matrix rows, flattened in storage order).
///
/// `bytes` must hold at least [`FormatElement::byte_size`] bytes.
pub fn read_element(bytes: &[u8], element: &FormatElement) -> Vec<ComponentValue> {
    let vector = element.format.vector_size() as usize;
    bytes
        .chunks_exact(vector.max(1))
        .take(element.rows() as usize)
        .flat_map(|chunk| read_vector(chunk, &element.format))
        .collect()
}

/// Splits flattened matrix values into `columns` arrays of `rows` values.
pub fn reshape_matrix(
    values: Vec<ComponentValue>,
    columns: usize,
    rows: usize,
    row_major: bool,
) -> Vec<Vec<ComponentValue>> {
    (0..columns)
        .map(|col| {
            (0..rows)
                .filter_map(|row| {
                    let i = if row_major { row * columns + col } else { col * rows + row };
                    values.get(i).copied()
                })
                .collect()
        })
        .collect()
}

/// Reads one vector of `format` from the start of `bytes`.
pub fn read_vector(bytes: &[u8], format: &ResourceFormat) -> Vec<ComponentValue> {
    let mut values = match format.special {
        Some(special) => read_packed(bytes, special, format),
        None => {
            let width = format.comp_byte_width as usize;
            bytes
                .chunks_exact(width.max(1))
                .take(format.comp_count as usize)
                .map(|c| read_component(c, format.comp_type))
                .collect()
        }
    };
    // R10G10B10A2 applies the swap per packed group.
    if format.bgra_order
        && format.special != Some(SpecialFormat::R10G10B10A2)
        && values.len() >= 3
    {
        values.swap(0, 2);
    }
    values
}

fn le_u16(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}

fn le_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn le_u64(b: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&b[..8]);
    u64::from_le_bytes(raw)
}

/// Zero-extends up to four little-endian bytes.
fn le_uint(b: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    let n = b.len().min(4);
    raw[..n].copy_from_slice(&b[..n]);
    u32::from_le_bytes(raw)
}

/// Sign-extends a little-endian integer of `b.len()` bytes (1, 2 or 4).
fn le_sint(b: &[u8]) -> i32 {
    match b.len() {
        1 => b[0] as i8 as i32,
        2 => le_u16(b) as i16 as i32,
        _ => le_uint(b) as i32,
    }
}

/// Decodes a single component whose width is `bytes.len()`.
fn read_component(bytes: &[u8], comp_type: CompType) -> ComponentValue {
    let width = bytes.len();
    match comp_type {
        CompType::Float => match width {
            8 => ComponentValue::Double(f64::from_bits(le_u64(bytes))),
            4 => ComponentValue::Float(f32::from_bits(le_u32(bytes))),
            2 => ComponentValue::Float(half::f16::from_bits(le_u16(bytes)).to_f32()),
            _ => ComponentValue::Float(le_uint(bytes) as f32 / unorm_max(width)),
        },
        CompType::Double => match width {
            8 => ComponentValue::Double(f64::from_bits(le_u64(bytes))),
            4 => ComponentValue::Double(f32::from_bits(le_u32(bytes)) as f64),
            _ => ComponentValue::Double(le_uint(bytes) as f64),
        },
        // 8-byte integers keep their low 32 bits.
        CompType::UInt => ComponentValue::UInt(le_uint(bytes)),
        CompType::SInt => ComponentValue::SInt(le_sint(&bytes[..width.min(4)])),
        CompType::UScaled => ComponentValue::Float(le_uint(bytes) as f32),
        CompType::SScaled => ComponentValue::Float(le_sint(&bytes[..width.min(4)]) as f32),
        CompType::UNorm => {
            if width >= 4 {
                log::trace!("unexpected {width}-byte unorm component");
            }
            ComponentValue::Float(le_uint(bytes) as f32 / unorm_max(width))
        }
        CompType::SNorm => ComponentValue::Float(snorm(bytes)),
        CompType::Depth => match width {
            4 => ComponentValue::Float(f32::from_bits(le_u32(bytes))),
            // 24-bit depth reads exactly its three bytes; a packed stencil byte is never touched.
            3 => ComponentValue::Float(le_uint(&bytes[..3]) as f32 / unorm_max(3)),
            _ => ComponentValue::Float(le_uint(bytes) as f32 / unorm_max(width)),
        },
    }
}

fn unorm_max(width: usize) -> f32 {
    match width {
        1 => u8::MAX as f32,
        2 => u16::MAX as f32,
        3 => 0x00ff_ffff as f32,
        _ => u32::MAX as f32,
    }
}

/// Signed normalized value; the most negative integer maps to exactly -1.
fn snorm(bytes: &[u8]) -> f32 {
    match bytes.len() {
        1 => {
            let v = bytes[0] as i8;
            if v == i8::MIN { -1.0 } else { v as f32 / i8::MAX as f32 }
        }
        2 => {
            let v = le_u16(bytes) as i16;
            if v == i16::MIN { -1.0 } else { v as f32 / i16::MAX as f32 }
        }
        _ => {
            log::trace!("unexpected {}-byte snorm component", bytes.len());
            let v = le_uint(bytes) as i32;
            if v == i32::MIN { -1.0 } else { v as f32 / i32::MAX as f32 }
        }
    }
}

fn read_packed(
    bytes: &[u8],
    special: SpecialFormat,
    format: &ResourceFormat,
) -> Vec<ComponentValue> {
    let f = ComponentValue::Float;
    match special {
        SpecialFormat::R5G5B5A1 => {
            let p = le_u16(bytes);
            vec![
                f((p & 0x1f) as f32 / 31.0),
                f(((p >> 5) & 0x1f) as f32 / 31.0),
                f(((p >> 10) & 0x1f) as f32 / 31.0),
                f(if p & 0x8000 != 0 { 1.0 } else { 0.0 }),
            ]
        }
        SpecialFormat::R5G6B5 => {
            let p = le_u16(bytes);
            vec![
                f((p & 0x1f) as f32 / 31.0),
                f(((p >> 5) & 0x3f) as f32 / 63.0),
                f(((p >> 11) & 0x1f) as f32 / 31.0),
            ]
        }
        SpecialFormat::R4G4B4A4 => {
            let p = le_u16(bytes);
            (0..4).map(|i| f(((p >> (i * 4)) & 0xf) as f32 / 15.0)).collect()
        }
        SpecialFormat::R10G10B10A2 => bytes
            .chunks_exact(4)
            .take((format.comp_count / 4).max(1) as usize)
            .flat_map(|c| unpack_10_10_10_2(le_u32(c), format))
            .collect(),
        SpecialFormat::R11G11B10 => {
            let p = le_u32(bytes);
            vec![
                f(small_float(p & 0x3f, (p >> 6) & 0x1f, 6)),
                f(small_float((p >> 11) & 0x3f, (p >> 17) & 0x1f, 6)),
                f(small_float((p >> 22) & 0x1f, (p >> 27) & 0x1f, 5)),
            ]
        }
    }
}

fn unpack_10_10_10_2(packed: u32, format: &ResourceFormat) -> [ComponentValue; 4] {
    let mut r = packed & 0x3ff;
    let g = (packed >> 10) & 0x3ff;
    let mut b = (packed >> 20) & 0x3ff;
    let a = (packed >> 30) & 0x3;
    if format.bgra_order {
        std::mem::swap(&mut r, &mut b);
    }

    let signed = |v: u32, bits: u32| -> i32 {
        let half = 1u32 << (bits - 1);
        if v < half { v as i32 } else { v as i32 - (1 << bits) }
    };

    match format.comp_type {
        CompType::UInt => [r, g, b, a].map(ComponentValue::UInt),
        CompType::UScaled => [r, g, b, a].map(|v| ComponentValue::Float(v as f32)),
        CompType::SInt => [
            signed(r, 10),
            signed(g, 10),
            signed(b, 10),
            signed(a, 2),
        ]
        .map(ComponentValue::SInt),
        CompType::SScaled => [
            signed(r, 10),
            signed(g, 10),
            signed(b, 10),
            signed(a, 2),
        ]
        .map(|v| ComponentValue::Float(v as f32)),
        _ => [
            r as f32 / 1023.0,
            g as f32 / 1023.0,
            b as f32 / 1023.0,
            a as f32 / 3.0,
        ]
        .map(ComponentValue::Float),
    }
}

/// Unsigned small float with a 5-bit exponent (bias 15) and `mantissa_bits` mantissa.
fn small_float(mantissa: u32, exponent: u32, mantissa_bits: u32) -> f32 {
    let lead = (1u32 << mantissa_bits) as f32;
    match (exponent, mantissa) {
        (0, 0) => 0.0,
        (0x1f, 0) => f32::INFINITY,
        (0x1f, _) => f32::NAN,
        (0, m) => (m as f32 / lead) * 2f32.powi(1 - 15),
        (e, m) => (1.0 + m as f32 / lead) * 2f32.powi(e as i32 - 15),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshview_core::mesh::{
        DrawParams, Layout, MeshDataStage, ResourceFormat, VertexBufferBinding,
    };
    use meshview_core::ResourceId;
    use std::sync::Arc;

    fn floats(v: &[f32]) -> Vec<ComponentValue> {
        v.iter().copied().map(ComponentValue::Float).collect()
    }

    fn f32_bytes(v: &[f32]) -> Vec<u8> {
        v.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn dataset(layout: Layout, buffers: Vec<Vec<u8>>, rows: usize) -> Dataset {
        let mut ds = Dataset::empty(MeshDataStage::VertexInput, Arc::new(layout), 0);
        ds.buffers = buffers;
        ds.row_count = rows;
        ds.seal()
    }

    #[test]
    fn decodes_interleaved_floats() {
        let layout = Layout::new()
            .with_buffer(VertexBufferBinding::new(ResourceId::new(1), 20))
            .with_element(FormatElement::new("POSITION", ResourceFormat::float(3)))
            .with_element(FormatElement::new("UV", ResourceFormat::float(2)).with_offset(12))
            .with_draw(DrawParams::new(2));
        let bytes = f32_bytes(&[1.0, 2.0, 3.0, 0.5, 0.25, 4.0, 5.0, 6.0, 0.75, 1.0]);
        let ds = dataset(layout, vec![bytes], 2);

        let row = decode_row(&ds, 1);
        let expected: Vec<Cell> = floats(&[4.0, 5.0, 6.0, 0.75, 1.0])
            .into_iter()
            .map(Cell::Scalar)
            .collect();
        assert_eq!(row.cells, expected);
        assert_eq!(row.row(), 1);
    }

    #[test]
    fn short_buffer_only_blanks_the_affected_element() {
        let layout = Layout::new()
            .with_buffer(VertexBufferBinding::new(ResourceId::new(1), 8))
            .with_buffer(VertexBufferBinding::new(ResourceId::new(2), 4))
            .with_element(FormatElement::new("A", ResourceFormat::float(2)))
            .with_element(FormatElement::new("B", ResourceFormat::uint(1)).at_buffer(1))
            .with_draw(DrawParams::new(2));
        let ds = dataset(
            layout,
            vec![f32_bytes(&[1.0, 2.0, 3.0]), 7u32.to_le_bytes().repeat(2)],
            2,
        );

        let row = decode_row(&ds, 1);
        assert_eq!(
            row.cells,
            vec![
                Cell::Missing,
                Cell::Missing,
                Cell::Scalar(ComponentValue::UInt(7))
            ]
        );
    }

    #[test]
    fn unknown_buffer_slot_is_missing() {
        let layout = Layout::new()
            .with_element(FormatElement::new("A", ResourceFormat::float(1)).at_buffer(3));
        let ds = dataset(layout, vec![vec![0; 16]], 1);
        assert_eq!(decode_row(&ds, 0).cells, vec![Cell::Missing]);
    }

    #[test]
    fn matrix_reshape() {
        let values = floats(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            reshape_matrix(values.clone(), 2, 2, false),
            vec![floats(&[1.0, 2.0]), floats(&[3.0, 4.0])]
        );
        assert_eq!(
            reshape_matrix(values, 2, 2, true),
            vec![floats(&[1.0, 3.0]), floats(&[2.0, 4.0])]
        );
    }

    #[test]
    fn generic_values_skip_byte_reads() {
        let layout = Layout::new()
            .with_element(FormatElement::new("COLOR", ResourceFormat::float(4)))
            .with_generic(0, floats(&[1.0, 0.0, 1.0]));
        let ds = dataset(layout, Vec::new(), 1);
        let row = decode_row(&ds, 0);
        assert_eq!(row.cells.len(), 4);
        assert_eq!(row.cells[2], Cell::Scalar(ComponentValue::Float(1.0)));
        assert_eq!(row.cells[3], Cell::Missing);
    }

    #[test]
    fn bounds_skip_missing_reads() {
        let layout = Layout::new()
            .with_buffer(VertexBufferBinding::new(ResourceId::new(1), 12))
            .with_element(FormatElement::new("POSITION", ResourceFormat::float(3)));
        let ds = dataset(layout, vec![f32_bytes(&[1.0, -1.0, 2.0])], 2);
        let mut acc = BoundsAccumulator::new(1);
        for row in 0..2 {
            decode_row_with_bounds(&ds, row, Some(&mut acc));
        }
        let bounds = acc.finish().element(0).unwrap();
        assert_eq!(bounds.samples, 1);
        assert_eq!(bounds.min, [1.0, -1.0, 2.0]);
    }

    #[test]
    fn integer_and_normalized_components() {
        let u8x4 = ResourceFormat::new(CompType::UInt, 1, 4);
        assert_eq!(
            read_vector(&[1, 2, 3, 255], &u8x4),
            [1u32, 2, 3, 255].map(ComponentValue::UInt).to_vec()
        );

        let s16 = ResourceFormat::new(CompType::SInt, 2, 1);
        assert_eq!(read_vector(&(-3i16).to_le_bytes(), &s16), vec![ComponentValue::SInt(-3)]);

        let unorm = ResourceFormat::new(CompType::UNorm, 1, 2);
        assert_eq!(read_vector(&[255, 0], &unorm), floats(&[1.0, 0.0]));

        let snorm = ResourceFormat::new(CompType::SNorm, 1, 3);
        assert_eq!(read_vector(&[0x80, 0x81, 127], &snorm), floats(&[-1.0, -1.0, 1.0]));

        let sscaled = ResourceFormat::new(CompType::SScaled, 2, 1);
        assert_eq!(read_vector(&(-300i16).to_le_bytes(), &sscaled), floats(&[-300.0]));
    }

    #[test]
    fn half_double_and_depth() {
        let half2 = ResourceFormat::new(CompType::Float, 2, 2);
        let bytes: Vec<u8> = [half::f16::from_f32(0.5), half::f16::from_f32(-2.0)]
            .iter()
            .flat_map(|h| h.to_bits().to_le_bytes())
            .collect();
        assert_eq!(read_vector(&bytes, &half2), floats(&[0.5, -2.0]));

        let double = ResourceFormat::new(CompType::Float, 8, 1);
        assert_eq!(
            read_vector(&1.25f64.to_le_bytes(), &double),
            vec![ComponentValue::Double(1.25)]
        );

        let d24 = ResourceFormat::new(CompType::Depth, 3, 1);
        assert_eq!(read_vector(&[0xff, 0xff, 0xff], &d24), floats(&[1.0]));
        // A trailing stencil byte does not leak into the depth value.
        assert_eq!(read_vector(&[0, 0, 0, 0xff], &d24), floats(&[0.0]));

        let d16 = ResourceFormat::new(CompType::Depth, 2, 1);
        assert_eq!(read_vector(&[0, 0], &d16), floats(&[0.0]));
    }

    #[test]
    fn bgra_swaps_first_and_third() {
        let bgra = ResourceFormat::new(CompType::UNorm, 1, 4).with_bgra();
        assert_eq!(read_vector(&[255, 0, 0, 255], &bgra), floats(&[0.0, 0.0, 1.0, 1.0]));
    }

    #[test]
    fn packed_formats() {
        let rgb565 = ResourceFormat::packed(SpecialFormat::R5G6B5, CompType::UNorm);
        assert_eq!(read_vector(&0xffffu16.to_le_bytes(), &rgb565), floats(&[1.0, 1.0, 1.0]));

        let rgb5a1 = ResourceFormat::packed(SpecialFormat::R5G5B5A1, CompType::UNorm);
        assert_eq!(
            read_vector(&0x801fu16.to_le_bytes(), &rgb5a1),
            floats(&[1.0, 0.0, 0.0, 1.0])
        );

        let rgba4 = ResourceFormat::packed(SpecialFormat::R4G4B4A4, CompType::UNorm);
        assert_eq!(
            read_vector(&0xf00fu16.to_le_bytes(), &rgba4),
            floats(&[1.0, 0.0, 0.0, 1.0])
        );

        let packed = 0x3ffu32 | (0x200 << 20) | (0x3 << 30);
        let uint = ResourceFormat::packed(SpecialFormat::R10G10B10A2, CompType::UInt);
        assert_eq!(
            read_vector(&packed.to_le_bytes(), &uint),
            [1023u32, 0, 512, 3].map(ComponentValue::UInt).to_vec()
        );
        let sint = ResourceFormat::packed(SpecialFormat::R10G10B10A2, CompType::SInt);
        assert_eq!(
            read_vector(&packed.to_le_bytes(), &sint),
            [-1i32, 0, -512, -1].map(ComponentValue::SInt).to_vec()
        );
    }

    #[test]
    fn small_floats() {
        // exponent 15, mantissa 0 -> 1.0 in every channel
        let one6 = 15 << 6;
        let one5 = 15 << 5;
        let packed: u32 = one6 | (one6 << 11) | (one5 << 22);
        let fmt = ResourceFormat::packed(SpecialFormat::R11G11B10, CompType::Float);
        assert_eq!(read_vector(&packed.to_le_bytes(), &fmt), floats(&[1.0, 1.0, 1.0]));
        assert!(small_float(1, 0x1f, 6).is_nan());
        assert_eq!(small_float(0, 0x1f, 5), f32::INFINITY);
    }
}
