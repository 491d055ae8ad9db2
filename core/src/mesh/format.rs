//! Per-attribute decode recipes.
//!
//! A [`FormatElement`] describes one named attribute inside an interleaved
//! record: which buffer slot it reads from, where in the record it lives,
//! and how its bytes are reinterpreted ([`ResourceFormat`]).
//!
//! Elements are produced by an external collaborator (a format-string parser
//! or a shader-reflection adapter) and are immutable once built.
//!
//! # Example
//!
//! ```ignore
//! // float3 position at offset 0, unorm8x4 colour at offset 12, buffer 0
//! let position = FormatElement::new("POSITION", ResourceFormat::float(3))
//!     .with_system_value(SystemValue::Position);
//! let colour = FormatElement::new("COLOR", ResourceFormat::new(CompType::UNorm, 1, 4))
//!     .with_offset(12);
//! ```

/// How the raw bytes of a component are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompType {
    /// IEEE float (2, 4 or 8 bytes).
    Float,
    /// Unsigned normalized to `[0, 1]`.
    UNorm,
    /// Signed normalized to `[-1, 1]`.
    SNorm,
    /// Unsigned integer.
    UInt,
    /// Signed integer.
    SInt,
    /// Unsigned integer converted to float.
    UScaled,
    /// Signed integer converted to float.
    SScaled,
    /// Depth value (float or normalized, depending on width).
    Depth,
    /// 64-bit float.
    Double,
}

/// Packed formats whose components don't sit on byte boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialFormat {
    R5G5B5A1,
    R5G6B5,
    R4G4B4A4,
    R10G10B10A2,
    R11G11B10,
}

impl SpecialFormat {
    /// Packed size in bytes of one vector of this format.
    pub fn packed_size(&self) -> u32 {
        match self {
            Self::R5G5B5A1 | Self::R5G6B5 | Self::R4G4B4A4 => 2,
            Self::R10G10B10A2 | Self::R11G11B10 => 4,
        }
    }

    /// Bits of the widest component.
    pub fn max_component_bits(&self) -> u32 {
        match self {
            Self::R4G4B4A4 => 4,
            Self::R5G5B5A1 => 5,
            Self::R5G6B5 => 6,
            Self::R10G10B10A2 => 10,
            Self::R11G11B10 => 11,
        }
    }
}

/// Component layout of one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceFormat {
    /// How each component is interpreted.
    pub comp_type: CompType,
    /// Bytes per component (1, 2, 3, 4 or 8).
    pub comp_byte_width: u32,
    /// Number of components (1-4, or a multiple of 4 for packed `R10G10B10A2` runs).
    pub comp_count: u32,
    /// Packed format, if the components are bit-packed.
    pub special: Option<SpecialFormat>,
    /// Swap the first and third decoded components.
    pub bgra_order: bool,
}

impl ResourceFormat {
    /// Create a plain (non-packed) format.
    pub fn new(comp_type: CompType, comp_byte_width: u32, comp_count: u32) -> Self {
        Self {
            comp_type,
            comp_byte_width,
            comp_count,
            special: None,
            bgra_order: false,
        }
    }

    /// `comp_count` 32-bit floats.
    pub fn float(comp_count: u32) -> Self {
        Self::new(CompType::Float, 4, comp_count)
    }

    /// `comp_count` 32-bit unsigned integers.
    pub fn uint(comp_count: u32) -> Self {
        Self::new(CompType::UInt, 4, comp_count)
    }

    /// `comp_count` 32-bit signed integers.
    pub fn sint(comp_count: u32) -> Self {
        Self::new(CompType::SInt, 4, comp_count)
    }

    /// A packed format. `comp_type` selects normalized/integer/scaled interpretation
    /// where the format allows it.
    pub fn packed(special: SpecialFormat, comp_type: CompType) -> Self {
        let comp_count = match special {
            SpecialFormat::R5G6B5 | SpecialFormat::R11G11B10 => 3,
            _ => 4,
        };
        Self {
            comp_type,
            comp_byte_width: 1,
            comp_count,
            special: Some(special),
            bgra_order: false,
        }
    }

    /// Set BGRA component ordering.
    pub fn with_bgra(mut self) -> Self {
        self.bgra_order = true;
        self
    }

    /// Size in bytes of one vector of this format.
    pub fn vector_size(&self) -> u32 {
        match self.special {
            Some(SpecialFormat::R10G10B10A2) => 4 * (self.comp_count / 4).max(1),
            Some(special) => special.packed_size(),
            None => self.comp_byte_width * self.comp_count,
        }
    }

    /// Number of values one vector decodes into.
    pub fn decoded_count(&self) -> u32 {
        match self.special {
            Some(SpecialFormat::R5G6B5 | SpecialFormat::R11G11B10) => 3,
            Some(SpecialFormat::R5G5B5A1 | SpecialFormat::R4G4B4A4) => 4,
            Some(SpecialFormat::R10G10B10A2) => 4 * (self.comp_count / 4).max(1),
            None => self.comp_count,
        }
    }
}

/// Tag marking an element with a fixed-function meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SystemValue {
    #[default]
    None,
    /// Vertex position (input position or clip-space output position).
    Position,
    VertexIndex,
    InstanceIndex,
    PointSize,
    ClipDistance,
    CullDistance,
}

/// One named attribute's decode recipe within an interleaved record.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatElement {
    /// Display name.
    pub name: String,
    /// Source buffer slot.
    pub buffer: usize,
    /// Byte offset within the record.
    pub offset: u32,
    /// Advances per instance rather than per vertex.
    pub per_instance: bool,
    /// Instances sharing one per-instance value (0 means every instance reads element 0).
    pub instance_rate: u32,
    /// Component layout.
    pub format: ResourceFormat,
    /// Matrix rows (1 for scalars and vectors).
    pub matrix_dim: u32,
    /// Matrix data is stored row by row.
    pub row_major: bool,
    /// Fixed-function meaning, if any.
    pub system_value: SystemValue,
    /// Prefer hexadecimal display for unsigned integers.
    pub hex: bool,
}

impl FormatElement {
    /// Create a per-vertex element at buffer 0, offset 0.
    pub fn new(name: impl Into<String>, format: ResourceFormat) -> Self {
        Self {
            name: name.into(),
            buffer: 0,
            offset: 0,
            per_instance: false,
            instance_rate: 1,
            format,
            matrix_dim: 1,
            row_major: false,
            system_value: SystemValue::None,
            hex: false,
        }
    }

    /// Set the source buffer slot.
    pub fn at_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer;
        self
    }

    /// Set the byte offset within the record.
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Make this a per-instance element with the given step rate.
    pub fn per_instance(mut self, instance_rate: u32) -> Self {
        self.per_instance = true;
        self.instance_rate = instance_rate;
        self
    }

    /// Make this a matrix element with `rows` rows of `format.comp_count` columns.
    pub fn with_matrix(mut self, rows: u32, row_major: bool) -> Self {
        self.matrix_dim = rows;
        self.row_major = row_major;
        self
    }

    /// Tag the element with a system value.
    pub fn with_system_value(mut self, system_value: SystemValue) -> Self {
        self.system_value = system_value;
        self
    }

    /// Prefer hex display.
    pub fn with_hex(mut self) -> Self {
        self.hex = true;
        self
    }

    /// Effective matrix dimension (0 is treated as 1).
    pub fn rows(&self) -> u32 {
        self.matrix_dim.max(1)
    }

    /// Whether this element decodes into column arrays.
    pub fn is_matrix(&self) -> bool {
        self.matrix_dim > 1
    }

    /// Size in bytes of this element within a record.
    pub fn byte_size(&self) -> u32 {
        self.format.vector_size() * self.rows()
    }

    /// Number of display columns this element occupies in a row.
    pub fn column_count(&self) -> usize {
        if self.is_matrix() {
            self.format.comp_count as usize
        } else {
            self.format.decoded_count() as usize
        }
    }

    /// Whether this element holds the vertex position.
    ///
    /// Uses the system value tag, falling back to the conventional names.
    pub fn is_position(&self) -> bool {
        self.system_value == SystemValue::Position
            || self.name.eq_ignore_ascii_case("POSITION")
            || self.name.eq_ignore_ascii_case("SV_POSITION")
    }
}
