//! Primitive assembly and index data formats.
//!
//! - [`PrimitiveTopology`] - How vertices are assembled into primitives
//! - [`IndexFormat`] - Index data format (u8, u16 or u32)
//! - [`PrimitiveRestart`] - Strip restart configuration of a draw

/// Primitive topology describing how vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Topology is not known (e.g. the engine returned no post-transform data).
    #[default]
    Unknown,
    /// Each vertex is a separate point.
    PointList,
    /// Every two vertices form a line.
    LineList,
    /// Vertices form a connected strip of lines.
    LineStrip,
    /// Every three vertices form a triangle.
    TriangleList,
    /// Vertices form a connected strip of triangles.
    TriangleStrip,
    /// Line list with adjacency information.
    LineListAdj,
    /// Line strip with adjacency information.
    LineStripAdj,
    /// Triangle list with adjacency information.
    TriangleListAdj,
    /// Triangle strip with adjacency information.
    TriangleStripAdj,
    /// Tessellation patch list with the given number of control points.
    PatchList(u32),
}

impl PrimitiveTopology {
    /// Whether this is a strip topology, where primitive restart applies.
    pub fn is_strip(&self) -> bool {
        matches!(
            self,
            Self::LineStrip | Self::LineStripAdj | Self::TriangleStrip | Self::TriangleStripAdj
        )
    }
}

/// Index format for indexed drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 8-bit unsigned integers.
    Uint8,
    /// 16-bit unsigned integers (max 65535 vertices).
    #[default]
    Uint16,
    /// 32-bit unsigned integers (max ~4 billion vertices).
    Uint32,
}

impl IndexFormat {
    /// Get the size in bytes of each index.
    pub fn size(&self) -> usize {
        match self {
            Self::Uint8 => 1,
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }

    /// Get the format for a byte width, if it is one of 1, 2 or 4.
    pub fn from_width(width: u32) -> Option<Self> {
        match width {
            1 => Some(Self::Uint8),
            2 => Some(Self::Uint16),
            4 => Some(Self::Uint32),
            _ => None,
        }
    }

    /// The all-ones value of this width, the conventional restart index.
    pub fn max_value(&self) -> u32 {
        match self {
            Self::Uint8 => u8::MAX as u32,
            Self::Uint16 => u16::MAX as u32,
            Self::Uint32 => u32::MAX,
        }
    }

    /// Widen raw little-endian index bytes into `u32` values.
    ///
    /// Trailing bytes that don't form a whole index are ignored.
    pub fn decode(&self, bytes: &[u8]) -> Vec<u32> {
        match self {
            Self::Uint8 => bytes.iter().map(|&b| b as u32).collect(),
            Self::Uint16 => bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as u32)
                .collect(),
            Self::Uint32 => bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        }
    }
}

/// Primitive restart state of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PrimitiveRestart {
    /// Whether restart is enabled for the draw.
    pub enabled: bool,
    /// The index value that terminates a strip.
    pub sentinel: u32,
}

impl PrimitiveRestart {
    /// Restart disabled.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Restart enabled with the all-ones sentinel of the given format.
    pub fn for_format(format: IndexFormat) -> Self {
        Self {
            enabled: true,
            sentinel: format.max_value(),
        }
    }

    /// The sentinel, if restart is enabled.
    pub fn active_sentinel(&self) -> Option<u32> {
        self.enabled.then_some(self.sentinel)
    }
}
