//! Per-stage vertex layout descriptors.
//!
//! A [`Layout`] bundles everything needed to fetch and decode one stage of a
//! draw: the element list, the vertex buffer bindings, the index buffer,
//! restart state and draw parameters. It can alternatively describe a raw
//! buffer view with no draw at all (see [`Layout::raw_buffer`]).
//!
//! Layouts are shared via `Arc` between the fetch job, the decode job and the
//! consumer, and are never mutated once handed over.
//!
//! # Example
//!
//! ```ignore
//! let layout = Arc::new(Layout::new()
//!     .with_buffer(VertexBufferBinding::new(vb, 24))
//!     .with_element(FormatElement::new("POSITION", ResourceFormat::float(3)))
//!     .with_element(FormatElement::new("NORMAL", ResourceFormat::float(3)).with_offset(12))
//!     .with_index_buffer(IndexBufferBinding::new(ib, IndexFormat::Uint16))
//!     .with_draw(DrawParams::indexed(36)));
//! ```

use super::format::FormatElement;
use super::topology::{IndexFormat, PrimitiveRestart, PrimitiveTopology};
use super::value::ComponentValue;
use crate::resource::ResourceId;

/// A vertex buffer bound to one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexBufferBinding {
    /// Bound buffer, `None` if the slot is empty.
    pub resource: Option<ResourceId>,
    /// Bytes between consecutive records.
    pub stride: u32,
    /// Base byte offset of the binding.
    pub offset: u64,
}

impl VertexBufferBinding {
    pub fn new(resource: ResourceId, stride: u32) -> Self {
        Self {
            resource: Some(resource),
            stride,
            offset: 0,
        }
    }

    /// A slot with a known stride but nothing bound.
    pub fn unbound(stride: u32) -> Self {
        Self {
            resource: None,
            stride,
            offset: 0,
        }
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

/// The index buffer of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexBufferBinding {
    /// Bound buffer, `None` if nothing is bound.
    pub resource: Option<ResourceId>,
    /// Base byte offset of the binding.
    pub offset: u64,
    /// Width of each index.
    pub format: IndexFormat,
}

impl IndexBufferBinding {
    pub fn new(resource: ResourceId, format: IndexFormat) -> Self {
        Self {
            resource: Some(resource),
            offset: 0,
            format,
        }
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

/// Parameters of the draw call a layout was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawParams {
    /// Number of indices (indexed draws) or vertices (non-indexed draws).
    pub vertex_count: u32,
    /// Number of instances.
    pub instance_count: u32,
    /// Signed offset added to every index before the buffer lookup.
    pub base_vertex: i32,
    /// First vertex of a non-indexed draw.
    pub vertex_offset: u32,
    /// First instance.
    pub instance_offset: u32,
    /// First index of an indexed draw, in indices.
    pub index_offset: u32,
    /// Primitive assembly.
    pub topology: PrimitiveTopology,
    /// Whether the draw reads an index buffer.
    pub uses_index_buffer: bool,
}

impl DrawParams {
    /// A non-indexed triangle-list draw of one instance.
    pub fn new(vertex_count: u32) -> Self {
        Self {
            vertex_count,
            instance_count: 1,
            base_vertex: 0,
            vertex_offset: 0,
            instance_offset: 0,
            index_offset: 0,
            topology: PrimitiveTopology::TriangleList,
            uses_index_buffer: false,
        }
    }

    /// An indexed triangle-list draw of one instance.
    pub fn indexed(index_count: u32) -> Self {
        Self {
            uses_index_buffer: true,
            ..Self::new(index_count)
        }
    }

    pub fn with_instances(mut self, instance_count: u32) -> Self {
        self.instance_count = instance_count;
        self
    }

    pub fn with_base_vertex(mut self, base_vertex: i32) -> Self {
        self.base_vertex = base_vertex;
        self
    }

    pub fn with_vertex_offset(mut self, vertex_offset: u32) -> Self {
        self.vertex_offset = vertex_offset;
        self
    }

    pub fn with_instance_offset(mut self, instance_offset: u32) -> Self {
        self.instance_offset = instance_offset;
        self
    }

    pub fn with_index_offset(mut self, index_offset: u32) -> Self {
        self.index_offset = index_offset;
        self
    }

    pub fn with_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }
}

/// Source of a raw buffer view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSource {
    /// A whole buffer.
    Buffer(ResourceId),
    /// One mip of a texture, viewed as a flat byte array.
    Texture { id: ResourceId, mip: u32 },
}

impl RawSource {
    pub fn resource(&self) -> ResourceId {
        match *self {
            Self::Buffer(id) | Self::Texture { id, .. } => id,
        }
    }
}

/// One stage's complete vertex format and draw description.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    /// Optional debug label.
    pub label: Option<String>,
    /// Elements in display order.
    pub elements: Vec<FormatElement>,
    /// Bindings per buffer slot.
    pub buffers: Vec<VertexBufferBinding>,
    /// Constant values per element, for elements not backed by a buffer.
    pub generics: Vec<Option<Vec<ComponentValue>>>,
    /// Index buffer of the draw.
    pub index_buffer: Option<IndexBufferBinding>,
    /// Strip restart state.
    pub restart: PrimitiveRestart,
    /// Draw parameters, `None` for raw buffer views.
    pub draw: Option<DrawParams>,
    /// Raw view source, `None` for draw layouts.
    pub raw: Option<RawSource>,
}

impl Layout {
    /// Create an empty draw layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// A raw view over a whole buffer, one record every `stride` bytes.
    ///
    /// A zero stride falls back to [`record_size`](Self::record_size).
    pub fn raw_buffer(id: ResourceId, stride: u32) -> Self {
        Self {
            buffers: vec![VertexBufferBinding::new(id, stride)],
            raw: Some(RawSource::Buffer(id)),
            ..Self::default()
        }
    }

    /// A raw view over one mip of a texture.
    pub fn raw_texture(id: ResourceId, mip: u32, stride: u32) -> Self {
        Self {
            buffers: vec![VertexBufferBinding::new(id, stride)],
            raw: Some(RawSource::Texture { id, mip }),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_element(mut self, element: FormatElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_buffer(mut self, binding: VertexBufferBinding) -> Self {
        self.buffers.push(binding);
        self
    }

    /// Attach a constant value to the element at `element`.
    pub fn with_generic(mut self, element: usize, values: Vec<ComponentValue>) -> Self {
        if self.generics.len() <= element {
            self.generics.resize(element + 1, None);
        }
        self.generics[element] = Some(values);
        self
    }

    pub fn with_index_buffer(mut self, binding: IndexBufferBinding) -> Self {
        self.index_buffer = Some(binding);
        self
    }

    pub fn with_restart(mut self, restart: PrimitiveRestart) -> Self {
        self.restart = restart;
        self
    }

    pub fn with_draw(mut self, draw: DrawParams) -> Self {
        self.draw = Some(draw);
        self
    }

    /// Byte size of the element at `element`, 0 if there is no such element.
    pub fn byte_size(&self, element: usize) -> u32 {
        self.elements.get(element).map_or(0, FormatElement::byte_size)
    }

    /// Sum of all element sizes, the implicit stride of a tightly packed record.
    pub fn record_size(&self) -> u32 {
        self.elements.iter().map(FormatElement::byte_size).sum()
    }

    /// Stride of buffer slot `buffer`, 0 if there is no such slot.
    pub fn stride(&self, buffer: usize) -> u32 {
        self.buffers.get(buffer).map_or(0, |b| b.stride)
    }

    /// Constant value of the element at `element`, if it has one.
    pub fn generic(&self, element: usize) -> Option<&[ComponentValue]> {
        self.generics.get(element)?.as_deref()
    }

    /// Whether the draw reads through an index buffer.
    pub fn uses_index_buffer(&self) -> bool {
        self.draw.is_some_and(|d| d.uses_index_buffer)
    }

    /// Index format of the draw, if it is indexed.
    pub fn index_format(&self) -> Option<IndexFormat> {
        if !self.uses_index_buffer() {
            return None;
        }
        Some(self.index_buffer.map(|ib| ib.format).unwrap_or_default())
    }

    /// Topology of the draw, `Unknown` for raw views.
    pub fn topology(&self) -> PrimitiveTopology {
        self.draw.map_or(PrimitiveTopology::Unknown, |d| d.topology)
    }

    pub fn is_raw(&self) -> bool {
        self.raw.is_some()
    }

    /// Index of the element holding vertex positions, if any.
    ///
    /// Prefers an explicit [`SystemValue::Position`](super::SystemValue::Position)
    /// tag over a name match.
    pub fn position_element(&self) -> Option<usize> {
        self.elements
            .iter()
            .position(|e| e.system_value == super::SystemValue::Position)
            .or_else(|| self.elements.iter().position(FormatElement::is_position))
    }
}
