//! Builds [`Dataset`]s from replay engine calls.
//!
//! One fetch covers one stage. Any engine call failing degrades that stage to
//! an empty dataset carrying a [`FetchDiagnostic::EngineFailure`]; sibling
//! stages are fetched by independent jobs and are unaffected.

use std::sync::Arc;

use meshview_core::ResourceId;
use meshview_core::mesh::{
    DrawParams, IndexBufferBinding, Layout, MeshDataStage, PrimitiveRestart, RawSource,
};
use meshview_replay::{ReplayEngine, ReplayError};

use crate::dataset::{Dataset, FetchDiagnostic};
use crate::index::apply_base_vertex;

struct CallError {
    call: &'static str,
    error: ReplayError,
}

type FetchResult<T> = Result<T, CallError>;

/// Fetches the data of `stage` described by `layout`.
///
/// `byte_offset` only applies to raw buffer views, where it is added to
/// every record read.
pub async fn fetch(
    engine: &dyn ReplayEngine,
    stage: MeshDataStage,
    layout: Arc<Layout>,
    instance: u32,
    byte_offset: u64,
) -> Dataset {
    let mut dataset = Dataset::empty(stage, Arc::clone(&layout), instance);

    let result = if let Some(source) = layout.raw {
        fetch_raw(engine, source, byte_offset, &mut dataset).await
    } else if stage.is_post_transform() {
        fetch_post_transform(engine, &mut dataset).await
    } else {
        fetch_input(engine, &mut dataset).await
    };

    match result {
        Ok(()) => dataset.seal(),
        Err(CallError { call, error }) => {
            log::warn!("{stage}: {call} failed ({error}), showing no data");
            let mut empty = Dataset::empty(stage, layout, instance);
            empty.diagnostics = dataset.diagnostics;
            empty
                .diagnostics
                .push(FetchDiagnostic::EngineFailure { call, error });
            empty
        }
    }
}

/// Reads buffer bytes, recording a diagnostic when the engine returns fewer than asked.
async fn read_buffer(
    engine: &dyn ReplayEngine,
    id: ResourceId,
    offset: u64,
    len: u64,
    slot: Option<usize>,
    diagnostics: &mut Vec<FetchDiagnostic>,
) -> FetchResult<Vec<u8>> {
    log::debug!("get_buffer_bytes({id}, offset {offset}, len {len})");
    let bytes = engine
        .get_buffer_bytes(id, offset, len)
        .await
        .map_err(|error| CallError {
            call: "get_buffer_bytes",
            error,
        })?;
    let actual = bytes.len() as u64;
    if len != 0 && actual < len {
        log::debug!("short read of {id}: {actual} of {len} bytes");
        diagnostics.push(FetchDiagnostic::ShortRead {
            buffer: slot,
            expected: len,
            actual,
        });
    }
    Ok(bytes)
}

async fn read_indices(
    engine: &dyn ReplayEngine,
    id: ResourceId,
    binding: IndexBufferBinding,
    draw: &DrawParams,
    diagnostics: &mut Vec<FetchDiagnostic>,
) -> FetchResult<Vec<u32>> {
    let width = binding.format.size() as u64;
    let offset = binding.offset + draw.index_offset as u64 * width;
    let bytes = read_buffer(
        engine,
        id,
        offset,
        draw.vertex_count as u64 * width,
        None,
        diagnostics,
    )
    .await?;
    Ok(binding.format.decode(&bytes))
}

/// Highest index that addresses a real vertex.
fn max_index(indices: &[u32], restart: PrimitiveRestart) -> Option<u32> {
    let sentinel = restart.active_sentinel();
    indices.iter().copied().filter(|&i| Some(i) != sentinel).max()
}

async fn fetch_raw(
    engine: &dyn ReplayEngine,
    source: RawSource,
    byte_offset: u64,
    dataset: &mut Dataset,
) -> FetchResult<()> {
    let layout = Arc::clone(&dataset.layout);
    let bytes = match source {
        RawSource::Buffer(id) => {
            read_buffer(engine, id, 0, 0, Some(0), &mut dataset.diagnostics).await?
        }
        RawSource::Texture { id, mip } => {
            log::debug!("get_texture_bytes({id}, mip {mip})");
            engine
                .get_texture_bytes(id, 0, mip)
                .await
                .map_err(|error| CallError {
                    call: "get_texture_bytes",
                    error,
                })?
        }
    };

    let stride = match layout.stride(0) {
        0 => layout.record_size(),
        stride => stride,
    };
    dataset.stride_override = Some(stride);
    dataset.byte_offset = byte_offset;
    if stride != 0 {
        let records = (bytes.len() as u64).saturating_sub(byte_offset) / stride as u64;
        dataset.row_count = records as usize;
    }
    dataset.buffers = vec![bytes];
    Ok(())
}

async fn fetch_input(engine: &dyn ReplayEngine, dataset: &mut Dataset) -> FetchResult<()> {
    let layout = Arc::clone(&dataset.layout);
    let Some(draw) = layout.draw else {
        return Ok(());
    };
    dataset.topology = draw.topology;
    dataset.base_vertex = draw.base_vertex;
    if draw.vertex_count == 0 || layout.elements.is_empty() {
        return Ok(());
    }

    let max_vertex = if layout.uses_index_buffer() {
        match layout.index_buffer.and_then(|ib| Some((ib.resource?, ib))) {
            Some((id, binding)) => {
                let indices =
                    read_indices(engine, id, binding, &draw, &mut dataset.diagnostics).await?;
                if indices.is_empty() {
                    return Ok(());
                }
                let max = max_index(&indices, layout.restart);
                dataset.row_count = indices.len();
                dataset.display_indices = Some(indices.clone());
                dataset.data_indices = Some(indices);
                max
            }
            None => {
                log::warn!("indexed draw has no index buffer bound, every row reads vertex 0");
                dataset.missing_index_buffer = true;
                dataset.diagnostics.push(FetchDiagnostic::MissingIndexBuffer);
                dataset.row_count = draw.vertex_count as usize;
                Some(0)
            }
        }
    } else {
        dataset.row_count = draw.vertex_count as usize;
        Some(draw.vertex_count - 1)
    };
    let max_vertex = max_vertex.map_or(0, |m| apply_base_vertex(m, draw.base_vertex));
    let max_instance = draw.instance_count.max(1) - 1;

    let mut buffers = Vec::with_capacity(layout.buffers.len());
    let mut unbound = Vec::new();
    let mut largest = 0u64;

    for (slot, binding) in layout.buffers.iter().enumerate() {
        let mut per_vertex = false;
        let mut per_instance = false;
        for (i, element) in layout.elements.iter().enumerate() {
            if element.buffer == slot && layout.generic(i).is_none() {
                if element.per_instance {
                    per_instance = true;
                } else {
                    per_vertex = true;
                }
            }
        }

        let (max_record, first) = match (per_vertex, per_instance) {
            (false, false) => {
                buffers.push(Vec::new());
                continue;
            }
            (true, true) => {
                log::error!("buffer slot {slot} is read both per-vertex and per-instance");
                dataset
                    .diagnostics
                    .push(FetchDiagnostic::MixedBufferUsage { buffer: slot });
                (max_vertex.max(max_instance), draw.vertex_offset)
            }
            (true, false) => (max_vertex, draw.vertex_offset),
            (false, true) => (max_instance, draw.instance_offset),
        };

        let stride = binding.stride as u64;
        let len = if stride == 0 {
            // Every record aliases the first one, so read one record's extent.
            record_extent(&layout, slot)
        } else {
            (max_record as u64 + 1) * stride
        };

        match binding.resource {
            None => {
                log::debug!("buffer slot {slot} is unbound, zero-filling");
                dataset
                    .diagnostics
                    .push(FetchDiagnostic::UnboundBuffer { buffer: slot });
                unbound.push(slot);
                buffers.push(Vec::new());
            }
            Some(_) if len == 0 => buffers.push(Vec::new()),
            Some(id) => {
                let offset = binding.offset + first as u64 * stride;
                let bytes =
                    read_buffer(engine, id, offset, len, Some(slot), &mut dataset.diagnostics)
                        .await?;
                largest = largest.max(bytes.len() as u64);
                buffers.push(bytes);
            }
        }
    }

    // Sized from bytes that were actually read, never from index values.
    for slot in unbound {
        let len = largest.max(record_extent(&layout, slot));
        buffers[slot] = vec![0; len as usize];
    }
    dataset.buffers = buffers;
    Ok(())
}

/// Bytes spanned by one record of `slot`.
fn record_extent(layout: &Layout, slot: usize) -> u64 {
    layout
        .elements
        .iter()
        .filter(|e| e.buffer == slot)
        .map(|e| e.offset as u64 + e.byte_size() as u64)
        .max()
        .unwrap_or(0)
}

async fn fetch_post_transform(engine: &dyn ReplayEngine, dataset: &mut Dataset) -> FetchResult<()> {
    let layout = Arc::clone(&dataset.layout);
    let stage = dataset.stage;
    log::debug!("get_post_transform_data(instance {}, {stage})", dataset.instance);
    let post = engine
        .get_post_transform_data(dataset.instance, stage)
        .await
        .map_err(|error| CallError {
            call: "get_post_transform_data",
            error,
        })?;

    let Some(buffer) = post.buffer else {
        log::debug!("{stage}: no post-transform data");
        return Ok(());
    };
    dataset.topology = post.topology;
    dataset.base_vertex = post.base_vertex;

    let stride = match post.stride {
        0 => layout.record_size(),
        stride => stride,
    };
    dataset.stride_override = Some(stride);
    if stride == 0 {
        return Ok(());
    }

    match (layout.draw, post.remap_index_buffer) {
        (Some(draw), Some(remap)) if layout.uses_index_buffer() => {
            if let Some(binding) = layout.index_buffer
                && let Some(id) = binding.resource
            {
                let display =
                    read_indices(engine, id, binding, &draw, &mut dataset.diagnostics).await?;
                dataset.display_indices = Some(display);
            }

            let format = layout.index_format().unwrap_or_default();
            let width = format.size() as u64;
            let bytes = read_buffer(
                engine,
                remap,
                0,
                draw.vertex_count as u64 * width,
                None,
                &mut dataset.diagnostics,
            )
            .await?;
            let data = format.decode(&bytes);
            if data.is_empty() {
                return Ok(());
            }

            let len = max_index(&data, layout.restart)
                .map_or(0, |m| (m as u64 + 1) * stride as u64);
            dataset.row_count = data.len();
            dataset.data_indices = Some(data);
            dataset.buffers = if len == 0 {
                vec![Vec::new()]
            } else {
                let diagnostics = &mut dataset.diagnostics;
                let bytes =
                    read_buffer(engine, buffer, post.byte_offset, len, Some(0), diagnostics).await?;
                vec![bytes]
            };
        }
        _ => {
            if post.vertex_count == 0 {
                return Ok(());
            }
            let len = post.vertex_count as u64 * stride as u64;
            let diagnostics = &mut dataset.diagnostics;
            let bytes =
                read_buffer(engine, buffer, post.byte_offset, len, Some(0), diagnostics).await?;
            dataset.row_count = (post.vertex_count as usize).min(bytes.len() / stride as usize);
            dataset.buffers = vec![bytes];
        }
    }
    Ok(())
}
