use std::sync::Arc;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use meshview::{Dataset, DecodeMode, NumberFormatter, decode_all, decode_row, fetch, format_row};
use meshview_core::ResourceId;
use meshview_core::compute::FetchEpoch;
use meshview_core::mesh::{
    CompType, DrawParams, FormatElement, Layout, MeshDataStage, ResourceFormat,
    VertexBufferBinding,
};
use meshview_replay::MemoryEngine;

const VERTICES: u32 = 10_000;
const VB: ResourceId = ResourceId::new(1);

/// Position, normal, uv and a UNorm8 color: 36 bytes per vertex.
fn layout() -> Layout {
    Layout::new()
        .with_buffer(VertexBufferBinding::new(VB, 36))
        .with_element(FormatElement::new("POSITION", ResourceFormat::float(3)))
        .with_element(FormatElement::new("NORMAL", ResourceFormat::float(3)).with_offset(12))
        .with_element(FormatElement::new("TEXCOORD", ResourceFormat::float(2)).with_offset(24))
        .with_element(
            FormatElement::new("COLOR", ResourceFormat::new(CompType::UNorm, 1, 4)).with_offset(32),
        )
        .with_draw(DrawParams::new(VERTICES))
}

fn engine() -> MemoryEngine {
    let engine = MemoryEngine::new();
    let bytes: Vec<u8> = (0..VERTICES as usize * 36).map(|i| (i % 251) as u8).collect();
    engine.insert_buffer(VB, bytes);
    engine
}

fn fetch_dataset(engine: &MemoryEngine, layout: &Arc<Layout>) -> Dataset {
    pollster::block_on(fetch(engine, MeshDataStage::VertexInput, Arc::clone(layout), 0, 0))
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

fn bench_fetch_input(c: &mut Criterion) {
    let engine = engine();
    let layout = Arc::new(layout());
    c.bench_function("fetch_input_10k", |b| {
        b.iter(|| black_box(fetch_dataset(&engine, &layout)));
    });
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn bench_decode_single_row(c: &mut Criterion) {
    let dataset = fetch_dataset(&engine(), &Arc::new(layout()));
    c.bench_function("decode_row", |b| {
        b.iter(|| black_box(decode_row(&dataset, black_box(4_321))));
    });
}

fn bench_decode_all_eager(c: &mut Criterion) {
    let engine = engine();
    let layout = Arc::new(layout());
    let epoch = FetchEpoch::new();
    c.bench_function("decode_all_eager_10k", |b| {
        b.iter_batched(
            || fetch_dataset(&engine, &layout),
            |dataset| black_box(decode_all(&dataset, &epoch.snapshot(), DecodeMode::Eager)),
            BatchSize::LargeInput,
        );
    });
}

fn bench_decode_all_lazy(c: &mut Criterion) {
    let dataset = fetch_dataset(&engine(), &Arc::new(layout()));
    let epoch = FetchEpoch::new();
    c.bench_function("decode_all_bounds_only_10k", |b| {
        b.iter(|| black_box(decode_all(&dataset, &epoch.snapshot(), DecodeMode::Lazy)));
    });
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

fn bench_format_floats(c: &mut Criterion) {
    let formatter = NumberFormatter::default();
    c.bench_function("format_float_mixed", |b| {
        b.iter(|| {
            for value in [0.0, -1.5, 0.123456, 12345678.0, -0.000001] {
                black_box(formatter.format_float(black_box(value)));
            }
        });
    });
}

fn bench_format_row(c: &mut Criterion) {
    let dataset = fetch_dataset(&engine(), &Arc::new(layout()));
    let formatter = NumberFormatter::default();
    let row = decode_row(&dataset, 17);
    c.bench_function("format_row", |b| {
        b.iter(|| black_box(format_row(&row, &dataset.layout, &formatter)));
    });
}

criterion_group!(
    benches,
    bench_fetch_input,
    bench_decode_single_row,
    bench_decode_all_eager,
    bench_decode_all_lazy,
    bench_format_floats,
    bench_format_row,
);
criterion_main!(benches);
