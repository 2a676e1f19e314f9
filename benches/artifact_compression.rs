//! Criterion benchmarks for the compile hot path
//!
//! Covers: even-stride selection, screenshot resize + JPEG encode, privacy
//! blur, and request assembly.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use mimic::artifacts::{compress_image, select_evenly, CompiledArtifactSet, CompressionSettings};
use mimic::capture::screen::privacy_blur;
use mimic::synthesis::build_request;
use mimic::synthesis::request::DEFAULT_MAX_REQUEST_BYTES;
use mimic::{ActionEvent, ScreenshotRecord};
use std::path::PathBuf;

fn records(n: u32) -> Vec<ScreenshotRecord> {
    (0..n)
        .map(|i| ScreenshotRecord {
            sequence_index: i,
            file_path: PathBuf::from(format!("screen_{:04}.png", i)),
            t_offset: i as f64 * 2.0,
        })
        .collect()
}

fn screen_frame(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    }))
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

fn bench_select_evenly(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_evenly");
    for n in [30u32, 300, 3000] {
        let all = records(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &all, |b, all| {
            b.iter(|| black_box(select_evenly(black_box(all), 25)));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Compression
// ---------------------------------------------------------------------------

fn bench_compress_image(c: &mut Criterion) {
    let settings = CompressionSettings::default();
    let mut group = c.benchmark_group("compress_image");
    group.sample_size(10);
    for (w, h) in [(1280u32, 800u32), (1920, 1080), (2880, 1800)] {
        let frame = screen_frame(w, h);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{}x{}", w, h)), &frame, |b, frame| {
            b.iter(|| black_box(compress_image(black_box(frame), 0, &settings).ok()));
        });
    }
    group.finish();
}

fn bench_privacy_blur(c: &mut Criterion) {
    let frame = RgbaImage::from_fn(1440, 900, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255]));
    let mut group = c.benchmark_group("privacy_blur");
    group.sample_size(10);
    group.bench_function("1440x900", |b| b.iter(|| black_box(privacy_blur(black_box(&frame)))));
    group.finish();
}

// ---------------------------------------------------------------------------
// Request assembly
// ---------------------------------------------------------------------------

fn bench_build_request(c: &mut Criterion) {
    let settings = CompressionSettings::default();
    let images = (0..25)
        .filter_map(|i| compress_image(&screen_frame(640, 400), i, &settings).ok())
        .collect();
    let actions = (0..200)
        .map(|i| ActionEvent::KeyPress { key: "a".into(), t_offset: i as f64 * 0.1, redacted: false })
        .collect();
    let set = CompiledArtifactSet {
        task_name: "bench".into(),
        images,
        actions,
        raw_screenshot_count: 30,
    };

    c.bench_function("build_request_25_images", |b| {
        b.iter(|| black_box(build_request(black_box(&set), "model", 4096, DEFAULT_MAX_REQUEST_BYTES).ok()))
    });
}

criterion_group!(
    benches,
    bench_select_evenly,
    bench_compress_image,
    bench_privacy_blur,
    bench_build_request,
);
criterion_main!(benches);
