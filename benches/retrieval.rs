//! Benchmarks comparing the image retrieval strategies.
//!
//! Run with:
//!   cargo bench -- retrieval
//!
//! Each strategy rebuilds the same canonical image: raw layouts from the
//! peer, the compressed round-trip through a transient file, and a snapshot
//! of the shared-memory region.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use pixbridge::layout;
use pixbridge::prelude::*;

/// Common resolutions to benchmark
const RESOLUTIONS: &[(u32, u32, &str)] = &[
    (320, 240, "QVGA"),
    (640, 480, "VGA"),
    (1280, 720, "720p"),
    (1920, 1080, "1080p"),
];

fn test_image(width: u32, height: u32) -> PixelBuffer {
    PixelBuffer::from_fn(Shape::new(height, width, 3), |h, w, c| {
        ((h * 255 / height as usize) ^ (w * 255 / width as usize) ^ (c * 85)) as u8
    })
    .expect("valid shape")
}

fn bench_retrieve(c: &mut Criterion) {
    let mut group = c.benchmark_group("retrieve");
    group.sample_size(20);

    for &(width, height, name) in RESOLUTIONS {
        let image = test_image(width, height);
        let dir = tempfile::tempdir().expect("Failed to create scratch dir");
        let mut source =
            ImageSource::new(SourceConfig::in_dir(dir.path()), LocalPeer::new(), AutoCodec::default())
                .expect("Failed to create source");
        let jpeg = JpegCodec::default().encode(&image).expect("JPEG encode");
        source.set_image(&jpeg, "bench.jpg").expect("Failed to ingest");

        group.throughput(Throughput::Bytes(image.payload().len() as u64));

        for strategy in Strategy::ALL {
            group.bench_with_input(
                BenchmarkId::new(strategy.to_string(), name),
                &strategy,
                |b, &strategy| {
                    b.iter(|| {
                        let image = source.retrieve(strategy).unwrap();
                        std::hint::black_box(image);
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_layout_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_decode");

    for &(width, height, name) in RESOLUTIONS {
        let image = test_image(width, height);
        group.throughput(Throughput::Bytes(image.payload().len() as u64));

        for kind in RawLayout::ALL {
            let raw = layout::encode(kind, &image);
            group.bench_with_input(
                BenchmarkId::new(format!("{kind:?}"), name),
                &raw,
                |b, raw| {
                    b.iter(|| {
                        let decoded = layout::decode(kind, raw, image.shape()).unwrap();
                        std::hint::black_box(decoded);
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_png_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("png_round_trip");
    group.sample_size(10);

    for &(width, height, name) in &RESOLUTIONS[..2] {
        let image = test_image(width, height);
        let dir = tempfile::tempdir().expect("Failed to create scratch dir");
        let round_trip = CompressedRoundTrip::new(PngCodec, dir.path());
        let encoded = round_trip.encode(&image).expect("PNG encode");

        group.throughput(Throughput::Bytes(image.payload().len() as u64));
        group.bench_with_input(BenchmarkId::new("decode", name), &encoded, |b, encoded| {
            b.iter(|| {
                let decoded = round_trip.decode(encoded).unwrap();
                std::hint::black_box(decoded);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_retrieve,
    bench_layout_decode,
    bench_png_round_trip,
);

criterion_main!(benches);
