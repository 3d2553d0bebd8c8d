use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;
use swfbits::extract::extract_images;
use swfbits::recompress::RecompressOptions;
use swfbits::tags::TagReader;
use swfbits::Movie;

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

fn lossless2_tag(id: u16, w: u16, h: u16) -> Vec<u8> {
    let argb: Vec<u8> = (0..w as usize * h as usize)
        .flat_map(|i| [255u8, (i % 256) as u8, (i / 256 % 256) as u8, (i % 64) as u8])
        .collect();
    let mut payload = id.to_le_bytes().to_vec();
    payload.push(5);
    payload.extend(w.to_le_bytes());
    payload.extend(h.to_le_bytes());
    payload.extend(deflate(&argb));

    let mut tag = ((36u16 << 6) | 0x3F).to_le_bytes().to_vec();
    tag.extend((payload.len() as u32).to_le_bytes());
    tag.extend(payload);
    tag
}

fn synthetic_movie(bitmaps: u16, w: u16, h: u16) -> Vec<u8> {
    let mut body = Vec::new();
    for id in 0..bitmaps {
        body.extend(lossless2_tag(id, w, h));
    }
    let mut data = vec![b'F', b'W', b'S', 6];
    data.extend(((13 + body.len()) as u32).to_le_bytes());
    data.push(0x00);
    data.extend([0x00, 0x0A, 0x01, 0x00]);
    data.extend(body);
    data
}

fn bench_tag_walk(c: &mut Criterion) {
    let swf = synthetic_movie(32, 64, 64);
    let movie = Movie::normalize(&swf).unwrap();

    c.bench_function("tag_walk_32_bitmaps", |b| {
        b.iter(|| TagReader::new(black_box(movie.body())).count())
    });
}

fn bench_extract(c: &mut Criterion) {
    let swf = synthetic_movie(8, 64, 64);

    c.bench_function("extract_8_bitmaps_64px", |b| {
        b.iter(|| extract_images(black_box(&swf), RecompressOptions::default()).unwrap())
    });

    c.bench_function("extract_8_bitmaps_64px_fast_png", |b| {
        b.iter(|| {
            extract_images(
                black_box(&swf),
                RecompressOptions {
                    quality: 10,
                    ..Default::default()
                },
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, bench_tag_walk, bench_extract);
criterion_main!(benches);
