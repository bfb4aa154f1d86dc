use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ledframe::{
    processing::{clahe::Clahe, FrameProcessor},
    source::{FrameSource, Pattern, SyntheticSource},
    ConvertConfig, Mode, Resolution,
};

fn gradient_frame(width: u32, height: u32) -> ledframe::Frame {
    SyntheticSource::new(30, 1, Resolution::new(width, height), Pattern::Gradient)
        .next_frame()
        .unwrap()
        .unwrap()
}

fn bench_chain(c: &mut Criterion) {
    let frame = gradient_frame(1920, 1080);
    for mode in [Mode::Normal, Mode::HighContrast] {
        let processor = FrameProcessor::new(&ConvertConfig::default().with_mode(mode));
        c.bench_function(&format!("chain_1080p_{}", mode), |b| {
            b.iter(|| processor.process(black_box(frame.clone())).unwrap())
        });
    }
}

fn bench_clahe(c: &mut Criterion) {
    let plane: Vec<u8> = (0..40 * 96).map(|i| (i % 251) as u8).collect();
    let clahe = Clahe::new(2.0, 2, 2);
    c.bench_function("clahe_40x96", |b| {
        b.iter(|| {
            let mut p = plane.clone();
            clahe.apply(black_box(&mut p), 40, 96);
            p
        })
    });
}

criterion_group!(benches, bench_chain, bench_clahe);
criterion_main!(benches);
