use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use bezregion::{
    generators::{checkerboard, rings, slanted_checkerboard},
    loop_breaker::break_loops,
    Contour, FillRule, Region,
};

fn fill(contours: &[Contour]) -> Region {
    Region::from_contours(contours, FillRule::NonZero).unwrap()
}

fn from_contours(c: &mut Criterion) {
    let (even, odd) = checkerboard(6);
    let all: Vec<_> = even.into_iter().chain(odd).collect();

    c.bench_function("fill checkerboard", |b| {
        b.iter(|| black_box(fill(&all)))
    });
    c.bench_function("break loops", |b| {
        b.iter(|| {
            for contour in &all {
                black_box(break_loops(contour));
            }
        })
    });
}

fn xor(c: &mut Criterion) {
    let (even, odd) = checkerboard(6);
    // Regions remember their results, so every iteration needs fresh ones.
    c.bench_function("xor", |b| {
        b.iter_batched(
            || (fill(&even), fill(&odd)),
            |(a, b)| black_box(a.symmetric_difference(&b)),
            BatchSize::SmallInput,
        )
    });

    let (even, odd) = slanted_checkerboard(6);
    c.bench_function("xor slanted", |b| {
        b.iter_batched(
            || (fill(&even), fill(&odd)),
            |(a, b)| black_box(a.symmetric_difference(&b)),
            BatchSize::SmallInput,
        )
    });
}

fn curves(c: &mut Criterion) {
    let rings = rings(8);
    let (left, right) = rings.split_at(4);
    c.bench_function("union of rings", |b| {
        b.iter_batched(
            || (fill(left), fill(right)),
            |(a, b)| black_box(a.union(&b)),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, from_contours, xor, curves);
criterion_main!(benches);
